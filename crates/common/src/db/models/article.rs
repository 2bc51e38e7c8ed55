//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Allowed values for the article `status` column
pub const ARTICLE_STATUSES: &[&str] = &["draft", "published", "in-review", "accepted"];

/// Default status assigned when a create request omits one
pub const DEFAULT_ARTICLE_STATUS: &str = "published";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Ordered author list, at least one entry
    pub authors: Vec<String>,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    pub publication_date: DateTimeWithTimeZone,

    /// Globally unique, `10.<4+ digits>/<suffix>` format
    #[sea_orm(column_type = "Text", unique)]
    pub doi: String,

    pub keywords: Vec<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub volume: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub issue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pages: Option<String>,

    pub citation_count: i32,

    /// One of draft, published, in-review, accepted
    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::citation::Entity", on_delete = "Cascade")]
    Citations,
}

impl Related<super::citation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Citations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
