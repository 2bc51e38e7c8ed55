//! Citation entity
//!
//! Each citation belongs to exactly one article. The `(article_id, title,
//! year)` tuple is unique per the duplicate-detection invariant; the schema
//! backs it with a unique index so concurrent check-then-write races still
//! surface as conflicts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Allowed values for the `citation_type` column
pub const CITATION_TYPES: &[&str] = &[
    "direct",
    "indirect",
    "supporting",
    "contrasting",
    "methodological",
];

/// Default type assigned when a create request omits one
pub const DEFAULT_CITATION_TYPE: &str = "direct";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning article
    pub article_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Free-form author string, not a list
    #[sea_orm(column_type = "Text")]
    pub authors: String,

    pub year: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub volume: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub issue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pages: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,

    /// One of direct, indirect, supporting, contrasting, methodological
    #[sea_orm(column_type = "Text")]
    pub citation_type: String,

    /// Sentence or passage where the citation occurs
    #[sea_orm(column_type = "Text", nullable)]
    pub context: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub is_verified: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
