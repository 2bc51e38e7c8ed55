//! SeaORM entity models
//!
//! Database entities for ScholarPort

mod article;
mod citation;

pub use article::{
    ActiveModel as ArticleActiveModel, Column as ArticleColumn, Entity as ArticleEntity,
    Model as Article, ARTICLE_STATUSES, DEFAULT_ARTICLE_STATUS,
};

pub use citation::{
    ActiveModel as CitationActiveModel, Column as CitationColumn, Entity as CitationEntity,
    Model as Citation, CITATION_TYPES, DEFAULT_CITATION_TYPE,
};
