//! Article CRUD handlers
//!
//! Seven operations: list, search, read (with embedded citations), create,
//! update, delete (cascading), and per-article statistics. Create and update
//! pre-check the DOI so the common duplicate case answers 409 with a clear
//! message; the unique index on the column catches whatever the pre-check
//! races past.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use scholarport_common::db::models::Article;
use scholarport_common::db::{
    ArticleChanges, ArticleFilter, ArticleSortKey, NewArticle, PageRequest, Repository, SortOrder,
    MAX_PAGE_SIZE,
};
use scholarport_common::errors::{AppError, Result};
use scholarport_common::metrics;
use scholarport_common::response::{ApiResponse, PageMeta};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{citations::CitationResponse, parse_id};
use crate::validation::{
    validate_authors, validate_doi, validate_keywords, validate_publication_date, validate_status,
};
use crate::AppState;

const DEFAULT_LIST_LIMIT: u64 = 10;
const DEFAULT_SEARCH_LIMIT: u64 = 20;

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArticlesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    #[validate(length(min = 3, max = 500, message = "Title must be between 3 and 500 characters"))]
    pub title: String,

    #[validate(custom(function = validate_authors))]
    pub authors: Vec<String>,

    #[serde(rename = "abstract")]
    #[validate(length(
        min = 50,
        max = 5000,
        message = "Abstract must be between 50 and 5000 characters"
    ))]
    pub abstract_text: String,

    #[validate(custom(function = validate_publication_date))]
    pub publication_date: DateTime<Utc>,

    #[validate(custom(function = validate_doi))]
    pub doi: String,

    #[serde(default)]
    #[validate(custom(function = validate_keywords))]
    pub keywords: Vec<String>,

    #[validate(length(max = 200, message = "Journal name cannot exceed 200 characters"))]
    pub journal: Option<String>,

    #[validate(length(max = 20, message = "Volume cannot exceed 20 characters"))]
    pub volume: Option<String>,

    #[validate(length(max = 20, message = "Issue cannot exceed 20 characters"))]
    pub issue: Option<String>,

    #[validate(length(max = 50, message = "Pages cannot exceed 50 characters"))]
    pub pages: Option<String>,

    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[validate(length(min = 3, max = 500, message = "Title must be between 3 and 500 characters"))]
    pub title: Option<String>,

    #[validate(custom(function = validate_authors))]
    pub authors: Option<Vec<String>>,

    #[serde(rename = "abstract")]
    #[validate(length(
        min = 50,
        max = 5000,
        message = "Abstract must be between 50 and 5000 characters"
    ))]
    pub abstract_text: Option<String>,

    #[validate(custom(function = validate_publication_date))]
    pub publication_date: Option<DateTime<Utc>>,

    #[validate(custom(function = validate_doi))]
    pub doi: Option<String>,

    #[validate(custom(function = validate_keywords))]
    pub keywords: Option<Vec<String>>,

    #[validate(length(max = 200, message = "Journal name cannot exceed 200 characters"))]
    pub journal: Option<String>,

    #[validate(length(max = 20, message = "Volume cannot exceed 20 characters"))]
    pub volume: Option<String>,

    #[validate(length(max = 20, message = "Issue cannot exceed 20 characters"))]
    pub issue: Option<String>,

    #[validate(length(max = 50, message = "Pages cannot exceed 50 characters"))]
    pub pages: Option<String>,

    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

impl From<UpdateArticleRequest> for ArticleChanges {
    fn from(req: UpdateArticleRequest) -> Self {
        ArticleChanges {
            title: req.title,
            authors: req.authors,
            abstract_text: req.abstract_text,
            publication_date: req.publication_date,
            doi: req.doi,
            keywords: req.keywords,
            journal: req.journal,
            volume: req.volume,
            issue: req.issue,
            pages: req.pages,
            status: req.status,
        }
    }
}

/// Public article record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publication_date: String,
    pub doi: String,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    pub citation_count: i32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title,
            authors: article.authors,
            abstract_text: article.abstract_text,
            publication_date: article.publication_date.to_rfc3339(),
            doi: article.doi,
            keywords: article.keywords,
            journal: article.journal,
            volume: article.volume,
            issue: article.issue,
            pages: article.pages,
            citation_count: article.citation_count,
            status: article.status,
            created_at: article.created_at.to_rfc3339(),
            updated_at: article.updated_at.to_rfc3339(),
        }
    }
}

/// Article read payload with its citations embedded
#[derive(Debug, Serialize)]
pub struct ArticleDetailResponse {
    #[serde(flatten)]
    pub article: ArticleResponse,
    pub citations: Vec<CitationResponse>,
}

/// Per-article statistics payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStatsResponse {
    pub article_id: String,
    pub title: String,
    #[serde(flatten)]
    pub stats: scholarport_common::db::CitationStats,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/articles
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<impl IntoResponse> {
    let repo = Repository::new(state.db.clone());

    let filter = ArticleFilter {
        search: query.search,
        year: query.year,
    };
    let sort_by = ArticleSortKey::parse(query.sort_by.as_deref());
    let order = SortOrder::parse(query.order.as_deref());
    let page = PageRequest::clamped(query.page, query.limit, DEFAULT_LIST_LIMIT);

    let (articles, total) = repo.list_articles(&filter, sort_by, order, page).await?;
    let items: Vec<ArticleResponse> = articles.into_iter().map(Into::into).collect();
    let count = items.len();

    Ok(Json(
        ApiResponse::data(items)
            .with_count(count)
            .with_pagination(PageMeta::new(page.page, page.limit, total)),
    ))
}

/// GET /api/articles/search?q=...
pub async fn search_articles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest {
            message: "Search query is required".to_string(),
        })?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_PAGE_SIZE);

    let repo = Repository::new(state.db.clone());
    let articles = repo.search_articles(q, limit).await?;
    metrics::record_search("articles");

    let items: Vec<ArticleResponse> = articles.into_iter().map(Into::into).collect();
    let count = items.len();

    Ok(Json(ApiResponse::data(items).with_count(count)))
}

/// GET /api/articles/{id}
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    let article = repo
        .find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    let citations = repo.citations_for_article(article_id).await?;

    Ok(Json(ApiResponse::data(ArticleDetailResponse {
        article: article.into(),
        citations: citations.into_iter().map(Into::into).collect(),
    })))
}

/// POST /api/articles
pub async fn create_article(
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let repo = Repository::new(state.db.clone());

    if repo.find_article_by_doi(&payload.doi).await?.is_some() {
        return Err(AppError::duplicate_doi());
    }

    let article = repo
        .create_article(NewArticle {
            title: payload.title,
            authors: payload.authors,
            abstract_text: payload.abstract_text,
            publication_date: payload.publication_date,
            doi: payload.doi,
            keywords: payload.keywords,
            journal: payload.journal,
            volume: payload.volume,
            issue: payload.issue,
            pages: payload.pages,
            status: payload.status,
        })
        .await?;

    metrics::record_article_created();

    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::data(ArticleResponse::from(article))
                .with_message("Article created successfully"),
        ),
    ))
}

/// PUT /api/articles/{id}
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    let article = repo
        .find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    // Only re-check the DOI when the payload actually changes it
    if let Some(doi) = payload.doi.as_deref() {
        if doi.trim() != article.doi {
            if repo.find_article_by_doi(doi).await?.is_some() {
                return Err(AppError::duplicate_doi());
            }
        }
    }

    let updated = repo.update_article(article, payload.into()).await?;

    Ok(Json(
        ApiResponse::data(ArticleResponse::from(updated))
            .with_message("Article updated successfully"),
    ))
}

/// DELETE /api/articles/{id}
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    repo.find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    let removed = repo.delete_article_cascade(article_id).await?;
    metrics::record_article_deleted();

    tracing::info!(article_id = %article_id, citations_removed = removed, "Article deleted");

    Ok(Json(ApiResponse::<()>::message(
        "Article and citations deleted",
    )))
}

/// GET /api/articles/{id}/stats
pub async fn article_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    let article = repo
        .find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    let stats = repo.citation_stats(article_id).await?;

    Ok(Json(ApiResponse::data(ArticleStatsResponse {
        article_id: article.id.to_string(),
        title: article.title,
        stats,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_create() -> CreateArticleRequest {
        serde_json::from_value(json!({
            "title": "Deep Residual Learning",
            "authors": ["He, K.", "Zhang, X."],
            "abstract": "a".repeat(120),
            "publicationDate": "2016-06-27T00:00:00Z",
            "doi": "10.1109/CVPR.2016.90",
            "keywords": ["vision"]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_request_valid() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_short_title() {
        let mut req = valid_create();
        req.title = "ab".to_string();
        let err: AppError = req.validate().unwrap_err().into();
        match err {
            AppError::Validation { errors } => {
                assert!(errors
                    .iter()
                    .any(|e| e.contains("Title must be between 3 and 500 characters")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_request_rejects_bad_doi() {
        let mut req = valid_create();
        req.doi = "doi:12345".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_empty_authors() {
        let mut req = valid_create();
        req.authors = vec![];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_all_fields_optional() {
        let req: UpdateArticleRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());
        let changes: ArticleChanges = req.into();
        assert!(changes.title.is_none());
        assert!(changes.doi.is_none());
    }

    #[test]
    fn test_abstract_field_renamed() {
        // the public field is "abstract", the struct field is abstract_text
        let req: std::result::Result<CreateArticleRequest, _> = serde_json::from_value(json!({
            "title": "Title",
            "authors": ["Doe, J."],
            "abstractText": "a".repeat(120),
            "publicationDate": "2016-06-27T00:00:00Z",
            "doi": "10.1000/1"
        }));
        assert!(req.is_err());
    }

    #[test]
    fn test_article_response_shape() {
        use chrono::Utc;
        use uuid::Uuid;

        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: "T".into(),
            authors: vec!["A".into()],
            abstract_text: "abs".into(),
            publication_date: now.into(),
            doi: "10.1000/1".into(),
            keywords: vec![],
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            citation_count: 2,
            status: "published".into(),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let json = serde_json::to_value(ArticleResponse::from(article)).unwrap();
        assert!(json["id"].is_string());
        assert_eq!(json["citationCount"], 2);
        assert!(json.get("abstract").is_some());
        assert!(json.get("abstractText").is_none());
        assert!(json.get("journal").is_none()); // absent optionals are omitted
    }
}
