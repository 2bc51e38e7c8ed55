//! Citation handlers
//!
//! Citations live under their article for list/create/stats/bulk, and are
//! addressed directly for read/update/delete/verify/format/search. The
//! `(article, title, year)` duplicate invariant is pre-checked on create and
//! on updates that touch the title or year; the unique index backs the check
//! under concurrency.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use scholarport_common::db::models::{Article, Citation};
use scholarport_common::db::{
    BulkEntryFailure, CitationChanges, CitationFilter, CitationSortKey, NewCitation, PageRequest,
    Repository, SortOrder, MAX_PAGE_SIZE,
};
use scholarport_common::errors::{AppError, Result};
use scholarport_common::format::{format_citation, CitationStyle};
use scholarport_common::metrics;
use scholarport_common::response::{ApiResponse, PageMeta};
use scholarport_common::MAX_BULK_CITATIONS;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_id;
use crate::validation::{
    convert_bulk_entries, validate_citation_type, validate_doi, validate_year, BulkCitationEntry,
};
use crate::AppState;

const DEFAULT_LIST_LIMIT: u64 = 20;
const DEFAULT_SEARCH_LIMIT: u64 = 20;

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCitationsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub year: Option<i32>,
    pub citation_type: Option<String>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub style: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCitationRequest {
    #[validate(length(
        min = 3,
        max = 500,
        message = "Citation title must be between 3 and 500 characters"
    ))]
    pub title: String,

    #[validate(length(
        min = 2,
        max = 300,
        message = "Authors must be between 2 and 300 characters"
    ))]
    pub authors: String,

    #[validate(custom(function = validate_year))]
    pub year: i32,

    #[validate(length(max = 200, message = "Journal name cannot exceed 200 characters"))]
    pub journal: Option<String>,

    #[validate(length(max = 20, message = "Volume cannot exceed 20 characters"))]
    pub volume: Option<String>,

    #[validate(length(max = 20, message = "Issue cannot exceed 20 characters"))]
    pub issue: Option<String>,

    #[validate(length(max = 50, message = "Pages cannot exceed 50 characters"))]
    pub pages: Option<String>,

    #[validate(custom(function = validate_doi))]
    pub doi: Option<String>,

    #[validate(url(message = "URL must be a valid URL"))]
    pub url: Option<String>,

    #[validate(custom(function = validate_citation_type))]
    pub citation_type: Option<String>,

    #[validate(length(max = 1000, message = "Context cannot exceed 1000 characters"))]
    pub context: Option<String>,

    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
}

impl From<CreateCitationRequest> for NewCitation {
    fn from(req: CreateCitationRequest) -> Self {
        NewCitation {
            title: req.title,
            authors: req.authors,
            year: req.year,
            journal: req.journal,
            volume: req.volume,
            issue: req.issue,
            pages: req.pages,
            doi: req.doi,
            url: req.url,
            citation_type: req.citation_type,
            context: req.context,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCitationRequest {
    #[validate(length(
        min = 3,
        max = 500,
        message = "Citation title must be between 3 and 500 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = 2,
        max = 300,
        message = "Authors must be between 2 and 300 characters"
    ))]
    pub authors: Option<String>,

    #[validate(custom(function = validate_year))]
    pub year: Option<i32>,

    #[validate(length(max = 200, message = "Journal name cannot exceed 200 characters"))]
    pub journal: Option<String>,

    #[validate(length(max = 20, message = "Volume cannot exceed 20 characters"))]
    pub volume: Option<String>,

    #[validate(length(max = 20, message = "Issue cannot exceed 20 characters"))]
    pub issue: Option<String>,

    #[validate(length(max = 50, message = "Pages cannot exceed 50 characters"))]
    pub pages: Option<String>,

    #[validate(custom(function = validate_doi))]
    pub doi: Option<String>,

    #[validate(url(message = "URL must be a valid URL"))]
    pub url: Option<String>,

    #[validate(custom(function = validate_citation_type))]
    pub citation_type: Option<String>,

    #[validate(length(max = 1000, message = "Context cannot exceed 1000 characters"))]
    pub context: Option<String>,

    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,

    pub is_verified: Option<bool>,
}

impl From<UpdateCitationRequest> for CitationChanges {
    fn from(req: UpdateCitationRequest) -> Self {
        CitationChanges {
            title: req.title,
            authors: req.authors,
            year: req.year,
            journal: req.journal,
            volume: req.volume,
            issue: req.issue,
            pages: req.pages,
            doi: req.doi,
            url: req.url,
            citation_type: req.citation_type,
            context: req.context,
            notes: req.notes,
            is_verified: req.is_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    #[serde(default)]
    pub citations: Option<Vec<BulkCitationEntry>>,
}

/// Public citation record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationResponse {
    pub id: String,
    pub article_id: String,
    pub title: String,
    pub authors: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub citation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Citation> for CitationResponse {
    fn from(citation: Citation) -> Self {
        Self {
            id: citation.id.to_string(),
            article_id: citation.article_id.to_string(),
            title: citation.title,
            authors: citation.authors,
            year: citation.year,
            journal: citation.journal,
            volume: citation.volume,
            issue: citation.issue,
            pages: citation.pages,
            doi: citation.doi,
            url: citation.url,
            citation_type: citation.citation_type,
            context: citation.context,
            notes: citation.notes,
            is_verified: citation.is_verified,
            created_at: citation.created_at.to_rfc3339(),
            updated_at: citation.updated_at.to_rfc3339(),
        }
    }
}

/// Minimal article identity attached to cross-article search hits
#[derive(Debug, Serialize)]
pub struct ArticleRef {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
}

impl From<Article> for ArticleRef {
    fn from(article: Article) -> Self {
        Self {
            id: article.id.to_string(),
            title: article.title,
            authors: article.authors,
        }
    }
}

/// Citation plus its parent article, for search results
#[derive(Debug, Serialize)]
pub struct CitationWithArticle {
    #[serde(flatten)]
    pub citation: CitationResponse,
    pub article: Option<ArticleRef>,
}

/// Rendered bibliographic string plus the underlying record
#[derive(Debug, Serialize)]
pub struct FormattedCitationResponse {
    pub id: String,
    pub style: &'static str,
    pub formatted: String,
    pub citation: CitationResponse,
}

/// Count summary for a bulk import
#[derive(Debug, Serialize)]
pub struct BulkImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Bulk import payload: per-entry outcomes plus the count summary
#[derive(Debug, Serialize)]
pub struct BulkImportResponse {
    pub summary: BulkImportSummary,
    pub successful: Vec<CitationResponse>,
    pub duplicates: Vec<BulkEntryFailure>,
    pub failed: Vec<BulkEntryFailure>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/articles/{id}/citations
pub async fn list_citations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListCitationsQuery>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    repo.find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    let filter = CitationFilter {
        year: query.year,
        citation_type: query.citation_type,
        is_verified: query.is_verified,
    };
    let sort_by = CitationSortKey::parse(query.sort_by.as_deref());
    let order = SortOrder::parse(query.order.as_deref());
    let page = PageRequest::clamped(query.page, query.limit, DEFAULT_LIST_LIMIT);

    let (citations, total) = repo
        .list_citations(article_id, &filter, sort_by, order, page)
        .await?;
    let items: Vec<CitationResponse> = citations.into_iter().map(Into::into).collect();
    let count = items.len();

    Ok(Json(
        ApiResponse::data(items)
            .with_count(count)
            .with_pagination(PageMeta::new(page.page, page.limit, total)),
    ))
}

/// POST /api/articles/{id}/citations
pub async fn create_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateCitationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    repo.find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    if repo
        .find_duplicate_citation(article_id, &payload.title, payload.year, None)
        .await?
        .is_some()
    {
        return Err(AppError::duplicate_citation());
    }

    let citation = repo.create_citation(article_id, payload.into()).await?;
    metrics::record_citations_created(1, "single");

    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::data(CitationResponse::from(citation))
                .with_message("Citation created successfully"),
        ),
    ))
}

/// GET /api/citations/{id}
pub async fn get_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let citation_id = parse_id(&id, "citation")?;
    let repo = Repository::new(state.db.clone());

    let (citation, article) = repo
        .find_citation_with_article(citation_id)
        .await?
        .ok_or(AppError::CitationNotFound { id })?;

    Ok(Json(ApiResponse::data(CitationWithArticle {
        citation: citation.into(),
        article: article.map(Into::into),
    })))
}

/// PUT /api/citations/{id}
pub async fn update_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCitationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let citation_id = parse_id(&id, "citation")?;
    let repo = Repository::new(state.db.clone());

    let citation = repo
        .find_citation_by_id(citation_id)
        .await?
        .ok_or(AppError::CitationNotFound { id })?;

    // Re-check the duplicate tuple only when the title or year changes
    let next_title = payload
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or(&citation.title);
    let next_year = payload.year.unwrap_or(citation.year);

    if next_title != citation.title || next_year != citation.year {
        if repo
            .find_duplicate_citation(citation.article_id, next_title, next_year, Some(citation_id))
            .await?
            .is_some()
        {
            return Err(AppError::duplicate_citation());
        }
    }

    let updated = repo.update_citation(citation, payload.into()).await?;

    Ok(Json(
        ApiResponse::data(CitationResponse::from(updated))
            .with_message("Citation updated successfully"),
    ))
}

/// DELETE /api/citations/{id}
pub async fn delete_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let citation_id = parse_id(&id, "citation")?;
    let repo = Repository::new(state.db.clone());

    if !repo.delete_citation(citation_id).await? {
        return Err(AppError::CitationNotFound { id });
    }

    Ok(Json(ApiResponse::<()>::message(
        "Citation deleted successfully",
    )))
}

/// PATCH /api/citations/{id}/verify
pub async fn verify_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let citation_id = parse_id(&id, "citation")?;
    let repo = Repository::new(state.db.clone());

    let citation = repo
        .find_citation_by_id(citation_id)
        .await?
        .ok_or(AppError::CitationNotFound { id })?;

    let toggled = repo.toggle_citation_verified(citation).await?;
    let message = if toggled.is_verified {
        "Citation verified successfully"
    } else {
        "Citation unverified successfully"
    };

    Ok(Json(
        ApiResponse::data(CitationResponse::from(toggled)).with_message(message),
    ))
}

/// GET /api/citations/{id}/formatted?style=apa|mla|chicago
pub async fn formatted_citation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FormatQuery>,
) -> Result<impl IntoResponse> {
    let citation_id = parse_id(&id, "citation")?;
    let repo = Repository::new(state.db.clone());

    let citation = repo
        .find_citation_by_id(citation_id)
        .await?
        .ok_or(AppError::CitationNotFound { id })?;

    // Unknown styles render as APA instead of failing the request
    let style = CitationStyle::parse(query.style.as_deref().unwrap_or(""));
    let formatted = format_citation(&citation, style);

    Ok(Json(ApiResponse::data(FormattedCitationResponse {
        id: citation.id.to_string(),
        style: style.as_str(),
        formatted,
        citation: citation.into(),
    })))
}

/// GET /api/citations/search?q=...
pub async fn search_citations(
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
    let hits = repo.search_citations(q, limit).await?;
    metrics::record_search("citations");

    let items: Vec<CitationWithArticle> = hits
        .into_iter()
        .map(|(citation, article)| CitationWithArticle {
            citation: citation.into(),
            article: article.map(Into::into),
        })
        .collect();
    let count = items.len();

    Ok(Json(ApiResponse::data(items).with_count(count)))
}

/// GET /api/articles/{id}/citations/stats
pub async fn citation_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;
    let repo = Repository::new(state.db.clone());

    repo.find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    let stats = repo.citation_stats(article_id).await?;

    Ok(Json(ApiResponse::data(stats)))
}

/// POST /api/articles/{id}/citations/bulk
pub async fn bulk_import_citations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<impl IntoResponse> {
    let article_id = parse_id(&id, "article")?;

    let entries = payload
        .citations
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest {
            message: "Citations array is required and cannot be empty".to_string(),
        })?;

    if entries.len() > MAX_BULK_CITATIONS {
        return Err(AppError::BadRequest {
            message: "Cannot import more than 100 citations at once".to_string(),
        });
    }

    let repo = Repository::new(state.db.clone());

    repo.find_article_by_id(article_id)
        .await?
        .ok_or(AppError::ArticleNotFound { id })?;

    // Shape errors reject the whole batch before anything is written
    let converted = convert_bulk_entries(&entries).map_err(|errors| AppError::Validation { errors })?;

    let outcome = repo.bulk_import_citations(article_id, converted).await?;
    metrics::record_citations_created(outcome.successful.len() as u64, "bulk");

    let response = BulkImportResponse {
        summary: BulkImportSummary {
            imported: outcome.successful.len(),
            duplicates: outcome.duplicates.len(),
            failed: outcome.failed.len(),
        },
        successful: outcome.successful.into_iter().map(Into::into).collect(),
        duplicates: outcome.duplicates,
        failed: outcome.failed,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(response).with_message("Bulk import completed")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_create() -> CreateCitationRequest {
        serde_json::from_value(json!({
            "title": "Attention Is All You Need",
            "authors": "Vaswani et al.",
            "year": 2017,
            "journal": "NeurIPS"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_request_valid() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_old_year() {
        let mut req = valid_create();
        req.year = 1799;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_bad_url() {
        let mut req = valid_create();
        req.url = Some("not a url".to_string());
        assert!(req.validate().is_err());

        req.url = Some("https://example.com/paper".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_field_bounds() {
        let mut req = valid_create();
        req.title = "ab".to_string();
        let err: AppError = req.validate().unwrap_err().into();
        match err {
            AppError::Validation { errors } => assert!(errors
                .iter()
                .any(|e| e.contains("Citation title must be between 3 and 500 characters"))),
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut req = valid_create();
        req.authors = "A".to_string();
        assert!(req.validate().is_err());
        req.authors = "A".repeat(301);
        assert!(req.validate().is_err());

        let mut req = valid_create();
        req.notes = Some("n".repeat(501));
        assert!(req.validate().is_err());
        req.notes = Some("n".repeat(500));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_request_same_bounds_as_create() {
        let req: UpdateCitationRequest = serde_json::from_value(json!({
            "title": "ab",
            "authors": "A",
            "notes": "n".repeat(501)
        }))
        .unwrap();
        let err: AppError = req.validate().unwrap_err().into();
        match err {
            AppError::Validation { errors } => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_request_rejects_unknown_type() {
        let mut req = valid_create();
        req.citation_type = Some("casual".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_empty_is_valid() {
        let req: UpdateCitationRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());
        let changes: CitationChanges = req.into();
        assert!(changes.title.is_none());
        assert!(changes.is_verified.is_none());
    }

    #[test]
    fn test_bulk_request_missing_citations_field() {
        let req: BulkImportRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.citations.is_none());
    }

    #[test]
    fn test_citation_response_shape() {
        use chrono::Utc;
        use uuid::Uuid;

        let now = Utc::now();
        let citation = Citation {
            id: Uuid::new_v4(),
            article_id: Uuid::new_v4(),
            title: "T".into(),
            authors: "A".into(),
            year: 2020,
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            url: None,
            citation_type: "direct".into(),
            context: None,
            notes: None,
            is_verified: true,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let json = serde_json::to_value(CitationResponse::from(citation)).unwrap();
        assert_eq!(json["isVerified"], true);
        assert_eq!(json["citationType"], "direct");
        assert!(json["articleId"].is_string());
        assert!(json.get("journal").is_none());
    }
}
