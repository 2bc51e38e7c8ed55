//! Repository pattern for database operations
//!
//! All reads and writes for articles and citations go through here. The
//! repository maps storage faults to [`AppError`] and enforces the
//! data-consistency rules: DOI uniqueness, the `(article_id, title, year)`
//! citation invariant, and the cascade delete of an article's citations.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement,
    TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

/// Hard cap on page size for every list endpoint
pub const MAX_PAGE_SIZE: u64 = 50;

/// A validated, clamped pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    /// Page size, always within 1..=MAX_PAGE_SIZE
    pub limit: u64,
}

impl PageRequest {
    /// Clamp raw query parameters: page floors at 1, limit is forced into
    /// 1..=50 regardless of the requested value.
    pub fn clamped(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Offset of the first item on this page
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Sort direction, `desc` unless the caller asked for `asc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Sortable article fields; `citations` maps to the stored citation count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleSortKey {
    Title,
    PublicationDate,
    CreatedAt,
    Citations,
}

impl ArticleSortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("title") => ArticleSortKey::Title,
            Some("createdAt") => ArticleSortKey::CreatedAt,
            Some("citations") => ArticleSortKey::Citations,
            _ => ArticleSortKey::PublicationDate,
        }
    }

    fn column(self) -> ArticleColumn {
        match self {
            ArticleSortKey::Title => ArticleColumn::Title,
            ArticleSortKey::PublicationDate => ArticleColumn::PublicationDate,
            ArticleSortKey::CreatedAt => ArticleColumn::CreatedAt,
            ArticleSortKey::Citations => ArticleColumn::CitationCount,
        }
    }
}

/// Sortable citation fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationSortKey {
    Title,
    Year,
    CreatedAt,
    CitationType,
}

impl CitationSortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("title") => CitationSortKey::Title,
            Some("year") => CitationSortKey::Year,
            Some("citationType") => CitationSortKey::CitationType,
            _ => CitationSortKey::CreatedAt,
        }
    }

    fn column(self) -> CitationColumn {
        match self {
            CitationSortKey::Title => CitationColumn::Title,
            CitationSortKey::Year => CitationColumn::Year,
            CitationSortKey::CreatedAt => CitationColumn::CreatedAt,
            CitationSortKey::CitationType => CitationColumn::CitationType,
        }
    }
}

/// Article list filters
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring match on title, abstract, or authors
    pub search: Option<String>,
    /// Calendar-year window on publication_date (UTC)
    pub year: Option<i32>,
}

/// Citation list filters, all exact matches
#[derive(Debug, Clone, Default)]
pub struct CitationFilter {
    pub year: Option<i32>,
    pub citation_type: Option<String>,
    pub is_verified: Option<bool>,
}

/// Fields for a new article record
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub publication_date: DateTime<Utc>,
    pub doi: String,
    pub keywords: Vec<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub status: Option<String>,
}

impl NewArticle {
    /// Trim every text field before persistence
    pub fn trimmed(self) -> Self {
        let trim_opt = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: self.title.trim().to_string(),
            authors: self.authors.iter().map(|a| a.trim().to_string()).collect(),
            abstract_text: self.abstract_text.trim().to_string(),
            publication_date: self.publication_date,
            doi: self.doi.trim().to_string(),
            keywords: self.keywords.iter().map(|k| k.trim().to_string()).collect(),
            journal: trim_opt(self.journal),
            volume: trim_opt(self.volume),
            issue: trim_opt(self.issue),
            pages: trim_opt(self.pages),
            status: trim_opt(self.status),
        }
    }
}

/// Partial update for an article; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub abstract_text: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub doi: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub status: Option<String>,
}

impl ArticleChanges {
    /// Trim every string field present in the payload
    pub fn trimmed(self) -> Self {
        let trim_opt = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: trim_opt(self.title),
            authors: self
                .authors
                .map(|a| a.iter().map(|s| s.trim().to_string()).collect()),
            abstract_text: trim_opt(self.abstract_text),
            publication_date: self.publication_date,
            doi: trim_opt(self.doi),
            keywords: self
                .keywords
                .map(|k| k.iter().map(|s| s.trim().to_string()).collect()),
            journal: trim_opt(self.journal),
            volume: trim_opt(self.volume),
            issue: trim_opt(self.issue),
            pages: trim_opt(self.pages),
            status: trim_opt(self.status),
        }
    }
}

/// Fields for a new citation record
#[derive(Debug, Clone)]
pub struct NewCitation {
    pub title: String,
    pub authors: String,
    pub year: i32,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_type: Option<String>,
    pub context: Option<String>,
    pub notes: Option<String>,
}

impl NewCitation {
    /// Trim every text field before persistence
    pub fn trimmed(self) -> Self {
        let trim_opt = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: self.title.trim().to_string(),
            authors: self.authors.trim().to_string(),
            year: self.year,
            journal: trim_opt(self.journal),
            volume: trim_opt(self.volume),
            issue: trim_opt(self.issue),
            pages: trim_opt(self.pages),
            doi: trim_opt(self.doi),
            url: trim_opt(self.url),
            citation_type: trim_opt(self.citation_type),
            context: trim_opt(self.context),
            notes: trim_opt(self.notes),
        }
    }
}

/// Partial update for a citation; strings are trimmed before applying
#[derive(Debug, Clone, Default)]
pub struct CitationChanges {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub citation_type: Option<String>,
    pub context: Option<String>,
    pub notes: Option<String>,
    pub is_verified: Option<bool>,
}

impl CitationChanges {
    /// Trim every string field present in the payload
    pub fn trimmed(self) -> Self {
        let trim_opt = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            title: trim_opt(self.title),
            authors: trim_opt(self.authors),
            year: self.year,
            journal: trim_opt(self.journal),
            volume: trim_opt(self.volume),
            issue: trim_opt(self.issue),
            pages: trim_opt(self.pages),
            doi: trim_opt(self.doi),
            url: trim_opt(self.url),
            citation_type: trim_opt(self.citation_type),
            context: trim_opt(self.context),
            notes: trim_opt(self.notes),
            is_verified: self.is_verified,
        }
    }
}

/// Per-year citation count
#[derive(Debug, Clone, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: i64,
}

/// Per-type citation count
#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub citation_type: String,
    pub count: i64,
}

/// Aggregate citation statistics for one article
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationStats {
    pub total_citations: i64,
    pub verified_citations: i64,
    pub earliest_year: Option<i32>,
    pub latest_year: Option<i32>,
    pub year_distribution: Vec<YearCount>,
    pub type_distribution: Vec<TypeCount>,
}

/// One rejected entry from a bulk import
#[derive(Debug, Clone, Serialize)]
pub struct BulkEntryFailure {
    /// 1-based position in the submitted batch
    pub index: usize,
    pub title: String,
    pub error: String,
}

/// Per-entry outcome of a bulk citation import
#[derive(Debug, Serialize)]
pub struct BulkImportOutcome {
    pub successful: Vec<Citation>,
    pub duplicates: Vec<BulkEntryFailure>,
    pub failed: Vec<BulkEntryFailure>,
}

/// Escape LIKE wildcards in user-supplied search text
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// UTC window covering one calendar year: [Jan 1 00:00, next Jan 1 00:00)
fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?;
    Some((start, end))
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Article Operations
    // ========================================================================

    fn article_condition(filter: &ArticleFilter) -> Condition {
        let mut cond = Condition::all();

        if let Some(q) = filter.search.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(q.trim()));
            cond = cond.add(Expr::cust_with_values(
                "(title ILIKE ? OR abstract_text ILIKE ? OR array_to_string(authors, ' ') ILIKE ?)",
                vec![pattern.clone(), pattern.clone(), pattern],
            ));
        }

        if let Some((start, end)) = filter.year.and_then(year_bounds) {
            cond = cond
                .add(ArticleColumn::PublicationDate.gte(start))
                .add(ArticleColumn::PublicationDate.lt(end));
        }

        cond
    }

    /// List articles with filtering, sorting, and offset pagination.
    /// Returns the page of records plus the total match count.
    pub async fn list_articles(
        &self,
        filter: &ArticleFilter,
        sort_by: ArticleSortKey,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64)> {
        let paginator = ArticleEntity::find()
            .filter(Self::article_condition(filter))
            .order_by(sort_by.column(), order.into())
            .paginate(self.conn(), page.limit);

        let total = paginator.num_items().await?;
        let articles = paginator.fetch_page(page.page - 1).await?;

        Ok((articles, total))
    }

    /// Free-text article search, newest first
    pub async fn search_articles(&self, query: &str, limit: u64) -> Result<Vec<Article>> {
        let filter = ArticleFilter {
            search: Some(query.to_string()),
            year: None,
        };

        ArticleEntity::find()
            .filter(Self::article_condition(&filter))
            .order_by_desc(ArticleColumn::CreatedAt)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find article by ID
    pub async fn find_article_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find article by DOI, used for the duplicate pre-check
    pub async fn find_article_by_doi(&self, doi: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::Doi.eq(doi.trim()))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new article. A unique-constraint violation on the DOI column
    /// surfaces as a Conflict even if the pre-check raced another writer.
    pub async fn create_article(&self, input: NewArticle) -> Result<Article> {
        let input = input.trimmed();
        let now = Utc::now();

        let article = ArticleActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            authors: Set(input.authors),
            abstract_text: Set(input.abstract_text),
            publication_date: Set(input.publication_date.into()),
            doi: Set(input.doi),
            keywords: Set(input.keywords),
            journal: Set(input.journal),
            volume: Set(input.volume),
            issue: Set(input.issue),
            pages: Set(input.pages),
            citation_count: Set(0),
            status: Set(input
                .status
                .unwrap_or_else(|| DEFAULT_ARTICLE_STATUS.to_string())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        article
            .insert(self.conn())
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::duplicate_doi(),
                _ => e.into(),
            })
    }

    /// Apply a partial update to an existing article; string fields in the
    /// payload are trimmed before being applied
    pub async fn update_article(&self, article: Article, changes: ArticleChanges) -> Result<Article> {
        let changes = changes.trimmed();
        let mut model: ArticleActiveModel = article.into();

        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(authors) = changes.authors {
            model.authors = Set(authors);
        }
        if let Some(abstract_text) = changes.abstract_text {
            model.abstract_text = Set(abstract_text);
        }
        if let Some(date) = changes.publication_date {
            model.publication_date = Set(date.into());
        }
        if let Some(doi) = changes.doi {
            model.doi = Set(doi);
        }
        if let Some(keywords) = changes.keywords {
            model.keywords = Set(keywords);
        }
        if let Some(journal) = changes.journal {
            model.journal = Set(Some(journal));
        }
        if let Some(volume) = changes.volume {
            model.volume = Set(Some(volume));
        }
        if let Some(issue) = changes.issue {
            model.issue = Set(Some(issue));
        }
        if let Some(pages) = changes.pages {
            model.pages = Set(Some(pages));
        }
        if let Some(status) = changes.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now().into());

        model
            .update(self.conn())
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::duplicate_doi(),
                _ => e.into(),
            })
    }

    /// Delete an article together with all of its citations. Both deletes run
    /// in one transaction so a failure cannot leave orphaned citations.
    /// Returns the number of citations removed.
    pub async fn delete_article_cascade(&self, id: Uuid) -> Result<u64> {
        let txn = self.conn().begin().await?;

        let removed = CitationEntity::delete_many()
            .filter(CitationColumn::ArticleId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        ArticleEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        Ok(removed)
    }

    // ========================================================================
    // Citation Operations
    // ========================================================================

    fn citation_condition(article_id: Uuid, filter: &CitationFilter) -> Condition {
        let mut cond = Condition::all().add(CitationColumn::ArticleId.eq(article_id));

        if let Some(year) = filter.year {
            cond = cond.add(CitationColumn::Year.eq(year));
        }
        if let Some(citation_type) = &filter.citation_type {
            cond = cond.add(CitationColumn::CitationType.eq(citation_type.clone()));
        }
        if let Some(is_verified) = filter.is_verified {
            cond = cond.add(CitationColumn::IsVerified.eq(is_verified));
        }

        cond
    }

    /// List one article's citations with filters, sorting, and pagination
    pub async fn list_citations(
        &self,
        article_id: Uuid,
        filter: &CitationFilter,
        sort_by: CitationSortKey,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<(Vec<Citation>, u64)> {
        let paginator = CitationEntity::find()
            .filter(Self::citation_condition(article_id, filter))
            .order_by(sort_by.column(), order.into())
            .paginate(self.conn(), page.limit);

        let total = paginator.num_items().await?;
        let citations = paginator.fetch_page(page.page - 1).await?;

        Ok((citations, total))
    }

    /// All citations belonging to an article, for embedding in article reads
    pub async fn citations_for_article(&self, article_id: Uuid) -> Result<Vec<Citation>> {
        CitationEntity::find()
            .filter(CitationColumn::ArticleId.eq(article_id))
            .order_by_desc(CitationColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find citation by ID
    pub async fn find_citation_by_id(&self, id: Uuid) -> Result<Option<Citation>> {
        CitationEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find citation by ID together with its parent article
    pub async fn find_citation_with_article(
        &self,
        id: Uuid,
    ) -> Result<Option<(Citation, Option<Article>)>> {
        CitationEntity::find_by_id(id)
            .find_also_related(ArticleEntity)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Look for a citation equal on the (article, trimmed title, year) tuple,
    /// optionally excluding one record (for updates)
    pub async fn find_duplicate_citation(
        &self,
        article_id: Uuid,
        title: &str,
        year: i32,
        exclude: Option<Uuid>,
    ) -> Result<Option<Citation>> {
        let mut query = CitationEntity::find()
            .filter(CitationColumn::ArticleId.eq(article_id))
            .filter(CitationColumn::Title.eq(title.trim()))
            .filter(CitationColumn::Year.eq(year));

        if let Some(id) = exclude {
            query = query.filter(CitationColumn::Id.ne(id));
        }

        query.one(self.conn()).await.map_err(Into::into)
    }

    /// Create a citation for an article. All text fields are trimmed and
    /// the citation type falls back to `direct`.
    pub async fn create_citation(&self, article_id: Uuid, input: NewCitation) -> Result<Citation> {
        let input = input.trimmed();
        let now = Utc::now();

        let citation = CitationActiveModel {
            id: Set(Uuid::new_v4()),
            article_id: Set(article_id),
            title: Set(input.title),
            authors: Set(input.authors),
            year: Set(input.year),
            journal: Set(input.journal),
            volume: Set(input.volume),
            issue: Set(input.issue),
            pages: Set(input.pages),
            doi: Set(input.doi),
            url: Set(input.url),
            citation_type: Set(input
                .citation_type
                .unwrap_or_else(|| DEFAULT_CITATION_TYPE.to_string())),
            context: Set(input.context),
            notes: Set(input.notes),
            is_verified: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        citation
            .insert(self.conn())
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::duplicate_citation(),
                _ => e.into(),
            })
    }

    /// Apply a partial update to an existing citation; string fields in the
    /// payload are trimmed before being applied
    pub async fn update_citation(
        &self,
        citation: Citation,
        changes: CitationChanges,
    ) -> Result<Citation> {
        let changes = changes.trimmed();
        let mut model: CitationActiveModel = citation.into();

        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(authors) = changes.authors {
            model.authors = Set(authors);
        }
        if let Some(year) = changes.year {
            model.year = Set(year);
        }
        if let Some(journal) = changes.journal {
            model.journal = Set(Some(journal));
        }
        if let Some(volume) = changes.volume {
            model.volume = Set(Some(volume));
        }
        if let Some(issue) = changes.issue {
            model.issue = Set(Some(issue));
        }
        if let Some(pages) = changes.pages {
            model.pages = Set(Some(pages));
        }
        if let Some(doi) = changes.doi {
            model.doi = Set(Some(doi));
        }
        if let Some(url) = changes.url {
            model.url = Set(Some(url));
        }
        if let Some(citation_type) = changes.citation_type {
            model.citation_type = Set(citation_type);
        }
        if let Some(context) = changes.context {
            model.context = Set(Some(context));
        }
        if let Some(notes) = changes.notes {
            model.notes = Set(Some(notes));
        }
        if let Some(is_verified) = changes.is_verified {
            model.is_verified = Set(is_verified);
        }
        model.updated_at = Set(Utc::now().into());

        model
            .update(self.conn())
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::duplicate_citation(),
                _ => e.into(),
            })
    }

    /// Delete a citation by ID; false when no record matched
    pub async fn delete_citation(&self, id: Uuid) -> Result<bool> {
        let result = CitationEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Flip a citation's verification flag and persist the new value
    pub async fn toggle_citation_verified(&self, citation: Citation) -> Result<Citation> {
        let flipped = !citation.is_verified;
        let mut model: CitationActiveModel = citation.into();
        model.is_verified = Set(flipped);
        model.updated_at = Set(Utc::now().into());

        model.update(self.conn()).await.map_err(Into::into)
    }

    /// Free-text citation search across all articles, newest first, with the
    /// parent article attached for display
    pub async fn search_citations(
        &self,
        query: &str,
        limit: u64,
    ) -> Result<Vec<(Citation, Option<Article>)>> {
        let pattern = format!("%{}%", escape_like(query.trim()));

        CitationEntity::find()
            .filter(Expr::cust_with_values(
                "(citations.title ILIKE ? OR citations.authors ILIKE ?)",
                vec![pattern.clone(), pattern],
            ))
            .find_also_related(ArticleEntity)
            .order_by_desc(CitationColumn::CreatedAt)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Aggregate citation statistics for one article: totals plus complete
    /// breakdowns by year (ascending) and by type
    pub async fn citation_stats(&self, article_id: Uuid) -> Result<CitationStats> {
        let conn = self.conn();

        let summary = conn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE is_verified) AS verified,
                    MIN(year) AS earliest,
                    MAX(year) AS latest
                FROM citations
                WHERE article_id = $1
                "#,
                vec![article_id.into()],
            ))
            .await?;

        let (total, verified, earliest, latest) = match summary {
            Some(row) => (
                row.try_get_by_index::<i64>(0)?,
                row.try_get_by_index::<i64>(1)?,
                row.try_get_by_index::<Option<i32>>(2)?,
                row.try_get_by_index::<Option<i32>>(3)?,
            ),
            None => (0, 0, None, None),
        };

        let year_distribution = conn
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                SELECT year, COUNT(*) AS count
                FROM citations
                WHERE article_id = $1
                GROUP BY year
                ORDER BY year ASC
                "#,
                vec![article_id.into()],
            ))
            .await?
            .into_iter()
            .map(|row| {
                Ok(YearCount {
                    year: row.try_get_by_index::<i32>(0)?,
                    count: row.try_get_by_index::<i64>(1)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let type_distribution = conn
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                SELECT citation_type, COUNT(*) AS count
                FROM citations
                WHERE article_id = $1
                GROUP BY citation_type
                "#,
                vec![article_id.into()],
            ))
            .await?
            .into_iter()
            .map(|row| {
                Ok(TypeCount {
                    citation_type: row.try_get_by_index::<String>(0)?,
                    count: row.try_get_by_index::<i64>(1)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CitationStats {
            total_citations: total,
            verified_citations: verified,
            earliest_year: earliest,
            latest_year: latest,
            year_distribution,
            type_distribution,
        })
    }

    /// Import a batch of citations for one article. Entries have already
    /// passed the shape check; here each one either inserts, hits the
    /// duplicate invariant, or fails at the storage level. Per-entry problems
    /// never abort the rest of the batch.
    pub async fn bulk_import_citations(
        &self,
        article_id: Uuid,
        entries: Vec<NewCitation>,
    ) -> Result<BulkImportOutcome> {
        let mut outcome = BulkImportOutcome {
            successful: Vec::new(),
            duplicates: Vec::new(),
            failed: Vec::new(),
        };

        for (i, entry) in entries.into_iter().enumerate() {
            let index = i + 1;
            let entry = entry.trimmed();
            let title = entry.title.clone();

            let existing = self
                .find_duplicate_citation(article_id, &title, entry.year, None)
                .await?;
            if existing.is_some() {
                outcome.duplicates.push(BulkEntryFailure {
                    index,
                    title,
                    error: "Citation with this title and year already exists".to_string(),
                });
                continue;
            }

            match self.create_citation(article_id, entry).await {
                Ok(citation) => outcome.successful.push(citation),
                Err(AppError::Duplicate { .. }) => outcome.duplicates.push(BulkEntryFailure {
                    index,
                    title,
                    error: "Citation with this title and year already exists".to_string(),
                }),
                Err(AppError::Database(e)) => outcome.failed.push(BulkEntryFailure {
                    index,
                    title,
                    error: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_limit() {
        let page = PageRequest::clamped(Some(2), Some(500), 10);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.page, 2);

        let page = PageRequest::clamped(Some(1), Some(0), 10);
        assert_eq!(page.limit, 1);
    }

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::clamped(None, None, 10);
        assert_eq!(page, PageRequest { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_floors_page() {
        let page = PageRequest::clamped(Some(0), Some(10), 10);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_offset_math() {
        // skip = (page - 1) * limit
        let page = PageRequest::clamped(Some(3), Some(10), 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(ArticleSortKey::parse(Some("title")), ArticleSortKey::Title);
        assert_eq!(
            ArticleSortKey::parse(Some("citations")),
            ArticleSortKey::Citations
        );
        // Unknown keys fall back to the default sort
        assert_eq!(
            ArticleSortKey::parse(Some("bogus")),
            ArticleSortKey::PublicationDate
        );
        assert_eq!(ArticleSortKey::parse(None), ArticleSortKey::PublicationDate);

        assert_eq!(
            CitationSortKey::parse(Some("year")),
            CitationSortKey::Year
        );
        assert_eq!(CitationSortKey::parse(None), CitationSortKey::CreatedAt);
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(None), SortOrder::Desc);
    }

    #[test]
    fn test_year_bounds_cover_whole_year() {
        let (start, end) = year_bounds(2020).unwrap();
        assert_eq!(start.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2021-01-01T00:00:00+00:00");

        // Dec 31 23:59:59 is inside the window, next Jan 1 midnight is not
        let late = Utc.with_ymd_and_hms(2020, 12, 31, 23, 59, 59).unwrap();
        assert!(late >= start && late < end);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100% pure_gold"), "100\\% pure\\_gold");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_new_article_trims_optional_fields() {
        let input = NewArticle {
            title: " Residual Learning ".to_string(),
            authors: vec![" He, K. ".to_string()],
            abstract_text: " abs ".to_string(),
            publication_date: Utc::now(),
            doi: " 10.1000/1 ".to_string(),
            keywords: vec![" vision ".to_string()],
            journal: Some("  CVPR ".to_string()),
            volume: Some(" 12 ".to_string()),
            issue: Some(" 3 ".to_string()),
            pages: Some(" 770-778 ".to_string()),
            status: None,
        };

        let trimmed = input.trimmed();
        assert_eq!(trimmed.title, "Residual Learning");
        assert_eq!(trimmed.authors, vec!["He, K.".to_string()]);
        assert_eq!(trimmed.journal.as_deref(), Some("CVPR"));
        assert_eq!(trimmed.volume.as_deref(), Some("12"));
        assert_eq!(trimmed.issue.as_deref(), Some("3"));
        assert_eq!(trimmed.pages.as_deref(), Some("770-778"));
    }

    #[test]
    fn test_article_changes_trim_only_present_fields() {
        let changes = ArticleChanges {
            journal: Some(" Nature ".to_string()),
            pages: Some(" 1-10 ".to_string()),
            ..Default::default()
        };

        let trimmed = changes.trimmed();
        assert_eq!(trimmed.journal.as_deref(), Some("Nature"));
        assert_eq!(trimmed.pages.as_deref(), Some("1-10"));
        assert!(trimmed.title.is_none());
        assert!(trimmed.volume.is_none());
    }

    #[test]
    fn test_new_citation_trimmed() {
        let input = NewCitation {
            title: "  Attention Is All You Need  ".to_string(),
            authors: " Vaswani et al. ".to_string(),
            year: 2017,
            journal: Some("  NeurIPS ".to_string()),
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            url: None,
            citation_type: None,
            context: None,
            notes: None,
        };

        let trimmed = input.trimmed();
        assert_eq!(trimmed.title, "Attention Is All You Need");
        assert_eq!(trimmed.authors, "Vaswani et al.");
        assert_eq!(trimmed.journal.as_deref(), Some("NeurIPS"));
    }

    #[test]
    fn test_citation_changes_trim_only_present_fields() {
        let changes = CitationChanges {
            title: Some("  New Title ".to_string()),
            is_verified: Some(true),
            ..Default::default()
        };

        let trimmed = changes.trimmed();
        assert_eq!(trimmed.title.as_deref(), Some("New Title"));
        assert!(trimmed.authors.is_none());
        assert_eq!(trimmed.is_verified, Some(true));
    }
}
