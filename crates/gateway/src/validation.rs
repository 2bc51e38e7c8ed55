//! Request validation helpers
//!
//! Custom validators used by the request DTOs, plus the up-front shape check
//! for bulk citation imports. The bulk check rejects the whole batch when any
//! entry is malformed; per-entry storage problems are handled later and never
//! fail the batch.

use chrono::{DateTime, Datelike, Utc};
use regex_lite::Regex;
use scholarport_common::db::models::{ARTICLE_STATUSES, CITATION_TYPES};
use scholarport_common::db::NewCitation;
use scholarport_common::MIN_CITATION_YEAR;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

static DOI_RE: OnceLock<Regex> = OnceLock::new();

/// DOI pattern: `10.<4+ digits>/<non-whitespace suffix>`
fn doi_re() -> &'static Regex {
    DOI_RE.get_or_init(|| Regex::new(r"^10\.\d{4,}/\S+").expect("valid DOI regex"))
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Latest publication year a citation may carry
pub fn max_citation_year() -> i32 {
    Utc::now().year() + 1
}

pub fn validate_doi(doi: &str) -> Result<(), ValidationError> {
    if doi_re().is_match(doi.trim()) {
        Ok(())
    } else {
        Err(error(
            "doi",
            "DOI must be in valid format (e.g., 10.1000/182)",
        ))
    }
}

pub fn validate_publication_date(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *date > Utc::now() {
        Err(error(
            "publication_date",
            "Publication date cannot be in the future",
        ))
    } else {
        Ok(())
    }
}

pub fn validate_authors(authors: &Vec<String>) -> Result<(), ValidationError> {
    if authors.is_empty() {
        return Err(error("authors", "At least one author is required"));
    }
    if authors
        .iter()
        .any(|a| a.trim().len() < 2 || a.trim().len() > 100)
    {
        return Err(error(
            "authors",
            "Each author must be between 2 and 100 characters",
        ));
    }
    Ok(())
}

pub fn validate_keywords(keywords: &Vec<String>) -> Result<(), ValidationError> {
    if keywords.iter().any(|k| k.trim().len() > 50) {
        Err(error("keywords", "Each keyword cannot exceed 50 characters"))
    } else {
        Ok(())
    }
}

pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    if ARTICLE_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(error(
            "status",
            "Status must be one of: draft, published, in-review, accepted",
        ))
    }
}

pub fn validate_citation_type(citation_type: &str) -> Result<(), ValidationError> {
    if CITATION_TYPES.contains(&citation_type) {
        Ok(())
    } else {
        Err(error(
            "citation_type",
            "Citation type must be one of: direct, indirect, supporting, contrasting, methodological",
        ))
    }
}

pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    if year < MIN_CITATION_YEAR || year > max_citation_year() {
        Err(error(
            "year",
            "Year must be a valid integer between 1800 and next year",
        ))
    } else {
        Ok(())
    }
}

/// One entry from a bulk import payload. The year is left loose here because
/// clients send it both as a number and as a string; the shape check decides
/// whether it parses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCitationEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub year: Option<serde_json::Value>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub citation_type: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn parse_year(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn entry_year(entry: &BulkCitationEntry) -> Option<i32> {
    entry.year.as_ref().and_then(parse_year)
}

/// Shape-check a bulk import batch. Returns the converted entries, or the
/// complete list of per-entry validation messages (1-based indices) when any
/// entry is malformed, in which case nothing may be written. Only the shape
/// is checked here: title, authors, and a parseable year. An out-of-range
/// year is a storage-level problem reported per entry, not a batch reject.
pub fn convert_bulk_entries(
    entries: &[BulkCitationEntry],
) -> Result<Vec<NewCitation>, Vec<String>> {
    let mut errors = Vec::new();
    let mut converted = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let index = i + 1;

        let title = entry.title.as_deref().map(str::trim).unwrap_or("");
        if title.is_empty() {
            errors.push(format!("Citation {}: Title is required", index));
        }

        let authors = entry.authors.as_deref().map(str::trim).unwrap_or("");
        if authors.is_empty() {
            errors.push(format!("Citation {}: Authors are required", index));
        }

        let year = entry_year(entry);
        if year.is_none() {
            errors.push(format!("Citation {}: Valid year is required", index));
        }

        if let Some(year) = year {
            if !title.is_empty() && !authors.is_empty() {
                converted.push(NewCitation {
                    title: title.to_string(),
                    authors: authors.to_string(),
                    year,
                    journal: entry.journal.clone(),
                    volume: entry.volume.clone(),
                    issue: entry.issue.clone(),
                    pages: entry.pages.clone(),
                    doi: entry.doi.clone(),
                    url: entry.url.clone(),
                    citation_type: entry.citation_type.clone(),
                    context: entry.context.clone(),
                    notes: entry.notes.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(converted)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(title: Option<&str>, authors: Option<&str>, year: serde_json::Value) -> BulkCitationEntry {
        BulkCitationEntry {
            title: title.map(String::from),
            authors: authors.map(String::from),
            year: Some(year),
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            url: None,
            citation_type: None,
            context: None,
            notes: None,
        }
    }

    #[test]
    fn test_doi_validation() {
        assert!(validate_doi("10.1000/182").is_ok());
        assert!(validate_doi("10.48550/arXiv.1706.03762").is_ok());
        assert!(validate_doi("11.1000/182").is_err());
        assert!(validate_doi("10.100/182").is_err()); // fewer than 4 digits
        assert!(validate_doi("10.1000/").is_err());
        assert!(validate_doi("10.1000/has space").is_err());
    }

    #[test]
    fn test_publication_date_not_in_future() {
        let past = Utc::now() - chrono::Duration::days(30);
        assert!(validate_publication_date(&past).is_ok());

        let future = Utc::now() + chrono::Duration::days(30);
        assert!(validate_publication_date(&future).is_err());
    }

    #[test]
    fn test_authors_validation() {
        assert!(validate_authors(&vec!["Ada Lovelace".to_string()]).is_ok());
        assert!(validate_authors(&vec![]).is_err());
        assert!(validate_authors(&vec!["A".to_string()]).is_err());
    }

    #[test]
    fn test_status_and_type_membership() {
        assert!(validate_status("draft").is_ok());
        assert!(validate_status("retracted").is_err());
        assert!(validate_citation_type("methodological").is_ok());
        assert!(validate_citation_type("casual").is_err());
    }

    #[test]
    fn test_year_range() {
        assert!(validate_year(2020).is_ok());
        assert!(validate_year(1800).is_ok());
        assert!(validate_year(1799).is_err());
        assert!(validate_year(max_citation_year() + 1).is_err());
    }

    #[test]
    fn test_bulk_missing_title_enumerates_index() {
        let entries = vec![
            entry(Some("First"), Some("Doe, A."), json!(2019)),
            entry(None, Some("Roe, B."), json!(2020)),
            entry(Some("Third"), Some("Poe, C."), json!(2021)),
        ];

        let errors = convert_bulk_entries(&entries).unwrap_err();
        assert_eq!(errors, vec!["Citation 2: Title is required".to_string()]);
    }

    #[test]
    fn test_bulk_collects_all_errors() {
        let entries = vec![
            entry(Some("  "), None, json!("not-a-year")),
        ];

        let errors = convert_bulk_entries(&entries).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Citation 1: Title is required".to_string(),
                "Citation 1: Authors are required".to_string(),
                "Citation 1: Valid year is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_bulk_year_as_string_parses() {
        let entries = vec![entry(Some("T"), Some("A"), json!("2018"))];
        let converted = convert_bulk_entries(&entries).unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].year, 2018);
    }

    #[test]
    fn test_bulk_out_of_range_year_passes_shape_check() {
        // Parseable but out-of-range years are a per-entry storage outcome,
        // never a whole-batch rejection
        let entries = vec![
            entry(Some("Old"), Some("A"), json!(1500)),
            entry(Some("New"), Some("B"), json!(2020)),
        ];
        let converted = convert_bulk_entries(&entries).unwrap();
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].year, 1500);
    }

    #[test]
    fn test_bulk_unparseable_year_rejects_batch() {
        let entries = vec![entry(Some("T"), Some("A"), json!([2020]))];
        let errors = convert_bulk_entries(&entries).unwrap_err();
        assert_eq!(errors, vec!["Citation 1: Valid year is required".to_string()]);
    }
}
