//! Bibliographic rendering of citations
//!
//! A citation renders to a single human-readable string in one of a small
//! closed set of styles. Unrecognized style strings fall back to APA rather
//! than erroring, so the endpoint never rejects a request over formatting.

use crate::db::models::Citation;

/// Supported bibliographic styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
}

impl CitationStyle {
    /// Parse a style string, case-insensitively. Anything unrecognized is APA.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "mla" => CitationStyle::Mla,
            "chicago" => CitationStyle::Chicago,
            _ => CitationStyle::Apa,
        }
    }

    /// Display name, uppercased for the API response
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "APA",
            CitationStyle::Mla => "MLA",
            CitationStyle::Chicago => "CHICAGO",
        }
    }
}

/// Placeholder journal name when the citation has none
const FALLBACK_JOURNAL: &str = "Journal";

/// Render a citation as a bibliographic string in the requested style
pub fn format_citation(citation: &Citation, style: CitationStyle) -> String {
    let journal = citation.journal.as_deref().unwrap_or(FALLBACK_JOURNAL);

    match style {
        CitationStyle::Apa => format_apa(citation, journal),
        CitationStyle::Mla => format!(
            "{}. \"{}.\" {}, {}.",
            citation.authors, citation.title, journal, citation.year
        ),
        CitationStyle::Chicago => format!(
            "{}. \"{}.\" {} ({}).",
            citation.authors, citation.title, journal, citation.year
        ),
    }
}

/// Canonical APA-style rendering: authors (year). title. journal, volume(issue), pages.
fn format_apa(citation: &Citation, journal: &str) -> String {
    let mut out = format!(
        "{} ({}). {}. {}",
        citation.authors, citation.year, citation.title, journal
    );

    if let Some(volume) = citation.volume.as_deref().filter(|v| !v.is_empty()) {
        out.push_str(", ");
        out.push_str(volume);
        if let Some(issue) = citation.issue.as_deref().filter(|i| !i.is_empty()) {
            out.push('(');
            out.push_str(issue);
            out.push(')');
        }
    }

    if let Some(pages) = citation.pages.as_deref().filter(|p| !p.is_empty()) {
        out.push_str(", ");
        out.push_str(pages);
    }

    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn citation(
        authors: &str,
        title: &str,
        year: i32,
        journal: Option<&str>,
    ) -> Citation {
        let now = Utc::now().into();
        Citation {
            id: Uuid::new_v4(),
            article_id: Uuid::new_v4(),
            title: title.to_string(),
            authors: authors.to_string(),
            year,
            journal: journal.map(String::from),
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            url: None,
            citation_type: "direct".to_string(),
            context: None,
            notes: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_mla_exact() {
        let c = citation("Smith, J.", "X", 2020, Some("Nature"));
        assert_eq!(
            format_citation(&c, CitationStyle::Mla),
            "Smith, J.. \"X.\" Nature, 2020."
        );
    }

    #[test]
    fn test_chicago_exact() {
        let c = citation("Smith, J.", "X", 2020, Some("Nature"));
        assert_eq!(
            format_citation(&c, CitationStyle::Chicago),
            "Smith, J.. \"X.\" Nature (2020)."
        );
    }

    #[test]
    fn test_missing_journal_uses_placeholder() {
        let c = citation("Doe, A.", "On Testing", 1999, None);
        assert_eq!(
            format_citation(&c, CitationStyle::Mla),
            "Doe, A.. \"On Testing.\" Journal, 1999."
        );
    }

    #[test]
    fn test_apa_basic() {
        let c = citation("Smith, J.", "X", 2020, Some("Nature"));
        assert_eq!(format_citation(&c, CitationStyle::Apa), "Smith, J. (2020). X. Nature.");
    }

    #[test]
    fn test_apa_with_volume_issue_pages() {
        let mut c = citation("Smith, J.", "X", 2020, Some("Nature"));
        c.volume = Some("12".to_string());
        c.issue = Some("3".to_string());
        c.pages = Some("45-67".to_string());
        assert_eq!(
            format_citation(&c, CitationStyle::Apa),
            "Smith, J. (2020). X. Nature, 12(3), 45-67."
        );
    }

    #[test]
    fn test_unrecognized_style_falls_back_to_apa() {
        let c = citation("Smith, J.", "X", 2020, Some("Nature"));
        let fallback = format_citation(&c, CitationStyle::parse("harvard"));
        assert_eq!(fallback, format_citation(&c, CitationStyle::Apa));
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(CitationStyle::parse("MLA"), CitationStyle::Mla);
        assert_eq!(CitationStyle::parse("chicago"), CitationStyle::Chicago);
        assert_eq!(CitationStyle::parse("apa"), CitationStyle::Apa);
        assert_eq!(CitationStyle::parse(""), CitationStyle::Apa);
        assert_eq!(CitationStyle::Apa.as_str(), "APA");
    }
}
