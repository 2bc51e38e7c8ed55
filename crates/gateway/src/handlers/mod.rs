//! API handlers module

pub mod articles;
pub mod citations;
pub mod health;

use scholarport_common::errors::{AppError, Result};
use uuid::Uuid;

/// Parse a path segment into a record identifier. Malformed ids are a client
/// error (400), distinct from a well-formed id that resolves to nothing (404).
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidId {
        message: format!("Invalid {} ID format", resource),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "article").unwrap(), id);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        let err = parse_id("not-a-uuid", "citation").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid citation ID format"
        );
    }
}
