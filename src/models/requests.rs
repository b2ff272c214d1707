//! Request DTOs for the query service API
//!
//! Defines the structure of incoming query strings and JSON bodies.

use serde::Deserialize;

use crate::cache::{MAX_KEY_LENGTH, SCOPE_SEPARATOR};

/// Query string of `GET /query/:entity`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    /// Project the query is restricted to
    #[serde(default)]
    pub scope_id: Option<String>,
    /// Serve an empty list instead of an error when the backend is unreachable
    #[serde(default)]
    pub fallback_empty: bool,
    /// Skip the cache lookup
    #[serde(default)]
    pub fresh: bool,
}

/// Checks an entity name taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_entity(entity: &str) -> Option<String> {
    if entity.is_empty() {
        return Some("Entity cannot be empty".to_string());
    }
    if entity.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Entity exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    if entity.contains(SCOPE_SEPARATOR) {
        return Some(format!("Entity cannot contain '{}'", SCOPE_SEPARATOR));
    }
    None
}

/// Request body for `PUT /scope`
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeRequest {
    /// New current scope, null to deselect
    #[serde(default)]
    pub scope_id: Option<String>,
}

/// Request body for `POST /refresh`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    /// Scope to drop, null for everything
    #[serde(default)]
    pub scope_id: Option<String>,
}

/// Request body for `POST /invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Substring of the cache keys to drop
    pub pattern: String,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_defaults() {
        let params: QueryParams = serde_json::from_str("{}").unwrap();
        assert!(params.scope_id.is_none());
        assert!(!params.fallback_empty);
        assert!(!params.fresh);
    }

    #[test]
    fn test_validate_entity() {
        assert!(validate_entity("leads").is_none());
        assert!(validate_entity("").is_some());
        assert!(validate_entity("leads@P1").is_some());
        assert!(validate_entity(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
    }

    #[test]
    fn test_scope_request_null() {
        let req: ScopeRequest = serde_json::from_str(r#"{"scope_id": null}"#).unwrap();
        assert!(req.scope_id.is_none());

        let req: ScopeRequest = serde_json::from_str(r#"{"scope_id": "P1"}"#).unwrap();
        assert_eq!(req.scope_id.as_deref(), Some("P1"));
    }

    #[test]
    fn test_invalidate_request_validation() {
        let req: InvalidateRequest = serde_json::from_str(r#"{"pattern": ""}"#).unwrap();
        assert!(req.validate().is_some());

        let req: InvalidateRequest = serde_json::from_str(r#"{"pattern": "leads"}"#).unwrap();
        assert!(req.validate().is_none());
    }
}
