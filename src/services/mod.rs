pub mod accounts;
pub mod comments;
pub mod posts;

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::database::{DatabaseError, Page};
use crate::error::ApiError;

/// Query string accepted by the list endpoints. Values stay raw so that
/// malformed numbers and ids map to our own error messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub user_id: Option<String>,
    pub post_id: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve `limit`/`offset` against the configured defaults.
pub fn resolve_page(params: &ListParams, api: &ApiConfig) -> Result<Page, ApiError> {
    let parse = |raw: Option<&str>| -> Result<Option<i64>, ApiError> {
        non_empty(raw)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| ApiError::bad_request("failed to parse request query"))
            })
            .transpose()
    };

    let limit = match parse(params.limit.as_deref())? {
        Some(limit) if limit > 0 => limit.min(api.max_page_limit),
        _ => api.default_page_limit,
    };

    let offset = parse(params.offset.as_deref())?.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request("offset must not be negative"));
    }

    Ok(Page { limit, offset })
}

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|e| {
        tracing::error!(id = raw, error = %e, "failed to parse uuid");
        ApiError::bad_request("failed to parse uuid")
    })
}

pub fn parse_optional_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    non_empty(raw).map(parse_id).transpose()
}

/// Every named field must be non-blank.
pub fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    let missing: HashMap<String, String> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| (name.to_string(), format!("{} is required", name)))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::error!(fields = ?missing.keys().collect::<Vec<_>>(), "failed to validate body");
        Err(ApiError::validation_error("failed to validate body", Some(missing)))
    }
}

/// Log a storage failure and hide it behind a client-safe message.
pub fn storage_failure(err: DatabaseError, message: &str) -> ApiError {
    tracing::error!(error = %err, "{}", message);
    ApiError::internal_server_error(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn params(limit: Option<&str>, offset: Option<&str>) -> ListParams {
        ListParams {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn page_defaults_and_caps() {
        let api = AppConfig::development().api;
        assert_eq!(
            resolve_page(&params(None, None), &api).unwrap(),
            Page { limit: 10, offset: 0 }
        );
        assert_eq!(resolve_page(&params(Some("0"), None), &api).unwrap().limit, 10);
        assert_eq!(resolve_page(&params(Some("-5"), None), &api).unwrap().limit, 10);
        assert_eq!(resolve_page(&params(Some("1000"), None), &api).unwrap().limit, 100);
        assert_eq!(resolve_page(&params(Some("3"), Some("6")), &api).unwrap().offset, 6);
    }

    #[test]
    fn page_rejects_bad_numbers() {
        let api = AppConfig::development().api;
        assert!(resolve_page(&params(Some("ten"), None), &api).is_err());
        assert!(resolve_page(&params(None, Some("-1")), &api).is_err());
    }

    #[test]
    fn reports_every_blank_field() {
        let err = require_fields(&[("title", " "), ("body", ""), ("name", "x")]).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["title"], "title is required");
        assert!(require_fields(&[("title", "ok")]).is_ok());
    }

    #[test]
    fn optional_ids() {
        assert_eq!(parse_optional_id(None).unwrap(), None);
        assert_eq!(parse_optional_id(Some("")).unwrap(), None);
        assert!(parse_optional_id(Some("nope")).is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_optional_id(Some(&id.to_string())).unwrap(), Some(id));
    }
}
