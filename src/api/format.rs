use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;

/// Wire format chosen from the first `Accept` value of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

/// A body that can be written in either format. `ROOT` names the XML root element.
pub trait ResponseBody: Serialize {
    const ROOT: &'static str;
}

/// Generic `{ message }` envelope, also used for v2 error bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, String>>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: None,
        }
    }
}

impl ResponseBody for MessageResponse {
    const ROOT: &'static str = "MessageResponse";
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let first = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

        match first.as_deref() {
            Some("application/xml") => ResponseFormat::Xml,
            _ => ResponseFormat::Json,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Xml => "application/xml; charset=utf-8",
        }
    }

    /// Serialize `body` in this format with the given status.
    pub fn respond<T: ResponseBody>(self, status: StatusCode, body: &T) -> Response {
        if status == StatusCode::NO_CONTENT {
            return StatusCode::NO_CONTENT.into_response();
        }

        let rendered = match self {
            ResponseFormat::Json => serde_json::to_string(body).map_err(|e| e.to_string()),
            ResponseFormat::Xml => quick_xml::se::to_string_with_root(T::ROOT, body)
                .map(|xml| format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml))
                .map_err(|e| e.to_string()),
        };

        match rendered {
            Ok(text) => (status, [(header::CONTENT_TYPE, self.content_type())], text).into_response(),
            Err(e) => {
                tracing::error!(error = %e, root = T::ROOT, "failed to serialize response body");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to serialize response\n").into_response()
            }
        }
    }
}

/// Decode a request body as XML when `Content-Type` says so, otherwise as JSON.
pub fn decode_body<T: DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> Result<T, String> {
    let is_xml = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("application/xml"))
        .unwrap_or(false);

    if is_xml {
        let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
        quick_xml::de::from_str(text).map_err(|e| e.to_string())
    } else {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseFormat::from_headers(&parts.headers))
    }
}
