use serde_json::{Map, Value};
use thiserror::Error;

/// Failure talking to one of the external services.
///
/// `status` and `details` mirror what the service itself reported, so the
/// refiner can log them without knowing which service produced the error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}")]
    Status {
        service: &'static str,
        status: u16,
        details: Option<Map<String, Value>>,
    },

    /// Service answered 2xx but refused the call in-band (Slack's `ok: false`).
    #[error("{service} rejected the call: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },

    /// Response body did not have the expected shape.
    #[error("{service} response malformed: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
}

impl ApiError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn malformed(service: &'static str, reason: impl ToString) -> Self {
        Self::Malformed {
            service,
            reason: reason.to_string(),
        }
    }

    /// Build a `Status` error from a raw error body. JSON objects are kept as
    /// details; anything else is stored under `"body"`.
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let details = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Some(map),
            _ if body.trim().is_empty() => None,
            _ => {
                let mut map = Map::new();
                map.insert("body".into(), Value::String(body.to_string()));
                Some(map)
            }
        };
        Self::Status {
            service,
            status,
            details,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Status { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Status tag written to the run log: `ERROR_429`, `ERROR_UNKNOWN`, ...
    pub fn status_tag(&self) -> String {
        match self.status_code() {
            Some(code) => format!("ERROR_{code}"),
            None => "ERROR_UNKNOWN".to_string(),
        }
    }
}

/// Turn a response into its body, or into `ApiError::Status` when the
/// service answered with a failure code.
pub async fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_status(service, status.as_u16(), &body))
}
