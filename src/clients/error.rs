use std::fmt;

/// Classified external-API error — tells the caller *why* the call failed
/// without forcing it to re-parse status codes or response bodies.
#[derive(Debug)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 401/403 — bad credential or missing permission.
    Auth,
    /// 429 — rate limited by the upstream service.
    RateLimit,
    /// 404 — unknown resource (bot id, model, ...).
    NotFound,
    /// 408, request timeout, or the upstream took too long.
    Timeout,
    /// Connection refused, DNS failure, reset, etc.
    Network,
    /// 500/502/503/504 — upstream-side outage.
    ServerError,
    /// Anything else, including malformed responses.
    Unknown,
}

impl ClientError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ClientErrorKind::Auth,
            404 => ClientErrorKind::NotFound,
            408 => ClientErrorKind::Timeout,
            429 => ClientErrorKind::RateLimit,
            500 | 502 | 503 | 504 => ClientErrorKind::ServerError,
            _ => ClientErrorKind::Unknown,
        };
        Self {
            kind,
            status: Some(status),
            message: truncate_body(body),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ClientErrorKind::Timeout
        } else {
            ClientErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    /// A failure that is not tied to an HTTP status (missing field in a
    /// response, unparseable payload, unconfigured integration).
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: ClientErrorKind::Unknown,
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "{:?} ({}): {}", self.kind, status, self.message)
        } else {
            write!(f, "{:?}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ClientError {}

fn truncate_body(body: &str) -> String {
    if body.len() > 300 {
        let mut end = 300;
        while end > 0 && !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ClientError::from_status(401, "").kind, ClientErrorKind::Auth);
        assert_eq!(ClientError::from_status(403, "").kind, ClientErrorKind::Auth);
        assert_eq!(ClientError::from_status(404, "").kind, ClientErrorKind::NotFound);
        assert_eq!(ClientError::from_status(429, "").kind, ClientErrorKind::RateLimit);
        assert_eq!(ClientError::from_status(503, "").kind, ClientErrorKind::ServerError);
        assert_eq!(ClientError::from_status(418, "").kind, ClientErrorKind::Unknown);
    }

    #[test]
    fn test_body_truncation() {
        let long = "x".repeat(500);
        let err = ClientError::from_status(500, &long);
        assert!(err.message.len() < 310);
        assert!(err.message.ends_with("..."));
    }

    #[test]
    fn test_display_includes_status() {
        let err = ClientError::from_status(404, "no such bot");
        let rendered = err.to_string();
        assert!(rendered.contains("404"));
        assert!(rendered.contains("no such bot"));
    }
}
