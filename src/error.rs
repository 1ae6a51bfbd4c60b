use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

use crate::srcset::SrcsetError;

#[derive(Debug, Error)]
pub enum PagetrimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Render session error: {0}")]
    Session(String),

    /// Only reached by library callers that use `?` on `srcset::absolutize`.
    /// The snapshot pipeline recovers srcset failures per attribute.
    #[error("Srcset error: {0}")]
    Srcset(#[from] SrcsetError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl PagetrimError {
    pub fn browser(message: impl Into<String>) -> Self {
        PagetrimError::Browser(message.into())
    }

    pub fn session(message: impl Into<String>) -> Self {
        PagetrimError::Session(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            PagetrimError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check the output directory path and its permissions.",
            ),
            PagetrimError::Json(e) => ErrorPayload::new(
                ErrorCategory::Browser,
                e.to_string(),
                "The Playwright bridge sent malformed data; rerun with --verbose for details.",
            ),
            PagetrimError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            PagetrimError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("executable doesn't exist")
                    || lower.contains("chromium executable")
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH (or set node_command in the config).",
                    )
                } else if lower.contains("timeout") || lower.contains("timed out") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Try increasing --nav-timeout/--network-idle-timeout/--process-timeout or ensure the page finishes loading.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Rerun with --verbose and --no-headless to watch the browser.",
                    )
                }
            }
            PagetrimError::Session(msg) => ErrorPayload::new(
                ErrorCategory::Browser,
                msg.to_string(),
                "The render session ended unexpectedly; rerun with --verbose for the bridge log.",
            ),
            PagetrimError::Srcset(e) => ErrorPayload::new(
                ErrorCategory::Content,
                e.to_string(),
                "The page contains a malformed srcset attribute.",
            ),
            PagetrimError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths (e.g., --viewport WIDTHxHEIGHT) and the config file.",
            ),
            PagetrimError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PagetrimError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Browser,
    Content,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
