// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the sondi probe
//!
//! Nothing the probe does on a page is fatal: failures inside event
//! dispatch or activity processing degrade to a skipped step and a log
//! line. These variants cover the host-side surfaces (loading pages,
//! parsing configuration, talking to the controller).

use thiserror::Error;

/// Result type alias for sondi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sondi
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTML parsing failed
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Selector parsing error
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller side of the bridge went away
    #[error("Controller bridge closed")]
    BridgeClosed,

    /// Frame/iframe error
    #[error("Frame error: {reason}")]
    Frame {
        reason: String,
        frame_url: Option<String>,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a selector error
    pub fn selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Selector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a frame error
    pub fn frame(reason: impl Into<String>) -> Self {
        Error::Frame {
            reason: reason.into(),
            frame_url: None,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a network error
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_))
    }

    /// Check if the controller is gone
    pub fn is_bridge_closed(&self) -> bool {
        matches!(self, Error::BridgeClosed)
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Frame {
                frame_url: Some(u), ..
            } => Some(u),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Attach a frame URL to a frame error
    fn with_url(self, url: &str) -> Result<T>;

    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn with_url(self, url: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            Error::Frame { reason, .. } => Error::Frame {
                reason,
                frame_url: Some(url.to_string()),
            },
            other => other,
        })
    }

    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            Error::Other(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_error() {
        let err = Error::selector("a:hover", "unsupported pseudo-class");
        assert_eq!(
            err.to_string(),
            "Invalid selector 'a:hover': unsupported pseudo-class"
        );
    }

    #[test]
    fn test_frame_error_with_url() {
        let result: Result<()> = Err(Error::frame("cross-origin"));
        let err = result.with_url("https://example.com/frame").unwrap_err();
        assert_eq!(err.url(), Some("https://example.com/frame"));
    }

    #[test]
    fn test_context() {
        let result: std::result::Result<(), &str> = Err("boom");
        let err = result.context("loading config").unwrap_err();
        assert_eq!(err.to_string(), "loading config: boom");
        assert!(!Error::BridgeClosed.is_network());
        assert!(Error::BridgeClosed.is_bridge_closed());
    }
}
