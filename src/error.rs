//! Error-code convention shared by every fallible stage.
//!
//! Each stage owns its own `thiserror` enum next to the code that raises it.
//! All of them implement [`ErrorCode`] so the driver can report a stable,
//! machine-readable code alongside the human message.

use canvas::CanvasError;

/// Stable error code and retry hint for a user-visible failure.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownHandle(_) => "E_CANVAS_UNKNOWN_HANDLE",
            Self::NotANode(_) => "E_CANVAS_NOT_A_NODE",
        }
    }
}

/// Render an error as `{"code", "message", "retryable"}` for the driver's JSON output.
pub fn error_json(err: &(impl ErrorCode + ?Sized)) -> serde_json::Value {
    serde_json::json!({
        "code": err.error_code(),
        "message": err.to_string(),
        "retryable": err.retryable(),
    })
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
