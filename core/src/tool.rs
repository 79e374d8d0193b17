use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::IntentError;

/// Uniform envelope every tool operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success {
        result: String,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ToolResult {
    pub fn success(result: impl Into<String>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error_message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The result text or the error message, whichever applies.
    pub fn text(&self) -> &str {
        match self {
            Self::Success { result } => result,
            Self::Error { error_message } => error_message,
        }
    }
}

impl From<Result<String, IntentError>> for ToolResult {
    fn from(outcome: Result<String, IntentError>) -> Self {
        match outcome {
            Ok(result) => Self::success(result),
            Err(err) => Self::error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_serializes_with_status_tag() {
        assert_eq!(
            serde_json::to_value(ToolResult::success("done")).unwrap(),
            json!({ "status": "success", "result": "done" })
        );
        assert_eq!(
            serde_json::to_value(ToolResult::error("nope")).unwrap(),
            json!({ "status": "error", "errorMessage": "nope" })
        );
    }

    #[test]
    fn errors_convert_into_error_envelopes() {
        let result: ToolResult = Err(IntentError::not_configured()).into();
        assert!(!result.is_success());
        assert!(result.text().contains("not configured"));

        let result: ToolResult = Ok("fine".to_string()).into();
        assert_eq!(result, ToolResult::success("fine"));
    }
}
