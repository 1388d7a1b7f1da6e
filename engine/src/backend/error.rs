use std::error::Error as _;

use strum::Display;
use thiserror::Error;

/// Everything that can stop a generation. The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Please select an image generation model!")]
    MissingModel,

    #[error("Please enter your API key in the sidebar!")]
    MissingKey,

    #[error("Please enter an image description!")]
    MissingPrompt,

    /// Non-200 answer carrying a detail message
    #[error("Generation failed (status {status}): {detail}")]
    Backend { status: u16, detail: String },

    /// Connection failures, timeouts and bodies we couldn't make sense of
    #[error("Error while contacting the backend: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[strum(to_string = "local validation")]
    LocalValidation,
    #[strum(to_string = "backend")]
    Backend,
    #[strum(to_string = "transport")]
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingModel | Self::MissingKey | Self::MissingPrompt => {
                ErrorKind::LocalValidation
            }
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingPrompt => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        // the actual cause (e.g. connection refused) only shows up in the source chain
        let mut text = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(text)
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response: {e}"))
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use super::*;

    #[test]
    fn backend_message_has_code_and_detail() {
        let err = GenerationError::Backend {
            status: 401,
            detail: "invalid key".into(),
        };
        expect![["Generation failed (status 401): invalid key"]].assert_eq(&err.to_string());
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn taxonomy() {
        assert_eq!(GenerationError::MissingKey.kind(), ErrorKind::LocalValidation);
        assert_eq!(
            GenerationError::Transport("refused".into()).kind().to_string(),
            "transport"
        );
        assert_eq!(GenerationError::MissingPrompt.severity(), Severity::Warning);
        assert_eq!(GenerationError::MissingKey.severity(), Severity::Error);
    }
}
