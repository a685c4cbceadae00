use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub const NO_ORIGIN_TYPE_MESSAGE: &str = "No origin type found";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("invalid payload field '{field}': {message}")]
    Validation { field: String, message: String },
    #[error("No origin type found")]
    MissingOriginType,
    #[error("no avatar provider supports any origin type")]
    MissingFallbackProvider,
    #[error("more than one avatar provider claims to support any origin type")]
    DuplicateFallbackProvider,
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownCommand { .. } => ErrorCode::UnknownCommand,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::MissingOriginType => ErrorCode::MissingOriginType,
            Self::Handler(_) => ErrorCode::HandlerFailure,
            Self::MissingFallbackProvider | Self::DuplicateFallbackProvider => ErrorCode::Internal,
        }
    }

    /// Normalizes the error into the value sent back to the UI.
    pub fn to_api_error(&self) -> ApiError {
        let message = match self {
            // keep the whole context chain, the UI has nothing else to go on
            Self::Handler(source) => format!("{source:#}"),
            other => other.to_string(),
        };
        ApiError::new(self.code(), message)
    }
}
