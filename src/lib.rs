#[cfg(feature = "audio-io")]
pub mod audio;
pub mod feedback;
pub mod integration;
pub mod questions;
pub mod session;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoachError {
    #[error("Question bank load error: {0}")]
    LoadError(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Speech recognition error: {0}")]
    RecognitionError(String),

    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Feedback service error: {} - {}", .status, .message.as_deref().unwrap_or("unknown error"))]
    ServiceError { status: u16, message: Option<String> },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl CoachError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Retrying the load is the recovery path
            CoachError::LoadError(_) => true,
            // Missing engines stay missing for the rest of the session
            CoachError::CapabilityUnavailable(_) => false,
            // Per-attempt failures
            CoachError::RecognitionError(_) => true,
            CoachError::SynthesisError(_) => true,
            CoachError::NetworkError(_) => true,
            CoachError::ServiceError { .. } => true,
            CoachError::ConfigError(_) => false,
            CoachError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            CoachError::LoadError(detail) => {
                format!("Could not load the interview questions: {}", detail)
            }
            CoachError::CapabilityUnavailable(detail) => {
                format!("This feature is not available here: {}", detail)
            }
            CoachError::RecognitionError(code) => {
                format!("Speech recognition error: {}", code)
            }
            CoachError::SynthesisError(detail) => {
                format!("Could not read the question aloud: {}", detail)
            }
            CoachError::NetworkError(detail) => format!(
                "Could not reach the feedback service. Check that it is running and the URL is correct. Details: {}",
                detail
            ),
            CoachError::ServiceError { status, message } => format!(
                "The feedback service returned an error ({}): {}",
                status,
                message.as_deref().unwrap_or("unknown error")
            ),
            CoachError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            CoachError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoachError>;
