use crate::wizard::WizardStep;

/// Result alias used by every fallible studio operation
pub type StudioResult<T> = Result<T, StudioError>;

/// Main error type for the studio surfaces.
///
/// The reveal core itself never fails: missing scripts, stale ticks and
/// degenerate budgets are absorbed by the driver. These variants cover the
/// navigation, export, configuration and I/O edges around it.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("Unknown advisor: {0}")]
    UnknownAdvisor(String),

    #[error("No content available for advisor: {0}")]
    NoScript(String),

    #[error("At most {max} advisors can be selected")]
    SelectionFull { max: usize },

    #[error("Exactly {required} advisors must be selected, got {selected}")]
    SelectionIncomplete { required: usize, selected: usize },

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Wizard is at step {actual:?}, expected {expected:?}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: String, to: String },

    #[error("Generation is not complete for: {0}")]
    GenerationIncomplete(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StudioError {
    /// Whether the error was caused by the caller rather than the studio
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            StudioError::Config(_)
                | StudioError::Logging(_)
                | StudioError::Io(_)
                | StudioError::Serialization(_)
        )
    }
}
