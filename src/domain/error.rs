//! Domain error types

use thiserror::Error;

/// Errors that can occur while talking to the radio or recording a session.
///
/// `Clone` so that the first failure captured by a track thread can be handed
/// back to the caller after both threads have been joined.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigError {
    /// Transport read/write failure; the radio session is torn down.
    #[error("Serial I/O error: {0}")]
    Io(String),

    /// No response within the deadline.
    #[error("Timed out waiting for {what}{}", hint_suffix(.hint))]
    Timeout { what: String, hint: Option<String> },

    /// A frame arrived but did not match the expected grammar.
    #[error("CAT parse error: {0}")]
    Parse(String),

    /// The CAT response queue is not being drained fast enough.
    #[error("CAT serial communication: queue overflow")]
    QueueOverflow,

    #[error("Radio does not appear to be {0}")]
    IdentityMismatch(String),

    #[error("Radio session already running")]
    AlreadyRunning,

    #[error("Radio session is not running")]
    NotRunning,

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Muxer error: {0}")]
    Muxer(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RigError {
    /// True for transport-class failures. Queue overflow counts as one so the
    /// engine stops instead of wedging.
    pub fn is_io(&self) -> bool {
        matches!(self, RigError::Io(_) | RigError::QueueOverflow)
    }

    /// Attach a remediation hint to a timeout; other errors pass through.
    pub fn with_hint(self, hint: Option<&str>) -> Self {
        match self {
            RigError::Timeout { what, hint: None } => RigError::Timeout {
                what,
                hint: hint.map(String::from),
            },
            other => other,
        }
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(". {h}")).unwrap_or_default()
}

/// Result type alias for rigcorder operations
pub type RigResult<T> = Result<T, RigError>;
