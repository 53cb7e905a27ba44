use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    #[error("Git error: {0}")]
    GitError(String),

    #[error("Not a git repository. Run 'snap init' first")]
    NotARepository,

    #[error("Already a git repository")]
    AlreadyARepository,

    #[error("Ollama error: {0}")]
    OllamaError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Shell completion error: {0}")]
    ShellCompletion(String),

    #[error("An effect is already in flight for this session ({0})")]
    EffectAlreadyInFlight(String),
}

pub type Result<T> = std::result::Result<T, SnapError>;

/// Failure of one external operation, as delivered back to a session.
///
/// Sessions must be comparable and cheap to clone, so the underlying
/// [`SnapError`] is flattened into its message at the runner boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EffectError(pub String);

impl From<SnapError> for EffectError {
    fn from(err: SnapError) -> Self {
        match err {
            // Strip the "Git error:" prefix; git's own stderr is clearer alone.
            SnapError::GitError(msg) => EffectError(msg.trim().to_string()),
            other => EffectError(other.to_string()),
        }
    }
}

impl From<&str> for EffectError {
    fn from(msg: &str) -> Self {
        EffectError(msg.to_string())
    }
}

/// Why a session ended badly.
///
/// Stored in `Session::last_error`. `Conflict`-style advisory endings are not
/// a `Cause`; they leave `last_error` unset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// Detected before any effect was started.
    #[error("{0}")]
    Precondition(String),

    /// The external operation itself failed.
    #[error("{0}")]
    Effect(String),

    /// The external operation succeeded but its result is unusable.
    #[error("{0}")]
    Domain(String),

    /// The user declined at a confirmation step.
    #[error("{0} cancelled")]
    Cancelled(String),
}

impl Cause {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Cause::Precondition(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Cause::Domain(msg.into())
    }

    pub fn cancelled(what: impl Into<String>) -> Self {
        Cause::Cancelled(what.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Cause::Cancelled(_))
    }
}

impl From<EffectError> for Cause {
    fn from(err: EffectError) -> Self {
        Cause::Effect(err.0)
    }
}
