//! Error types for the Hearth console core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering identity resolution, command parsing, collaborator lookups, and
//! the OAuth pairing handshake.

/// Top-level error type for the Hearth core library.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// The OS account of the current process could not be resolved.
    /// Fatal at session startup; never raised afterwards.
    #[error("Identity lookup failed: {message}")]
    IdentityLookup { message: String },

    /// An escape-prefixed line whose second character selects no verb.
    #[error("Unknown command: \\{command}")]
    UnknownCommand { command: String },

    /// A well-formed verb with a malformed argument list.
    #[error("Invalid arguments, usage: {usage}")]
    InvalidArguments { usage: String },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Phase 1 of the pairing handshake failed; the pairing state stays idle.
    #[error("OAuth initiation for '{kind}' failed: {message}")]
    OAuthInitiation { kind: String, message: String },

    /// Phase 2 of the pairing handshake failed; the pairing state resets to
    /// idle and the operator must restart from phase 1.
    #[error("OAuth completion for '{kind}' failed: {message}")]
    OAuthCompletion { kind: String, message: String },

    /// A collaborator raised an error the console only reports.
    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HearthError {
    /// Wrap a collaborator failure message.
    pub fn engine(message: impl Into<String>) -> Self {
        HearthError::Engine {
            message: message.into(),
        }
    }
}

/// A type alias for results using the top-level `HearthError`.
pub type Result<T> = std::result::Result<T, HearthError>;
