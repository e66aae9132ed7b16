use thiserror::Error;

/// Reasons an editor refuses an action.
///
/// These never reach the host: the session logs them and keeps the
/// current options.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("`{tag}` has no field `{field}`")]
    UnknownField { tag: String, field: String },

    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("address does not resolve at `{0}`")]
    StaleAddress(String),

    #[error("`{action}` does not apply to a {target}")]
    Unsupported {
        action: &'static str,
        target: &'static str,
    },
}
