use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

/// Fatal planning failures. Nothing is placed when one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    /// Non-positive dimension or quantity, or an item no material can hold.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no material selected; choose the sheet material to cut from")]
    NoMaterialSelected,

    #[error("optimization strategy '{strategy}' is not implemented; use '{suggestion}' instead")]
    StrategyNotImplemented {
        strategy: String,
        suggestion: String,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
