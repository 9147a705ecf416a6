use thiserror::Error;

/// Failure while turning model text into a [`Model`](crate::Model).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("invalid value {value:?} for attribute '{attr}' on <{element}>")]
    BadValue {
        element: String,
        attr: String,
        value: String,
    },
}

impl ModelError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Failure while advancing simulation state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StepError {
    #[error("simulation diverged at t={time:.4}s (body {body})")]
    Diverged { time: f64, body: usize },

    #[error("state does not match model: expected {expected} bodies, found {found}")]
    Mismatch { expected: usize, found: usize },
}
