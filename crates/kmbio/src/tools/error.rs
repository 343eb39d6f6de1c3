use thiserror::Error;

/// Errors raised while superposing coordinate sets.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("coordinate sets differ in size: {reference} reference vs {moving} moving")]
    SizeMismatch { reference: usize, moving: usize },

    #[error("cannot superpose empty coordinate sets")]
    Empty,

    #[error("no coordinates have been set")]
    NotSet,

    #[error("superposition has not been run yet")]
    NotRun,

    #[error("rotation could not be computed: {reason}")]
    RotationFailed { reason: String },
}

impl Error {
    pub fn rotation_failed(reason: impl Into<String>) -> Self {
        Self::RotationFailed {
            reason: reason.into(),
        }
    }
}
