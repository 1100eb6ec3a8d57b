use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A form submission failed numeric validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A workout was about to be built with an illegal measurement.
    #[error("invalid measurement: {field} = {value}")]
    InvalidMeasurement { field: &'static str, value: f64 },

    #[error("workout not found: {0}")]
    NotFound(String),

    /// Persisted data could not be turned back into a known workout kind.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("current location is unavailable")]
    GeolocationUnavailable,

    #[error("no form is open")]
    NoActiveForm,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Errors the controller recovers from locally without aborting the caller.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidMeasurement { .. }
                | Self::NotFound(_)
                | Self::CorruptRecord(_)
                | Self::GeolocationUnavailable
                | Self::NoActiveForm
        )
    }
}
