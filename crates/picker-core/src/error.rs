//! Error types and result aliases for the picker.
//!
//! One closed taxonomy shared by every component; the HTTP layer performs
//! a single exhaustive mapping from these kinds to response codes.

/// The result type used throughout the picker.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in picker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service is missing or rejecting configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// The sheet store is unreachable or returned an unusable response.
    #[error("data source error: {message}")]
    DataSource {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The sheet's header row is missing required columns.
    #[error("sheet is missing required columns: {}", missing.join(", "))]
    MalformedSheet {
        /// The required column names that were absent.
        missing: Vec<String>,
    },

    /// The requested card/color pair does not exist in the freshest read.
    #[error("card '{name}' ({color}) not found")]
    CardNotFound {
        /// Requested card name.
        name: String,
        /// Requested color.
        color: String,
    },

    /// The card is already held by another user.
    #[error("card '{name}' already reserved by {reserved_by}")]
    AlreadyReserved {
        /// Requested card name.
        name: String,
        /// The current holder recorded in the sheet.
        reserved_by: String,
    },

    /// A per-user reservation policy was violated (duplicate color or max count).
    #[error("{message}")]
    ReservationLimit {
        /// Description of the violated limit.
        message: String,
    },

    /// The reservation write itself failed at the store.
    #[error("update error: {message}")]
    Update {
        /// Description of the write failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new data source error with the given message.
    #[must_use]
    pub fn data_source(message: impl Into<String>) -> Self {
        Self::DataSource {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source cause.
    #[must_use]
    pub fn data_source_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DataSource {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new update error with the given message.
    #[must_use]
    pub fn update(message: impl Into<String>) -> Self {
        Self::Update {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new update error with a source cause.
    #[must_use]
    pub fn update_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Update {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new reservation limit error.
    #[must_use]
    pub fn reservation_limit(message: impl Into<String>) -> Self {
        Self::ReservationLimit {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
