//! Common error types for foodb

use thiserror::Error;

/// Common result type for foodb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the foodb build steps
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input file does not have the expected shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pipeline step failed
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the name of the pipeline step that produced it
    pub fn in_step(step: &'static str, source: Error) -> Self {
        Error::Step {
            step,
            source: Box::new(source),
        }
    }

    /// Process exit code for this error (sysexits.h categories)
    ///
    /// A failed step reports the code of the error that stopped it.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 78,
            Error::InvalidInput(_) => 65,
            Error::Io(_) => 74,
            Error::Database(_) | Error::Csv(_) => 70,
            Error::Step { source, .. } => source.exit_code(),
        }
    }
}
