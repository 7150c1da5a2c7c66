use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e.to_string())
    }
}

impl From<csv::Error> for DbError {
    fn from(e: csv::Error) -> Self {
        DbError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
