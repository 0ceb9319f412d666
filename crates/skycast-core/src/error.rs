//! Shared error types for SkyCast.
//!
//! The weather, store and registry errors in the other crates wrap the
//! transport and storage failures defined here. Every type has a
//! `user_message()` suitable for showing next to a forecast or a saved place.

use thiserror::Error;

/// Errors surfaced at startup and other application edges.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Local storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "Could not read or write SkyCast's files.",
            AppError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

/// Failures talking to a weather or geocoding endpoint, before any HTTP
/// status is looked at.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    /// The request could not be built or sent.
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("Unreadable response body: {0}")]
    Body(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Can't reach the weather service. Check your internet connection."
            }
            NetworkError::Timeout => "The weather service took too long to answer.",
            NetworkError::Request(_) => "Weather could not be requested. Please try again.",
            NetworkError::Body(_) => "The weather service sent an incomplete reply.",
        }
    }
}

/// Local SQLite failures.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Database is busy: {0}")]
    Busy(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// Schema creation failed or the file was written by a newer release.
    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => "Your saved places could not be opened.",
            DatabaseError::Busy(_) => "Saved places are in use elsewhere. Try again shortly.",
            DatabaseError::QueryFailed(_) => "Saving your changes failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "Saved places look damaged. Removing them may be necessary."
            }
            DatabaseError::MigrationFailed(_) => {
                "Saved places come from a newer SkyCast and can't be read."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "SkyCast's settings are invalid. Check config.toml.",
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_body() || self.is_decode() {
            NetworkError::Body(self.to_string())
        } else {
            NetworkError::Request(self.to_string())
        }
    }
}

/// Classify a rusqlite failure.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        use rusqlite::ErrorCode;

        let code = match &self {
            rusqlite::Error::SqliteFailure(err, _) => Some(err.code),
            _ => None,
        };
        let message = self.to_string();
        match code {
            Some(ErrorCode::CannotOpen) => DatabaseError::ConnectionFailed(message),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                DatabaseError::Busy(message)
            }
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                DatabaseError::Corruption(message)
            }
            _ => DatabaseError::QueryFailed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_network_error_lifts_into_app_error() {
        let app_err: AppError = NetworkError::Timeout.into();
        assert!(matches!(app_err, AppError::Network(NetworkError::Timeout)));
        assert_eq!(
            app_err.user_message(),
            "The weather service took too long to answer."
        );
    }

    #[test]
    fn test_sqlite_codes_are_classified() {
        assert!(matches!(
            sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN).into_database_error(),
            DatabaseError::ConnectionFailed(_)
        ));
        assert!(matches!(
            sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into_database_error(),
            DatabaseError::Busy(_)
        ));
        assert!(matches!(
            sqlite_failure(rusqlite::ffi::SQLITE_NOTADB).into_database_error(),
            DatabaseError::Corruption(_)
        ));
    }

    #[test]
    fn test_other_sqlite_errors_are_query_failures() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_database_error();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }

    #[test]
    fn test_config_error_message() {
        let err = AppError::from(ConfigError::Invalid("timeout_secs".into()));
        assert!(err.user_message().contains("config.toml"));
    }
}
