//! Mapping of driver, network and filesystem errors onto [`ErrorKind`].

use std::io;
use std::sync::OnceLock;

use regex::Regex;
use sqlx::mysql::MySqlDatabaseError;

use schemasync_core::error::{classify_message, ErrorKind, SyncError};

/// Classifies a MySQL server or client error number.
///
/// Returns `None` for numbers without a well-known meaning.
#[must_use]
pub fn classify_error_number(number: u16) -> Option<(ErrorKind, bool)> {
    let classified = match number {
        // ER_DBACCESS_DENIED, ER_ACCESS_DENIED, ER_TABLEACCESS_DENIED,
        // ER_SPECIFIC_ACCESS_DENIED
        1044 | 1045 | 1142 | 1227 => (ErrorKind::Permission, false),
        // CR_CONNECTION_ERROR, CR_CONN_HOST_ERROR, CR_SERVER_GONE_ERROR,
        // CR_SERVER_LOST
        2002 | 2003 | 2006 | 2013 => (ErrorKind::Connection, true),
        // ER_LOCK_WAIT_TIMEOUT
        1205 => (ErrorKind::Timeout, true),
        // ER_LOCK_DEADLOCK
        1213 => (ErrorKind::Sql, true),
        // Table/column/key exists or is missing.
        1050 | 1051 | 1054 | 1060 | 1061 | 1091 | 1146 => (ErrorKind::Schema, false),
        // ER_PARSE_ERROR
        1064 => (ErrorKind::Sql, false),
        _ => return None,
    };
    Some(classified)
}

fn error_number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\berror\s*:?\s*\(?(\d{4})\)?").ok())
        .as_ref()
}

/// Extracts a MySQL error number from text such as `ERROR 1045 (28000): ...`.
#[must_use]
pub fn error_number_in(message: &str) -> Option<u16> {
    error_number_pattern()?
        .captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Classifies free-form error text, preferring an embedded error number
/// over phrase matching.
#[must_use]
pub fn classify_text(message: &str) -> SyncError {
    let number = error_number_in(message);
    let (kind, recoverable) = number
        .and_then(classify_error_number)
        .unwrap_or_else(|| classify_message(message));

    let err = SyncError::new(kind, message).recoverable(recoverable);
    match number {
        Some(number) => err.with_context("error_number", number),
        None => err,
    }
}

/// Classifies an error returned by `sqlx`, keeping it as the source.
#[must_use]
pub fn classify_sqlx_error(err: sqlx::Error) -> SyncError {
    let classified = match &err {
        sqlx::Error::Database(db) => {
            let number = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number);
            let (kind, recoverable) = number
                .and_then(classify_error_number)
                .unwrap_or_else(|| classify_message(db.message()));

            let mut classified = SyncError::new(kind, db.message()).recoverable(recoverable);
            if let Some(number) = number {
                classified = classified.with_context("error_number", number);
            }
            if let Some(state) = db.code() {
                classified = classified.with_context("sql_state", state);
            }
            classified
        }
        sqlx::Error::Io(io_err) => classify_io_error(io_err),
        sqlx::Error::Tls(tls) => SyncError::connection(format!("TLS error: {tls}")),
        sqlx::Error::PoolTimedOut => {
            SyncError::timeout("timed out waiting for a pooled connection")
        }
        sqlx::Error::PoolClosed => {
            SyncError::connection("connection pool is closed").recoverable(false)
        }
        sqlx::Error::Configuration(cause) => {
            SyncError::validation(format!("invalid connection configuration: {cause}"))
        }
        other => classify_text(&other.to_string()),
    };
    classified.with_source(err)
}

/// Classifies an I/O error from the network or filesystem.
#[must_use]
pub fn classify_io_error(err: &io::Error) -> SyncError {
    use io::ErrorKind as Io;

    let message = err.to_string();
    match err.kind() {
        Io::ConnectionRefused
        | Io::ConnectionReset
        | Io::ConnectionAborted
        | Io::NotConnected
        | Io::BrokenPipe
        | Io::AddrNotAvailable
        | Io::UnexpectedEof => SyncError::connection(message),
        Io::TimedOut | Io::WouldBlock => SyncError::timeout(message),
        Io::PermissionDenied => SyncError::permission(message),
        Io::NotFound | Io::InvalidInput | Io::InvalidData => SyncError::validation(message),
        Io::Interrupted => SyncError::interruption(message),
        _ => SyncError::from_message(message),
    }
}
