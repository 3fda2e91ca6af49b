//! Error types for schema synchronization.
//!
//! Every failure is reduced to a [`SyncError`] carrying an [`ErrorKind`], a
//! recoverability flag used by retry policies, and free-form context pairs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Boxed underlying cause of a [`SyncError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The database could not be reached or the connection dropped.
    Connection,
    /// A statement was rejected by the server.
    Sql,
    /// The schema is not in the expected shape (missing table, bad column).
    Schema,
    /// A malformed plan, missing object, or empty required field.
    Validation,
    /// The account lacks the privileges for an operation.
    Permission,
    /// An operation exceeded its deadline.
    Timeout,
    /// The run was cancelled.
    Interruption,
    /// Anything not recognized above.
    Unknown,
}

impl ErrorKind {
    /// Returns the lowercase tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Sql => "sql",
            Self::Schema => "schema",
            Self::Validation => "validation",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Interruption => "interruption",
            Self::Unknown => "unknown",
        }
    }

    /// Whether errors of this kind are retried unless stated otherwise.
    #[must_use]
    pub fn default_recoverable(&self) -> bool {
        matches!(self, Self::Connection | Self::Timeout)
    }

    /// Short guidance shown to the user below the error message.
    #[must_use]
    pub fn troubleshooting(&self) -> &'static str {
        match self {
            Self::Connection => {
                "Check that the database server is running, reachable from this host, \
                 and that the connection URL (host, port, database) is correct."
            }
            Self::Sql => {
                "Inspect the failing statement; run with --dry-run to review the full plan \
                 before applying it."
            }
            Self::Schema => {
                "The target schema changed or differs from the snapshot. Re-extract both \
                 schemas and compare again."
            }
            Self::Validation => {
                "The generated plan is malformed. Re-run the comparison; if the problem \
                 persists, report the schemas that triggered it."
            }
            Self::Permission => {
                "Grant the account ALTER, CREATE, DROP, INDEX and REFERENCES privileges \
                 on the target database."
            }
            Self::Timeout => {
                "The server did not answer in time. Increase the operation timeout or \
                 retry when the server is less loaded."
            }
            Self::Interruption => "The run was cancelled; no further statements were executed.",
            Self::Unknown => "Re-run with --verbose for the full error chain.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified synchronization error.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct SyncError {
    kind: ErrorKind,
    message: String,
    recoverable: bool,
    context: BTreeMap<String, String>,
    #[source]
    source: Option<BoxError>,
}

impl SyncError {
    /// Creates an error of the given kind with its default recoverability.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.default_recoverable(),
            context: BTreeMap::new(),
            source: None,
        }
    }

    /// Connection failure (recoverable).
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// Statement rejected by the server.
    pub fn sql(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Sql, message)
    }

    /// Schema shape problem.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    /// Precondition or plan validation failure (never recoverable).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Missing privileges.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// Deadline exceeded (recoverable).
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Cancellation observed.
    pub fn interruption(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Interruption, message)
    }

    /// Unrecognized failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Builds an error from a driver message using [`classify_message`].
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let (kind, recoverable) = classify_message(&message);
        Self::new(kind, message).recoverable(recoverable)
    }

    /// Overrides the recoverability flag.
    #[must_use]
    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Adds a context pair, replacing any previous value under `key`.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a retry may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Returns the context pairs.
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Looks up one context value.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// Guidance for this error's kind.
    #[must_use]
    pub fn troubleshooting(&self) -> &'static str {
        self.kind.troubleshooting()
    }
}

/// Maps a driver or network error message onto the taxonomy.
///
/// Matching is case-insensitive on well-known MySQL client and server
/// phrases. Unrecognized messages are `unknown` and not recoverable.
#[must_use]
pub fn classify_message(message: &str) -> (ErrorKind, bool) {
    let msg = message.to_ascii_lowercase();
    let has = |needle: &str| msg.contains(needle);

    if has("access denied") || has("command denied") || has("permission denied") {
        (ErrorKind::Permission, false)
    } else if has("deadline has elapsed")
        || has("timed out")
        || has("timeout")
        || has("lock wait timeout")
    {
        (ErrorKind::Timeout, true)
    } else if has("cancelled") || has("canceled") || has("interrupted") {
        (ErrorKind::Interruption, false)
    } else if has("can't connect")
        || has("cannot connect")
        || has("server has gone away")
        || has("gone away")
        || has("lost connection")
        || has("connection refused")
        || has("connection reset")
        || has("broken pipe")
        || has("too many connections")
    {
        (ErrorKind::Connection, true)
    } else if has("deadlock") {
        (ErrorKind::Sql, true)
    } else if has("unknown column")
        || has("unknown table")
        || has("doesn't exist")
        || has("already exists")
        || has("duplicate column")
        || has("duplicate key name")
        || has("can't drop")
    {
        (ErrorKind::Schema, false)
    } else if has("syntax") || has("you have an error in your sql") {
        (ErrorKind::Sql, false)
    } else {
        (ErrorKind::Unknown, false)
    }
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
