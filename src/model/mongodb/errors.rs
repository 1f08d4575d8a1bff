//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps, and classifies errors for the transaction retry loop.

use mongodb::error::{
    Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};

pub const LOCK_TIMEOUT: i32 = 24;
pub const WRITE_CONFLICT: i32 = 112;
pub const DUPLICATE_KEY: i32 = 11000;

/// The server error code carried by the given error, if any.
pub fn error_code(err: &DbError) -> Option<i32> {
    match *err.kind {
        ErrorKind::Command(ref e) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(ref e)) => Some(e.code),
        _ => None,
    }
}

/// Return true if the given error is a duplicate key write error.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    error_code(err) == Some(DUPLICATE_KEY)
}

/// Return true if the whole transaction may succeed if retried from the start.
pub fn is_transient_error(err: &DbError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
        || matches!(error_code(err), Some(WRITE_CONFLICT) | Some(LOCK_TIMEOUT))
}

/// Return true if a commit may or may not have been applied, and may be safely retried.
pub fn is_unknown_commit_result(err: &DbError) -> bool {
    err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
}
