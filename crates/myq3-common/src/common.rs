// common.rs — console printing and engine errors

use thiserror::Error;

use crate::q_shared::{ERR_DROP, ERR_FATAL, ERR_SERVERDISCONNECT};

// ============================================================
// Com_Printf / Com_DPrintf
// ============================================================

/// General-purpose console print.
pub fn com_printf(msg: &str) {
    tracing::info!(target: "console", "{}", msg.trim_end_matches('\n'));
}

/// Developer-only print. Emitted at debug level so it only shows up when the
/// subscriber enables it.
pub fn com_dprintf(msg: &str) {
    tracing::debug!(target: "console", "{}", msg.trim_end_matches('\n'));
}

// ============================================================
// Com_Error
// ============================================================

/// Errors raised by the engine core. Every variant ends the current
/// connection; only `Fatal` takes the whole process down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComError {
    /// Exit the entire game.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// Print to console and disconnect from game. Raised for protocol
    /// desynchronization and internal consistency failures.
    #[error("{0}")]
    Drop(String),

    /// The server closed the connection, optionally telling us why.
    #[error("Server disconnected{}", disconnect_suffix(.0))]
    ServerDisconnect(Option<String>),
}

impl ComError {
    /// Shorthand for building an `ERR_DROP` error.
    pub fn drop(msg: impl Into<String>) -> Self {
        ComError::Drop(msg.into())
    }

    /// The `ERR_*` code this error corresponds to.
    pub fn code(&self) -> i32 {
        match self {
            ComError::Fatal(_) => ERR_FATAL,
            ComError::Drop(_) => ERR_DROP,
            ComError::ServerDisconnect(_) => ERR_SERVERDISCONNECT,
        }
    }

    /// True if the error must take the whole process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ComError::Fatal(_))
    }

    /// True if the remote side ended the session on purpose.
    pub fn is_server_disconnect(&self) -> bool {
        matches!(self, ComError::ServerDisconnect(_))
    }
}

pub type ComResult<T> = Result<T, ComError>;

fn disconnect_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" - {}", r),
        None => String::new(),
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ComError::Fatal("x".into()).code(), ERR_FATAL);
        assert_eq!(ComError::drop("x").code(), ERR_DROP);
        assert_eq!(ComError::ServerDisconnect(None).code(), ERR_SERVERDISCONNECT);
    }

    #[test]
    fn test_server_disconnect_message() {
        assert_eq!(ComError::ServerDisconnect(None).to_string(), "Server disconnected");
        assert_eq!(
            ComError::ServerDisconnect(Some("kicked".into())).to_string(),
            "Server disconnected - kicked"
        );
        assert!(ComError::ServerDisconnect(None).is_server_disconnect());
        assert!(!ComError::drop("x").is_server_disconnect());
    }

    #[test]
    fn test_only_fatal_is_fatal() {
        assert!(ComError::Fatal("boom".into()).is_fatal());
        assert!(!ComError::drop("boom").is_fatal());
        assert_eq!(ComError::drop("CL_GetSnapshot: bad").to_string(), "CL_GetSnapshot: bad");
    }
}
