//! Crate error types
//!
//! Per-connection failures are local: they terminate that connection's two
//! loops and never propagate to the hub loop or to other connections. The
//! `Error` type exists so loop code can use `?` and so callers of the
//! serving surface get a typed cause.

use std::io;

use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hub and connection operations
#[derive(Debug)]
pub enum Error {
    /// Underlying socket I/O failed
    Io(io::Error),
    /// WebSocket-level failure (handshake, framing, capacity)
    Transport(WsError),
    /// Inbound payload exceeded the configured message size limit
    MessageTooLarge { size: usize, limit: usize },
    /// No liveness response within the read deadline
    DeadlineExpired,
    /// The hub event loop is gone and can no longer accept events
    HubClosed,
}

impl Error {
    /// Whether this error is an ordinary peer disconnect.
    ///
    /// Clean closes, peers that vanish without a closing handshake, and the
    /// usual reset/EOF I/O kinds all count. These tear the connection down
    /// silently; anything else is logged once.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Transport(WsError::ConnectionClosed | WsError::AlreadyClosed) => true,
            Error::Transport(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                true
            }
            Error::Transport(WsError::Io(e)) => is_disconnect_io(e),
            Error::Io(e) => is_disconnect_io(e),
            _ => false,
        }
    }
}

fn is_disconnect_io(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Transport(e) => write!(f, "transport error: {}", e),
            Error::MessageTooLarge { size, limit } => {
                write!(f, "message of {} bytes exceeds limit of {}", size, limit)
            }
            Error::DeadlineExpired => write!(f, "no response from peer within read deadline"),
            Error::HubClosed => write!(f, "hub event loop is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<WsError> for Error {
    fn from(e: WsError) -> Self {
        Error::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_close_is_disconnect() {
        assert!(Error::Transport(WsError::ConnectionClosed).is_disconnect());
        assert!(Error::Transport(WsError::AlreadyClosed).is_disconnect());
    }

    #[test]
    fn test_abnormal_closure_is_disconnect() {
        let err = Error::Transport(WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake,
        ));
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_reset_io_is_disconnect() {
        let err = Error::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(err.is_disconnect());

        let err = Error::Transport(WsError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "eof",
        )));
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_other_errors_are_not_disconnects() {
        assert!(!Error::DeadlineExpired.is_disconnect());
        assert!(!Error::HubClosed.is_disconnect());
        assert!(!Error::MessageTooLarge { size: 600, limit: 512 }.is_disconnect());
        assert!(!Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")).is_disconnect());
    }

    #[test]
    fn test_display_includes_sizes() {
        let err = Error::MessageTooLarge { size: 600, limit: 512 };
        let text = err.to_string();
        assert!(text.contains("600"));
        assert!(text.contains("512"));
    }
}
