//! Error types returned by this crate's clients.
//!
//! Errors are grouped the way the protocol layers themselves are: a bad argument
//! never reaches the wire, a transport failure comes from the socket, a protocol
//! error comes from a malformed RPC envelope, and a server status code is never
//! wrapped here at all - it travels back in-band as part of a procedure's typed
//! result, exactly as RFC 1813 and RFC 1833 define it.

use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A call's arguments were rejected before anything was sent to the server -
    /// an oversized file handle, an unsupported MKNOD file type, or an unknown
    /// authentication flavor.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The underlying socket failed, a read timed out, a message was truncated, or
    /// an XDR value failed to decode.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The RPC envelope around a reply was malformed: the XID didn't match the
    /// call, the message type wasn't REPLY, or the call was rejected/denied at the
    /// RPC layer itself (as opposed to failing inside the called procedure).
    #[error("RPC protocol error: {0}")]
    Protocol(String),
}

/// Convenience alias used throughout this crate's public API.
pub type Result<T> = std::result::Result<T, Error>;
