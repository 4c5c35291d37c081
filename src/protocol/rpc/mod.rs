//! RPC (Remote Procedure Call) protocol implementation as specified in RFC 5531 (previously RFC 1057).
//!
//! The RPC protocol enables programs to call procedures on remote systems as if
//! they were local calls. It forms the foundation for all NFS operations by
//! providing a standard mechanism for client-server communication.
//!
//! This module implements the client side of RPC version 2:
//!
//! 1. Message framing for TCP using the Record Marking Standard
//! 2. A blocking, one-call-in-flight connection to a single server
//! 3. Authentication (AUTH_NONE and AUTH_UNIX)
//! 4. Strict reply validation (xid match, accept/reject status)
//!
//! RPC provides important benefits for distributed systems:
//! - Location transparency (clients don't need to know server locations)
//! - Network protocol independence (can run over TCP or UDP)
//! - Platform neutrality through XDR (External Data Representation)
//! - Built-in authentication and security mechanisms
//!
//! The implementation in this module serves as the communication layer for
//! the NFS, MOUNT, and PORTMAP clients, handling connection setup, message
//! encoding/transmission, and reply validation.

mod transport;

pub use transport::{release_all_rpc, Connection};
