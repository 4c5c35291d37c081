//! The ONC RPC/NFSv3 wire protocol stack, layered the way RFC 1813 and its
//! companion RFCs define it.
//!
//! - `xdr`: External Data Representation (RFC 1832) types for the PORTMAP,
//!   MOUNT and NFSv3 programs, plus the RPC call/reply envelope itself.
//!
//! - `rpc`: the client-side ONC RPC transport (RFC 5531) - Record Marking
//!   framing, XID assignment, and reply validation - that the `portmap`,
//!   `mount` and `nfs3` clients are built on.
//!
//! Most callers should use [`crate::portmap`], [`crate::mount`] and
//! [`crate::nfs3`] instead of this module directly.

pub mod rpc;
pub mod xdr;
