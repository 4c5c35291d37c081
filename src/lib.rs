//! A user-space NFSv3 client library over TCP.
//!
//! This crate speaks the three ONC RPC programs a real mount needs, each with
//! its own thin client:
//!
//! - [`portmap`]: PORTMAP version 2 (RFC 1833) for discovering which port a
//!   program is registered on.
//! - [`mount`]: MOUNT version 3 (RFC 1813 Appendix I) for turning an export
//!   path into the file handle that roots it.
//! - [`nfs3`]: the NFS version 3 protocol itself (RFC 1813) - all 22
//!   procedures, each exposed as a typed method on [`nfs3::Nfs3Client`].
//!
//! `protocol` holds the lower layers these clients are built from: XDR
//! encoding (RFC 1832), the RPC call/reply envelope (RFC 5531), and the wire
//! types for all three programs. Most users only need `portmap`, `mount` and
//! `nfs3`; `protocol` is exposed for callers who want to drive the wire
//! format directly.
//!
//! ## Standards Compliance
//!
//! - RFC 1813: NFS Version 3 Protocol Specification
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2 (obsoletes RFC 1831)
//! - RFC 1832: XDR: External Data Representation Standard (obsoletes RFC 1014)
//! - RFC 1833: Binding Protocols for ONC RPC Version 2
//!
//! ## Usage
//!
//! A typical client discovers the MOUNT and NFS ports via [`portmap::Portmap`],
//! mounts an export with [`mount::Mount`] to obtain a root file handle, then
//! drives file operations through [`nfs3::Nfs3Client`] using that handle.

pub mod config;
pub mod error;
pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod protocol;

pub use config::{Auth, ConnectionConfig};
pub use error::{Error, Result};
pub use protocol::rpc::release_all_rpc;
pub use protocol::xdr;
