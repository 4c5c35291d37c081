//! This module implements the `MOUNT` protocol (RFC 1813 Appendix I) data structures
//! for XDR serialization and deserialization.
//!
//! The `MOUNT` protocol is used to establish the initial connection between an NFS client
//! and server. It provides functions for mounting and unmounting file systems, and
//! obtaining the initial file handle that serves as the root of the mounted file system.

// Allow unused code since we implement the complete RFC specification
#![allow(dead_code)]
// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use crate::xdr::{DeserializeEnum, SerializeEnum};
use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// MOUNT program number for RPC
pub const PROGRAM: u32 = 100005;
/// MOUNT protocol version 3
pub const VERSION: u32 = 3;

/// Maximum bytes in a path name
pub const MNTPATHLEN: u32 = 1024;
/// Maximum bytes in a name
pub const MNTNAMLEN: u32 = 255;
/// Maximum bytes in a V3 file handle
pub const FHSIZE3: u32 = 64;

/// File handle for NFS version 3
pub type fhandle3 = Vec<u8>;
/// Directory path on the server
pub type dirpath = Vec<u8>;
/// Name in the directory
pub type name = Vec<u8>;

/// Status codes returned by `MOUNT` protocol operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat3 {
    /// No error
    #[default]
    MNT3_OK = 0, /* no error */
    /// Not owner
    MNT3ERR_PERM = 1, /* Not owner */
    /// No such file or directory
    MNT3ERR_NOENT = 2, /* No such file or directory */
    /// I/O error
    MNT3ERR_IO = 5, /* I/O error */
    /// Permission denied
    MNT3ERR_ACCES = 13, /* Permission denied */
    /// Not a directory
    MNT3ERR_NOTDIR = 20, /* Not a directory */
    /// Invalid argument
    MNT3ERR_INVAL = 22, /* Invalid argument */
    /// Filename too long
    MNT3ERR_NAMETOOLONG = 63, /* Filename too long */
    /// Operation not supported
    MNT3ERR_NOTSUPP = 10004, /* Operation not supported */
    /// A failure on the server
    MNT3ERR_SERVERFAULT = 10006, /* A failure on the server */
}
SerializeEnum!(mountstat3);
DeserializeEnum!(mountstat3);

/// Successful response to a mount request
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct mountres3_ok {
    /// File handle for the mounted directory
    pub fhandle: fhandle3, // really same thing as nfs::nfs_fh3
    /// List of authentication flavors supported by the server
    pub auth_flavors: Vec<u32>,
}
DeserializeStruct!(mountres3_ok, fhandle, auth_flavors);
SerializeStruct!(mountres3_ok, fhandle, auth_flavors);

/// The reply to MNT, as defined in RFC 1813 Appendix I: a `mountstat3` discriminant
/// followed, only on `MNT3_OK`, by the mounted handle and accepted auth flavors.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub enum mountres3 {
    /// Mount succeeded
    Ok(mountres3_ok),
    /// Mount failed with this status
    Err(mountstat3),
}

impl Default for mountres3 {
    fn default() -> Self {
        mountres3::Err(mountstat3::default())
    }
}

impl Serialize for mountres3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            mountres3::Ok(ok) => {
                mountstat3::MNT3_OK.serialize(dest)?;
                ok.serialize(dest)
            }
            mountres3::Err(status) => status.serialize(dest),
        }
    }
}
impl Deserialize for mountres3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let status: mountstat3 = deserialize(src)?;
        *self = match status {
            mountstat3::MNT3_OK => mountres3::Ok(deserialize(src)?),
            other => mountres3::Err(other),
        };
        Ok(())
    }
}

/// Procedure numbers for the `MOUNT` version 3 protocol
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
pub enum MountProgram {
    /// Null procedure for service availability testing
    #[default]
    MOUNTPROC3_NULL = 0,
    /// Mount a file system
    MOUNTPROC3_MNT = 1,
    /// Get list of mounted file systems
    MOUNTPROC3_DUMP = 2,
    /// Unmount a file system
    MOUNTPROC3_UMNT = 3,
    /// Unmount all file systems
    MOUNTPROC3_UMNTALL = 4,
    /// Get list of exported file systems
    MOUNTPROC3_EXPORT = 5,
    /// Invalid procedure number
    INVALID,
}
SerializeEnum!(MountProgram);
DeserializeEnum!(MountProgram);

/// A single exported directory, as returned by EXPORT, with the flattened form of
/// the on-wire `groupnode` cons-list of client/netgroup names permitted to mount it.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct exportnode {
    /// Path of the exported directory
    pub dir: dirpath,
    /// Names of groups permitted to mount this export; empty means "everyone"
    pub groups: Vec<name>,
}

impl Serialize for exportnode {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.dir.serialize(dest)?;
        for group in &self.groups {
            true.serialize(dest)?;
            group.serialize(dest)?;
        }
        false.serialize(dest)
    }
}
impl Deserialize for exportnode {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.dir.deserialize(src)?;
        self.groups.clear();
        loop {
            let has_next: bool = deserialize(src)?;
            if !has_next {
                break;
            }
            self.groups.push(deserialize(src)?);
        }
        Ok(())
    }
}

/// The full export list returned by EXPORT, as defined in RFC 1813 Appendix I. The
/// flattened form of the on-wire `exportnode *` cons-list.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct exports3 {
    /// Exported directories, in server order
    pub nodes: Vec<exportnode>,
}

impl Serialize for exports3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for node in &self.nodes {
            true.serialize(dest)?;
            node.serialize(dest)?;
        }
        false.serialize(dest)
    }
}
impl Deserialize for exports3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.nodes.clear();
        loop {
            let has_next: bool = deserialize(src)?;
            if !has_next {
                break;
            }
            self.nodes.push(deserialize(src)?);
        }
        Ok(())
    }
}
