//! Module contains XDR data structures related to directories for NFS version 3 protocol
//! as defined in RFC 1813.
//!
//! This module includes data structures for the following directory operations:
//! - MKDIR: Create a directory (procedure 9)
//! - SYMLINK: Create a symbolic link (procedure 10)
//! - READDIR: Read from a directory (procedure 16)
//! - READDIRPLUS: Extended read from a directory (procedure 17)
//! - MKNOD: Create a special device (procedure 11)
//!
//! These structures implement the XDR serialization/deserialization interfaces for
//! the request arguments and response data of directory-related operations.

// Allow unused code warnings since we implement the complete RFC 1813 specification,
// including procedures that may not be used by all clients
#![allow(dead_code)]
// Preserve original RFC naming conventions (e.g. READDIR3args, MKDIR3resok)
// for consistency with the NFS version 3 protocol specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use super::*;

/// Arguments for the MKDIR procedure (procedure 9)
/// as defined in RFC 1813 section 3.3.9
/// Used to create a new directory
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKDIR3args {
    /// Directory where new directory should be created and its name
    pub dirops: diropargs3,
    /// Initial attributes for the new directory
    pub attributes: sattr3,
}
DeserializeStruct!(MKDIR3args, dirops, attributes);
SerializeStruct!(MKDIR3args, dirops, attributes);

/// Successful response shared by MKDIR, SYMLINK and MKNOD (RFC 1813 sections 3.3.9-3.3.11):
/// the new object's handle and attributes plus weak cache consistency data for the
/// parent directory.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKDIR3resok {
    /// File handle of the newly created directory
    pub obj: post_op_fh3,
    /// Attributes of the newly created directory
    pub obj_attributes: post_op_attr,
    /// Attributes of the parent directory before and after the operation
    pub dir_wcc: wcc_data,
}
DeserializeStruct!(MKDIR3resok, obj, obj_attributes, dir_wcc);
SerializeStruct!(MKDIR3resok, obj, obj_attributes, dir_wcc);

/// Successful response to SYMLINK; identical in shape to [`MKDIR3resok`].
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct SYMLINK3resok {
    /// File handle of the newly created symbolic link
    pub obj: post_op_fh3,
    /// Attributes of the newly created symbolic link
    pub obj_attributes: post_op_attr,
    /// Attributes of the parent directory before and after the operation
    pub dir_wcc: wcc_data,
}
DeserializeStruct!(SYMLINK3resok, obj, obj_attributes, dir_wcc);
SerializeStruct!(SYMLINK3resok, obj, obj_attributes, dir_wcc);

/// Successful response to MKNOD; identical in shape to [`MKDIR3resok`].
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKNOD3resok {
    /// File handle of the newly created special file
    pub obj: post_op_fh3,
    /// Attributes of the newly created special file
    pub obj_attributes: post_op_attr,
    /// Attributes of the parent directory before and after the operation
    pub dir_wcc: wcc_data,
}
DeserializeStruct!(MKNOD3resok, obj, obj_attributes, dir_wcc);
SerializeStruct!(MKNOD3resok, obj, obj_attributes, dir_wcc);

/// Arguments for the SYMLINK procedure (procedure 10)
/// as defined in RFC 1813 section 3.3.10
/// Used to create a symbolic link
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct SYMLINK3args {
    /// Directory where symbolic link should be created and its name
    pub dirops: diropargs3,
    /// Target path and attributes for the symbolic link
    pub symlink: symlinkdata3,
}
DeserializeStruct!(SYMLINK3args, dirops, symlink);
SerializeStruct!(SYMLINK3args, dirops, symlink);

/// A single directory entry returned by READDIR, as defined in RFC 1813 section 3.3.16.
///
/// On the wire, `entry3` is a recursive structure: each entry is followed by a
/// boolean and, when true, another `entry3`. [`dirlist3`] handles that recursive
/// chain and decodes it into a flat `Vec<entry3>`; this struct only covers one
/// link's own fields.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct entry3 {
    /// File identifier (inode number)
    pub fileid: fileid3,
    /// Name of the directory entry
    pub name: filename3,
    /// Cookie for the next READDIR operation
    pub cookie: cookie3,
}
DeserializeStruct!(entry3, fileid, name, cookie);
SerializeStruct!(entry3, fileid, name, cookie);

/// The directory listing returned by READDIR, as defined in RFC 1813 section 3.3.16.
///
/// `entries` is the flattened form of the on-wire cons-list (`entry3 *entries`,
/// a bool-present tail after every element, ending in a trailing `false`).
/// `eof` is true when no more entries remain beyond this reply.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct dirlist3 {
    /// Entries in this batch of the directory listing, in server order
    pub entries: Vec<entry3>,
    /// True if this is the last batch of entries in the directory
    pub eof: bool,
}

impl Serialize for dirlist3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }
}
impl Deserialize for dirlist3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        loop {
            let has_next: bool = deserialize(src)?;
            if !has_next {
                break;
            }
            self.entries.push(deserialize(src)?);
        }
        self.eof.deserialize(src)
    }
}

/// Arguments for the READDIR procedure (procedure 16)
/// as defined in RFC 1813 section 3.3.16
/// Used to read entries from a directory. The server returns a variable number of directory entries,
/// up to the specified count limit.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIR3args {
    /// File handle for the directory to be read
    pub dir: nfs_fh3,
    /// Cookie indicating where to start reading directory entries
    /// A cookie value of 0 means start at beginning of directory
    pub cookie: cookie3,
    /// Cookie verifier to detect whether directory has changed
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
}
DeserializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);
SerializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);

/// Successful response to READDIR, as defined in RFC 1813 section 3.3.16.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIR3resok {
    /// Attributes of the directory after the operation
    pub dir_attributes: post_op_attr,
    /// Cookie verifier to present on the next READDIR call to continue this listing
    pub cookieverf: cookieverf3,
    /// The batch of entries and whether the listing is complete
    pub reply: dirlist3,
}
DeserializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);
SerializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);

/// Directory entry with additional attributes for READDIRPLUS operation
/// as defined in RFC 1813 section 3.3.17
/// This structure represents a single directory entry with extended information
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct entryplus3 {
    /// File identifier (inode number) uniquely identifying the file within the filesystem
    pub fileid: fileid3,
    /// Name of the directory entry (filename)
    pub name: filename3,
    /// Cookie value that can be used in subsequent READDIRPLUS calls to resume listing
    pub cookie: cookie3,
    /// File attributes for this directory entry
    pub name_attributes: post_op_attr,
    /// File handle for this directory entry
    pub name_handle: post_op_fh3,
}
DeserializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);
SerializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// The directory listing returned by READDIRPLUS, as defined in RFC 1813 section 3.3.17.
/// Structurally identical to [`dirlist3`] but carries `entryplus3` links.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct dirlistplus3 {
    /// Entries in this batch of the directory listing, in server order
    pub entries: Vec<entryplus3>,
    /// True if this is the last batch of entries in the directory
    pub eof: bool,
}

impl Serialize for dirlistplus3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }
}
impl Deserialize for dirlistplus3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        loop {
            let has_next: bool = deserialize(src)?;
            if !has_next {
                break;
            }
            self.entries.push(deserialize(src)?);
        }
        self.eof.deserialize(src)
    }
}

/// Arguments for the READDIRPLUS procedure (procedure 17)
/// as defined in RFC 1813 section 3.3.17
/// READDIRPLUS returns directory entries along with their attributes and file handles.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIRPLUS3args {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Cookie from previous READDIRPLUS - where to start reading
    pub cookie: cookie3,
    /// Cookie verifier to detect changed directories
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
    /// Maximum number of bytes of attribute information to return
    pub maxcount: count3,
}
DeserializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
SerializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);

/// Successful response to READDIRPLUS, as defined in RFC 1813 section 3.3.17.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIRPLUS3resok {
    /// Attributes of the directory after the operation
    pub dir_attributes: post_op_attr,
    /// Cookie verifier to present on the next READDIRPLUS call to continue this listing
    pub cookieverf: cookieverf3,
    /// The batch of entries and whether the listing is complete
    pub reply: dirlistplus3,
}
DeserializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);
SerializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);

/// Arguments for the MKNOD procedure (procedure 11)
/// as defined in RFC 1813 section 3.3.11
/// Used to create a special device file, FIFO, or socket
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKNOD3args {
    /// Directory where the special file should be created and its name
    pub where_dir: diropargs3,
    /// Type and device information for the special file
    pub what: mknoddata3,
}
DeserializeStruct!(MKNOD3args, where_dir, what);
SerializeStruct!(MKNOD3args, where_dir, what);

/// Device number and initial attributes for a character or block special file,
/// as defined in RFC 1813 section 3.3.11.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct devicedata3 {
    /// Initial attributes for the device node
    pub dev_attributes: sattr3,
    /// Major and minor device numbers
    pub spec: specdata3,
}
DeserializeStruct!(devicedata3, dev_attributes, spec);
SerializeStruct!(devicedata3, dev_attributes, spec);

/// Arguments to MKNOD, tagged by the file type being created, as defined in
/// RFC 1813 section 3.3.11:
///
/// - `NF3CHR`/`NF3BLK` carry a [`devicedata3`] (attributes plus major/minor numbers).
/// - `NF3SOCK`/`NF3FIFO` carry only initial attributes.
/// - Any other type (`NF3REG`, `NF3DIR`, `NF3LNK`) is not a valid MKNOD target; the
///   client rejects it with an argument error before encoding a call.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone)]
pub enum mknoddata3 {
    /// Character special device
    Chr(devicedata3),
    /// Block special device
    Blk(devicedata3),
    /// Unix domain socket
    Sock(sattr3),
    /// Named pipe (FIFO)
    Fifo(sattr3),
}

impl Default for mknoddata3 {
    fn default() -> Self {
        mknoddata3::Fifo(sattr3::default())
    }
}

impl Serialize for mknoddata3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            mknoddata3::Chr(d) => {
                ftype3::NF3CHR.serialize(dest)?;
                d.serialize(dest)
            }
            mknoddata3::Blk(d) => {
                ftype3::NF3BLK.serialize(dest)?;
                d.serialize(dest)
            }
            mknoddata3::Sock(a) => {
                ftype3::NF3SOCK.serialize(dest)?;
                a.serialize(dest)
            }
            mknoddata3::Fifo(a) => {
                ftype3::NF3FIFO.serialize(dest)?;
                a.serialize(dest)
            }
        }
    }
}
impl Deserialize for mknoddata3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let kind: ftype3 = deserialize(src)?;
        *self = match kind {
            ftype3::NF3CHR => mknoddata3::Chr(deserialize(src)?),
            ftype3::NF3BLK => mknoddata3::Blk(deserialize(src)?),
            ftype3::NF3SOCK => mknoddata3::Sock(deserialize(src)?),
            ftype3::NF3FIFO => mknoddata3::Fifo(deserialize(src)?),
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{other:?} is not a valid MKNOD file type"),
                ))
            }
        };
        Ok(())
    }
}
