//! Client for the NFS version 3 protocol (RFC 1813).
//!
//! `Nfs3Client` issues one typed method per NFSv3 procedure over a connection
//! already pointed at a server's NFS port (typically discovered through
//! [`crate::portmap::Portmap`] and preceded by a [`crate::mount::Mount::mnt`] to
//! obtain a root file handle).

use std::io::Read;
use std::time::Duration;

use num_traits::cast::ToPrimitive;

use crate::config::Auth;
use crate::error::{Error, Result};
use crate::protocol::rpc::Connection;
use crate::protocol::xdr::nfs3::dir::{
    MKDIR3args, MKDIR3resok, MKNOD3args, MKNOD3resok, READDIR3args, READDIR3resok,
    READDIRPLUS3args, READDIRPLUS3resok, SYMLINK3args, SYMLINK3resok,
};
use crate::protocol::xdr::nfs3::file::{
    CREATE3args, CREATE3resok, COMMIT3args, COMMIT3resok, LINK3args, LINK3resok, READ3args,
    READ3resok, WRITE3args, WRITE3resok,
};
use crate::protocol::xdr::nfs3::fs::{fsinfo3, FSSTAT3resok, PATHCONF3resok};
use crate::protocol::xdr::nfs3::{
    cookieverf3, diropargs3, fattr3, nfs_fh3, nfsstat3, sattr3, sattrguard3, symlinkdata3,
    wcc_data, ACCESS3args, ACCESS3resok, LOOKUP3resok, NFSProgram, READLINK3resok, RENAME3args,
    RENAME3resok, SETATTR3args, NFS3_FHSIZE, PROGRAM, VERSION,
};
use crate::protocol::xdr::{deserialize, Deserialize, Serialize};

pub use crate::protocol::xdr::nfs3::dir::mknoddata3 as MknodData;
pub use crate::protocol::xdr::nfs3::file::createhow3 as CreateHow;
pub use crate::protocol::xdr::nfs3::file::stable_how as StableHow;
pub use crate::protocol::xdr::nfs3::{fattr3 as FileAttr, sattr3 as SetAttr};

/// An NFSv3 file handle, bounded to [`NFS3_FHSIZE`] as required by RFC 1813 section 2.3.3.
///
/// Wrapping the raw bytes means an oversized handle is rejected at construction,
/// before any procedure call touches the socket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NfsFh3(Vec<u8>);

impl NfsFh3 {
    /// Wraps `data` as a file handle, rejecting it if longer than `NFS3_FHSIZE`.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        if data.len() > NFS3_FHSIZE as usize {
            return Err(Error::Argument(format!(
                "file handle is {} bytes, exceeds NFS3_FHSIZE of {NFS3_FHSIZE}",
                data.len()
            )));
        }
        Ok(Self(data))
    }

    /// The raw handle bytes, as opaque to this library as they are to NFS itself.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<nfs_fh3> for NfsFh3 {
    fn from(fh: nfs_fh3) -> Self {
        Self(fh.data)
    }
}

impl From<&NfsFh3> for nfs_fh3 {
    fn from(fh: &NfsFh3) -> Self {
        nfs_fh3 { data: fh.0.clone() }
    }
}

/// The outcome of an NFSv3 procedure call: either the typed success payload, or the
/// status code the server returned along with whatever weak-cache-consistency or
/// attribute data it still attaches on failure (`Fail` is `()` for procedures whose
/// failure arm is void, per RFC 1813).
#[derive(Clone, Debug)]
pub enum NfsResult<Ok, Fail = ()> {
    /// `NFS3_OK`, with the procedure's success payload
    Ok(Ok),
    /// Any other status, with whatever data the failure arm of that procedure carries
    Err(nfsstat3, Fail),
}

impl<O, F> NfsResult<O, F> {
    /// Converts to a plain `Result`, discarding the failure-arm payload.
    pub fn into_result(self) -> std::result::Result<O, nfsstat3> {
        match self {
            NfsResult::Ok(v) => std::result::Result::Ok(v),
            NfsResult::Err(status, _) => std::result::Result::Err(status),
        }
    }
}

impl<O: Default, F: Default> Default for NfsResult<O, F> {
    fn default() -> Self {
        NfsResult::Err(nfsstat3::default(), F::default())
    }
}

impl<O: Deserialize + Default, F: Deserialize + Default> Deserialize for NfsResult<O, F> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let status: nfsstat3 = deserialize(src)?;
        *self = match status {
            nfsstat3::NFS3_OK => NfsResult::Ok(deserialize(src)?),
            other => NfsResult::Err(other, deserialize(src)?),
        };
        Ok(())
    }
}

/// Result of GETATTR.
pub type GetattrResult = NfsResult<fattr3>;
/// Result of SETATTR; both arms carry weak cache consistency data for the object.
pub type SetattrResult = NfsResult<wcc_data, wcc_data>;
/// Result of LOOKUP.
pub type LookupResult = NfsResult<LOOKUP3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of ACCESS.
pub type AccessResult = NfsResult<ACCESS3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of READLINK.
pub type ReadlinkResult = NfsResult<READLINK3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of READ.
pub type ReadResult = NfsResult<READ3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of WRITE; both arms carry weak cache consistency data for the file.
pub type WriteResult = NfsResult<WRITE3resok, wcc_data>;
/// Result of CREATE; both arms carry weak cache consistency data for the parent.
pub type CreateResult = NfsResult<CREATE3resok, wcc_data>;
/// Result of MKDIR; both arms carry weak cache consistency data for the parent.
pub type MkdirResult = NfsResult<MKDIR3resok, wcc_data>;
/// Result of SYMLINK; both arms carry weak cache consistency data for the parent.
pub type SymlinkResult = NfsResult<SYMLINK3resok, wcc_data>;
/// Result of MKNOD; both arms carry weak cache consistency data for the parent.
pub type MknodResult = NfsResult<MKNOD3resok, wcc_data>;
/// Result of REMOVE; both arms carry weak cache consistency data for the parent.
pub type RemoveResult = NfsResult<wcc_data, wcc_data>;
/// Result of RMDIR; both arms carry weak cache consistency data for the parent.
pub type RmdirResult = NfsResult<wcc_data, wcc_data>;
/// Result of RENAME; both arms carry the same shape (both directories' wcc data).
pub type RenameResult = NfsResult<RENAME3resok, RENAME3resok>;
/// Result of LINK; both arms carry the same shape (file attrs plus link dir wcc data).
pub type LinkResult = NfsResult<LINK3resok, LINK3resok>;
/// Result of READDIR.
pub type ReaddirResult = NfsResult<READDIR3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of READDIRPLUS.
pub type ReaddirplusResult =
    NfsResult<READDIRPLUS3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of FSSTAT.
pub type FsstatResult = NfsResult<FSSTAT3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of FSINFO.
pub type FsinfoResult = NfsResult<fsinfo3, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of PATHCONF.
pub type PathconfResult = NfsResult<PATHCONF3resok, crate::protocol::xdr::nfs3::post_op_attr>;
/// Result of COMMIT; both arms carry weak cache consistency data for the file.
pub type CommitResult = NfsResult<COMMIT3resok, wcc_data>;

/// A connection to a server's NFSv3 service.
pub struct Nfs3Client {
    conn: Connection,
    auth: Auth,
}

impl Nfs3Client {
    /// Connects to the NFSv3 service at `(host, port)`, usually the port
    /// [`crate::portmap::Portmap::getport`] reported for program 100003.
    pub fn connect(host: &str, port: u16, timeout: Duration, auth: Auth) -> Result<Self> {
        let conn = Connection::connect(host, port, timeout)?;
        Ok(Self { conn, auth })
    }

    /// Closes the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.conn.disconnect()
    }

    fn call<Res: Deserialize + Default>(
        &mut self,
        proc: NFSProgram,
        args: &impl Serialize,
    ) -> Result<Res> {
        let proc_num = proc.to_u32().expect("nfs procedure fits in u32");
        let bytes = self.conn.call(PROGRAM, VERSION, proc_num, &self.auth, args)?;
        Ok(deserialize(&mut &bytes[..])?)
    }

    /// NULL (0): a no-op round trip used to check reachability.
    pub fn null(&mut self) -> Result<()> {
        self.call::<()>(NFSProgram::NFSPROC3_NULL, &())
    }

    /// GETATTR (1): retrieves an object's attributes.
    pub fn getattr(&mut self, handle: &NfsFh3) -> Result<GetattrResult> {
        self.call(NFSProgram::NFSPROC3_GETATTR, &nfs_fh3::from(handle))
    }

    /// SETATTR (2): sets an object's attributes, optionally guarded by its current ctime.
    pub fn setattr(
        &mut self,
        handle: &NfsFh3,
        new_attributes: sattr3,
        guard: sattrguard3,
    ) -> Result<SetattrResult> {
        let args = SETATTR3args {
            object: handle.into(),
            new_attribute: new_attributes,
            guard,
        };
        self.call(NFSProgram::NFSPROC3_SETATTR, &args)
    }

    /// LOOKUP (3): resolves a name within a directory to a file handle.
    pub fn lookup(&mut self, dir: &NfsFh3, name: impl Into<Vec<u8>>) -> Result<LookupResult> {
        let args = diropargs3 { dir: dir.into(), name: name.into().into() };
        self.call(NFSProgram::NFSPROC3_LOOKUP, &args)
    }

    /// ACCESS (4): checks a bitmask of access rights (the `ACCESS3_*` constants)
    /// against the caller's credentials, returning the granted subset.
    pub fn access(&mut self, handle: &NfsFh3, access: u32) -> Result<AccessResult> {
        let args = ACCESS3args { object: handle.into(), access };
        self.call(NFSProgram::NFSPROC3_ACCESS, &args)
    }

    /// READLINK (5): reads the target path of a symbolic link.
    pub fn readlink(&mut self, handle: &NfsFh3) -> Result<ReadlinkResult> {
        self.call(NFSProgram::NFSPROC3_READLINK, &nfs_fh3::from(handle))
    }

    /// READ (6): reads up to `count` bytes starting at `offset`. A short read with
    /// `eof == false` means "retry at `offset + count`"; `eof == true` means end of file.
    pub fn read(&mut self, handle: &NfsFh3, offset: u64, count: u32) -> Result<ReadResult> {
        let args = READ3args { file: handle.into(), offset, count };
        self.call(NFSProgram::NFSPROC3_READ, &args)
    }

    /// WRITE (7): writes `data` starting at `offset`. The result's `committed` field
    /// reports the actual stability the server applied, and `verf` changes across a
    /// server reboot - this library never resends unstable writes automatically.
    pub fn write(
        &mut self,
        handle: &NfsFh3,
        offset: u64,
        data: Vec<u8>,
        stable: StableHow,
    ) -> Result<WriteResult> {
        let count = data.len() as u32;
        let args = WRITE3args { file: handle.into(), offset, count, stable, data };
        self.call(NFSProgram::NFSPROC3_WRITE, &args)
    }

    /// CREATE (8): creates a regular file. `how` selects UNCHECKED/GUARDED (carrying
    /// initial attributes) or EXCLUSIVE (carrying a client-chosen verifier).
    pub fn create(
        &mut self,
        dir: &NfsFh3,
        name: impl Into<Vec<u8>>,
        how: CreateHow,
    ) -> Result<CreateResult> {
        let args = CREATE3args { where_dir: diropargs3 { dir: dir.into(), name: name.into().into() }, how };
        self.call(NFSProgram::NFSPROC3_CREATE, &args)
    }

    /// MKDIR (9): creates a directory.
    pub fn mkdir(
        &mut self,
        dir: &NfsFh3,
        name: impl Into<Vec<u8>>,
        attributes: sattr3,
    ) -> Result<MkdirResult> {
        let args = MKDIR3args {
            dirops: diropargs3 { dir: dir.into(), name: name.into().into() },
            attributes,
        };
        self.call(NFSProgram::NFSPROC3_MKDIR, &args)
    }

    /// SYMLINK (10): creates a symbolic link pointing at `target`.
    pub fn symlink(
        &mut self,
        dir: &NfsFh3,
        name: impl Into<Vec<u8>>,
        target: impl Into<Vec<u8>>,
        attributes: sattr3,
    ) -> Result<SymlinkResult> {
        let args = SYMLINK3args {
            dirops: diropargs3 { dir: dir.into(), name: name.into().into() },
            symlink: symlinkdata3 { symlink_attributes: attributes, symlink_data: target.into().into() },
        };
        self.call(NFSProgram::NFSPROC3_SYMLINK, &args)
    }

    /// MKNOD (11): creates a special file. `what` is tagged by file type; only
    /// character/block devices and sockets/FIFOs can be constructed, matching the
    /// set of types RFC 1813 allows MKNOD to create.
    pub fn mknod(
        &mut self,
        dir: &NfsFh3,
        name: impl Into<Vec<u8>>,
        what: MknodData,
    ) -> Result<MknodResult> {
        let args = MKNOD3args {
            where_dir: diropargs3 { dir: dir.into(), name: name.into().into() },
            what,
        };
        self.call(NFSProgram::NFSPROC3_MKNOD, &args)
    }

    /// REMOVE (12): removes a file.
    pub fn remove(&mut self, dir: &NfsFh3, name: impl Into<Vec<u8>>) -> Result<RemoveResult> {
        let args = diropargs3 { dir: dir.into(), name: name.into().into() };
        self.call(NFSProgram::NFSPROC3_REMOVE, &args)
    }

    /// RMDIR (13): removes an empty directory.
    pub fn rmdir(&mut self, dir: &NfsFh3, name: impl Into<Vec<u8>>) -> Result<RmdirResult> {
        let args = diropargs3 { dir: dir.into(), name: name.into().into() };
        self.call(NFSProgram::NFSPROC3_RMDIR, &args)
    }

    /// RENAME (14): moves/renames an object between two directory+name pairs.
    pub fn rename(
        &mut self,
        from_dir: &NfsFh3,
        from_name: impl Into<Vec<u8>>,
        to_dir: &NfsFh3,
        to_name: impl Into<Vec<u8>>,
    ) -> Result<RenameResult> {
        let args = RENAME3args {
            from: diropargs3 { dir: from_dir.into(), name: from_name.into().into() },
            to: diropargs3 { dir: to_dir.into(), name: to_name.into().into() },
        };
        self.call(NFSProgram::NFSPROC3_RENAME, &args)
    }

    /// LINK (15): creates a hard link to `handle` at `link_dir`/`link_name`.
    pub fn link(
        &mut self,
        handle: &NfsFh3,
        link_dir: &NfsFh3,
        link_name: impl Into<Vec<u8>>,
    ) -> Result<LinkResult> {
        let args = LINK3args {
            file: handle.into(),
            link: diropargs3 { dir: link_dir.into(), name: link_name.into().into() },
        };
        self.call(NFSProgram::NFSPROC3_LINK, &args)
    }

    /// READDIR (16): lists directory entries starting from `cookie`, verified
    /// against `cookieverf` from a prior call (use `[0; 8]` to start from the beginning).
    pub fn readdir(
        &mut self,
        dir: &NfsFh3,
        cookie: u64,
        cookieverf: cookieverf3,
        count: u32,
    ) -> Result<ReaddirResult> {
        let args = READDIR3args { dir: dir.into(), cookie, cookieverf, dircount: count };
        self.call(NFSProgram::NFSPROC3_READDIR, &args)
    }

    /// READDIRPLUS (17): like READDIR, but each entry also carries attributes and a
    /// file handle when the server provides them. `dircount` bounds directory-data
    /// bytes; `maxcount` bounds the total reply size.
    pub fn readdirplus(
        &mut self,
        dir: &NfsFh3,
        cookie: u64,
        cookieverf: cookieverf3,
        dircount: u32,
        maxcount: u32,
    ) -> Result<ReaddirplusResult> {
        let args = READDIRPLUS3args { dir: dir.into(), cookie, cookieverf, dircount, maxcount };
        self.call(NFSProgram::NFSPROC3_READDIRPLUS, &args)
    }

    /// FSSTAT (18): queries dynamic file system state (space and inode usage).
    pub fn fsstat(&mut self, handle: &NfsFh3) -> Result<FsstatResult> {
        self.call(NFSProgram::NFSPROC3_FSSTAT, &nfs_fh3::from(handle))
    }

    /// FSINFO (19): queries static file system capabilities (size limits, the
    /// `FSF3_*` property bitmask).
    pub fn fsinfo(&mut self, handle: &NfsFh3) -> Result<FsinfoResult> {
        self.call(NFSProgram::NFSPROC3_FSINFO, &nfs_fh3::from(handle))
    }

    /// PATHCONF (20): queries POSIX pathconf-style limits for the file system.
    pub fn pathconf(&mut self, handle: &NfsFh3) -> Result<PathconfResult> {
        self.call(NFSProgram::NFSPROC3_PATHCONF, &nfs_fh3::from(handle))
    }

    /// COMMIT (21): flushes a previously unstable-written byte range to stable storage.
    pub fn commit(&mut self, handle: &NfsFh3, offset: u64, count: u32) -> Result<CommitResult> {
        let args = COMMIT3args { file: handle.into(), offset, count };
        self.call(NFSProgram::NFSPROC3_COMMIT, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_handle_rejects_oversized_data() {
        let oversized = vec![0u8; NFS3_FHSIZE as usize + 1];
        assert!(NfsFh3::new(oversized).is_err());
    }

    #[test]
    fn file_handle_accepts_max_size() {
        let max = vec![0u8; NFS3_FHSIZE as usize];
        assert!(NfsFh3::new(max).is_ok());
    }

    #[test]
    fn getattr_result_decodes_success() {
        let mut buf = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut buf).unwrap();
        fattr3::default().serialize(&mut buf).unwrap();
        let result: GetattrResult = deserialize(&mut &buf[..]).unwrap();
        assert!(matches!(result, NfsResult::Ok(_)));
    }

    #[test]
    fn getattr_result_decodes_failure() {
        let mut buf = Vec::new();
        nfsstat3::NFS3ERR_NOENT.serialize(&mut buf).unwrap();
        let result: GetattrResult = deserialize(&mut &buf[..]).unwrap();
        assert!(matches!(result, NfsResult::Err(nfsstat3::NFS3ERR_NOENT, ())));
    }
}
