//! Client for the MOUNT version 3 protocol (RFC 1813 Appendix I).
//!
//! MOUNT is the prerequisite step before using NFS: a client presents an export
//! path and gets back the file handle that roots the exported tree.

use std::time::Duration;

use num_traits::cast::ToPrimitive;

use crate::config::Auth;
use crate::error::{Error, Result};
use crate::nfs3::NfsFh3;
use crate::protocol::rpc::Connection;
use crate::protocol::xdr::mount::{exports3, mountres3, mountstat3, MountProgram, PROGRAM, VERSION};
use crate::protocol::xdr::{deserialize, Serialize};

/// A single exported directory and the groups permitted to mount it.
#[derive(Clone, Debug)]
pub struct ExportNode {
    /// Path of the exported directory
    pub dir: Vec<u8>,
    /// Names of groups permitted to mount it; empty means unrestricted
    pub groups: Vec<Vec<u8>>,
}

/// The result of a successful MNT call.
#[derive(Clone, Debug)]
pub struct MountInfo {
    /// File handle rooting the mounted export
    pub file_handle: NfsFh3,
    /// Authentication flavors the server accepts for this export
    pub auth_flavors: Vec<u32>,
}

enum MountState {
    NotMounted,
    Mounted(Vec<u8>),
}

/// A connection to a server's mount daemon.
pub struct Mount {
    conn: Connection,
    auth: Auth,
    state: MountState,
}

impl Mount {
    /// Connects to the mount daemon at `(host, port)`, usually the port
    /// [`crate::portmap::Portmap::getport`] reported for program 100005.
    pub fn connect(host: &str, port: u16, timeout: Duration, auth: Auth) -> Result<Self> {
        let conn = Connection::connect(host, port, timeout)?;
        Ok(Self { conn, auth, state: MountState::NotMounted })
    }

    /// Closes the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.conn.disconnect()
    }

    fn call(&mut self, proc: MountProgram, args: &impl Serialize) -> Result<Vec<u8>> {
        let proc_num = proc.to_u32().expect("mount procedure fits in u32");
        self.conn.call(PROGRAM, VERSION, proc_num, &self.auth, args)
    }

    /// MOUNTPROC3_NULL: a no-op round trip used to check reachability.
    pub fn null(&mut self) -> Result<()> {
        self.call(MountProgram::MOUNTPROC3_NULL, &())?;
        Ok(())
    }

    /// MOUNTPROC3_MNT: mounts `path`, remembering it for a later `umnt`.
    pub fn mnt(&mut self, path: impl Into<Vec<u8>>) -> Result<MountInfo> {
        let path = path.into();
        let bytes = self.call(MountProgram::MOUNTPROC3_MNT, &path)?;
        let reply: mountres3 = deserialize(&mut &bytes[..])?;
        match reply {
            mountres3::Ok(ok) => {
                self.state = MountState::Mounted(path);
                Ok(MountInfo {
                    file_handle: NfsFh3::new(ok.fhandle)?,
                    auth_flavors: ok.auth_flavors,
                })
            }
            mountres3::Err(status) => {
                Err(Error::Protocol(format!("mount failed: {status:?}")))
            }
        }
    }

    /// MOUNTPROC3_UMNT: unmounts the path a prior `mnt` established.
    ///
    /// Refuses locally with an error (no RPC is issued) if nothing is currently
    /// mounted on this connection - the server-side equivalent would be
    /// `MNT3ERR_NOTSUPP`.
    pub fn umnt(&mut self) -> Result<()> {
        let path = match &self.state {
            MountState::Mounted(path) => path.clone(),
            MountState::NotMounted => {
                return Err(Error::Argument(
                    "no filesystem is mounted on this connection (MNT3ERR_NOTSUPP)".to_string(),
                ))
            }
        };
        self.call(MountProgram::MOUNTPROC3_UMNT, &path)?;
        self.state = MountState::NotMounted;
        Ok(())
    }

    /// MOUNTPROC3_EXPORT: lists the directories this server exports.
    pub fn export(&mut self) -> Result<Vec<ExportNode>> {
        let bytes = self.call(MountProgram::MOUNTPROC3_EXPORT, &())?;
        let list: exports3 = deserialize(&mut &bytes[..])?;
        Ok(list
            .nodes
            .into_iter()
            .map(|n| ExportNode { dir: n.dir, groups: n.groups })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    /// `umnt()` with no prior successful `mnt()` must reject locally - mirroring
    /// `MNT3ERR_NOTSUPP` - without ever writing a call to the socket. A listener
    /// that accepts but never expects a byte catches a regression that makes
    /// `umnt()` fall through to `self.call(...)`.
    #[test]
    fn umnt_without_mnt_is_rejected_locally() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream
        });

        let mut mount =
            Mount::connect("127.0.0.1", port, Duration::from_secs(5), Auth::None).unwrap();
        let err = mount.umnt().unwrap_err();
        assert!(matches!(err, Error::Argument(_)));

        mount.disconnect().unwrap();
        server.join().unwrap();
    }
}
