//! Connection configuration shared by the PORTMAP, MOUNT and NFSv3 clients.

use std::time::Duration;

use crate::protocol::xdr::rpc::auth_unix;

/// Default socket read/write timeout applied when a caller doesn't specify one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lowest privileged port this crate will try to bind a client socket to.
pub const PRIVILEGED_PORT_LOW: u16 = 500;
/// Highest privileged port this crate will try to bind a client socket to.
pub const PRIVILEGED_PORT_HIGH: u16 = 1023;
/// How many privileged ports to try binding before falling back to an ephemeral one.
pub const PRIVILEGED_PORT_ATTEMPTS: u32 = 16;

/// The RPC authentication credential to attach to every call on a connection.
///
/// `AuthNone` carries no identity and is accepted by most servers only for the
/// NULL procedure and read-only operations. `AuthSys` (`AUTH_SYS`/`AUTH_UNIX`)
/// carries the caller's uid/gid and is what a real mount uses.
#[derive(Clone, Debug, Default)]
pub enum Auth {
    /// No authentication credential.
    #[default]
    None,
    /// UNIX-style credential: uid, gid, and supplementary group IDs.
    Sys {
        /// Name of the client machine, as reported to the server.
        machine_name: String,
        /// Effective user ID of the caller.
        uid: u32,
        /// Effective group ID of the caller.
        gid: u32,
        /// Supplementary group IDs. A single `[0]` is encoded as an empty list,
        /// matching the convention callers of this crate's predecessor relied on.
        aux_gids: Vec<u32>,
    },
}

impl Auth {
    /// Builds the on-wire `auth_unix` body for this credential. Returns `None` for
    /// [`Auth::None`], since that flavor carries no body.
    pub(crate) fn to_auth_unix(&self, stamp: u32) -> Option<auth_unix> {
        match self {
            Auth::None => None,
            Auth::Sys { machine_name, uid, gid, aux_gids } => {
                let gids = if aux_gids == &[0] { Vec::new() } else { aux_gids.clone() };
                Some(auth_unix {
                    stamp,
                    machinename: machine_name.clone().into_bytes(),
                    uid: *uid,
                    gid: *gid,
                    gids,
                })
            }
        }
    }
}

/// Connection parameters shared by [`crate::portmap::Portmap`], [`crate::mount::Mount`]
/// and [`crate::nfs3::Nfs3Client`].
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Read/write timeout applied to the underlying socket.
    pub timeout: Duration,
    /// Authentication credential attached to every call.
    pub auth: Auth,
}

impl ConnectionConfig {
    /// Creates a configuration with [`DEFAULT_TIMEOUT`] and no authentication.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, timeout: DEFAULT_TIMEOUT, auth: Auth::default() }
    }

    /// Sets the socket timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the authentication credential.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }
}
