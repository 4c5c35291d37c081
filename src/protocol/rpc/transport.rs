//! Synchronous RPC transport over TCP: connection setup, Record Marking framing
//! (RFC 5531 section 10), and call/reply processing.
//!
//! Unlike a server, which must demultiplex many concurrent connections, a client
//! connection here issues one call at a time and blocks until the matching reply
//! is assembled. There is no command queue, no transaction tracker keyed by a pool
//! of clients, and no async runtime - just a socket, a call counter, and a strict
//! reply validator.

use std::io::{self, Cursor, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use rand::Rng;
use socket2::{Domain, Socket, Type};
use tracing::{debug, trace, warn};

use crate::config::Auth;
use crate::error::{Error, Result};
use crate::protocol::xdr::rpc::{
    accept_body, auth_flavor, call_body, opaque_auth, rejected_reply, reply_body, rpc_body,
};
use crate::protocol::xdr::{deserialize, Serialize};

/// Lowest privileged port this crate will try to bind a client socket to.
pub const PRIVILEGED_PORT_LOW: u16 = 500;
/// Highest privileged port this crate will try to bind a client socket to.
pub const PRIVILEGED_PORT_HIGH: u16 = 1023;
/// How many privileged ports to try binding before falling back to an ephemeral one.
pub const PRIVILEGED_PORT_ATTEMPTS: u32 = 16;

/// Top bit of a record-marking fragment header: set on the final fragment of a message.
const LAST_FRAGMENT: u32 = 0x8000_0000;
/// Mask isolating the 31-bit length field of a record-marking fragment header.
const FRAGMENT_LEN_MASK: u32 = 0x7fff_ffff;
/// Upper bound on a single reassembled RPC message, to bound allocation against a
/// corrupted or hostile fragment length.
const MAX_MESSAGE_LEN: u32 = 64 * 1024 * 1024;

type SharedStream = Arc<Mutex<Option<TcpStream>>>;

static REGISTRY: OnceLock<Mutex<Vec<Weak<Mutex<Option<TcpStream>>>>>> = OnceLock::new();

fn registry() -> &'static Mutex<Vec<Weak<Mutex<Option<TcpStream>>>>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Closes every RPC connection this process currently has open.
///
/// Intended for process-wide cleanup (in particular, to free privileged source
/// ports held by connections the caller may have lost track of) rather than
/// routine use - most applications should `disconnect()` individual clients.
pub fn release_all_rpc() {
    let mut entries = registry().lock().expect("rpc connection registry poisoned");
    for weak in entries.drain(..) {
        let Some(shared) = weak.upgrade() else { continue };
        let mut guard = shared.lock().expect("rpc connection poisoned");
        if let Some(stream) = guard.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

fn bind_and_connect(addr: SocketAddr, timeout: Duration) -> io::Result<(TcpStream, u16)> {
    let mut rng = rand::thread_rng();
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };

    for _ in 0..PRIVILEGED_PORT_ATTEMPTS {
        let port = rng.gen_range(PRIVILEGED_PORT_LOW..=PRIVILEGED_PORT_HIGH);
        let unspecified =
            if addr.is_ipv4() { IpAddr::V4(Ipv4Addr::UNSPECIFIED) } else { IpAddr::V6(Ipv6Addr::UNSPECIFIED) };
        let local = SocketAddr::new(unspecified, port);

        let socket = Socket::new(domain, Type::STREAM, None)?;
        match socket.bind(&local.into()) {
            Ok(()) => {
                socket.set_read_timeout(Some(timeout))?;
                socket.set_write_timeout(Some(timeout))?;
                socket.connect(&addr.into())?;
                return Ok((socket.into(), port));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                trace!(port, "privileged port already in use, retrying with another");
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("not permitted to bind privileged ports, falling back to an ephemeral port");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    socket.connect(&addr.into())?;
    let port = socket.local_addr()?.as_socket().map(|a| a.port()).unwrap_or(0);
    Ok((socket.into(), port))
}

/// One TCP connection carrying ONC RPC calls to a single server.
pub struct Connection {
    shared: SharedStream,
    local_port: u16,
    next_xid: u32,
}

impl Connection {
    /// Opens a TCP connection to `(host, port)`, preferring a privileged local
    /// source port, and registers it so [`release_all_rpc`] can find it later.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Io(io::Error::new(io::ErrorKind::NotFound, "no addresses for host")))?;

        let (stream, local_port) = bind_and_connect(addr, timeout)?;
        debug!(%addr, local_port, "rpc connection established");

        let shared: SharedStream = Arc::new(Mutex::new(Some(stream)));
        registry().lock().expect("rpc connection registry poisoned").push(Arc::downgrade(&shared));

        Ok(Self { shared, local_port, next_xid: rand::thread_rng().gen() })
    }

    /// The local port this connection's socket is bound to.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Closes this connection's socket and frees its local port.
    pub fn disconnect(&mut self) -> Result<()> {
        let mut guard = self.shared.lock().expect("rpc connection poisoned");
        if let Some(stream) = guard.take() {
            stream.shutdown(std::net::Shutdown::Both)?;
            debug!(local_port = self.local_port, "rpc connection closed");
        }
        Ok(())
    }

    fn next_xid(&mut self) -> u32 {
        self.next_xid = self.next_xid.wrapping_add(1);
        self.next_xid
    }

    /// Issues one RPC call and returns the raw bytes of the procedure-specific
    /// reply payload - everything after the standard RPC reply header, which this
    /// function has already validated.
    pub fn call(
        &mut self,
        program: u32,
        version: u32,
        procedure: u32,
        auth: &Auth,
        args: &impl Serialize,
    ) -> Result<Vec<u8>> {
        let xid = self.next_xid();

        let cred = match auth.to_auth_unix(xid) {
            Some(au) => {
                let mut body = Vec::new();
                au.serialize(&mut body)?;
                opaque_auth { flavor: auth_flavor::AUTH_UNIX, body }
            }
            None => opaque_auth::default(),
        };

        let call = call_body {
            rpcvers: 2,
            prog: program,
            vers: version,
            proc: procedure,
            cred,
            verf: opaque_auth::default(),
        };

        let mut message = Vec::new();
        xid.serialize(&mut message)?;
        rpc_body::CALL(call).serialize(&mut message)?;
        args.serialize(&mut message)?;

        trace!(xid, program, version, procedure, len = message.len(), "sending rpc call");

        let mut guard = self.shared.lock().expect("rpc connection poisoned");
        let stream =
            guard.as_mut().ok_or_else(|| Error::Protocol("connection is closed".to_string()))?;
        write_fragment(stream, &message)?;
        let reply = read_message(stream)?;
        drop(guard);

        let mut cursor = Cursor::new(reply);
        let reply_xid: u32 = deserialize(&mut cursor)?;
        if reply_xid != xid {
            return Err(Error::Protocol(format!(
                "reply xid {reply_xid} does not match call xid {xid}"
            )));
        }

        let body: rpc_body = deserialize(&mut cursor)?;
        let reply_body = match body {
            rpc_body::REPLY(r) => r,
            rpc_body::CALL(_) => {
                return Err(Error::Protocol("server sent a CALL instead of a REPLY".to_string()))
            }
        };

        match reply_body {
            reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(m)) => Err(Error::Protocol(
                format!("rpc version mismatch, server supports {}..={}", m.low, m.high),
            )),
            reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(stat)) => {
                Err(Error::Protocol(format!("authentication rejected: {stat:?}")))
            }
            reply_body::MSG_ACCEPTED(accepted) => match accepted.reply_data {
                accept_body::SUCCESS => {
                    let mut rest = Vec::new();
                    cursor.read_to_end(&mut rest)?;
                    Ok(rest)
                }
                accept_body::PROG_UNAVAIL => {
                    Err(Error::Protocol(format!("program {program} is not available")))
                }
                accept_body::PROG_MISMATCH(m) => Err(Error::Protocol(format!(
                    "program {program} version {version} unsupported, server supports {}..={}",
                    m.low, m.high
                ))),
                accept_body::PROC_UNAVAIL => {
                    Err(Error::Protocol(format!("procedure {procedure} is not available")))
                }
                accept_body::GARBAGE_ARGS => {
                    Err(Error::Protocol("server could not decode call arguments".to_string()))
                }
            },
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

/// Writes `payload` as a single Record Marking fragment with the last-fragment bit set.
pub(crate) fn write_fragment(dest: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    assert!(payload.len() as u64 <= FRAGMENT_LEN_MASK as u64);
    let header = LAST_FRAGMENT | (payload.len() as u32 & FRAGMENT_LEN_MASK);
    dest.write_all(&header.to_be_bytes())?;
    dest.write_all(payload)
}

/// Reads one complete RPC message, reassembling however many Record Marking
/// fragments the server split it into.
///
/// Each fragment's payload is read in exactly the number of bytes its own header
/// declares; the next fragment's header is always read fresh, rather than folded
/// into the remaining-bytes arithmetic of the prior read.
pub(crate) fn read_message(src: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut message = Vec::new();
    loop {
        let mut header_bytes = [0u8; 4];
        src.read_exact(&mut header_bytes)?;
        let header = u32::from_be_bytes(header_bytes);
        let last = header & LAST_FRAGMENT != 0;
        let len = header & FRAGMENT_LEN_MASK;

        if message.len() as u64 + len as u64 > MAX_MESSAGE_LEN as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("rpc message exceeds maximum size of {MAX_MESSAGE_LEN} bytes"),
            ));
        }

        let start = message.len();
        message.resize(start + len as usize, 0);
        src.read_exact(&mut message[start..])?;
        trace!(len, last, "received rpc fragment");

        if last {
            return Ok(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_roundtrip() {
        let mut buf = Vec::new();
        write_fragment(&mut buf, b"hello").unwrap();
        assert_eq!(&buf[0..4], &(LAST_FRAGMENT | 5).to_be_bytes());
        let msg = read_message(&mut &buf[..]).unwrap();
        assert_eq!(msg, b"hello");
    }

    #[test]
    fn multi_fragment_reassembly_matches_single_fragment() {
        let mut split = Vec::new();
        let header_a = (5u32) & FRAGMENT_LEN_MASK;
        split.extend_from_slice(&header_a.to_be_bytes());
        split.extend_from_slice(b"hello");
        let header_b = LAST_FRAGMENT | 6;
        split.extend_from_slice(&header_b.to_be_bytes());
        split.extend_from_slice(b" world");

        let msg = read_message(&mut &split[..]).unwrap();
        assert_eq!(msg, b"hello world");

        let mut single = Vec::new();
        write_fragment(&mut single, b"hello world").unwrap();
        let msg2 = read_message(&mut &single[..]).unwrap();
        assert_eq!(msg, msg2);
    }
}
