//! Client for the PORTMAP version 2 protocol (RFC 1833, previously RFC 1057 Appendix A).
//!
//! PORTMAP always listens on TCP port 111 and lets a client discover which port a
//! given RPC program - typically MOUNT or NFS itself - is currently bound to.

use std::collections::HashSet;
use std::time::Duration;

use num_traits::cast::ToPrimitive;

use crate::config::Auth;
use crate::error::Result;
use crate::protocol::rpc::Connection;
use crate::protocol::xdr::portmap::{
    mapping, pmaplist, PortmapProgram, IPPROTO_TCP, IPPROTO_UDP, PROGRAM, VERSION,
};
use crate::protocol::xdr::{deserialize, Serialize};

/// TCP port the portmapper is conventionally reachable on.
pub const PORTMAP_PORT: u16 = 111;

/// The transport protocol a registered service is reachable over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Transmission Control Protocol
    Tcp,
    /// User Datagram Protocol
    Udp,
    /// Any other IP protocol number, preserved as reported by the server
    Other(u32),
}

impl Protocol {
    fn to_raw(self) -> u32 {
        match self {
            Protocol::Tcp => IPPROTO_TCP,
            Protocol::Udp => IPPROTO_UDP,
            Protocol::Other(raw) => raw,
        }
    }

    fn from_raw(raw: u32) -> Self {
        match raw {
            IPPROTO_TCP => Protocol::Tcp,
            IPPROTO_UDP => Protocol::Udp,
            other => Protocol::Other(other),
        }
    }
}

/// One registered program-to-port mapping, as reported by DUMP.
#[derive(Clone, Copy, Debug)]
pub struct Mapping {
    /// RPC program number
    pub program: u32,
    /// RPC program version
    pub version: u32,
    /// Transport protocol the service listens on
    pub protocol: Protocol,
    /// Port the service is bound to
    pub port: u16,
}

/// A connection to a server's portmapper.
pub struct Portmap {
    conn: Connection,
}

impl Portmap {
    /// Connects to the portmapper on `host` (always TCP port 111).
    pub fn connect(host: &str, timeout: Duration) -> Result<Self> {
        let conn = Connection::connect(host, PORTMAP_PORT, timeout)?;
        Ok(Self { conn })
    }

    /// Closes the connection.
    pub fn disconnect(&mut self) -> Result<()> {
        self.conn.disconnect()
    }

    fn call(&mut self, proc: PortmapProgram, args: &impl Serialize) -> Result<Vec<u8>> {
        let proc = proc.to_u32().expect("portmap procedure fits in u32");
        self.conn.call(PROGRAM, VERSION, proc, &Auth::None, args)
    }

    /// PMAPPROC_NULL: a no-op round trip used to check reachability.
    pub fn null(&mut self) -> Result<()> {
        self.call(PortmapProgram::PMAPPROC_NULL, &())?;
        Ok(())
    }

    /// PMAPPROC_DUMP: lists every program-to-port mapping the server currently holds.
    ///
    /// Duplicate `(program, version, protocol, port)` tuples are suppressed.
    pub fn dump(&mut self) -> Result<Vec<Mapping>> {
        let bytes = self.call(PortmapProgram::PMAPPROC_DUMP, &())?;
        let list: pmaplist = deserialize(&mut &bytes[..])?;

        let mut seen = HashSet::new();
        let mut mappings = Vec::new();
        for m in list.entries {
            if seen.insert((m.prog, m.vers, m.prot, m.port)) {
                mappings.push(Mapping {
                    program: m.prog,
                    version: m.vers,
                    protocol: Protocol::from_raw(m.prot),
                    port: m.port as u16,
                });
            }
        }
        Ok(mappings)
    }

    /// PMAPPROC_GETPORT: looks up the port a program/version is registered on.
    /// A returned port of `0` means the program is not registered.
    pub fn getport(&mut self, program: u32, version: u32, protocol: Protocol) -> Result<u16> {
        let args = mapping { prog: program, vers: version, prot: protocol.to_raw(), port: 0 };
        let bytes = self.call(PortmapProgram::PMAPPROC_GETPORT, &args)?;
        let port: u32 = deserialize(&mut &bytes[..])?;
        Ok(port as u16)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};
    use std::net::{TcpListener, TcpStream};

    use super::*;
    use crate::protocol::xdr::rpc::{accept_body, accepted_reply, opaque_auth, reply_body, rpc_body};

    #[test]
    fn protocol_raw_roundtrip() {
        assert_eq!(Protocol::from_raw(Protocol::Tcp.to_raw()), Protocol::Tcp);
        assert_eq!(Protocol::from_raw(Protocol::Udp.to_raw()), Protocol::Udp);
        assert_eq!(Protocol::from_raw(42), Protocol::Other(42));
    }

    const LAST_FRAGMENT: u32 = 0x8000_0000;

    fn read_record(stream: &mut TcpStream) -> Vec<u8> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).unwrap();
        let header = u32::from_be_bytes(header);
        let mut message = vec![0u8; (header & !LAST_FRAGMENT) as usize];
        stream.read_exact(&mut message).unwrap();
        message
    }

    fn write_record(stream: &mut TcpStream, payload: &[u8]) {
        let header = LAST_FRAGMENT | payload.len() as u32;
        stream.write_all(&header.to_be_bytes()).unwrap();
        stream.write_all(payload).unwrap();
    }

    /// Scenario: a DUMP reply listing `(100003,3,tcp,2049)` and `(100005,3,tcp,892)`
    /// resolves `getport(100005, 3, Tcp)` to 892, and collapses the duplicate
    /// `(100005,3,tcp,892)` entry into a single `Mapping` via `dump()`.
    ///
    /// `Portmap::connect` always targets the well-known port 111, so this drives a
    /// `Connection` at the mock server's ephemeral port directly instead.
    #[test]
    fn dump_and_getport_resolve_registered_ports() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            for _ in 0..2 {
                let message = read_record(&mut stream);
                let mut cursor = Cursor::new(message);
                let xid: u32 = deserialize(&mut cursor).unwrap();
                let body: rpc_body = deserialize(&mut cursor).unwrap();
                let rpc_body::CALL(call) = body else { panic!("expected a call") };

                let mut reply_payload = Vec::new();
                match call.proc {
                    4 => {
                        // PMAPPROC_DUMP
                        pmaplist {
                            entries: vec![
                                mapping { prog: 100003, vers: 3, prot: IPPROTO_TCP, port: 2049 },
                                mapping { prog: 100005, vers: 3, prot: IPPROTO_TCP, port: 892 },
                                mapping { prog: 100005, vers: 3, prot: IPPROTO_TCP, port: 892 },
                            ],
                        }
                        .serialize(&mut reply_payload)
                        .unwrap();
                    }
                    3 => {
                        // PMAPPROC_GETPORT
                        892u32.serialize(&mut reply_payload).unwrap();
                    }
                    other => panic!("unexpected procedure {other}"),
                }

                let mut reply = Vec::new();
                xid.serialize(&mut reply).unwrap();
                let accepted =
                    accepted_reply { verf: opaque_auth::default(), reply_data: accept_body::SUCCESS };
                rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted)).serialize(&mut reply).unwrap();
                reply.extend_from_slice(&reply_payload);
                write_record(&mut stream, &reply);
            }
        });

        let conn = crate::protocol::rpc::Connection::connect(
            "127.0.0.1",
            port,
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let mut client = Portmap { conn };

        let mappings = client.dump().unwrap();
        assert_eq!(mappings.len(), 2);
        assert!(mappings.iter().any(|m| m.program == 100003 && m.port == 2049));
        assert!(mappings.iter().any(|m| m.program == 100005 && m.port == 892));

        let resolved = client.getport(100005, 3, Protocol::Tcp).unwrap();
        assert_eq!(resolved, 892);

        client.disconnect().unwrap();
        server.join().unwrap();
    }
}
