//! In-process mock RPC server used by the integration tests.
//!
//! Each test spins one of these up on an ephemeral loopback port, points a real
//! client at it, and hands back canned reply bytes - exercising the same Record
//! Marking framing and RPC envelope a real server would produce, without needing
//! a live NFS server for CI.

use std::io::{Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;

use nfs3_client::xdr::rpc::{accept_body, accepted_reply, opaque_auth, reply_body, rpc_body};
use nfs3_client::xdr::{deserialize, Serialize};

const LAST_FRAGMENT: u32 = 0x8000_0000;
const FRAGMENT_LEN_MASK: u32 = 0x7fff_ffff;

/// One recorded call: the raw bytes of the RPC header and argument payload, for
/// tests that want to assert on exactly what went over the wire.
pub struct RecordedCall {
    pub xid: u32,
    pub procedure: u32,
    /// Bytes of the call, from the XID through the end of the argument payload.
    pub raw: Vec<u8>,
    pub args: Vec<u8>,
}

/// A mock server that accepts one connection and answers each call it receives
/// by handing the call to `build_reply` and wrapping the result as an
/// accepted-SUCCESS reply.
pub struct MockServer {
    pub port: u16,
    handle: Option<JoinHandle<Vec<RecordedCall>>>,
}

impl MockServer {
    pub fn start(build_reply: impl Fn(u32, &[u8]) -> Vec<u8> + Send + 'static) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind mock listener");
        let port = listener.local_addr().expect("local addr").port();

        let handle = std::thread::spawn(move || {
            let mut calls = Vec::new();
            let Ok((mut stream, _)) = listener.accept() else { return calls };
            while let Some(message) = read_record(&mut stream) {
                let mut cursor = Cursor::new(message.clone());
                let xid: u32 = deserialize(&mut cursor).expect("xid");
                let body: rpc_body = deserialize(&mut cursor).expect("call body");
                let rpc_body::CALL(call) = body else { break };

                let mut args = Vec::new();
                cursor.read_to_end(&mut args).expect("read args");
                calls.push(RecordedCall { xid, procedure: call.proc, raw: message, args: args.clone() });

                let payload = build_reply(call.proc, &args);

                let mut reply = Vec::new();
                xid.serialize(&mut reply).expect("serialize xid");
                let accepted =
                    accepted_reply { verf: opaque_auth::default(), reply_data: accept_body::SUCCESS };
                rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted))
                    .serialize(&mut reply)
                    .expect("serialize reply header");
                reply.extend_from_slice(&payload);
                write_record(&mut stream, &reply);
            }
            calls
        });

        Self { port, handle: Some(handle) }
    }

    /// Waits for the server thread to finish and returns every call it recorded.
    pub fn join(mut self) -> Vec<RecordedCall> {
        self.handle.take().expect("join called twice").join().expect("mock server panicked")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_record(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut message = Vec::new();
    loop {
        let mut header_bytes = [0u8; 4];
        stream.read_exact(&mut header_bytes).ok()?;
        let header = u32::from_be_bytes(header_bytes);
        let last = header & LAST_FRAGMENT != 0;
        let len = (header & FRAGMENT_LEN_MASK) as usize;

        let start = message.len();
        message.resize(start + len, 0);
        stream.read_exact(&mut message[start..]).ok()?;

        if last {
            return Some(message);
        }
    }
}

fn write_record(stream: &mut TcpStream, payload: &[u8]) {
    let header = LAST_FRAGMENT | (payload.len() as u32 & FRAGMENT_LEN_MASK);
    stream.write_all(&header.to_be_bytes()).expect("write fragment header");
    stream.write_all(payload).expect("write fragment payload");
}
