//! Integration tests asserting on the exact bytes the RPC transport puts on the
//! wire for the call header and the two built-in auth flavors.

mod common;

use std::time::Duration;

use common::MockServer;
use nfs3_client::nfs3::Nfs3Client;
use nfs3_client::xdr::deserialize;
use nfs3_client::xdr::rpc::auth_unix;
use nfs3_client::Auth;

#[test]
fn call_header_bytes_match_xid_zero_two_prog_vers_proc() {
    let server = MockServer::start(|_proc, _args| Vec::new());

    let mut client =
        Nfs3Client::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    client.null().unwrap();
    client.disconnect().unwrap();

    let calls = server.join();
    assert_eq!(calls.len(), 1);
    let raw = &calls[0].raw;

    let xid = u32::from_be_bytes(raw[0..4].try_into().unwrap());
    assert_eq!(xid, calls[0].xid);
    assert_eq!(&raw[4..8], &0u32.to_be_bytes(), "msg_type must be CALL (0)");
    assert_eq!(&raw[8..12], &2u32.to_be_bytes(), "rpcvers must be 2");
    assert_eq!(&raw[12..16], &nfs3_client::protocol::xdr::nfs3::PROGRAM.to_be_bytes());
    assert_eq!(&raw[16..20], &nfs3_client::protocol::xdr::nfs3::VERSION.to_be_bytes());
    assert_eq!(&raw[20..24], &0u32.to_be_bytes(), "NFSPROC3_NULL is procedure 0");
}

#[test]
fn auth_none_encodes_as_four_zero_words() {
    let server = MockServer::start(|_proc, _args| Vec::new());

    let mut client =
        Nfs3Client::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    client.null().unwrap();
    client.disconnect().unwrap();

    let calls = server.join();
    let raw = &calls[0].raw;
    // Bytes 24.. are the credential (flavor, length) then the verifier (flavor, length).
    assert_eq!(&raw[24..40], &[0u8; 16]);
}

#[test]
fn auth_sys_with_single_zero_aux_gid_encodes_an_empty_gids_array() {
    let server = MockServer::start(|_proc, _args| Vec::new());

    let auth = Auth::Sys {
        machine_name: "client".to_string(),
        uid: 1000,
        gid: 1000,
        aux_gids: vec![0],
    };
    let mut client =
        Nfs3Client::connect("127.0.0.1", server.port, Duration::from_secs(5), auth).unwrap();
    client.null().unwrap();
    client.disconnect().unwrap();

    let calls = server.join();
    let raw = &calls[0].raw;

    // Skip the 24-byte call header, then flavor(4) + length(4) of the credential.
    let cred_flavor = u32::from_be_bytes(raw[24..28].try_into().unwrap());
    assert_eq!(cred_flavor, 1, "AUTH_UNIX flavor");
    let cred_len = u32::from_be_bytes(raw[28..32].try_into().unwrap()) as usize;
    let body = &raw[32..32 + cred_len];

    let decoded: auth_unix = deserialize(&mut &body[..]).unwrap();
    assert!(decoded.gids.is_empty());
}
