//! Integration tests for the MOUNT client against an in-process mock server.

mod common;

use std::time::Duration;

use common::MockServer;
use nfs3_client::mount::Mount;
use nfs3_client::xdr::mount::{exportnode, exports3, mountres3, mountres3_ok};
use nfs3_client::xdr::Serialize;
use nfs3_client::{Auth, Error};

#[test]
fn mnt_reply_decodes_into_mount_info() {
    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        mountres3::Ok(mountres3_ok { fhandle: vec![0x01, 0x02, 0x03], auth_flavors: vec![1] })
            .serialize(&mut payload)
            .unwrap();
        payload
    });

    let mut mount =
        Mount::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    let info = mount.mnt(b"/export".to_vec()).unwrap();

    assert_eq!(info.file_handle.as_bytes(), &[0x01, 0x02, 0x03]);
    assert_eq!(info.auth_flavors, vec![1]);

    mount.disconnect().unwrap();
    server.join();
}

#[test]
fn mnt_error_status_surfaces_as_protocol_error() {
    use nfs3_client::xdr::mount::mountstat3;

    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        mountres3::Err(mountstat3::MNT3ERR_ACCES).serialize(&mut payload).unwrap();
        payload
    });

    let mut mount =
        Mount::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    let err = mount.mnt(b"/export".to_vec()).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));

    mount.disconnect().unwrap();
    server.join();
}

#[test]
fn umnt_without_prior_mnt_never_touches_the_network() {
    let server = MockServer::start(|_proc, _args| unreachable!("no call should reach the server"));

    let mut mount =
        Mount::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    let err = mount.umnt().unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    mount.disconnect().unwrap();
    let calls = server.join();
    assert!(calls.is_empty());
}

#[test]
fn mnt_then_umnt_round_trip_on_the_same_connection() {
    let server = MockServer::start(|proc, _args| {
        let mut payload = Vec::new();
        if proc == 1 {
            // MOUNTPROC3_MNT
            mountres3::Ok(mountres3_ok { fhandle: vec![0xAA], auth_flavors: vec![] })
                .serialize(&mut payload)
                .unwrap();
        }
        payload
    });

    let mut mount =
        Mount::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    mount.mnt(b"/export".to_vec()).unwrap();
    mount.umnt().unwrap();

    mount.disconnect().unwrap();
    let calls = server.join();
    assert_eq!(calls.len(), 2);
}

#[test]
fn export_list_decodes_every_node_and_its_groups() {
    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        exports3 {
            nodes: vec![
                exportnode { dir: b"/srv/a".to_vec(), groups: vec![b"admins".to_vec()] },
                exportnode { dir: b"/srv/b".to_vec(), groups: vec![] },
            ],
        }
        .serialize(&mut payload)
        .unwrap();
        payload
    });

    let mut mount =
        Mount::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap();
    let nodes = mount.export().unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].dir, b"/srv/a");
    assert_eq!(nodes[0].groups, vec![b"admins".to_vec()]);
    assert_eq!(nodes[1].dir, b"/srv/b");
    assert!(nodes[1].groups.is_empty());

    mount.disconnect().unwrap();
    server.join();
}
