//! Integration tests for the NFSv3 client against an in-process mock server.

mod common;

use std::time::Duration;

use common::MockServer;
use nfs3_client::nfs3::{CreateHow, NfsFh3, NfsResult, Nfs3Client};
use nfs3_client::xdr::nfs3::dir::{entry3, dirlist3, READDIR3resok};
use nfs3_client::xdr::nfs3::file::CREATE3resok;
use nfs3_client::xdr::nfs3::{fattr3, ftype3, nfstime3, nfsstat3, post_op_attr, post_op_fh3, specdata3, wcc_data};
use nfs3_client::xdr::Serialize;
use nfs3_client::Auth;

fn connect(server: &MockServer) -> Nfs3Client {
    Nfs3Client::connect("127.0.0.1", server.port, Duration::from_secs(5), Auth::None).unwrap()
}

#[test]
fn getattr_decodes_every_field_of_a_regular_file() {
    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        fattr3 {
            ftype: ftype3::NF3REG,
            mode: 0o644,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            size: 42,
            used: 4096,
            rdev: specdata3 { specdata1: 0, specdata2: 0 },
            fsid: 1,
            fileid: 7,
            atime: nfstime3 { seconds: 100, nseconds: 0 },
            mtime: nfstime3 { seconds: 100, nseconds: 0 },
            ctime: nfstime3 { seconds: 100, nseconds: 0 },
        }
        .serialize(&mut payload)
        .unwrap();
        payload
    });

    let mut client = connect(&server);
    let handle = NfsFh3::new(vec![0u8; 4]).unwrap();
    let result = client.getattr(&handle).unwrap();

    let NfsResult::Ok(attr) = result else { panic!("expected success") };
    assert!(matches!(attr.ftype, ftype3::NF3REG));
    assert_eq!(attr.mode, 0o644);
    assert_eq!(attr.nlink, 1);
    assert_eq!(attr.uid, 1000);
    assert_eq!(attr.gid, 1000);
    assert_eq!(attr.size, 42);
    assert_eq!(attr.used, 4096);
    assert_eq!(attr.fsid, 1);
    assert_eq!(attr.fileid, 7);
    assert_eq!(attr.atime.seconds, 100);
    assert_eq!(attr.mtime.seconds, 100);
    assert_eq!(attr.ctime.seconds, 100);

    client.disconnect().unwrap();
    server.join();
}

#[test]
fn short_read_reports_eof_then_a_trailing_empty_read() {
    use nfs3_client::xdr::nfs3::file::READ3resok;

    let file = [7u8; 10];
    let server = MockServer::start(move |_proc, args| {
        // offset is the second field of READ3args, a u64 right after the 64-byte
        // padded file handle opaque; easiest to just branch on call order via count.
        let offset_bytes = &args[args.len() - 12..args.len() - 4];
        let offset = u64::from_be_bytes(offset_bytes.try_into().unwrap());

        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        if offset == 0 {
            READ3resok {
                file_attributes: post_op_attr::Void,
                count: file.len() as u32,
                eof: true,
                data: file.to_vec(),
            }
            .serialize(&mut payload)
            .unwrap();
        } else {
            READ3resok { file_attributes: post_op_attr::Void, count: 0, eof: true, data: vec![] }
                .serialize(&mut payload)
                .unwrap();
        }
        payload
    });

    let mut client = connect(&server);
    let handle = NfsFh3::new(vec![1u8; 4]).unwrap();

    let NfsResult::Ok(first) = client.read(&handle, 0, 4096).unwrap() else {
        panic!("expected success")
    };
    assert_eq!(first.count, 10);
    assert!(first.eof);
    assert_eq!(first.data.len(), 10);

    let NfsResult::Ok(second) = client.read(&handle, 10, 4096).unwrap() else {
        panic!("expected success")
    };
    assert_eq!(second.count, 0);
    assert!(second.eof);

    client.disconnect().unwrap();
    server.join();
}

#[test]
fn readdir_cookie_continuation_then_bad_cookie_restart() {
    use nfs3_client::xdr::nfs3::cookieverf3;

    const VERF: cookieverf3 = [1, 2, 3, 4, 5, 6, 7, 8];
    let call_count = std::sync::atomic::AtomicU32::new(0);

    let server = MockServer::start(move |_proc, _args| {
        let n = call_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut payload = Vec::new();
        match n {
            0 => {
                nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
                READDIR3resok {
                    dir_attributes: post_op_attr::Void,
                    cookieverf: VERF,
                    reply: dirlist3 {
                        entries: vec![entry3 { fileid: 1, name: b"a".to_vec(), cookie: 42 }],
                        eof: false,
                    },
                }
                .serialize(&mut payload)
                .unwrap();
            }
            1 => {
                // Second call presented a stale cookieverf; reject it.
                nfsstat3::NFS3ERR_BAD_COOKIE.serialize(&mut payload).unwrap();
                post_op_attr::Void.serialize(&mut payload).unwrap();
            }
            _ => {
                // Restart from cookie 0 succeeds and finishes the listing.
                nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
                READDIR3resok {
                    dir_attributes: post_op_attr::Void,
                    cookieverf: [0; 8],
                    reply: dirlist3 {
                        entries: vec![entry3 { fileid: 1, name: b"a".to_vec(), cookie: 42 }],
                        eof: true,
                    },
                }
                .serialize(&mut payload)
                .unwrap();
            }
        }
        payload
    });

    let mut client = connect(&server);
    let dir = NfsFh3::new(vec![2u8; 4]).unwrap();

    let NfsResult::Ok(first) = client.readdir(&dir, 0, [0; 8], 4096).unwrap() else {
        panic!("expected success")
    };
    assert!(!first.reply.eof);
    assert_eq!(first.reply.entries.last().unwrap().cookie, 42);
    let verifier = first.cookieverf;

    let continued = client.readdir(&dir, 42, verifier, 4096).unwrap();
    assert!(matches!(continued, NfsResult::Err(nfsstat3::NFS3ERR_BAD_COOKIE, _)));

    let NfsResult::Ok(restarted) = client.readdir(&dir, 0, [0; 8], 4096).unwrap() else {
        panic!("expected success")
    };
    assert!(restarted.reply.eof);

    client.disconnect().unwrap();
    server.join();
}

#[test]
fn create_guarded_collision_carries_parent_wcc_data() {
    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        nfsstat3::NFS3ERR_EXIST.serialize(&mut payload).unwrap();
        wcc_data::default().serialize(&mut payload).unwrap();
        payload
    });

    let mut client = connect(&server);
    let dir = NfsFh3::new(vec![3u8; 4]).unwrap();
    let result = client
        .create(&dir, b"existing".to_vec(), CreateHow::Guarded(Default::default()))
        .unwrap();

    assert!(matches!(result, NfsResult::Err(nfsstat3::NFS3ERR_EXIST, _)));

    client.disconnect().unwrap();
    server.join();
}

#[test]
fn create_unchecked_success_returns_new_handle() {
    let server = MockServer::start(|_proc, _args| {
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        CREATE3resok {
            obj: post_op_fh3::handle(nfs3_client::xdr::nfs3::nfs_fh3 { data: vec![9] }),
            obj_attributes: post_op_attr::Void,
            dir_wcc: wcc_data::default(),
        }
        .serialize(&mut payload)
        .unwrap();
        payload
    });

    let mut client = connect(&server);
    let dir = NfsFh3::new(vec![3u8; 4]).unwrap();
    let result = client
        .create(&dir, b"new".to_vec(), CreateHow::Unchecked(Default::default()))
        .unwrap();

    let NfsResult::Ok(ok) = result else { panic!("expected success") };
    assert!(matches!(ok.obj, post_op_fh3::handle(_)));

    client.disconnect().unwrap();
    server.join();
}
