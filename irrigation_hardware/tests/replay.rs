use irrigation_hardware::{HwError, ReplayConnector, SharedSink};
use irrigation_traits::Connector;
use rstest::rstest;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn sink() -> (Arc<Mutex<Vec<u8>>>, SharedSink) {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let shared: SharedSink = buf.clone();
    (buf, shared)
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(64)]
fn replay_serves_file_in_chunks_then_ends(#[case] chunk: usize) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.txt");
    let payload = b"S1:802.0,S2:822.0,T:21.7,H:69.6,L:202\nS1:500,S2:510,T:20,H:50\n";
    fs::write(&path, payload).unwrap();

    let (_buf, shared) = sink();
    let mut connector = ReplayConnector::new(&path, chunk, shared);
    let mut conn = connector.open().unwrap();

    let mut got = Vec::new();
    let mut buf = [0u8; 32];
    let err = loop {
        match conn.read(&mut buf, Duration::from_millis(10)) {
            Ok(n) => {
                assert!(n <= chunk);
                got.extend_from_slice(&buf[..n]);
            }
            Err(e) => break e,
        }
    };
    assert_eq!(got, payload.to_vec());
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::EndOfStream)
    ));
}

#[test]
fn replay_writes_go_to_sink() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.txt");
    fs::write(&path, b"").unwrap();

    let (buf, shared) = sink();
    let mut connector = ReplayConnector::new(&path, 8, shared);
    let mut conn = connector.open().unwrap();
    conn.write_all(b"CMD:WATER_ON;SEC:0\n").unwrap();
    conn.write_all(b"CMD:WATER_OFF;SEC:0\n").unwrap();

    let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert_eq!(out, "CMD:WATER_ON;SEC:0\nCMD:WATER_OFF;SEC:0\n");
}

#[test]
fn missing_file_fails_open() {
    let dir = tempdir().unwrap();
    let (_buf, shared) = sink();
    let mut connector = ReplayConnector::new(dir.path().join("nope.txt"), 8, shared);
    let err = connector.open().err().expect("open should fail");
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Io(_))));
    assert!(connector.describe().starts_with("replay:"));
}
