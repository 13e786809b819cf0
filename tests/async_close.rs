mod common;

use log::debug;

use common::{spawn_relay, wait_online, TestClient};
use wsrelay::frame::OpCode;

#[tokio::test]
async fn close_frame_is_accepted_and_answered() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (addr, registry) = spawn_relay().await;

    let mut a = TestClient::connect(&addr).await;
    wait_online(&registry, 1).await;

    // code 1000, reason "bye"
    let mut payload = 1000u16.to_be_bytes().to_vec();
    payload.extend_from_slice(b"bye");
    debug!("client a: close..");
    a.send(OpCode::Close, &payload).await;

    // the relay answers with a normal close, then hangs up
    let (opcode, payload) = a.recv().await;
    assert_eq!(opcode, OpCode::Close as u8);
    assert_eq!(payload, 1000u16.to_be_bytes());
    assert!(a.closed().await);

    wait_online(&registry, 0).await;
}

#[tokio::test]
async fn unmasked_frame_is_rejected_with_1002() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (addr, registry) = spawn_relay().await;

    let mut a = TestClient::connect(&addr).await;
    wait_online(&registry, 1).await;

    // text frame without the mask bit; the decoder still consumes
    // four key bytes, so pad them in
    let mut bytes = vec![0x81, 0x05, 0, 0, 0, 0];
    bytes.extend_from_slice(b"hello");
    a.send_raw(&bytes).await;

    let (opcode, payload) = a.recv().await;
    assert_eq!(opcode, OpCode::Close as u8);
    assert_eq!(payload, 1002u16.to_be_bytes());
    assert!(a.closed().await);

    wait_online(&registry, 0).await;
}

#[tokio::test]
async fn bad_close_code_is_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (addr, registry) = spawn_relay().await;

    let mut a = TestClient::connect(&addr).await;
    wait_online(&registry, 1).await;

    // 1004 sits below 3000 and is not on the recognized list
    a.send(OpCode::Close, &1004u16.to_be_bytes()).await;

    let (opcode, payload) = a.recv().await;
    assert_eq!(opcode, OpCode::Close as u8);
    assert_eq!(payload, 1002u16.to_be_bytes());
    assert!(a.closed().await);
}

#[tokio::test]
async fn violation_does_not_disturb_other_peers() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (addr, registry) = spawn_relay().await;

    let mut a = TestClient::connect(&addr).await;
    wait_online(&registry, 1).await;
    let mut b = TestClient::connect(&addr).await;
    wait_online(&registry, 2).await;

    // a reserved opcode takes down only its sender
    a.send(OpCode::Text, b"first").await;
    let (_, payload) = b.recv().await;
    assert_eq!(payload, b"Socket 1: first");

    // opcode 0x3, masked, zero length
    a.send_raw(&[0x83, 0x80, 0, 0, 0, 0]).await;

    let (opcode, _) = a.recv().await;
    assert_eq!(opcode, OpCode::Close as u8);
    assert!(a.closed().await);
    wait_online(&registry, 1).await;

    // b never saw the bad frame and still has a live session
    b.send_text("EXIT").await;
    assert!(b.closed().await);
}
