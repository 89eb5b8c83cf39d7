use std::time::Duration;

use ferry_channel::{DealerChannel, RouterChannel};
use ferry_core::Command;
use ferryd::Requester;
use reqwest::StatusCode;

use crate::*;

#[tokio::test]
async fn empty_filename_upload_is_rejected_and_stores_nothing() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let part = reqwest::multipart::Part::bytes(b"content".to_vec()).file_name("");
    let form = reqwest::multipart::Form::new().part("upload_file", part);
    let response = reqwest::Client::new()
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "No file selected");
    assert_eq!(std::fs::read_dir(store.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn disallowed_extension_is_rejected() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let part = reqwest::multipart::Part::bytes(b"MZ".to_vec()).file_name("payload.exe");
    let form = reqwest::multipart::Form::new().part("upload_file", part);
    let response = reqwest::Client::new()
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(store.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_of_unknown_file_is_not_found() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let response = reqwest::get(format!("{base_url}/download/nope.stl"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let dest = store.path().join("nope.stl");
    let err = ferry_relay::client::download_to(&base_url, "nope.stl", &dest)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nope.stl"));
}

/// A registrar that accepts the connection but never confirms it exhausts
/// the handshake budget and the requester reports a fatal error.
#[tokio::test]
async fn silent_registrar_exhausts_handshake_budget() {
    let mut router = RouterChannel::bind("127.0.0.1:0").await.unwrap();
    let addr = router.local_addr().to_string();

    let dir = tempfile::tempdir().unwrap();
    let dealer = DealerChannel::connect(&addr).await.unwrap();
    let mut requester = Requester::new(
        dealer,
        dir.path().to_path_buf(),
        "http://127.0.0.1:1".to_string(),
        1024,
        4,
    )
    .unwrap();

    let err = requester
        .handshake(2, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not established"));

    // Both budgeted sends reached the router.
    for _ in 0..2 {
        let (_, frames) = router
            .recv_timeout(Duration::from_millis(500))
            .await
            .unwrap()
            .expect("connect should have arrived");
        assert!(matches!(
            Command::from_frames(&frames),
            Ok(Command::Connect)
        ));
    }
}

/// When the registrar goes away mid-session the requester's blocking
/// receive surfaces the closed channel instead of hanging.
#[tokio::test]
async fn requester_observes_channel_teardown() {
    let mut router = RouterChannel::bind("127.0.0.1:0").await.unwrap();
    let addr = router.local_addr().to_string();

    let mut dealer = DealerChannel::connect(&addr).await.unwrap();
    dealer.send(&Command::Connect.to_frames()).await.unwrap();
    let (peer, _) = router.recv().await.unwrap();
    router
        .send_to(peer, Command::Established.to_frames())
        .unwrap();
    assert!(matches!(
        Command::from_frames(&dealer.recv().await.unwrap()),
        Ok(Command::Established)
    ));

    drop(router);

    let err = dealer.recv().await.unwrap_err();
    assert!(matches!(err, ferry_channel::ChannelError::Closed));
}
