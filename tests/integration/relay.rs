use std::time::Duration;

use crate::*;

#[tokio::test]
async fn upload_then_download_round_trips() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let src = tempfile::tempdir().unwrap();
    let path = src.path().join("points.csv");
    let content = b"1.0000,2.0000,3.0000\n4.0000,5.0000,6.0000\n";
    std::fs::write(&path, content).unwrap();

    ferry_relay::client::upload(&base_url, &path).await.unwrap();

    let dest = src.path().join("fetched.csv");
    ferry_relay::client::download_to(&base_url, "points.csv", &dest)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), content);
}

#[tokio::test]
async fn uploaded_name_is_sanitized_in_the_store() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let part = reqwest::multipart::Part::bytes(b"solid".to_vec()).file_name("../../escape.stl");
    let form = reqwest::multipart::Form::new().part("upload_file", part);
    let response = reqwest::Client::new()
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Stored under the final path component only.
    assert!(store.path().join("escape.stl").exists());
    assert!(!store.path().parent().unwrap().join("escape.stl").exists());
}

#[tokio::test]
async fn root_endpoint_answers() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let body = reqwest::get(base_url).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ferry relay");
}

#[tokio::test]
async fn large_upload_is_accepted() {
    let store = tempfile::tempdir().unwrap();
    let base_url = spawn_relay(store.path()).await;

    let src = tempfile::tempdir().unwrap();
    let path = src.path().join("big.txt");
    let content: Vec<u8> = (0..2_000_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    ferry_relay::client::upload(&base_url, &path).await.unwrap();

    let stored = wait_for_file(&store.path().join("big.txt"), Duration::from_secs(5)).await;
    assert_eq!(stored, content);
}
