use std::time::Duration;

use ferry_channel::{DealerChannel, RouterChannel};
use ferryd::{Registrar, Requester};

use crate::*;

const TIMEOUT: Duration = Duration::from_secs(10);

/// The whole pipeline on loopback: a file appears in the watched directory
/// *before* any peer has connected, so it must be queued and announced once
/// the handshake completes. The requester's copy must be byte-identical,
/// the derived CSV must carry 4-decimal vertex rows, and the registrar must
/// end up with both artifacts — the STL under its canonical output name.
#[tokio::test]
async fn full_pipeline_file_before_identity() {
    let dirs = Dirs::new();
    let relay_url = spawn_relay(&dirs.relay_store).await;

    let router = RouterChannel::bind("127.0.0.1:0").await.unwrap();
    let channel_addr = router.local_addr().to_string();
    let registrar = Registrar::new(
        router,
        dirs.send.clone(),
        dirs.registrar_save.clone(),
        relay_url.clone(),
        Duration::from_millis(50),
    )
    .unwrap();
    let registrar_task = tokio::spawn(registrar.run());

    // File lands while no identity is known.
    let stl = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
    std::fs::write(dirs.send.join("part.stl"), &stl).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Small chunk so the pull takes several round trips.
    let dealer = DealerChannel::connect(&channel_addr).await.unwrap();
    let mut requester = Requester::new(
        dealer,
        dirs.requester_save.clone(),
        relay_url,
        64,
        4,
    )
    .unwrap();
    requester
        .handshake(10, Duration::from_secs(2))
        .await
        .unwrap();
    let requester_task = tokio::spawn(requester.run());

    // The registrar's CSV fetch is the last step of the chain.
    let registrar_csv = wait_for_file(&dirs.registrar_save.join("output.csv"), TIMEOUT).await;

    let copy = std::fs::read(dirs.requester_save.join("part.stl")).unwrap();
    assert_eq!(copy, stl, "pulled copy must be byte-identical");

    let expected_csv = "0.0000,0.0000,0.0000\n1.0000,0.0000,0.0000\n0.0000,1.0000,0.0000\n";
    let requester_csv = std::fs::read(dirs.requester_save.join("output.csv")).unwrap();
    assert_eq!(requester_csv, expected_csv.as_bytes());
    assert_eq!(registrar_csv, expected_csv.as_bytes());

    // Both artifacts passed through the relay store under their own names.
    assert_eq!(std::fs::read(dirs.relay_store.join("part.stl")).unwrap(), stl);
    assert_eq!(
        std::fs::read(dirs.relay_store.join("output.csv")).unwrap(),
        expected_csv.as_bytes()
    );

    // The STL landed under the canonical output name, byte-identical.
    let artifact = std::fs::read(dirs.registrar_save.join("output.stl")).unwrap();
    assert_eq!(artifact, stl);

    registrar_task.abort();
    requester_task.abort();
}

/// A non-STL file skips conversion: one upload, one download trigger.
#[tokio::test]
async fn text_file_transfers_without_conversion() {
    let dirs = Dirs::new();
    let relay_url = spawn_relay(&dirs.relay_store).await;

    let router = RouterChannel::bind("127.0.0.1:0").await.unwrap();
    let channel_addr = router.local_addr().to_string();
    let registrar = Registrar::new(
        router,
        dirs.send.clone(),
        dirs.registrar_save.clone(),
        relay_url.clone(),
        Duration::from_millis(50),
    )
    .unwrap();
    let registrar_task = tokio::spawn(registrar.run());

    let dealer = DealerChannel::connect(&channel_addr).await.unwrap();
    let mut requester = Requester::new(
        dealer,
        dirs.requester_save.clone(),
        relay_url,
        64,
        4,
    )
    .unwrap();
    requester
        .handshake(10, Duration::from_secs(2))
        .await
        .unwrap();
    let requester_task = tokio::spawn(requester.run());

    // This time the file appears after the identity is established.
    let content: Vec<u8> = (0..1000u32).flat_map(|i| i.to_le_bytes()).collect();
    std::fs::write(dirs.send.join("notes.txt"), &content).unwrap();

    let artifact = wait_for_file(&dirs.registrar_save.join("notes.txt"), TIMEOUT).await;
    assert_eq!(artifact, content);

    let copy = std::fs::read(dirs.requester_save.join("notes.txt")).unwrap();
    assert_eq!(copy, content);
    assert!(
        !dirs.requester_save.join("output.csv").exists(),
        "no conversion expected for txt"
    );
    assert!(!dirs.registrar_save.join("output.stl").exists());

    registrar_task.abort();
    requester_task.abort();
}

/// Two files queued before any identity are announced in order and both
/// arrive intact; the second STL keeps its own name at the registrar
/// because the canonical output name is already taken by the first.
#[tokio::test]
async fn queued_files_are_served_in_arrival_order() {
    let dirs = Dirs::new();
    let relay_url = spawn_relay(&dirs.relay_store).await;

    let router = RouterChannel::bind("127.0.0.1:0").await.unwrap();
    let channel_addr = router.local_addr().to_string();
    let registrar = Registrar::new(
        router,
        dirs.send.clone(),
        dirs.registrar_save.clone(),
        relay_url.clone(),
        Duration::from_millis(50),
    )
    .unwrap();
    let registrar_task = tokio::spawn(registrar.run());

    let first = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]]);
    let second = binary_stl(&[[[5.0, 5.0, 5.0], [6.0, 6.0, 6.0], [7.0, 7.0, 7.0]]]);
    std::fs::write(dirs.send.join("a-first.stl"), &first).unwrap();
    std::fs::write(dirs.send.join("b-second.stl"), &second).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let dealer = DealerChannel::connect(&channel_addr).await.unwrap();
    let mut requester = Requester::new(
        dealer,
        dirs.requester_save.clone(),
        relay_url,
        64,
        4,
    )
    .unwrap();
    requester
        .handshake(10, Duration::from_secs(2))
        .await
        .unwrap();
    let requester_task = tokio::spawn(requester.run());

    let named = wait_for_file(&dirs.registrar_save.join("b-second.stl"), TIMEOUT).await;

    // First STL claimed the canonical name; the second kept its own.
    let canonical = std::fs::read(dirs.registrar_save.join("output.stl")).unwrap();
    assert_eq!(canonical, first);
    assert_eq!(named, second);

    registrar_task.abort();
    requester_task.abort();
}
