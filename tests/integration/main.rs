//! Ferry integration test harness.
//!
//! Tests here wire real components together on loopback: a router channel
//! bound to an ephemeral port, an in-process relay on an ephemeral port,
//! and the two role loops as spawned tasks. No configuration files or
//! fixed ports are touched, so tests can run in parallel.
//!
//! Each test owns its temp directories and any tasks it spawns.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ferry_relay::RelayState;

mod failures;
mod relay;
mod transfer;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Start an in-process relay over `store_dir` on an ephemeral port.
/// Returns the base URL. The serve task lives until the runtime drops.
pub async fn spawn_relay(store_dir: &Path) -> String {
    std::fs::create_dir_all(store_dir).unwrap();
    let state = RelayState {
        store_dir: store_dir.to_path_buf(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, ferry_relay::server::router(state))
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

/// Poll until `path` exists and its size has stopped changing, or panic
/// after `timeout`. Returns the file's contents.
pub async fn wait_for_file(path: &Path, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut last_len: Option<u64> = None;
    loop {
        if let Ok(meta) = std::fs::metadata(path) {
            if last_len == Some(meta.len()) {
                return std::fs::read(path).unwrap();
            }
            last_len = Some(meta.len());
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", path.display());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// A minimal binary STL: 80-byte header, triangle count, then per triangle
/// a normal, three vertices, and an attribute word.
pub fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut out = vec![0u8; 80];
    out.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for tri in triangles {
        out.extend_from_slice(&[0u8; 12]); // normal, ignored
        for vertex in tri {
            for coord in vertex {
                out.extend_from_slice(&coord.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Temp directory set shared by the transfer scenarios.
pub struct Dirs {
    _root: tempfile::TempDir,
    pub send: PathBuf,
    pub requester_save: PathBuf,
    pub registrar_save: PathBuf,
    pub relay_store: PathBuf,
}

impl Dirs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let base = root.path();
        let dirs = Self {
            send: base.join("send"),
            requester_save: base.join("requester-save"),
            registrar_save: base.join("registrar-save"),
            relay_store: base.join("relay-store"),
            _root: root,
        };
        for d in [
            &dirs.send,
            &dirs.requester_save,
            &dirs.registrar_save,
            &dirs.relay_store,
        ] {
            std::fs::create_dir_all(d).unwrap();
        }
        dirs
    }
}
