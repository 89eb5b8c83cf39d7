//! ferry-mesh — STL mesh reading and the vertex-list → CSV conversion.
//!
//! The requester runs this on pulled `.stl` files: the mesh's vertex list
//! (exact duplicates collapsed, first-seen order) is written as one
//! `x,y,z` row per vertex, each coordinate rounded to 4 decimal places.

pub mod stl;

use std::path::Path;

pub use stl::{read_vertices, Vertex};

/// Default name for the derived CSV artifact.
pub const DEFAULT_CSV_NAME: &str = "output.csv";

/// Errors that can arise reading a mesh or writing its conversion.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an STL file")]
    NotStl,

    #[error("binary STL truncated: expected {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("malformed vertex on line {line}")]
    InvalidVertex { line: usize },
}

/// Convert an STL file to a CSV of vertex rows. Returns the file name of
/// the written artifact.
pub fn convert_to_csv(input: &Path, output: &Path) -> Result<String, MeshError> {
    let vertices = read_vertices(input)?;

    let mut rows = String::with_capacity(vertices.len() * 24);
    for v in &vertices {
        rows.push_str(&format!("{:.4},{:.4},{:.4}\n", v[0], v[1], v[2]));
    }
    std::fs::write(output, rows)?;

    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_CSV_NAME)
        .to_string();

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        vertices = vertices.len(),
        "mesh converted to CSV"
    );
    Ok(name)
}
