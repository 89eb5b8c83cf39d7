//! STL reading — binary and ASCII, detected from content.
//!
//! Binary STL: 80-byte header, little-endian u32 triangle count, then 50
//! bytes per triangle (normal, three vertices, attribute count). A file is
//! treated as binary exactly when its length matches that formula; the
//! header text is not trusted, since binary exporters routinely start their
//! header with "solid" too.

use std::collections::HashSet;
use std::path::Path;

use crate::MeshError;

/// One vertex as x, y, z.
pub type Vertex = [f32; 3];

const BINARY_HEADER_LEN: usize = 80;
const BINARY_TRIANGLE_LEN: usize = 50;

/// Read the vertex list of an STL file, collapsing exact duplicates in
/// first-seen order.
pub fn read_vertices(path: &Path) -> Result<Vec<Vertex>, MeshError> {
    let data = std::fs::read(path)?;

    let raw = if binary_length_matches(&data) {
        parse_binary(&data)?
    } else {
        parse_ascii(&data)?
    };

    // Dedup on exact bit patterns so -0.0 and 0.0 stay distinct entries
    // only if the file really contains both.
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(raw.len());
    let mut vertices = Vec::with_capacity(raw.len());
    for v in raw {
        let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
        if seen.insert(key) {
            vertices.push(v);
        }
    }
    Ok(vertices)
}

fn binary_length_matches(data: &[u8]) -> bool {
    if data.len() < BINARY_HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    data.len() == BINARY_HEADER_LEN + 4 + count * BINARY_TRIANGLE_LEN
}

fn parse_binary(data: &[u8]) -> Result<Vec<Vertex>, MeshError> {
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let expected = BINARY_HEADER_LEN + 4 + count * BINARY_TRIANGLE_LEN;
    if data.len() < expected {
        return Err(MeshError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let mut vertices = Vec::with_capacity(count * 3);
    for i in 0..count {
        // 12 bytes of normal first, then the three vertices.
        let triangle = &data[BINARY_HEADER_LEN + 4 + i * BINARY_TRIANGLE_LEN..];
        for v in 0..3 {
            let at = 12 + v * 12;
            vertices.push([
                f32_le(triangle, at),
                f32_le(triangle, at + 4),
                f32_le(triangle, at + 8),
            ]);
        }
    }
    Ok(vertices)
}

fn f32_le(data: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn parse_ascii(data: &[u8]) -> Result<Vec<Vertex>, MeshError> {
    let text = std::str::from_utf8(data).map_err(|_| MeshError::NotStl)?;
    if !text.trim_start().starts_with("solid") {
        return Err(MeshError::NotStl);
    }

    let mut vertices = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if let Some(coords) = line.strip_prefix("vertex") {
            let mut parts = coords.split_whitespace();
            let mut vertex = [0f32; 3];
            for axis in &mut vertex {
                *axis = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or(MeshError::InvalidVertex { line: i + 1 })?;
            }
            vertices.push(vertex);
        }
    }
    Ok(vertices)
}
