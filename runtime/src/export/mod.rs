//! Persistence and rendering of pipeline output.

pub mod csv;
pub mod html;

use crate::error::Result;
use crate::model::ReducedMarkerSet;
use std::path::Path;
use tracing::info;

/// Render the marker set and write it to `path`.
pub fn write_map(
    path: &Path,
    markers: &ReducedMarkerSet,
    attribute_keys: &[&str],
    title: &str,
) -> Result<()> {
    let html = html::render_map(markers, attribute_keys, title)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    info!("map saved to {}", path.display());
    Ok(())
}
