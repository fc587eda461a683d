//! I/O helpers for detector frames and JSON reports.
//!
//! - `load_grayscale_f64`: read a TIFF/PNG frame into an owned `f64` image,
//!   keeping the full 16-bit dynamic range.
//! - `save_grayscale_f64`: write a map to an 8-bit PNG, linearly stretched
//!   over its finite range (quick-look output only).
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageF64, ImageView};
use crate::error::{Error, Result};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert it to 16-bit grayscale samples.
pub fn load_grayscale_f64(path: &Path) -> Result<ImageF64> {
    let img = image::open(path)
        .map_err(|e| Error::Io(format!("Failed to open {}: {e}", path.display())))?
        .into_luma16();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.into_raw().into_iter().map(f64::from).collect();
    ImageF64::from_vec(width, height, data)
}

/// Save a real map to a grayscale PNG; non-finite pixels are written black.
pub fn save_grayscale_f64(image: &ImageF64, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let (lo, hi) = image
        .as_slice()
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for (y, row) in image.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = if px.is_finite() {
                ((px - lo) / span * 255.0).clamp(0.0, 255.0)
            } else {
                0.0
            };
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| Error::Io(format!("Failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        Error::Io(format!("Failed to serialize JSON for {}: {e}", path.display()))
    })?;
    fs::write(path, json)
        .map_err(|e| Error::Io(format!("Failed to write JSON {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Io(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
    }
    Ok(())
}
