//! Output files and the on-disk completion ledger.
//!
//! Row `i` is complete when `<image_dir>/i.png` exists. Images are encoded to
//! `i.png.part` first and renamed into place, so a completed path always holds
//! a whole PNG even if the process is killed mid-write.

use crate::{Result, RunnerError};
use image::{DynamicImage, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// Final path of the image for a row.
pub fn image_path(image_dir: &Path, index: usize) -> PathBuf {
    image_dir.join(format!("{}.png", index))
}

/// Scratch path used while the image for `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    path.with_extension("png.part")
}

/// Check whether a row already has its image.
pub fn is_complete(image_dir: &Path, index: usize) -> bool {
    image_path(image_dir, index).exists()
}

/// Encode `image` as PNG and move it to `path` once fully written.
pub fn save_png_atomic(image: &DynamicImage, path: &Path) -> Result<()> {
    let partial = partial_path(path);

    if let Err(source) = image.save_with_format(&partial, ImageFormat::Png) {
        let _ = fs::remove_file(&partial);
        return Err(RunnerError::Save {
            path: path.to_path_buf(),
            source,
        });
    }

    fs::rename(&partial, path)?;
    Ok(())
}
