// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Decode, optionally shrink, and re-encode images as JPEG

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::Result;

const PARTIAL_EXTENSION: &str = "partial";

/// Re-encode `source` as JPEG at `target`.
///
/// When `max_edge` is given and the longer side of the source exceeds it, the
/// image is scaled down (aspect ratio kept) so the longer side equals `max_edge`.
/// `source` and `target` may be the same file. The JPEG is written to a
/// `.partial` sibling and renamed over `target`, so a failed encode leaves
/// `target` untouched.
pub fn transcode(source: &Path, target: &Path, max_edge: Option<u32>, quality: u8) -> Result<()> {
    let img = image::open(source)?;
    let (width, height) = img.dimensions();

    let img = match max_edge {
        Some(edge) if width.max(height) > edge => {
            debug!("Resizing {:?} from {}x{} to fit {}px", source, width, height, edge);
            img.resize(edge, edge, FilterType::Lanczos3)
        }
        _ => img,
    };

    let partial = target.with_extension(PARTIAL_EXTENSION);
    let written = encode_jpeg(&img.to_rgb8(), &partial, quality)
        .and_then(|()| fs::rename(&partial, target).map_err(Into::into));
    if written.is_err() {
        let _ = fs::remove_file(&partial);
    }
    written
}

fn encode_jpeg(rgb: &RgbImage, target: &Path, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(target)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};

    #[test]
    fn test_shrinks_long_edge() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wide.png");
        RgbImage::new(200, 50).save(&src).unwrap();
        let dst = dir.path().join("wide.jpg");

        transcode(&src, &dst, Some(100), 90).unwrap();

        let out = image::open(&dst).unwrap();
        assert_eq!(out.dimensions(), (100, 25));
        assert_eq!(ImageFormat::from_path(&dst).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_small_image_not_enlarged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("small.png");
        RgbaImage::new(40, 30).save(&src).unwrap();
        let dst = dir.path().join("small.jpg");

        transcode(&src, &dst, Some(100), 90).unwrap();
        assert_eq!(image::open(&dst).unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn test_no_limit_keeps_size() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("big.png");
        RgbImage::new(300, 120).save(&src).unwrap();
        let dst = dir.path().join("big.jpg");

        transcode(&src, &dst, None, 90).unwrap();
        assert_eq!(image::open(&dst).unwrap().dimensions(), (300, 120));
    }

    #[test]
    fn test_undecodable_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.png");
        std::fs::write(&src, b"not an image").unwrap();
        let dst = dir.path().join("broken.jpg");

        assert!(transcode(&src, &dst, None, 90).is_err());
        assert!(!dst.exists());
        assert!(!dst.with_extension(PARTIAL_EXTENSION).exists());
    }

    #[test]
    fn test_in_place_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        RgbImage::new(120, 60).save(&path).unwrap();

        transcode(&path, &path, Some(60), 90).unwrap();
        assert_eq!(image::open(&path).unwrap().dimensions(), (60, 30));
        assert!(!path.with_extension(PARTIAL_EXTENSION).exists());
    }

    #[test]
    fn test_failed_in_place_write_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        RgbImage::new(120, 60).save(&path).unwrap();
        // A directory in the way makes the intermediate file impossible to create
        std::fs::create_dir(path.with_extension(PARTIAL_EXTENSION)).unwrap();

        assert!(transcode(&path, &path, Some(60), 90).is_err());
        assert_eq!(image::open(&path).unwrap().dimensions(), (120, 60));
    }
}
