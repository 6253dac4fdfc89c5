//! Photo uploads.
//!
//! An accepted upload is decoded, shrunk so its longest side fits the
//! configured bound, re-encoded in its original format and written to the
//! upload directory under a random name. The file only appears under its
//! final name once fully written.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while handling an uploaded photo.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Not an image type we can process.
    #[error("That filetype isn't allowed")]
    UnsupportedType(String),

    /// Claimed to be an image but could not be decoded.
    #[error("That image could not be read")]
    Undecodable(#[source] image::ImageError),

    /// Re-encoding the resized image failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Writing the file failed.
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task panicked or was cancelled.
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MediaError {
    /// Returns `true` if the upload itself was at fault, in which case the
    /// request carries on without a photo.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::Undecodable(_))
    }
}

/// A file part from a multipart form.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Browsers send an empty part when no file was chosen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_name.as_deref().is_none_or(str::is_empty) || self.bytes.is_empty()
    }
}

/// An upload that passed the type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedImage {
    pub format: ImageFormat,
    /// File extension, taken from the mimetype subtype.
    pub extension: String,
}

/// Writes processed photos to a directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    upload_dir: PathBuf,
    max_dimension: u32,
}

impl MediaStore {
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>, max_dimension: u32) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_dimension,
        }
    }

    /// Directory processed photos are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Check the declared mimetype.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UnsupportedType` for anything other than a PNG,
    /// JPEG, GIF or WebP image.
    pub fn validate(upload: &Upload) -> Result<AcceptedImage, MediaError> {
        let mime = upload
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let mime = canonical_mime(&mime).to_owned();

        let format = mime
            .strip_prefix("image/")
            .and(ImageFormat::from_mime_type(&mime))
            .filter(|f| {
                matches!(
                    f,
                    ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
                )
            })
            .ok_or_else(|| MediaError::UnsupportedType(mime.clone()))?;

        let extension = mime.trim_start_matches("image/").to_owned();
        Ok(AcceptedImage { format, extension })
    }

    /// Process an optional upload, returning the stored filename.
    ///
    /// No file (or an empty part) is not an error: the result is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a rejection (`MediaError::is_rejection`) if the file is not a
    /// usable image, or `MediaError::Io` / `MediaError::Encode` if it could
    /// not be stored.
    #[tracing::instrument(skip_all)]
    pub async fn process(&self, upload: Option<Upload>) -> Result<Option<String>, MediaError> {
        let Some(upload) = upload.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let accepted = Self::validate(&upload)?;
        let filename = format!("{}.{}", Uuid::new_v4(), accepted.extension);

        let dir = self.upload_dir.clone();
        let max_dimension = self.max_dimension;
        let target = dir.join(&filename);
        tokio::task::spawn_blocking(move || {
            let encoded = resize(&upload.bytes, accepted.format, max_dimension)?;
            write_atomically(&dir, &target, &encoded)
        })
        .await??;

        tracing::info!(photo = %filename, "photo stored");
        Ok(Some(filename))
    }
}

/// Older clients still send these legacy names for JPEG.
fn canonical_mime(mime: &str) -> &str {
    match mime {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    }
}

/// Decode, shrink to fit `max_dimension` (never enlarge) and re-encode.
fn resize(bytes: &[u8], format: ImageFormat, max_dimension: u32) -> Result<Vec<u8>, MediaError> {
    let image = image::load_from_memory_with_format(bytes, format).map_err(MediaError::Undecodable)?;

    let image = if image.width().max(image.height()) > max_dimension {
        image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        image
    };

    // JPEG has no alpha; the GIF and WebP encoders want RGBA.
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::Gif | ImageFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image,
    };

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).map_err(MediaError::Encode)?;
    Ok(out.into_inner())
}

/// Write to a temp file in `dir`, then rename it into place.
fn write_atomically(dir: &Path, target: &Path, contents: &[u8]) -> Result<(), MediaError> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| MediaError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GenericImageView, RgbImage, RgbaImage};

    use super::*;

    fn encode(image: DynamicImage, format: ImageFormat) -> Bytes {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        Bytes::from(out.into_inner())
    }

    fn png_upload(width: u32, height: u32) -> Upload {
        Upload {
            file_name: Some("photo.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: encode(
                DynamicImage::ImageRgba8(RgbaImage::new(width, height)),
                ImageFormat::Png,
            ),
        }
    }

    #[test]
    fn test_validate_accepts_images() {
        let accepted = MediaStore::validate(&png_upload(1, 1)).unwrap();
        assert_eq!(accepted.format, ImageFormat::Png);
        assert_eq!(accepted.extension, "png");

        let jpeg = Upload {
            content_type: Some("image/jpeg".to_string()),
            ..Upload::default()
        };
        assert_eq!(MediaStore::validate(&jpeg).unwrap().extension, "jpeg");
    }

    #[test]
    fn test_validate_accepts_legacy_jpeg_names() {
        for mime in ["image/jpg", "image/pjpeg", "IMAGE/JPG; charset=binary"] {
            let upload = Upload {
                content_type: Some(mime.to_string()),
                ..Upload::default()
            };
            let accepted = MediaStore::validate(&upload).unwrap();
            assert_eq!(accepted.format, ImageFormat::Jpeg, "{mime}");
            assert_eq!(accepted.extension, "jpeg", "{mime}");
        }
    }

    #[test]
    fn test_validate_rejects_other_types() {
        for mime in ["text/plain", "image/svg+xml", "application/pdf", ""] {
            let upload = Upload {
                content_type: Some(mime.to_string()),
                ..Upload::default()
            };
            let err = MediaStore::validate(&upload).unwrap_err();
            assert!(err.is_rejection(), "{mime}");
            assert_eq!(err.to_string(), "That filetype isn't allowed");
        }
    }

    #[tokio::test]
    async fn test_process_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);

        assert_eq!(media.process(None).await.unwrap(), None);
        let empty = Upload {
            file_name: Some(String::new()),
            content_type: Some("application/octet-stream".to_string()),
            bytes: Bytes::new(),
        };
        assert_eq!(media.process(Some(empty)).await.unwrap(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_process_shrinks_large_png() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);

        let name = media
            .process(Some(png_upload(1600, 400)))
            .await
            .unwrap()
            .unwrap();
        assert!(name.ends_with(".png"));

        let stored = image::open(dir.path().join(&name)).unwrap();
        assert_eq!(stored.dimensions(), (800, 200));
    }

    #[tokio::test]
    async fn test_process_never_enlarges() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);

        let name = media
            .process(Some(png_upload(300, 200)))
            .await
            .unwrap()
            .unwrap();
        let stored = image::open(dir.path().join(name)).unwrap();
        assert_eq!(stored.dimensions(), (300, 200));
    }

    #[tokio::test]
    async fn test_process_tall_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);
        let upload = Upload {
            file_name: Some("tall.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: encode(
                DynamicImage::ImageRgb8(RgbImage::new(500, 1000)),
                ImageFormat::Jpeg,
            ),
        };

        let name = media.process(Some(upload)).await.unwrap().unwrap();
        assert!(name.ends_with(".jpeg"));
        let stored = image::open(dir.path().join(name)).unwrap();
        assert_eq!(stored.dimensions(), (400, 800));
    }

    #[tokio::test]
    async fn test_process_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);

        let a = media.process(Some(png_upload(10, 10))).await.unwrap();
        let b = media.process(Some(png_upload(10, 10))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_process_rejects_undecodable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);
        let upload = Upload {
            file_name: Some("fake.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"definitely not a png"),
        };

        let err = media.process(Some(upload)).await.unwrap_err();
        assert!(matches!(err, MediaError::Undecodable(_)));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_process_rejects_text() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 800);
        let upload = Upload {
            file_name: Some("notes.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(b"hello"),
        };

        let err = media.process(Some(upload)).await.unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(_)));
    }
}
