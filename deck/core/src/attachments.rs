//! Image attachments
//!
//! [`AttachmentStaging`] holds images waiting to be sent with the next
//! message. Pasted images are turned into inline `data:` URLs by
//! [`decode_pasted`], which is the only asynchronous step in the crate.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use futures::future::join_all;
use tracing::warn;

use crate::events::ImageRef;

/// Default cap on staged images
pub const DEFAULT_MAX_ATTACHMENTS: usize = 20;

/// Image MIME types accepted from the clipboard or disk
pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Images staged for the next message, capped at a fixed count
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentStaging {
    items: Vec<ImageRef>,
    max: usize,
}

impl Default for AttachmentStaging {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTACHMENTS)
    }
}

impl AttachmentStaging {
    /// Create an empty staging area with the given cap
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            items: Vec::new(),
            max,
        }
    }

    /// Add images, keeping the earliest ones when the cap would be exceeded
    ///
    /// Returns how many were actually staged.
    pub fn add(&mut self, images: impl IntoIterator<Item = ImageRef>) -> usize {
        let before = self.items.len();
        let room = self.max.saturating_sub(before);
        self.items.extend(images.into_iter().take(room));
        self.items.len() - before
    }

    /// Remove the image at `index`, if present
    pub fn remove(&mut self, index: usize) -> Option<ImageRef> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Take everything, leaving the staging area empty
    pub fn take(&mut self) -> Vec<ImageRef> {
        std::mem::take(&mut self.items)
    }

    /// Staged images in order
    #[must_use]
    pub fn items(&self) -> &[ImageRef] {
        &self.items
    }

    /// Number of staged images
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is staged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cap on staged images
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Whether the cap is reached
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max
    }
}

/// An image handed over by a paste or drop
#[derive(Clone, Debug)]
pub enum PastedImage {
    /// Raw bytes with a declared MIME type
    Bytes {
        /// MIME type reported by the clipboard
        mime_type: String,
        /// Image bytes
        data: Vec<u8>,
    },
    /// A file on disk; type inferred from the extension
    File(PathBuf),
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn data_url(mime_type: &str, data: &[u8]) -> ImageRef {
    ImageRef(format!(
        "data:{mime_type};base64,{}",
        BASE64_STANDARD.encode(data)
    ))
}

async fn decode_one(image: PastedImage) -> anyhow::Result<ImageRef> {
    match image {
        PastedImage::Bytes { mime_type, data } => {
            let mime_type = mime_type.to_ascii_lowercase();
            if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
                bail!("unsupported image type {mime_type}");
            }
            if data.is_empty() {
                bail!("empty image data");
            }
            Ok(data_url(&mime_type, &data))
        }
        PastedImage::File(path) => {
            let Some(mime_type) = mime_for_path(&path) else {
                bail!("unsupported image file {}", path.display());
            };
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(data_url(mime_type, &data))
        }
    }
}

/// Turn pasted images into data URLs
///
/// Every item is decoded concurrently. Failures are logged and dropped; the
/// rest come back in the order they were pasted.
pub async fn decode_pasted(images: Vec<PastedImage>) -> Vec<ImageRef> {
    let total = images.len();
    let decoded: Vec<ImageRef> = join_all(images.into_iter().map(decode_one))
        .await
        .into_iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(index, error = %err, "dropping pasted image");
                None
            }
        })
        .collect();
    tracing::debug!(total, decoded = decoded.len(), "decoded pasted images");
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn image(n: usize) -> ImageRef {
        ImageRef(format!("data:image/png;base64,{n}"))
    }

    #[test]
    fn test_cap_keeps_earliest() {
        let mut staging = AttachmentStaging::new(3);
        assert_eq!(staging.add((0..2).map(image)), 2);
        assert_eq!(staging.add((2..6).map(image)), 1);
        assert!(staging.is_full());
        assert_eq!(staging.items(), &[image(0), image(1), image(2)]);
        assert_eq!(staging.add([image(9)]), 0);
    }

    #[test]
    fn test_default_cap() {
        let mut staging = AttachmentStaging::default();
        staging.add((0..25).map(image));
        assert_eq!(staging.len(), DEFAULT_MAX_ATTACHMENTS);
    }

    #[test]
    fn test_remove_and_take() {
        let mut staging = AttachmentStaging::new(5);
        staging.add((0..3).map(image));
        assert_eq!(staging.remove(1), Some(image(1)));
        assert_eq!(staging.remove(7), None);
        assert_eq!(staging.take(), vec![image(0), image(2)]);
        assert!(staging.is_empty());
    }

    #[tokio::test]
    async fn test_decode_bytes() {
        let decoded = decode_pasted(vec![PastedImage::Bytes {
            mime_type: "image/PNG".to_string(),
            data: vec![1, 2, 3],
        }])
        .await;
        assert_eq!(decoded, vec![ImageRef::new("data:image/png;base64,AQID")]);
    }

    #[tokio::test]
    async fn test_failures_are_dropped_in_order() {
        let mut file = Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"jpg").unwrap();

        let decoded = decode_pasted(vec![
            PastedImage::Bytes {
                mime_type: "image/gif".to_string(),
                data: vec![1],
            },
            PastedImage::File(file.path().to_path_buf()),
            PastedImage::File(PathBuf::from("/nonexistent/image.png")),
            PastedImage::Bytes {
                mime_type: "image/webp".to_string(),
                data: vec![0xff],
            },
        ])
        .await;

        assert_eq!(
            decoded,
            vec![
                ImageRef::new("data:image/jpeg;base64,anBn"),
                ImageRef::new("data:image/webp;base64,/w=="),
            ]
        );
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.JPEG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("a.txt")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }
}
