//! Thumbnail generation for images and PDF documents.
//!
//! Images are decoded with the `image` crate and fitted into a bounded box
//! without upscaling; PDFs have their first page rendered by an external
//! renderer and then go through the same resize path. Output is always
//! JPEG, stored next to the source object under a deterministic key.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use quill_postgres::types::MediaKind;

use crate::error::{MediaError, MediaResult};

/// Tracing target for thumbnail operations.
const TRACING_TARGET: &str = "quill_media::thumbnail";

/// Bounding box thumbnails are fitted into.
pub const THUMBNAIL_MAX_WIDTH: u32 = 480;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 480;

/// JPEG quality for encoded thumbnails.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Width PDF pages are rendered at before the resize step.
pub const PDF_RENDER_WIDTH: u32 = 480;

/// Derives the thumbnail key for a source object key.
///
/// The directory is preserved and the extension replaced, so
/// `images/photo.png` maps to `images/photo_thumb.jpg`.
pub fn thumbnail_key(storage_key: &str) -> String {
    let (dir, name) = match storage_key.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, storage_key),
    };

    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };

    match dir {
        Some(dir) => format!("{dir}/{stem}_thumb.jpg"),
        None => format!("{stem}_thumb.jpg"),
    }
}

/// A generated thumbnail, ready to upload.
#[derive(Debug, Clone)]
pub struct GeneratedThumbnail {
    /// Storage key the thumbnail should be written under.
    pub key: String,
    /// Encoded JPEG bytes.
    pub data: Vec<u8>,
    /// Thumbnail width in pixels.
    pub width: u32,
    /// Thumbnail height in pixels.
    pub height: u32,
}

/// Renders a document page to an image for thumbnailing.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders the first page of a PDF at the given pixel width.
    ///
    /// Returns encoded image bytes in any format the `image` crate decodes.
    async fn render_first_page(&self, pdf: &[u8], width: u32) -> MediaResult<Vec<u8>>;
}

/// Page renderer shelling out to a `pdftoppm`-compatible binary.
pub struct CommandPageRenderer {
    command: PathBuf,
}

impl CommandPageRenderer {
    /// Uses `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self::with_command("pdftoppm")
    }

    /// Uses the given renderer binary.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for CommandPageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for CommandPageRenderer {
    async fn render_first_page(&self, pdf: &[u8], width: u32) -> MediaResult<Vec<u8>> {
        let dir = tempfile::tempdir()
            .map_err(|err| MediaError::thumbnail("<pdf>", format!("tempdir: {err}")))?;

        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf)
            .await
            .map_err(|err| MediaError::thumbnail("<pdf>", format!("write input: {err}")))?;

        let output_prefix = dir.path().join("page");
        let status = tokio::process::Command::new(&self.command)
            .arg("-png")
            .args(["-f", "1", "-l", "1"])
            .args(["-scale-to-x", &width.to_string()])
            .args(["-scale-to-y", "-1"])
            .arg(&input)
            .arg(&output_prefix)
            .status()
            .await
            .map_err(|err| {
                MediaError::thumbnail(
                    "<pdf>",
                    format!("failed to run `{}`: {err}", self.command.display()),
                )
            })?;

        if !status.success() {
            return Err(MediaError::thumbnail(
                "<pdf>",
                format!("`{}` exited with {status}", self.command.display()),
            ));
        }

        // pdftoppm writes <prefix>-1.png for a single-page render.
        let rendered = dir.path().join("page-1.png");
        let data = tokio::fs::read(&rendered)
            .await
            .map_err(|err| MediaError::thumbnail("<pdf>", format!("read rendered page: {err}")))?;

        Ok(data)
    }
}

/// Generates thumbnails for cataloged media.
///
/// Construction without a page renderer disables PDF thumbnails; image
/// thumbnails always work. Failures are reported per object and never
/// treated as fatal by callers.
#[derive(Clone, Default)]
pub struct ThumbnailPipeline {
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl ThumbnailPipeline {
    /// Creates a pipeline without PDF support.
    pub fn new() -> Self {
        Self { renderer: None }
    }

    /// Enables PDF thumbnails through the given renderer.
    pub fn with_page_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Whether this pipeline can thumbnail the given kind and MIME type.
    pub fn supports(&self, kind: MediaKind, mime_type: &str) -> bool {
        match kind {
            MediaKind::Image => !mime_type.eq_ignore_ascii_case("image/svg+xml"),
            MediaKind::Document => {
                mime_type.eq_ignore_ascii_case("application/pdf") && self.renderer.is_some()
            }
            MediaKind::Video | MediaKind::Other => false,
        }
    }

    /// Generates a thumbnail for an object, if the kind supports one.
    ///
    /// Returns `Ok(None)` for kinds without thumbnail support and `Err`
    /// when generation was attempted and failed.
    pub async fn generate(
        &self,
        storage_key: &str,
        kind: MediaKind,
        mime_type: &str,
        data: Vec<u8>,
    ) -> MediaResult<Option<GeneratedThumbnail>> {
        if !self.supports(kind, mime_type) {
            return Ok(None);
        }

        let image_bytes = match kind {
            MediaKind::Image => data,
            MediaKind::Document => {
                let renderer = self.renderer.as_ref().ok_or_else(|| {
                    MediaError::thumbnail(storage_key, "no page renderer configured")
                })?;
                renderer.render_first_page(&data, PDF_RENDER_WIDTH).await?
            }
            _ => return Ok(None),
        };

        let key = thumbnail_key(storage_key);
        let source_key = storage_key.to_owned();

        let (data, width, height) = tokio::task::spawn_blocking(move || {
            encode_bounded_jpeg(&image_bytes).map_err(|message| (source_key, message))
        })
        .await
        .map_err(|err| MediaError::thumbnail(storage_key, format!("encode task: {err}")))?
        .map_err(|(key, message)| MediaError::thumbnail(key, message))?;

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            width,
            height,
            size = data.len(),
            "Thumbnail generated"
        );

        Ok(Some(GeneratedThumbnail {
            key,
            data,
            width,
            height,
        }))
    }
}

impl std::fmt::Debug for ThumbnailPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailPipeline")
            .field("pdf_support", &self.renderer.is_some())
            .finish()
    }
}

/// Decodes image bytes, fits them into the thumbnail box without
/// upscaling, and encodes a JPEG.
fn encode_bounded_jpeg(image_bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), String> {
    let decoded =
        image::load_from_memory(image_bytes).map_err(|err| format!("decode: {err}"))?;

    let fitted = if decoded.width() <= THUMBNAIL_MAX_WIDTH
        && decoded.height() <= THUMBNAIL_MAX_HEIGHT
    {
        decoded
    } else {
        decoded.thumbnail(THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT)
    };

    let (width, height) = (fitted.width(), fitted.height());

    // JPEG has no alpha channel.
    let rgb = fitted.to_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, THUMBNAIL_JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|err| format!("encode: {err}"))?;

    Ok((buffer.into_inner(), width, height))
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbImage};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb([120, 40, 200]));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn thumbnail_keys_are_deterministic() {
        assert_eq!(
            thumbnail_key("images/photo.png"),
            "images/photo_thumb.jpg"
        );
        assert_eq!(
            thumbnail_key("documents/report.final.pdf"),
            "documents/report.final_thumb.jpg"
        );
        assert_eq!(thumbnail_key("bare"), "bare_thumb.jpg");
        assert_eq!(thumbnail_key("a/b/.hidden"), "a/b/.hidden_thumb.jpg");
    }

    #[tokio::test]
    async fn large_images_are_fitted_into_the_box() {
        let pipeline = ThumbnailPipeline::new();

        let thumbnail = pipeline
            .generate("images/big.png", MediaKind::Image, "image/png", png_bytes(1600, 900))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumbnail.key, "images/big_thumb.jpg");
        assert!(thumbnail.width <= THUMBNAIL_MAX_WIDTH);
        assert!(thumbnail.height <= THUMBNAIL_MAX_HEIGHT);
        // Aspect ratio survives the resize.
        assert_eq!(thumbnail.width, 480);
        assert_eq!(thumbnail.height, 270);
        assert!(!thumbnail.data.is_empty());
    }

    #[tokio::test]
    async fn small_images_are_not_upscaled() {
        let pipeline = ThumbnailPipeline::new();

        let thumbnail = pipeline
            .generate("images/tiny.png", MediaKind::Image, "image/png", png_bytes(100, 80))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumbnail.width, 100);
        assert_eq!(thumbnail.height, 80);
    }

    #[tokio::test]
    async fn unsupported_kinds_yield_no_thumbnail() {
        let pipeline = ThumbnailPipeline::new();

        let video = pipeline
            .generate("videos/clip.mp4", MediaKind::Video, "video/mp4", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(video.is_none());

        // PDF without a renderer configured.
        let pdf = pipeline
            .generate(
                "documents/doc.pdf",
                MediaKind::Document,
                "application/pdf",
                vec![1, 2, 3],
            )
            .await
            .unwrap();
        assert!(pdf.is_none());
    }

    #[tokio::test]
    async fn corrupt_image_data_is_a_thumbnail_error() {
        let pipeline = ThumbnailPipeline::new();

        let error = pipeline
            .generate(
                "images/broken.png",
                MediaKind::Image,
                "image/png",
                vec![0, 1, 2, 3],
            )
            .await
            .unwrap_err();

        assert!(matches!(error, MediaError::Thumbnail { .. }));
    }

    struct StaticRenderer;

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render_first_page(&self, _pdf: &[u8], width: u32) -> MediaResult<Vec<u8>> {
            Ok(png_bytes(width, width * 13 / 10))
        }
    }

    #[tokio::test]
    async fn pdf_thumbnails_go_through_the_renderer() {
        let pipeline =
            ThumbnailPipeline::new().with_page_renderer(Arc::new(StaticRenderer));

        let thumbnail = pipeline
            .generate(
                "documents/report.pdf",
                MediaKind::Document,
                "application/pdf",
                b"%PDF-1.7 fake".to_vec(),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumbnail.key, "documents/report_thumb.jpg");
        assert!(thumbnail.width <= THUMBNAIL_MAX_WIDTH);
        assert!(thumbnail.height <= THUMBNAIL_MAX_HEIGHT);
    }
}
