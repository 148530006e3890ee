//! Extension-based MIME resolution and classification.
//!
//! Reconciliation sees bare object keys, so classification works from the
//! file extension alone. Unknown extensions resolve to
//! `application/octet-stream` and file under `/documents`.

use quill_postgres::types::MediaKind;

/// MIME type served when the extension is unknown.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Resolves a MIME type from a file extension.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        // Documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "doc" => "application/msword",
        "docx" => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        _ => return None,
    };
    Some(mime)
}

/// Extracts the extension from an object key or file name.
pub fn extension_of(key: &str) -> Option<&str> {
    let name = key.rsplit('/').next().unwrap_or(key);
    let (stem, extension) = name.rsplit_once('.')?;
    (!stem.is_empty() && !extension.is_empty()).then_some(extension)
}

/// Classifies an object key into a media kind and MIME type.
pub fn classify_key(key: &str) -> (MediaKind, &'static str) {
    let mime = extension_of(key)
        .and_then(mime_for_extension)
        .unwrap_or(FALLBACK_MIME);
    (MediaKind::from_mime(mime), mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(mime_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_for_extension("mp4"), Some("video/mp4"));
        assert_eq!(mime_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(mime_for_extension("xyz"), None);
    }

    #[test]
    fn extensions_come_from_the_last_path_segment() {
        assert_eq!(extension_of("images/photo.final.JPG"), Some("JPG"));
        assert_eq!(extension_of("a.b/noext"), None);
        assert_eq!(extension_of(".gitignore"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn classification_matches_canonical_folders() {
        let (kind, mime) = classify_key("uploads/foo.png");
        assert_eq!(kind, MediaKind::Image);
        assert_eq!(mime, "image/png");
        assert_eq!(kind.folder_path(), "/images");

        let (kind, _) = classify_key("uploads/foo.mp4");
        assert_eq!(kind.folder_path(), "/videos");

        let (kind, _) = classify_key("uploads/foo.pdf");
        assert_eq!(kind.folder_path(), "/documents");

        // Unknown extensions file with documents.
        let (kind, mime) = classify_key("uploads/foo.xyz");
        assert_eq!(kind, MediaKind::Other);
        assert_eq!(mime, FALLBACK_MIME);
        assert_eq!(kind.folder_path(), "/documents");
    }
}
