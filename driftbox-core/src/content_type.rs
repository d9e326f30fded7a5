//! Advisory MIME types for stored blobs.

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extensions the upload service is expected to see, with their MIME types.
const EXTENSION_TYPES: &[(&str, &str)] = &[
    // images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
    // audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
    ("wma", "audio/x-ms-wma"),
    // video
    ("mp4", "video/mp4"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("flv", "video/x-flv"),
    // documents
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("csv", "text/csv"),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("md", "text/markdown"),
    // archives
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("rar", "application/vnd.rar"),
];

/// Lowercased extension of `file_name`, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Pick the MIME type to record for a blob: the caller's hint when it has
/// one, else a guess from the display name, else `application/octet-stream`.
pub fn resolve_content_type(hint: Option<&str>, display_name: &str) -> String {
    if let Some(hint) = hint.map(str::trim).filter(|hint| !hint.is_empty()) {
        return hint.to_string();
    }

    extension_of(display_name)
        .and_then(|ext| content_type_for_extension(&ext))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
