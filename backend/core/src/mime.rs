//! Content-type guessing for stored objects that were uploaded without one.

/// Guess a MIME type from the key's extension.
pub fn detect_content_type(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf"          => "application/pdf",
        "zip"          => "application/zip",
        "json"         => "application/json",
        "md"           => "text/markdown",
        "txt"          => "text/plain",
        "html" | "htm" => "text/html",
        "csv"          => "text/csv",
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "tiff" | "tif" => "image/tiff",
        _              => "application/octet-stream",
    }
}
