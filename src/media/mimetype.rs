pub const OCTET_STREAM: &str = "application/octet-stream";

/// Sniffs the content type of downloaded bytes from their magic number.
pub fn detect_mimetype(data: &[u8]) -> &'static str {
    match infer::get(data) {
        Some(kind) => kind.mime_type(),
        None => OCTET_STREAM,
    }
}
