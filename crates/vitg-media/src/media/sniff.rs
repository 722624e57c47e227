use super::Extension;
use crate::prelude::*;
use crate::Result;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Number of leading bytes that is enough to recognize any supported format
pub const SNIFF_LEN: usize = 12;

const JPEG: &[u8] = &[0xFF, 0xD8];
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF: &[u8] = b"GIF8";
const RIFF: &[u8] = b"RIFF";
const WEBP: &[u8] = b"WEBP";

/// Classifies an image container by its magic bytes. The claimed file name
/// or MIME type plays no role here. Only the first [`SNIFF_LEN`] bytes are
/// inspected, and the first matching signature wins.
pub fn detect(bytes: &[u8]) -> Option<Extension> {
    let header = &bytes[..bytes.len().min(SNIFF_LEN)];

    if header.starts_with(JPEG) {
        return Some(Extension::Jpg);
    }
    if header.starts_with(PNG) {
        return Some(Extension::Png);
    }
    if header.starts_with(GIF) {
        return Some(Extension::Gif);
    }
    if header.starts_with(RIFF) && header.get(8..12) == Some(WEBP) {
        return Some(Extension::Webp);
    }

    None
}

/// Same as [`detect`], but reads the header from the file at the given path
pub async fn detect_file(path: &Path) -> Result<Option<Extension>> {
    let file = fs_err::tokio::File::open(path).await?;

    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .await
        .fatal_ctx(|| format!("Failed to read the header of {}", path.display()))?;

    let ext = detect(&header);

    trace!(path = %path.display(), ?ext, header = ?header, "Sniffed file format");

    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    #[track_caller]
    fn assert_detect(bytes: &[u8], expected: Expect) {
        expected.assert_eq(&format!("{:?}", detect(bytes)));
    }

    #[test]
    fn signatures() {
        assert_detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], expect!["Some(Jpg)"]);
        assert_detect(
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00],
            expect!["Some(Png)"],
        );
        assert_detect(b"GIF89a......", expect!["Some(Gif)"]);
        assert_detect(b"GIF87a", expect!["Some(Gif)"]);
        assert_detect(b"RIFF\x10\x20\x30\x40WEBPVP8 ", expect!["Some(Webp)"]);
    }

    #[test]
    fn unknown_content() {
        assert_detect(b"", expect!["None"]);
        assert_detect(b"hello world, this is text", expect!["None"]);
        // RIFF container that is not WEBP
        assert_detect(b"RIFF\x00\x00\x00\x00WAVEfmt ", expect!["None"]);
        // Truncated WEBP header
        assert_detect(b"RIFF\x00\x00\x00\x00WEB", expect!["None"]);
        // Truncated PNG signature
        assert_detect(&[0x89, 0x50, 0x4E, 0x47], expect!["None"]);
        // mp4 and webm don't look like images
        assert_detect(b"\x00\x00\x00\x18ftypmp42", expect!["None"]);
        assert_detect(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F], expect!["None"]);
    }

    #[test]
    fn only_the_header_is_inspected() {
        let mut bytes = vec![0u8; 64];
        bytes[20..22].copy_from_slice(JPEG);
        assert_detect(&bytes, expect!["None"]);
    }

    #[test_log::test(tokio::test)]
    async fn detects_file_content_regardless_of_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims_to_be.png");
        fs_err::write(&path, b"RIFF\x00\x00\x00\x00WEBPVP8L rest of the payload").unwrap();

        let ext = detect_file(&path).await.unwrap();
        assert_eq!(ext, Some(Extension::Webp));
    }
}
