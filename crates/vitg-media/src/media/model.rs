use super::FileLocation;
use crate::util::units::{KB, MB};
use bytes::Bytes;
use std::path::PathBuf;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumString,
    clap::ValueEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Sticker,
    Photo,
    Video,
    Voice,
    Audio,
}

impl MediaKind {
    /// Segment of the canonical cache file name. Photos are stored under
    /// `image` to stay compatible with the files the serving layer looks up.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Photo => "image",
            _ => self.into(),
        }
    }

    /// Size of a single ranged read. This is fixed per kind, it is never
    /// negotiated with the remote.
    pub fn chunk_size(self) -> usize {
        let size = match self {
            Self::Video => MB,
            Self::Sticker | Self::Photo | Self::Voice | Self::Audio => 512 * KB,
        };
        size as usize
    }

    /// Extension used when neither the content nor the declared MIME type
    /// reveal the format.
    pub fn default_extension(self) -> Extension {
        match self {
            Self::Sticker => Extension::Webp,
            Self::Photo => Extension::Png,
            Self::Video => Extension::Mp4,
            Self::Voice => Extension::Ogg,
            Self::Audio => Extension::Mp3,
        }
    }

    /// Ordered list of extensions that a cached file of this kind may have.
    /// Cache lookups probe exactly these, in this order.
    pub fn candidate_extensions(self) -> &'static [Extension] {
        use Extension::*;
        match self {
            Self::Sticker => &[Webp, Png, Jpg, Gif, Webm],
            Self::Photo => &[Jpg, Jpeg, Png, Webp, Gif],
            Self::Video => &[Mp4, Avi, Mkv, Mov, Webm, Flv],
            Self::Voice => &[Ogg, Oga, Mp3, Wav, M4a, Aac],
            Self::Audio => &[Mp3, M4a, Aac, Wav, Ogg, Flac],
        }
    }

    /// Picks the extension to publish a file with when sniffing didn't
    /// recognize the content.
    pub(crate) fn fallback_extension(self, mime_type: Option<&str>) -> Extension {
        mime_type
            .and_then(Extension::from_mime_type)
            .filter(|ext| self.candidate_extensions().contains(ext))
            .unwrap_or_else(|| self.default_extension())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Extension {
    Jpg,
    Jpeg,
    Png,
    Gif,
    Webp,
    Mp4,
    Avi,
    Mkv,
    Mov,
    Webm,
    Flv,
    Ogg,
    Oga,
    Mp3,
    Wav,
    M4a,
    Aac,
    Flac,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// MIME type the serving layer should report for files with this extension
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Mp4 => "video/mp4",
            Self::Avi => "video/x-msvideo",
            Self::Mkv => "video/x-matroska",
            Self::Mov => "video/quicktime",
            Self::Webm => "video/webm",
            Self::Flv => "video/x-flv",
            Self::Ogg | Self::Oga => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/mp4",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next()?.trim().to_ascii_lowercase();
        let ext = match essence.as_str() {
            "image/jpeg" | "image/jpg" => Self::Jpg,
            "image/png" => Self::Png,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "video/mp4" => Self::Mp4,
            "video/x-msvideo" => Self::Avi,
            "video/x-matroska" => Self::Mkv,
            "video/quicktime" => Self::Mov,
            "video/webm" => Self::Webm,
            "video/x-flv" => Self::Flv,
            "audio/ogg" | "audio/opus" => Self::Ogg,
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/wav" | "audio/x-wav" => Self::Wav,
            "audio/mp4" | "audio/x-m4a" => Self::M4a,
            "audio/aac" => Self::Aac,
            "audio/flac" | "audio/x-flac" => Self::Flac,
            _ => return None,
        };
        Some(ext)
    }
}

/// Opaque remote descriptor of a piece of binary media.
///
/// The `file_reference` baked into the locations may expire, in which case
/// the message metadata has to be fetched again to get a fresh [`MediaRef`].
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub kind: MediaKind,

    /// Identity of the media in the local cache
    pub id: i64,

    /// Remote locations of the same media. Documents have a single variant,
    /// photos have one per resolution.
    pub variants: Vec<SizeVariant>,

    /// MIME type declared by the remote, if any. It is only a hint used when
    /// the content itself doesn't reveal the format.
    pub mime_type: Option<String>,
}

impl MediaRef {
    /// Media stored as a document (stickers, videos, voice and audio clips)
    pub fn document(
        kind: MediaKind,
        id: i64,
        access_hash: i64,
        file_reference: Bytes,
        mime_type: Option<String>,
    ) -> Self {
        let location = FileLocation::Document {
            id,
            access_hash,
            file_reference,
        };
        Self {
            kind,
            id,
            variants: vec![SizeVariant {
                width: 0,
                label: "document".to_owned(),
                location,
            }],
            mime_type,
        }
    }

    /// Photo with the given `(thumb_type, width)` sizes. Zero width means the
    /// width is unknown (e.g. stripped thumbnails).
    pub fn photo(
        id: i64,
        access_hash: i64,
        file_reference: Bytes,
        sizes: impl IntoIterator<Item = (String, u32)>,
    ) -> Self {
        let variants = sizes
            .into_iter()
            .map(|(thumb_type, width)| SizeVariant {
                width,
                label: thumb_type.clone(),
                location: FileLocation::Photo {
                    id,
                    access_hash,
                    file_reference: file_reference.clone(),
                    thumb_size: thumb_type,
                },
            })
            .collect();

        Self {
            kind: MediaKind::Photo,
            id,
            variants,
            mime_type: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SizeVariant {
    /// Declared width in pixels, zero if unknown
    pub width: u32,

    /// Human-readable description for logs
    pub label: String,

    pub location: FileLocation,
}

/// File published in the local cache. There is at most one live entry per
/// `(kind, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub kind: MediaKind,
    pub id: i64,
    pub extension: Extension,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn content_type(&self) -> &'static str {
        self.extension.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn chunk_sizes() {
        assert_eq!(MediaKind::Sticker.chunk_size(), 512 * 1024);
        assert_eq!(MediaKind::Photo.chunk_size(), 512 * 1024);
        assert_eq!(MediaKind::Voice.chunk_size(), 512 * 1024);
        assert_eq!(MediaKind::Video.chunk_size(), 1024 * 1024);
    }

    #[test]
    fn default_extension_is_a_candidate() {
        for kind in [
            MediaKind::Sticker,
            MediaKind::Photo,
            MediaKind::Video,
            MediaKind::Voice,
            MediaKind::Audio,
        ] {
            assert!(
                kind.candidate_extensions()
                    .contains(&kind.default_extension()),
                "{kind}"
            );
        }
    }

    #[test]
    fn fallback_extension_prefers_declared_mime_type() {
        let kind = MediaKind::Video;
        assert_eq!(
            kind.fallback_extension(Some("video/quicktime")),
            Extension::Mov
        );
        assert_eq!(
            kind.fallback_extension(Some("video/webm; codecs=vp9")),
            Extension::Webm
        );

        // Audio MIME type is not a valid extension for videos
        assert_eq!(kind.fallback_extension(Some("audio/flac")), Extension::Mp4);
        assert_eq!(kind.fallback_extension(None), Extension::Mp4);
        assert_eq!(
            MediaKind::Voice.fallback_extension(Some("application/octet-stream")),
            Extension::Ogg
        );
    }

    #[test]
    fn path_segments() {
        let actual = [
            MediaKind::Sticker,
            MediaKind::Photo,
            MediaKind::Video,
            MediaKind::Voice,
            MediaKind::Audio,
        ]
        .map(MediaKind::path_segment);

        expect![[r#"["sticker", "image", "video", "voice", "audio"]"#]].assert_eq(&format!("{actual:?}"));
    }

    #[test]
    fn content_types() {
        assert_eq!(Extension::Jpeg.content_type(), "image/jpeg");
        assert_eq!(Extension::Mkv.content_type(), "video/x-matroska");
        assert_eq!(Extension::Oga.content_type(), "audio/ogg");
        assert_eq!(Extension::M4a.as_str(), "m4a");
    }

    #[test]
    fn photo_variants_share_the_reference() {
        let photo = MediaRef::photo(
            7,
            42,
            Bytes::from_static(b"ref"),
            [("m".to_owned(), 320), ("y".to_owned(), 1280)],
        );

        assert_eq!(photo.kind, MediaKind::Photo);
        assert_eq!(photo.variants.len(), 2);
        for variant in &photo.variants {
            assert_eq!(variant.location.file_reference().as_ref(), b"ref");
        }
    }
}
