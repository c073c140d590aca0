//! Turns an uploaded photo into the base64 inline payload Gemini expects.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use image::ImageFormat;

use crate::error::{BoothError, Result};

/// A photo as the user handed it over. Content is opaque bytes; nothing here
/// decodes pixels except the best-effort [`UploadedImage::dimensions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    bytes: Bytes,
    declared_mime: Option<String>,
    file_name: Option<String>,
}

/// Base64 payload plus MIME tag, ready to be placed in an inline data part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

impl UploadedImage {
    pub fn new(
        bytes: impl Into<Bytes>,
        declared_mime: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            declared_mime: declared_mime
                .map(|mime| mime.trim().to_string())
                .filter(|mime| !mime.is_empty()),
            file_name,
        }
    }

    /// Reads a photo from disk. The MIME type is left to sniffing.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BoothError::Encoding(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self::new(bytes, None, file_name))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> Option<String> {
        resolve_mime_type(&self.bytes, self.declared_mime.as_deref())
    }

    /// Pixel size read from the image header, if the format is one we can parse.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::io::Reader::new(Cursor::new(self.bytes.as_ref()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

/// A declared `image/*` type wins, then magic-number sniffing, then whatever
/// was declared.
pub fn resolve_mime_type(bytes: &[u8], declared: Option<&str>) -> Option<String> {
    let declared = declared.map(str::trim).filter(|mime| !mime.is_empty());
    if let Some(mime) = declared {
        if mime.starts_with("image/") {
            return Some(mime.to_string());
        }
    }

    let sniffed = image::guess_format(bytes).ok().and_then(|format| match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    });

    sniffed
        .map(str::to_string)
        .or_else(|| declared.map(str::to_string))
}

pub fn encode(image: &UploadedImage) -> Result<EncodedImage> {
    if image.is_empty() {
        return Err(BoothError::Encoding("file is empty".to_string()));
    }
    let mime_type = image.mime_type().ok_or_else(|| {
        BoothError::Encoding("unrecognized file type, expected PNG, JPEG or WEBP".to_string())
    })?;

    Ok(EncodedImage {
        data: general_purpose::STANDARD.encode(image.bytes()),
        mime_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(3, 2);
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn encodes_with_declared_type() {
        let upload = UploadedImage::new(
            b"\xff\xd8\xff\xe0fake".to_vec(),
            Some("image/jpeg".to_string()),
            Some("me.jpg".to_string()),
        );
        let encoded = encode(&upload).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert_eq!(
            general_purpose::STANDARD.decode(&encoded.data).unwrap(),
            b"\xff\xd8\xff\xe0fake"
        );
    }

    #[test]
    fn sniffs_png_when_type_is_missing_or_generic() {
        let bytes = png_bytes();
        assert_eq!(resolve_mime_type(&bytes, None).as_deref(), Some("image/png"));
        assert_eq!(
            resolve_mime_type(&bytes, Some("application/octet-stream")).as_deref(),
            Some("image/png")
        );
    }

    #[test]
    fn unknown_content_falls_back_to_declared_type() {
        assert_eq!(
            resolve_mime_type(b"hello", Some("application/octet-stream")).as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(resolve_mime_type(b"hello", Some("  ")), None);
    }

    #[test]
    fn rejects_empty_and_untyped_files() {
        let empty = UploadedImage::new(Vec::new(), Some("image/png".to_string()), None);
        assert!(matches!(encode(&empty), Err(BoothError::Encoding(_))));

        let untyped = UploadedImage::new(b"plain text".to_vec(), None, None);
        assert!(matches!(encode(&untyped), Err(BoothError::Encoding(_))));
    }

    #[test]
    fn reads_dimensions_from_header() {
        let upload = UploadedImage::new(png_bytes(), None, None);
        assert_eq!(upload.dimensions(), Some((3, 2)));
        assert_eq!(UploadedImage::new(b"nope".to_vec(), None, None).dimensions(), None);
    }

    #[tokio::test]
    async fn load_reports_missing_file_as_encoding_error() {
        let err = UploadedImage::load("/definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(matches!(err, BoothError::Encoding(_)));
        assert!(err.to_string().starts_with("Failed to read image file"));
    }

    #[tokio::test]
    async fn load_reads_file_name_and_content() {
        let path = std::env::temp_dir().join(format!("booth-load-{}.png", std::process::id()));
        tokio::fs::write(&path, png_bytes()).await.unwrap();

        let upload = UploadedImage::load(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(upload.mime_type().as_deref(), Some("image/png"));
        assert!(upload.file_name().unwrap().starts_with("booth-load-"));
    }
}
