//! Image payloads for analysis.

use std::fmt::{self, Debug, Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use garden_guru_model::InlineData;
use mime::Mime;

/// Errors from building an [`ImageInput`].
#[derive(Debug)]
pub enum ImageError {
    /// The media type is not an `image/*` type.
    NotAnImage(String),
    /// The file extension doesn't map to a known image type.
    UnknownExtension(PathBuf),
    /// The file couldn't be read.
    Io(io::Error),
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::NotAnImage(ty) => write!(f, "not an image type: {ty}"),
            ImageError::UnknownExtension(path) => {
                write!(f, "unknown image extension: {}", path.display())
            }
            ImageError::Io(err) => write!(f, "failed to read image: {err}"),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ImageError {
    #[inline]
    fn from(err: io::Error) -> Self {
        ImageError::Io(err)
    }
}

/// An image the user picked, with its media type.
///
/// Only the media type is checked. Size limits and whether the bytes really
/// decode are left to the service. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Arc<[u8]>,
    mime: Mime,
}

impl ImageInput {
    /// Creates an image from raw bytes and a media type.
    pub fn new(bytes: impl Into<Vec<u8>>, mime: Mime) -> Result<Self, ImageError> {
        if mime.type_() != mime::IMAGE {
            return Err(ImageError::NotAnImage(mime.to_string()));
        }
        let bytes: Vec<u8> = bytes.into();
        Ok(Self {
            bytes: Arc::from(bytes),
            mime,
        })
    }

    /// Creates an image from raw bytes and a media type string such as
    /// `image/webp`.
    pub fn with_type(
        bytes: impl Into<Vec<u8>>,
        mime: &str,
    ) -> Result<Self, ImageError> {
        let parsed = mime
            .parse::<Mime>()
            .map_err(|_| ImageError::NotAnImage(mime.to_owned()))?;
        Self::new(bytes, parsed)
    }

    /// Reads an image file, deriving the media type from its extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let mime = mime_for_path(path)
            .ok_or_else(|| ImageError::UnknownExtension(path.to_owned()))?;
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), len = bytes.len(), "read image");
        Self::with_type(bytes, mime)
    }

    /// Returns the media type.
    #[inline]
    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    /// Returns the raw bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encodes the image for embedding in a request body.
    pub fn to_inline_data(&self) -> InlineData {
        InlineData {
            mime_type: self.mime.essence_str().to_owned(),
            data: STANDARD.encode(self.bytes()),
        }
    }
}

impl Debug for ImageInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}
