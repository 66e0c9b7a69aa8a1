use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a captured image came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    File { name: String },
    Clipboard,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::File { name } => write!(f, "file: {}", name),
            ImageSource::Clipboard => write!(f, "clipboard"),
        }
    }
}

/// A validated image, re-encoded as PNG.
///
/// Lives only as long as the round that captured it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    /// Full-resolution PNG bytes
    #[serde(with = "base64_bytes")]
    pub png: Vec<u8>,
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    pub const MIME_TYPE: &'static str = "image/png";

    /// Human-readable label, e.g. `"file: shot.png"`
    pub fn source_label(&self) -> String {
        self.source.to_string()
    }

    /// `"{width}x{height}"`
    pub fn dimensions_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Size of the encoded PNG in bytes
    pub fn byte_len(&self) -> usize {
        self.png.len()
    }
}

// Keep multi-megabyte payloads out of debug output.
impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("png", &format_args!("<{} bytes>", self.png.len()))
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
