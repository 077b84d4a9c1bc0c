//! The binary document handed back by a completed run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An immutable binary artifact: bytes plus what a presentation layer
/// needs to expose them (content type, suggested filename).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Suggested filename for downloads
    pub filename: String,

    /// MIME type of the payload
    pub content_type: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the payload
    pub sha256: String,

    /// When the artifact was sealed
    pub created_at: DateTime<Utc>,

    /// Raw payload (base64 on the wire)
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Create a new artifact
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            size_bytes: bytes.len() as u64,
            sha256,
            created_at: Utc::now(),
            bytes,
        }
    }

    /// Create a PDF artifact
    pub fn pdf(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(filename, PDF_CONTENT_TYPE, bytes)
    }

    /// Content-addressed reference to this artifact
    pub fn uri(&self) -> String {
        format!("artifact://sha256/{}", self.sha256)
    }

    /// Whether the payload starts with the PDF magic header
    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF-")
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}
