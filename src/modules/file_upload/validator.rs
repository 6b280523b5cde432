//! Content validation for inbound uploads.
//!
//! Everything here is a pure function of its inputs: the declared file name,
//! the declared MIME type and the raw bytes. Supported types and their limits
//! live in [`CONTENT_RULES`]; adding a type is a data edit.

use std::fmt;

const MIB: usize = 1024 * 1024;
pub const MAX_FILE_NAME_LEN: usize = 255;

/// The content types the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Jpeg,
    Png,
    Pdf,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        self.rule().mime
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        CONTENT_RULES
            .iter()
            .find(|r| r.mime.eq_ignore_ascii_case(mime))
            .map(|r| r.content_type)
    }

    fn rule(&self) -> &'static ContentRule {
        CONTENT_RULES
            .iter()
            .find(|r| r.content_type == *self)
            .unwrap_or(&CONTENT_RULES[0])
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

pub struct ContentRule {
    pub content_type: ContentType,
    pub mime: &'static str,
    pub signatures: &'static [[u8; 4]],
    pub max_bytes: usize,
}

pub static CONTENT_RULES: &[ContentRule] = &[
    ContentRule {
        content_type: ContentType::Jpeg,
        mime: "image/jpeg",
        signatures: &[[0xFF, 0xD8, 0xFF, 0xE0], [0xFF, 0xD8, 0xFF, 0xE1]],
        max_bytes: 5 * MIB,
    },
    ContentRule {
        content_type: ContentType::Png,
        mime: "image/png",
        signatures: &[[0x89, 0x50, 0x4E, 0x47]],
        max_bytes: 5 * MIB,
    },
    ContentRule {
        content_type: ContentType::Pdf,
        mime: "application/pdf",
        signatures: &[[0x25, 0x50, 0x44, 0x46]],
        max_bytes: 10 * MIB,
    },
];

/// Why an upload was rejected. Each variant renders an actionable message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid file name: use 1 to 255 letters, digits, spaces, '.', '_' or '-'")]
    InvalidFileName,
    #[error("File type '{0}' is not allowed")]
    UnsupportedType(String),
    #[error(
        "File size {} exceeds the {} limit for {content_type}",
        display_size(.size),
        display_size(.limit)
    )]
    Oversized {
        content_type: ContentType,
        size: usize,
        limit: usize,
    },
    #[error("File content does not match declared type '{declared}'")]
    TypeMismatch { declared: String },
}

/// Allowed types and their size ceilings.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    allowed: Vec<(ContentType, usize)>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            allowed: CONTENT_RULES
                .iter()
                .map(|r| (r.content_type, r.max_bytes))
                .collect(),
        }
    }
}

impl ContentPolicy {
    /// Restrict the policy to the given MIME types. Unknown entries are ignored.
    pub fn with_allowed<S: AsRef<str>>(mut self, mimes: &[S]) -> Self {
        let wanted: Vec<ContentType> = mimes
            .iter()
            .filter_map(|m| ContentType::from_mime(m.as_ref()))
            .collect();
        self.allowed.retain(|(t, _)| wanted.contains(t));
        self
    }

    pub fn with_ceiling(mut self, content_type: ContentType, max_bytes: usize) -> Self {
        if let Some(entry) = self.allowed.iter_mut().find(|(t, _)| *t == content_type) {
            entry.1 = max_bytes;
        }
        self
    }

    pub fn ceiling(&self, content_type: ContentType) -> Option<usize> {
        self.allowed
            .iter()
            .find(|(t, _)| *t == content_type)
            .map(|(_, max)| *max)
    }

    /// Largest ceiling across allowed types; bounds how much of a request body is buffered.
    pub fn max_upload_bytes(&self) -> usize {
        self.allowed.iter().map(|(_, max)| *max).max().unwrap_or(0)
    }

    pub fn validate(
        &self,
        bytes: &[u8],
        declared_mime: &str,
        declared_name: &str,
    ) -> Result<ContentType, ValidationFailure> {
        if !is_valid_file_name(declared_name) {
            return Err(ValidationFailure::InvalidFileName);
        }

        let content_type = ContentType::from_mime(declared_mime)
            .filter(|t| self.ceiling(*t).is_some())
            .ok_or_else(|| ValidationFailure::UnsupportedType(declared_mime.to_string()))?;

        let limit = self.ceiling(content_type).unwrap_or(0);
        if bytes.len() > limit {
            return Err(ValidationFailure::Oversized {
                content_type,
                size: bytes.len(),
                limit,
            });
        }

        if !matches_signature(bytes, content_type) {
            return Err(ValidationFailure::TypeMismatch {
                declared: content_type.mime().to_string(),
            });
        }

        Ok(content_type)
    }
}

pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_FILE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
}

pub fn matches_signature(bytes: &[u8], content_type: ContentType) -> bool {
    let Some(header) = bytes.get(..4) else {
        return false;
    };
    content_type
        .rule()
        .signatures
        .iter()
        .any(|sig| sig[..] == *header)
}

fn display_size(bytes: &usize) -> String {
    readable_file_size(*bytes as u64)
}

/// Human readable size in base-1024 units with two decimals.
pub fn readable_file_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
