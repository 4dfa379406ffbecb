use std::fmt;

/// Failures surfaced by skin loading, note conversion and asset lookup.
///
/// Malformed numbers and absent keys never reach this type: they are
/// coerced to zero or replaced by defaults while parsing.
#[derive(Debug)]
pub enum PlayfieldError {
    /// `Keys` resolved to something below one.
    InvalidKeyCount(i64),
    /// A note or layout query named a column outside `[0, keys)`.
    ColumnOutOfRange { column: i64, keys: usize },
    /// A skin image key has no matching asset.
    AssetMissing { key: String, name: String },
    Io(std::io::Error),
    Image(image::ImageError),
}

impl PlayfieldError {
    /// True for errors that leave the rest of the playfield usable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AssetMissing { .. } | Self::Image(_))
    }
}

impl fmt::Display for PlayfieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyCount(keys) => write!(f, "invalid key count {keys}, expected at least 1"),
            Self::ColumnOutOfRange { column, keys } => {
                write!(f, "column {column} is outside 0..{keys}")
            }
            Self::AssetMissing { key, name } => {
                write!(f, "skin image '{key}' references missing asset '{name}'")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Image(e) => write!(f, "image error: {e}"),
        }
    }
}

impl std::error::Error for PlayfieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlayfieldError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for PlayfieldError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

#[cfg(test)]
mod tests {
    use super::PlayfieldError;

    #[test]
    fn display_names_the_offending_key() {
        let err = PlayfieldError::AssetMissing {
            key: "KeyImage0".to_string(),
            name: "mania-key1".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("KeyImage0") && text.contains("mania-key1"), "got {text}");
        assert!(err.is_recoverable());
        assert!(!PlayfieldError::InvalidKeyCount(0).is_recoverable());
    }
}
