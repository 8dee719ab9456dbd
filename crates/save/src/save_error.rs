// ---------------------------------------------------------------------------
// SaveError: error types for map save/load and OpenDRIVE exchange
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors that can occur while saving, loading, importing or exporting a map.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// Bitcode encoding failed.
    Encode(String),
    /// Bitcode decoding failed (corrupt or invalid map data).
    Decode(String),
    /// The file header is malformed, from a newer build, or fails its checksum.
    InvalidHeader(String),
    /// Map file version is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// The document is not well-formed XML.
    Xml(String),
    /// Well-formed XML that does not describe a usable road network.
    OpenDrive(String),
    /// No map data was available to load.
    NoData,
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::InvalidHeader(msg) => write!(f, "Invalid file header: {msg}"),
            SaveError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: map is v{found}, but this build only supports up to v{expected_max}"
            ),
            SaveError::Xml(msg) => write!(f, "XML error: {msg}"),
            SaveError::OpenDrive(msg) => write!(f, "OpenDRIVE error: {msg}"),
            SaveError::NoData => write!(f, "No map data available to load"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}

impl From<roxmltree::Error> for SaveError {
    fn from(e: roxmltree::Error) -> Self {
        SaveError::Xml(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_error_display_io() {
        let err = SaveError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let msg = format!("{err}");
        assert!(msg.contains("I/O error"), "got: {msg}");
        assert!(msg.contains("file not found"), "got: {msg}");
    }

    #[test]
    fn test_save_error_display_version_mismatch() {
        let err = SaveError::VersionMismatch {
            expected_max: 1,
            found: 7,
        };
        let msg = format!("{err}");
        assert!(msg.contains("v7"), "got: {msg}");
        assert!(msg.contains("v1"), "got: {msg}");
    }

    #[test]
    fn test_save_error_from_xml() {
        let xml_err = roxmltree::Document::parse("<OpenDRIVE>").unwrap_err();
        let err: SaveError = xml_err.into();
        assert!(matches!(err, SaveError::Xml(_)));
        assert!(format!("{err}").contains("XML error"));
    }

    #[test]
    fn test_save_error_source_only_for_io() {
        let io = SaveError::Io(std::io::Error::new(std::io::ErrorKind::Other, "test"));
        assert!(std::error::Error::source(&io).is_some());
        let decode = SaveError::Decode("bad".to_string());
        assert!(std::error::Error::source(&decode).is_none());
    }
}
