// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for recording and export.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingError {
    /// Export was requested with nothing captured
    #[error("No events recorded")]
    EmptyRecording,
    /// A raw input message could not be classified (dropped by capture)
    #[error("Malformed MIDI message: {0:02X?}")]
    MalformedInput(Vec<u8>),
    /// Bytes that are not a well-formed Standard MIDI file
    #[error("Invalid MIDI file: {0}")]
    InvalidFile(String),
    /// Writing the encoded file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecordingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(RecordingError::EmptyRecording.to_string(), "No events recorded");
        assert_eq!(
            RecordingError::MalformedInput(vec![0x90, 0x3C]).to_string(),
            "Malformed MIDI message: [90, 3C]"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: RecordingError = io.into();
        assert!(matches!(err, RecordingError::Io(_)));
    }
}
