// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording and export system.
//!
//! This module provides:
//! - Timestamped capture of live MIDI input
//! - Standard MIDI file export
//! - A reader for checking exported files

pub mod capture;
pub mod export;
pub mod inspect;

pub use capture::{CaptureSession, CapturedEvent, EventKind, IngestOutcome, SharedSession};
pub use export::{
    encode_smf, read_variable_length, recording_filename, save_to_dir, write_variable_length,
    SmfEncoder,
};
pub use inspect::{SmfSummary, TrackEvent, TrackSummary};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TempoSignature;

    #[test]
    fn test_session_creation() {
        let session = CaptureSession::new();
        assert!(!session.is_recording());
    }

    #[test]
    fn test_encoder_creation() {
        let encoder = SmfEncoder::new(TempoSignature::default());
        assert_eq!(encoder.tempo().bpm, 120);
    }

    #[test]
    fn test_capture_to_file() {
        let mut session = CaptureSession::new();
        let start = std::time::Instant::now();
        session.start_at(start);
        session.ingest_at(&[0x90, 60, 100], start);
        session.ingest_at(&[0x80, 60, 0], start + std::time::Duration::from_millis(500));
        session.stop();

        let bytes = encode_smf(&session.snapshot(), TempoSignature::default()).unwrap();
        let summary = SmfSummary::parse(&bytes).unwrap();
        assert_eq!(summary.tracks[1].end_tick(), 480);
    }
}
