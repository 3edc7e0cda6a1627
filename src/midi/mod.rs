// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input abstraction layer.
//!
//! This module provides the message constants shared by capture and
//! export, and a trait-based abstraction for anything that delivers raw
//! MIDI messages into a recording session.

#[cfg(feature = "live-input")]
pub mod input;

use anyhow::Result;

use crate::recording::SharedSession;

#[cfg(feature = "live-input")]
pub use input::{list_sources, print_sources, MidiInput};

/// Trait for raw MIDI message sources.
///
/// A source delivers every message it receives into the attached session
/// via [`SharedSession::ingest`], from whatever thread it runs its
/// callbacks on. Whether the message is kept is up to the session.
pub trait EventSource {
    /// Start delivering messages into `session`.
    ///
    /// # Returns
    /// * `Ok(())` once the source is connected
    /// * `Err` if the underlying device could not be opened
    fn attach(&mut self, session: SharedSession) -> Result<()>;

    /// Stop delivering messages. Does nothing if not attached.
    fn detach(&mut self);

    /// Whether the source is currently attached to a session
    fn is_attached(&self) -> bool;
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const ACTIVE_SENSING: u8 = 0xFE;

    // Meta events (file only)
    pub const META: u8 = 0xFF;
    pub const META_END_OF_TRACK: u8 = 0x2F;
    pub const META_SET_TEMPO: u8 = 0x51;
    pub const META_TIME_SIGNATURE: u8 = 0x58;
}

/// Controllers kept by the recorder; every other CC is dropped at capture
pub mod controllers {
    pub const MODULATION: u8 = 1;
    pub const VOLUME: u8 = 7;
    pub const EXPRESSION: u8 = 11;
    pub const SUSTAIN: u8 = 64;

    /// All recorded controllers
    pub const RECORDED: [u8; 4] = [SUSTAIN, MODULATION, VOLUME, EXPRESSION];

    /// Whether a controller number is recorded
    pub fn is_recorded(controller: u8) -> bool {
        RECORDED.contains(&controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::CaptureSession;

    /// In-memory source that replays a fixed list of messages on attach
    struct MockSource {
        messages: Vec<Vec<u8>>,
        session: Option<SharedSession>,
    }

    impl MockSource {
        fn new(messages: Vec<Vec<u8>>) -> Self {
            Self {
                messages,
                session: None,
            }
        }
    }

    impl EventSource for MockSource {
        fn attach(&mut self, session: SharedSession) -> Result<()> {
            for message in &self.messages {
                session.ingest(message);
            }
            self.session = Some(session);
            Ok(())
        }

        fn detach(&mut self) {
            self.session = None;
        }

        fn is_attached(&self) -> bool {
            self.session.is_some()
        }
    }

    #[test]
    fn test_mock_source_delivers_into_session() {
        let session = SharedSession::new(CaptureSession::new());
        session.start();

        let mut source = MockSource::new(vec![
            vec![messages::NOTE_ON, 60, 100],
            vec![messages::CONTROL_CHANGE, 20, 5],
            vec![messages::NOTE_OFF, 60, 0],
        ]);
        source.attach(session.clone()).unwrap();
        assert!(source.is_attached());

        // CC 20 is not recorded
        assert_eq!(session.len(), 2);

        source.detach();
        assert!(!source.is_attached());
    }

    #[test]
    fn test_source_ignored_while_stopped() {
        let session = SharedSession::new(CaptureSession::new());

        let mut source = MockSource::new(vec![vec![messages::NOTE_ON, 60, 100]]);
        source.attach(session.clone()).unwrap();

        assert!(session.is_empty());
    }

    #[test]
    fn test_recorded_controllers() {
        assert!(controllers::is_recorded(controllers::SUSTAIN));
        assert!(controllers::is_recorded(controllers::MODULATION));
        assert!(controllers::is_recorded(controllers::VOLUME));
        assert!(controllers::is_recorded(controllers::EXPRESSION));
        assert!(!controllers::is_recorded(20));
        assert!(!controllers::is_recorded(0));
    }

    #[test]
    fn test_midi_message_constants() {
        assert_eq!(messages::NOTE_ON, 0x90);
        assert_eq!(messages::NOTE_OFF, 0x80);
        assert_eq!(messages::CONTROL_CHANGE, 0xB0);
        assert_eq!(messages::META_SET_TEMPO, 0x51);
        assert_eq!(messages::META_TIME_SIGNATURE, 0x58);
    }
}
