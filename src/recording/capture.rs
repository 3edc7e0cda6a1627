// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Real-time MIDI capture.
//!
//! A [`CaptureSession`] timestamps every accepted input message against
//! the instant recording started and appends it to an arrival-ordered log.
//! Capture is lossy-safe: anything it cannot classify is dropped and
//! logged, never reported back to the input callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{RecordingError, Result};
use crate::midi::{controllers, messages};
use crate::timing::TempoProvider;

use super::export::SmfEncoder;

/// Payload of a captured event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Note on or note off
    Note {
        note: u8,
        velocity: u8,
        is_note_on: bool,
    },
    /// Control change (recorded controllers only)
    ControlChange { controller: u8, value: u8 },
    /// Polyphonic aftertouch
    Aftertouch { note: u8, pressure: u8 },
    /// Channel pressure
    ChannelPressure { pressure: u8 },
}

impl EventKind {
    /// Classify a raw message into its channel and payload.
    ///
    /// Returns `Ok(None)` for status bytes the recorder does not keep and
    /// `Err(MalformedInput)` for kept message types that are truncated.
    pub fn parse(data: &[u8]) -> Result<Option<(u8, EventKind)>> {
        let Some(&status) = data.first() else {
            return Err(RecordingError::MalformedInput(Vec::new()));
        };

        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        let needed = match msg_type {
            messages::NOTE_OFF
            | messages::NOTE_ON
            | messages::POLY_AFTERTOUCH
            | messages::CONTROL_CHANGE => 3,
            messages::CHANNEL_AFTERTOUCH => 2,
            _ => return Ok(None),
        };

        if data.len() < needed {
            return Err(RecordingError::MalformedInput(data.to_vec()));
        }

        let kind = match msg_type {
            messages::NOTE_OFF | messages::NOTE_ON => EventKind::Note {
                note: data[1],
                velocity: data[2],
                // Note On with velocity 0 is equivalent to Note Off
                is_note_on: msg_type == messages::NOTE_ON && data[2] > 0,
            },
            messages::CONTROL_CHANGE => EventKind::ControlChange {
                controller: data[1],
                value: data[2],
            },
            messages::POLY_AFTERTOUCH => EventKind::Aftertouch {
                note: data[1],
                pressure: data[2],
            },
            _ => EventKind::ChannelPressure { pressure: data[1] },
        };

        Ok(Some((channel, kind)))
    }
}

/// A captured performance event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedEvent {
    /// Milliseconds since recording started
    pub time_ms: f64,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Event payload
    pub kind: EventKind,
}

impl CapturedEvent {
    /// Create a new captured event
    pub fn new(time_ms: f64, channel: u8, kind: EventKind) -> Self {
        Self {
            time_ms,
            channel,
            kind,
        }
    }

    pub fn note_on(time_ms: f64, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            time_ms,
            channel,
            EventKind::Note {
                note,
                velocity,
                is_note_on: true,
            },
        )
    }

    pub fn note_off(time_ms: f64, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            time_ms,
            channel,
            EventKind::Note {
                note,
                velocity,
                is_note_on: false,
            },
        )
    }

    pub fn control_change(time_ms: f64, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(time_ms, channel, EventKind::ControlChange { controller, value })
    }

    pub fn aftertouch(time_ms: f64, channel: u8, note: u8, pressure: u8) -> Self {
        Self::new(time_ms, channel, EventKind::Aftertouch { note, pressure })
    }

    pub fn channel_pressure(time_ms: f64, channel: u8, pressure: u8) -> Self {
        Self::new(time_ms, channel, EventKind::ChannelPressure { pressure })
    }

    /// Whether this is a sounding note on
    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, EventKind::Note { is_note_on: true, .. })
    }
}

/// What the session did with one raw message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Appended to the log
    Captured,
    /// Session was not recording
    NotRecording,
    /// Control change for a controller that is not recorded
    Filtered,
    /// Message type the recorder does not keep
    Ignored,
    /// Truncated or empty message
    Malformed,
}

/// Recording session for capturing input to an event log
#[derive(Debug, Default)]
pub struct CaptureSession {
    /// Actively recording
    recording: bool,
    /// Instant recording started
    start: Option<Instant>,
    /// Captured events in arrival order
    events: Vec<CapturedEvent>,
}

impl CaptureSession {
    /// Create an empty, stopped session
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording now, discarding the previous log
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Start recording with `start` as time zero, discarding the previous log.
    ///
    /// Lets a caller line recording up with an already running metronome.
    pub fn start_at(&mut self, start: Instant) {
        if !self.events.is_empty() {
            tracing::debug!("Discarding {} unsaved events", self.events.len());
        }
        self.events.clear();
        self.start = Some(start);
        self.recording = true;
        tracing::info!("Recording started");
    }

    /// Stop recording; the log is kept for export
    pub fn stop(&mut self) {
        if self.recording {
            tracing::info!("Recording stopped with {} events", self.events.len());
        }
        self.recording = false;
    }

    /// Clear recorded events; also stops recording
    pub fn clear(&mut self) {
        self.events.clear();
        self.recording = false;
    }

    /// Capture a raw message received now
    pub fn ingest(&mut self, data: &[u8]) -> IngestOutcome {
        self.ingest_at(data, Instant::now())
    }

    /// Capture a raw message received at `now`
    pub fn ingest_at(&mut self, data: &[u8], now: Instant) -> IngestOutcome {
        if !self.recording {
            return IngestOutcome::NotRecording;
        }

        let (channel, kind) = match EventKind::parse(data) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => {
                tracing::trace!("Ignoring MIDI message {:02X?}", data);
                return IngestOutcome::Ignored;
            }
            Err(e) => {
                tracing::debug!("Dropping input: {}", e);
                return IngestOutcome::Malformed;
            }
        };

        if let EventKind::ControlChange { controller, .. } = kind {
            if !controllers::is_recorded(controller) {
                tracing::trace!("Dropping CC {} on channel {}", controller, channel);
                return IngestOutcome::Filtered;
            }
        }

        let time_ms = self
            .start
            .map(|start| now.saturating_duration_since(start).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        self.events.push(CapturedEvent::new(time_ms, channel, kind));
        IngestOutcome::Captured
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Instant recording last started
    pub fn start_instant(&self) -> Option<Instant> {
        self.start
    }

    /// Get captured events in arrival order
    pub fn events(&self) -> &[CapturedEvent] {
        &self.events
    }

    /// Copy of the log for encoding
    pub fn snapshot(&self) -> Vec<CapturedEvent> {
        self.events.clone()
    }

    /// Number of captured events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of sounding note ons
    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_note_on()).count()
    }

    /// Timestamp of the latest event, in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.time_ms.max(0.0))
            .fold(0.0, f64::max)
    }
}

/// Capture session shared between the input callback and the control thread
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<CaptureSession>>,
}

impl SharedSession {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    // Every mutation leaves the session consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, CaptureSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self) {
        self.lock().start();
    }

    pub fn start_at(&self, start: Instant) {
        self.lock().start_at(start);
    }

    pub fn stop(&self) {
        self.lock().stop();
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn ingest(&self, data: &[u8]) -> IngestOutcome {
        self.lock().ingest(data)
    }

    pub fn ingest_at(&self, data: &[u8], now: Instant) -> IngestOutcome {
        self.lock().ingest_at(data, now)
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_recording()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn note_on_count(&self) -> usize {
        self.lock().note_on_count()
    }

    pub fn snapshot(&self) -> Vec<CapturedEvent> {
        self.lock().snapshot()
    }

    /// Stop recording and encode a snapshot of the log.
    ///
    /// An empty log fails with `EmptyRecording` and leaves the session
    /// armed. Otherwise the lock is released before encoding, so input
    /// arriving meanwhile is simply not recorded. The log stays intact
    /// whether or not encoding succeeds.
    pub fn export<T: TempoProvider + ?Sized>(&self, tempo: &T) -> Result<Vec<u8>> {
        let events = {
            let mut session = self.lock();
            if session.is_empty() {
                return Err(RecordingError::EmptyRecording);
            }
            session.stop();
            session.snapshot()
        };

        SmfEncoder::new(tempo.tempo_signature()).encode(&events)
    }
}
