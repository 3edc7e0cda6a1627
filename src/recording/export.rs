// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Writes a captured log as a Type 1 file with two tracks: a tempo track
//! holding the time signature and tempo, and one track with every
//! captured event in time order. Division is fixed at 480 ticks per
//! quarter note and the tempo is applied to the whole recording.

use std::cmp::Ordering;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{RecordingError, Result};
use crate::midi::messages;
use crate::timing::{ms_to_ticks, TempoSignature, DIVISION};

use super::capture::{CapturedEvent, EventKind};

/// Largest value a four-byte variable-length quantity can hold
pub const MAX_VARIABLE_LENGTH: u32 = 0x0FFF_FFFF;

/// Size of the `MThd` chunk including its tag and length
pub const HEADER_CHUNK_LEN: usize = 14;

/// Fixed release velocity written for every note off
const NOTE_OFF_VELOCITY: u8 = 0x40;

/// MIDI event for export
#[derive(Debug, Clone, PartialEq)]
struct MidiExportEvent {
    /// Absolute tick
    tick: u64,
    /// Event data
    data: Vec<u8>,
}

impl MidiExportEvent {
    fn note_on(tick: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            data: vec![messages::NOTE_ON | (channel & 0x0F), note.min(127), velocity.clamp(1, 127)],
        }
    }

    fn note_off(tick: u64, channel: u8, note: u8) -> Self {
        Self {
            tick,
            data: vec![messages::NOTE_OFF | (channel & 0x0F), note.min(127), NOTE_OFF_VELOCITY],
        }
    }

    fn control_change(tick: u64, channel: u8, controller: u8, value: u8) -> Self {
        Self {
            tick,
            data: vec![messages::CONTROL_CHANGE | (channel & 0x0F), controller.min(127), value.min(127)],
        }
    }

    fn aftertouch(tick: u64, channel: u8, note: u8, pressure: u8) -> Self {
        Self {
            tick,
            data: vec![messages::POLY_AFTERTOUCH | (channel & 0x0F), note.min(127), pressure.min(127)],
        }
    }

    fn channel_pressure(tick: u64, channel: u8, pressure: u8) -> Self {
        Self {
            tick,
            data: vec![messages::CHANNEL_AFTERTOUCH | (channel & 0x0F), pressure.min(127)],
        }
    }

    fn from_captured(tick: u64, event: &CapturedEvent) -> Self {
        let channel = event.channel;
        match event.kind {
            EventKind::Note {
                note,
                velocity,
                is_note_on: true,
            } => Self::note_on(tick, channel, note, velocity),
            EventKind::Note {
                note,
                is_note_on: false,
                ..
            } => Self::note_off(tick, channel, note),
            EventKind::ControlChange { controller, value } => {
                Self::control_change(tick, channel, controller, value)
            }
            EventKind::Aftertouch { note, pressure } => {
                Self::aftertouch(tick, channel, note, pressure)
            }
            EventKind::ChannelPressure { pressure } => {
                Self::channel_pressure(tick, channel, pressure)
            }
        }
    }

    fn tempo(tick: u64, micros_per_quarter: u32) -> Self {
        Self {
            tick,
            data: vec![
                messages::META, messages::META_SET_TEMPO, 0x03,
                ((micros_per_quarter >> 16) & 0xFF) as u8,
                ((micros_per_quarter >> 8) & 0xFF) as u8,
                (micros_per_quarter & 0xFF) as u8,
            ],
        }
    }

    fn time_signature(tick: u64, numerator: u8, denominator_power: u8) -> Self {
        Self {
            tick,
            data: vec![
                messages::META, messages::META_TIME_SIGNATURE, 0x04,
                numerator,
                denominator_power,
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per MIDI quarter note
            ],
        }
    }

    fn end_of_track() -> Self {
        Self {
            tick: 0, // Will be set correctly during writing
            data: vec![messages::META, messages::META_END_OF_TRACK, 0x00],
        }
    }
}

/// Encoder from a captured log to Standard MIDI file bytes.
///
/// Holds only the tempo snapshot; encoding the same log twice yields the
/// same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfEncoder {
    tempo: TempoSignature,
}

impl SmfEncoder {
    /// Create an encoder for the given tempo snapshot
    pub fn new(tempo: TempoSignature) -> Self {
        Self { tempo }
    }

    /// Tempo snapshot in use
    pub fn tempo(&self) -> TempoSignature {
        self.tempo
    }

    /// Encode `events` into a complete file.
    ///
    /// Fails with `EmptyRecording` before producing anything if `events`
    /// is empty.
    pub fn encode(&self, events: &[CapturedEvent]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(events, &mut buffer)?;
        Ok(buffer)
    }

    /// Encode `events` and write the file to `writer`.
    ///
    /// The whole file is assembled in memory first, so a failed check
    /// never leaves a partial file in the writer.
    pub fn write<W: Write>(&self, events: &[CapturedEvent], writer: &mut W) -> Result<()> {
        if events.is_empty() {
            return Err(RecordingError::EmptyRecording);
        }

        let mut file = Vec::new();
        self.write_header(&mut file)?;

        let meta_events = [
            MidiExportEvent::time_signature(
                0,
                self.tempo.beats_per_measure,
                self.tempo.beat_unit_exponent(),
            ),
            MidiExportEvent::tempo(0, self.tempo.micros_per_quarter()),
        ];
        self.write_track(&mut file, &meta_events)?;

        let performance = self.performance_events(events);
        self.write_track(&mut file, &performance)?;

        writer.write_all(&file)?;
        Ok(())
    }

    /// Sort by time (stable) and convert each event to absolute ticks
    fn performance_events(&self, events: &[CapturedEvent]) -> Vec<MidiExportEvent> {
        let mut sorted: Vec<CapturedEvent> = events
            .iter()
            .map(|e| CapturedEvent {
                time_ms: e.time_ms.max(0.0),
                ..*e
            })
            .collect();
        sorted.sort_by(|a, b| a.time_ms.partial_cmp(&b.time_ms).unwrap_or(Ordering::Equal));

        sorted
            .iter()
            .map(|e| MidiExportEvent::from_captured(ms_to_ticks(e.time_ms, self.tempo.bpm), e))
            .collect()
    }

    /// Write MIDI file header chunk
    fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // MThd
        writer.write_all(b"MThd")?;
        // Chunk length (always 6)
        writer.write_all(&[0, 0, 0, 6])?;
        // Format 1
        writer.write_all(&1u16.to_be_bytes())?;
        // Tempo track + performance track
        writer.write_all(&2u16.to_be_bytes())?;
        // PPQN
        writer.write_all(&DIVISION.to_be_bytes())?;
        Ok(())
    }

    /// Write a track chunk
    fn write_track<W: Write>(&self, writer: &mut W, events: &[MidiExportEvent]) -> io::Result<()> {
        // Build track data
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in events {
            // Ticks only move forward; anything else collapses to a zero delta
            let delta = event.tick.saturating_sub(last_tick);
            let delta = u32::try_from(delta).unwrap_or(u32::MAX);
            write_variable_length(&mut track_data, delta)?;
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        // End of track
        let end_event = MidiExportEvent::end_of_track();
        write_variable_length(&mut track_data, 0)?;
        track_data.extend_from_slice(&end_event.data);

        // MTrk
        writer.write_all(b"MTrk")?;
        // Track length
        let length = track_data.len() as u32;
        writer.write_all(&length.to_be_bytes())?;
        // Track data
        writer.write_all(&track_data)?;

        Ok(())
    }
}

/// Encode `events` at `tempo`
pub fn encode_smf(events: &[CapturedEvent], tempo: TempoSignature) -> Result<Vec<u8>> {
    SmfEncoder::new(tempo).encode(events)
}

/// Write variable-length quantity.
///
/// Values above [`MAX_VARIABLE_LENGTH`] are saturated to it, keeping
/// every quantity within four bytes.
pub fn write_variable_length<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    if value > MAX_VARIABLE_LENGTH {
        tracing::warn!("Delta time {} saturated to {}", value, MAX_VARIABLE_LENGTH);
    }
    let mut value = value.min(MAX_VARIABLE_LENGTH);

    let mut bytes = Vec::with_capacity(4);

    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    writer.write_all(&bytes)
}

/// Read a variable-length quantity from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if the
/// quantity is truncated or longer than four bytes.
pub fn read_variable_length(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;

    for (i, &byte) in bytes.iter().take(4).enumerate() {
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }

    None
}

/// File name for a recording saved at `unix_ms`
pub fn recording_filename(unix_ms: u128) -> String {
    format!("piano-recording-{}.mid", unix_ms)
}

/// Save an encoded file into `dir` under a timestamped name.
///
/// Failures leave the capture session untouched; the caller can retry.
pub fn save_to_dir<P: AsRef<Path>>(dir: P, bytes: &[u8]) -> Result<PathBuf> {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let path = dir.as_ref().join(recording_filename(unix_ms));

    fs::create_dir_all(dir.as_ref())?;
    fs::write(&path, bytes).map_err(|e| {
        tracing::error!("Failed to write {}: {}", path.display(), e);
        RecordingError::Io(e)
    })?;

    tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
