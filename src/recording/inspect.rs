// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file reader.
//!
//! Walks the chunks of an exported file and decodes each track's events
//! with absolute tick positions. Understands the subset of the format the
//! exporter writes: channel voice messages without running status and
//! meta-events.

use std::fmt;

use crate::error::{RecordingError, Result};
use crate::midi::messages;

use super::export::read_variable_length;

/// One decoded track event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Delta-time from the previous event
    pub delta: u32,
    /// Absolute tick
    pub tick: u64,
    /// Status and data bytes (meta-events include type and length)
    pub data: Vec<u8>,
}

impl TrackEvent {
    /// Whether this is a meta-event of the given type
    pub fn is_meta(&self, meta_type: u8) -> bool {
        self.data.len() >= 2 && self.data[0] == messages::META && self.data[1] == meta_type
    }
}

/// One decoded `MTrk` chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    /// Length declared in the chunk header
    pub length: u32,
    /// Events in file order
    pub events: Vec<TrackEvent>,
}

impl TrackSummary {
    /// Tick of the last event
    pub fn end_tick(&self) -> u64 {
        self.events.last().map(|e| e.tick).unwrap_or(0)
    }

    /// Whether the track is terminated by an end-of-track meta-event
    pub fn is_terminated(&self) -> bool {
        self.events
            .last()
            .map(|e| e.is_meta(messages::META_END_OF_TRACK))
            .unwrap_or(false)
    }
}

/// Decoded Standard MIDI file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfSummary {
    /// File format (0, 1 or 2)
    pub format: u16,
    /// Ticks per quarter note
    pub division: u16,
    /// Tracks in file order
    pub tracks: Vec<TrackSummary>,
}

impl SmfSummary {
    /// Parse a complete file
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = ChunkReader { bytes, pos: 0 };

        let (tag, header) = reader.chunk()?;
        if tag != *b"MThd" || header.len() != 6 {
            return Err(invalid("missing MThd header"));
        }

        let format = u16::from_be_bytes([header[0], header[1]]);
        let track_count = u16::from_be_bytes([header[2], header[3]]);
        let division = u16::from_be_bytes([header[4], header[5]]);

        let mut tracks = Vec::with_capacity(track_count as usize);
        for _ in 0..track_count {
            let (tag, payload) = reader.chunk()?;
            if tag != *b"MTrk" {
                return Err(invalid("expected MTrk chunk"));
            }
            tracks.push(TrackSummary {
                length: payload.len() as u32,
                events: parse_track(payload)?,
            });
        }

        if reader.pos != bytes.len() {
            return Err(invalid("trailing bytes after last track"));
        }

        Ok(Self {
            format,
            division,
            tracks,
        })
    }

    /// Tempo from the first set-tempo meta-event, in microseconds per quarter
    pub fn micros_per_quarter(&self) -> Option<u32> {
        self.meta_payload(messages::META_SET_TEMPO)
            .filter(|p| p.len() == 3)
            .map(|p| u32::from_be_bytes([0, p[0], p[1], p[2]]))
    }

    /// Time signature as (numerator, denominator) from the first time signature meta-event
    pub fn time_signature(&self) -> Option<(u8, u16)> {
        self.meta_payload(messages::META_TIME_SIGNATURE)
            .filter(|p| p.len() == 4 && p[1] < 16)
            .map(|p| (p[0], 1u16 << p[1]))
    }

    /// Number of channel voice events across all tracks
    pub fn channel_event_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|t| &t.events)
            .filter(|e| e.data.first().map(|s| *s < 0xF0).unwrap_or(false))
            .count()
    }

    fn meta_payload(&self, meta_type: u8) -> Option<&[u8]> {
        self.tracks
            .iter()
            .flat_map(|t| &t.events)
            .find(|e| e.is_meta(meta_type))
            .and_then(|e| e.data.get(3..))
    }
}

impl fmt::Display for SmfSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "format {}, {} tracks, {} ticks/quarter",
            self.format,
            self.tracks.len(),
            self.division
        )?;
        if let Some((num, den)) = self.time_signature() {
            write!(f, ", {}/{}", num, den)?;
        }
        if let Some(micros) = self.micros_per_quarter() {
            write!(f, ", {} us/quarter", micros)?;
        }
        write!(f, ", {} events", self.channel_event_count())
    }
}

struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    fn chunk(&mut self) -> Result<([u8; 4], &'a [u8])> {
        let bytes: &'a [u8] = self.bytes;
        let rest = &bytes[self.pos..];
        if rest.len() < 8 {
            return Err(invalid("truncated chunk header"));
        }

        let tag = [rest[0], rest[1], rest[2], rest[3]];
        let length = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let payload = rest
            .get(8..8 + length)
            .ok_or_else(|| invalid("chunk length exceeds file"))?;

        self.pos += 8 + length;
        Ok((tag, payload))
    }
}

fn parse_track(payload: &[u8]) -> Result<Vec<TrackEvent>> {
    let mut events = Vec::new();
    let mut pos = 0;
    let mut tick = 0u64;

    while pos < payload.len() {
        let (delta, used) = read_variable_length(&payload[pos..])
            .ok_or_else(|| invalid("bad delta-time"))?;
        pos += used;
        tick += u64::from(delta);

        let status = *payload.get(pos).ok_or_else(|| invalid("missing status byte"))?;
        let len = match status {
            messages::META => {
                let length = *payload
                    .get(pos + 2)
                    .ok_or_else(|| invalid("truncated meta-event"))?;
                3 + length as usize
            }
            s if s & 0xF0 == messages::PROGRAM_CHANGE || s & 0xF0 == messages::CHANNEL_AFTERTOUCH => 2,
            s if (0x80..0xF0).contains(&s) => 3,
            _ => return Err(invalid("unsupported status byte")),
        };

        let data = payload
            .get(pos..pos + len)
            .ok_or_else(|| invalid("truncated event"))?;
        events.push(TrackEvent {
            delta,
            tick,
            data: data.to_vec(),
        });
        pos += len;
    }

    Ok(events)
}

fn invalid(reason: &str) -> RecordingError {
    RecordingError::InvalidFile(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{encode_smf, CapturedEvent};
    use crate::timing::TempoSignature;

    #[test]
    fn test_parse_exported_file() {
        let events = [
            CapturedEvent::note_on(0.0, 0, 60, 100),
            CapturedEvent::control_change(250.0, 0, 64, 127),
            CapturedEvent::note_off(500.0, 0, 60, 0),
        ];
        let bytes = encode_smf(&events, TempoSignature::new(120, 6, 8)).unwrap();
        let summary = SmfSummary::parse(&bytes).unwrap();

        assert_eq!(summary.format, 1);
        assert_eq!(summary.division, 480);
        assert_eq!(summary.tracks.len(), 2);
        assert_eq!(summary.time_signature(), Some((6, 8)));
        assert_eq!(summary.micros_per_quarter(), Some(500_000));
        assert_eq!(summary.channel_event_count(), 3);

        let track = &summary.tracks[1];
        assert!(track.is_terminated());
        let ticks: Vec<u64> = track.events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 240, 480, 480]);
    }

    #[test]
    fn test_meta_track_terminated() {
        let events = [CapturedEvent::note_on(0.0, 0, 60, 100)];
        let bytes = encode_smf(&events, TempoSignature::default()).unwrap();
        let summary = SmfSummary::parse(&bytes).unwrap();

        let meta = &summary.tracks[0];
        assert_eq!(meta.events.len(), 3);
        assert!(meta.events[0].is_meta(messages::META_TIME_SIGNATURE));
        assert!(meta.events[1].is_meta(messages::META_SET_TEMPO));
        assert!(meta.is_terminated());
        assert_eq!(meta.end_tick(), 0);
    }

    #[test]
    fn test_display() {
        let events = [CapturedEvent::note_on(0.0, 0, 60, 100)];
        let bytes = encode_smf(&events, TempoSignature::default()).unwrap();
        let summary = SmfSummary::parse(&bytes).unwrap();

        assert_eq!(
            summary.to_string(),
            "format 1, 2 tracks, 480 ticks/quarter, 4/4, 500000 us/quarter, 1 events"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(SmfSummary::parse(b"").is_err());
        assert!(SmfSummary::parse(b"RIFF\x00\x00\x00\x06abcdef").is_err());
    }

    #[test]
    fn test_rejects_bad_track_length() {
        let events = [CapturedEvent::note_on(0.0, 0, 60, 100)];
        let mut bytes = encode_smf(&events, TempoSignature::default()).unwrap();
        let last = bytes.len() - 1;
        bytes.truncate(last);

        assert!(matches!(
            SmfSummary::parse(&bytes),
            Err(RecordingError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let events = [CapturedEvent::note_on(0.0, 0, 60, 100)];
        let mut bytes = encode_smf(&events, TempoSignature::default()).unwrap();
        bytes.push(0);

        assert!(SmfSummary::parse(&bytes).is_err());
    }
}
