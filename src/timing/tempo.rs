// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo and time signature snapshot.
//!
//! The recorder never tracks tempo changes while capturing. Whatever
//! tempo is current when an export is requested is applied to the whole
//! recording, and written once as a global meta-event.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Ticks per quarter note used for every exported file
pub const DIVISION: u16 = 480;

/// Lowest accepted tempo
pub const MIN_BPM: u16 = 20;
/// Highest accepted tempo
pub const MAX_BPM: u16 = 300;

/// Largest accepted time signature numerator
pub const MAX_BEATS_PER_MEASURE: u8 = 32;

/// Beat units representable as a power-of-two denominator
pub const VALID_BEAT_UNITS: [u8; 7] = [1, 2, 4, 8, 16, 32, 64];

/// Tempo and time signature as of a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoSignature {
    /// Beats per minute (20-300)
    pub bpm: u16,
    /// Time signature numerator (1-32)
    pub beats_per_measure: u8,
    /// Time signature denominator as a note value (1, 2, 4, ... 64)
    pub beat_unit: u8,
}

impl TempoSignature {
    /// Create a snapshot, saturating bpm and numerator into range.
    ///
    /// The beat unit is kept as given; use [`normalized_beat_unit`]
    /// to read it back in a form the file format can express.
    ///
    /// [`normalized_beat_unit`]: TempoSignature::normalized_beat_unit
    pub fn new(bpm: u16, beats_per_measure: u8, beat_unit: u8) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            beats_per_measure: beats_per_measure.clamp(1, MAX_BEATS_PER_MEASURE),
            beat_unit,
        }
    }

    /// Beat unit, with anything that is not a power of two up to 64 forced to 4
    pub fn normalized_beat_unit(&self) -> u8 {
        if VALID_BEAT_UNITS.contains(&self.beat_unit) {
            self.beat_unit
        } else {
            4
        }
    }

    /// log2 of the normalized beat unit, as stored in the time signature meta-event
    pub fn beat_unit_exponent(&self) -> u8 {
        self.normalized_beat_unit().trailing_zeros() as u8
    }

    /// Microseconds per quarter note, as stored in the tempo meta-event
    pub fn micros_per_quarter(&self) -> u32 {
        60_000_000 / u32::from(self.bpm.max(1))
    }
}

impl Default for TempoSignature {
    fn default() -> Self {
        Self {
            bpm: 120,
            beats_per_measure: 4,
            beat_unit: 4,
        }
    }
}

/// Source of the tempo applied at export time
pub trait TempoProvider {
    /// Current tempo and time signature
    fn tempo_signature(&self) -> TempoSignature;
}

impl TempoProvider for TempoSignature {
    fn tempo_signature(&self) -> TempoSignature {
        *self
    }
}

/// Tempo provider that can be updated while a recording runs
#[derive(Debug, Clone, Default)]
pub struct SharedTempo {
    inner: Arc<RwLock<TempoSignature>>,
}

impl SharedTempo {
    pub fn new(tempo: TempoSignature) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tempo)),
        }
    }

    /// Replace the current tempo
    pub fn set(&self, tempo: TempoSignature) {
        match self.inner.write() {
            Ok(mut current) => *current = tempo,
            Err(poisoned) => *poisoned.into_inner() = tempo,
        }
    }
}

impl TempoProvider for SharedTempo {
    fn tempo_signature(&self) -> TempoSignature {
        match self.inner.read() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Convert a millisecond offset into ticks at the given tempo.
///
/// Negative and NaN offsets count as zero.
pub fn ms_to_ticks(ms: f64, bpm: u16) -> u64 {
    let ms = ms.max(0.0);
    (ms * f64::from(DIVISION) * f64::from(bpm) / 60_000.0).floor() as u64
}

/// Tap tempo calculator
#[derive(Debug, Clone)]
pub struct TapTempo {
    /// Recent tap times
    taps: Vec<Instant>,
    /// Maximum number of taps to average
    max_taps: usize,
    /// Idle time after which the tap history starts over
    timeout: Duration,
}

impl TapTempo {
    /// Shortest interval considered a real tap (600 BPM)
    const MIN_INTERVAL: Duration = Duration::from_millis(100);
    /// Longest interval considered a real tap (20 BPM)
    const MAX_INTERVAL: Duration = Duration::from_millis(3000);

    /// Create a new tap tempo calculator
    pub fn new(max_taps: usize, timeout_ms: u64) -> Self {
        Self {
            taps: Vec::with_capacity(max_taps),
            max_taps: max_taps.max(2),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Record a tap now
    pub fn tap(&mut self) -> Option<u16> {
        self.tap_at(Instant::now())
    }

    /// Record a tap at `now` and return the BPM if it can be computed
    pub fn tap_at(&mut self, now: Instant) -> Option<u16> {
        if let Some(last) = self.taps.last() {
            if now.saturating_duration_since(*last) >= self.timeout {
                self.taps.clear();
            }
        }

        self.taps.push(now);

        if self.taps.len() > self.max_taps {
            self.taps.remove(0);
        }

        if self.taps.len() < 2 {
            return None;
        }

        let intervals: Vec<Duration> = self
            .taps
            .windows(2)
            .map(|w| w[1].saturating_duration_since(w[0]))
            .filter(|d| *d >= Self::MIN_INTERVAL && *d <= Self::MAX_INTERVAL)
            .collect();

        if intervals.is_empty() {
            return None;
        }

        let avg_ms = intervals.iter().map(|d| d.as_secs_f64() * 1000.0).sum::<f64>()
            / intervals.len() as f64;
        let bpm = (60_000.0 / avg_ms).round();

        if bpm >= f64::from(MIN_BPM) && bpm <= f64::from(MAX_BPM) {
            Some(bpm as u16)
        } else {
            None
        }
    }

    /// Number of taps currently held
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Reset the tap tempo
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(8, 3000) // Average up to 8 taps, 3 second timeout
    }
}
