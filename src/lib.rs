// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Piano performance recorder.
//!
//! Captures live MIDI performance events with millisecond timestamps and
//! exports them as Standard MIDI files.

pub mod config;
pub mod error;
pub mod midi;
pub mod recording;
pub mod timing;

pub use error::{RecordingError, Result};
