// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the tempo/time signature snapshot read at
//! export time, tap tempo, and millisecond-to-tick conversion.

pub mod tempo;

pub use tempo::{ms_to_ticks, SharedTempo, TapTempo, TempoProvider, TempoSignature, DIVISION};
