// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI Input handling for receiving messages from a keyboard.
//!
//! Messages arrive on the backend's callback thread and go straight into
//! the attached [`SharedSession`]; the session lock serializes them
//! against start/stop/clear from the control thread.

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInputConnection};

use super::EventSource;
use crate::recording::SharedSession;

const CLIENT_NAME: &str = "pianorec";

/// Which ports an input listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// A single port by index
    One(usize),
    /// Every port present when attaching
    All,
}

/// MIDI Input handler using midir.
///
/// Holds one connection per port. Every connection feeds the same
/// session, so events from several keyboards interleave in one log.
pub struct MidiInput {
    selection: Selection,
    source_names: Vec<String>,
    connections: Vec<MidiInputConnection<SharedSession>>,
}

impl MidiInput {
    /// Look up the input source at `source_index` without connecting yet
    pub fn new(source_index: usize) -> Result<Self> {
        let client = create_client()?;

        let ports = client.ports();
        let port = ports
            .get(source_index)
            .ok_or_else(|| anyhow!("MIDI source {} not found", source_index))?;
        let source_name = client
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", source_index));

        Ok(Self {
            selection: Selection::One(source_index),
            source_names: vec![source_name],
            connections: Vec::new(),
        })
    }

    /// Listen on every available source
    pub fn all() -> Result<Self> {
        let source_names: Vec<String> = list_sources().into_iter().map(|(_, name)| name).collect();
        if source_names.is_empty() {
            return Err(anyhow!("No MIDI sources found"));
        }

        Ok(Self {
            selection: Selection::All,
            source_names,
            connections: Vec::new(),
        })
    }

    /// Display name of the source, or of every source joined
    pub fn name(&self) -> String {
        self.source_names.join(", ")
    }

    /// Number of sources this input covers
    pub fn source_count(&self) -> usize {
        self.source_names.len()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // midir consumes the client on connect, so each port gets its own.
    fn connect(index: usize, session: SharedSession) -> Result<MidiInputConnection<SharedSession>> {
        let mut client = create_client()?;
        // SysEx, clock and active sensing never reach the recorder
        client.ignore(Ignore::All);

        let ports = client.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| anyhow!("MIDI source {} not found", index))?;

        client
            .connect(
                port,
                &format!("pianorec-input-{}", index),
                |_stamp, message, session: &mut SharedSession| {
                    session.ingest(message);
                },
                session,
            )
            .map_err(|e| anyhow!("Failed to connect to source {}: {}", index, e))
    }
}

impl EventSource for MidiInput {
    fn attach(&mut self, session: SharedSession) -> Result<()> {
        self.detach();

        match self.selection {
            Selection::One(index) => {
                let connection = Self::connect(index, session)?;
                tracing::info!("Listening on MIDI source {}: {}", index, self.name());
                self.connections.push(connection);
            }
            Selection::All => {
                let count = create_client()?.port_count();
                for index in 0..count {
                    match Self::connect(index, session.clone()) {
                        Ok(connection) => {
                            tracing::info!("Listening on MIDI source {}", index);
                            self.connections.push(connection);
                        }
                        Err(e) => tracing::warn!("Skipping MIDI source {}: {:#}", index, e),
                    }
                }
                if self.connections.is_empty() {
                    return Err(anyhow!("Could not connect to any MIDI source"));
                }
            }
        }

        Ok(())
    }

    fn detach(&mut self) {
        let count = self.connections.len();
        for connection in self.connections.drain(..) {
            let _ = connection.close();
        }
        if count > 0 {
            tracing::debug!("Disconnected from {} MIDI source(s)", count);
        }
    }

    fn is_attached(&self) -> bool {
        !self.connections.is_empty()
    }
}

impl Drop for MidiInput {
    fn drop(&mut self) {
        self.detach();
    }
}

fn create_client() -> Result<midir::MidiInput> {
    midir::MidiInput::new(CLIENT_NAME).map_err(|e| anyhow!("Failed to create MIDI client: {}", e))
}

/// List all available MIDI sources
pub fn list_sources() -> Vec<(usize, String)> {
    let client = match create_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("MIDI unavailable: {:#}", e);
            return Vec::new();
        }
    };

    let mut result = Vec::new();
    for (i, port) in client.ports().iter().enumerate() {
        let name = client
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", i));
        result.push((i, name));
    }

    result
}

/// Print all available MIDI sources to stdout
pub fn print_sources() {
    let sources = list_sources();
    if sources.is_empty() {
        println!("No MIDI sources found.");
    } else {
        println!("Available MIDI sources (inputs):");
        for (i, name) in sources {
            println!("  {}: {}", i, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::EventSource;

    #[test]
    fn test_list_sources_indexed_in_order() {
        let sources = list_sources();
        for (position, (index, _)) in sources.iter().enumerate() {
            assert_eq!(*index, position);
        }
    }

    #[test]
    fn test_all_sources_covers_listing() {
        let count = list_sources().len();
        match MidiInput::all() {
            Ok(input) => {
                assert_eq!(input.source_count(), count);
                assert_eq!(input.connection_count(), 0);
                assert!(!input.is_attached());
            }
            Err(_) => assert_eq!(count, 0),
        }
    }

    #[test]
    fn test_missing_source() {
        assert!(MidiInput::new(usize::MAX).is_err());
    }
}
