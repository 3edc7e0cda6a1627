// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! File watcher for hot-reload configuration.
//!
//! Lets a running recorder pick up tempo and time signature edits, so
//! the export uses whatever the file says at the moment it is written.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::StudioConfig;

/// Events emitted by the config watcher
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Configuration file was modified and successfully reloaded
    Reloaded(Box<StudioConfig>),
    /// Configuration file was modified but failed to parse
    Error(String),
}

/// Configuration file watcher with debouncing
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    event_receiver: Receiver<ConfigEvent>,
    watched_path: PathBuf,
}

impl ConfigWatcher {
    /// Create a new watcher for the configuration file at `path`
    ///
    /// The parent directory is watched so that editors which replace the
    /// file on save are still noticed.
    ///
    /// # Arguments
    /// * `path` - Configuration file to watch
    /// * `debounce_ms` - Debounce duration in milliseconds (default: 500)
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let watched_path = path.as_ref().to_path_buf();
        let debounce_duration = Duration::from_millis(debounce_ms.unwrap_or(500));

        let watch_dir = match watched_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = watched_path
            .file_name()
            .ok_or_else(|| anyhow!("Not a file path: {:?}", watched_path))?
            .to_os_string();

        let (event_tx, event_rx): (Sender<ConfigEvent>, Receiver<ConfigEvent>) = mpsc::channel();
        let (notify_tx, notify_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| anyhow!("Failed to create file watcher: {}", e))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| anyhow!("Failed to watch path {:?}: {}", watch_dir, e))?;

        let reload_path = watched_path.clone();
        std::thread::spawn(move || {
            let mut last_event_time: Option<Instant> = None;

            loop {
                match notify_rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(event) => {
                        let touches_file = event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                        if touches_file
                            && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                        {
                            last_event_time = Some(Instant::now());
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if let Some(last_time) = last_event_time {
                            if last_time.elapsed() >= debounce_duration {
                                last_event_time = None;
                                let event = match StudioConfig::load(&reload_path) {
                                    Ok(config) => {
                                        tracing::info!("Reloaded {:?}", reload_path);
                                        ConfigEvent::Reloaded(Box::new(config))
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to reload {:?}: {:#}", reload_path, e);
                                        ConfigEvent::Error(format!(
                                            "Failed to load {:?}: {:#}",
                                            reload_path, e
                                        ))
                                    }
                                };
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        // Watcher was dropped, exit thread
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
            watched_path,
        })
    }

    /// Try to receive the next config event (non-blocking)
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Receive all pending config events
    pub fn recv_all(&self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Latest successfully reloaded configuration among pending events
    pub fn latest(&self) -> Option<StudioConfig> {
        self.recv_all()
            .into_iter()
            .filter_map(|event| match event {
                ConfigEvent::Reloaded(config) => Some(*config),
                ConfigEvent::Error(_) => None,
            })
            .last()
    }

    /// Get the path being watched
    pub fn watched_path(&self) -> &Path {
        &self.watched_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("watch_test.yaml");
        fs::write(&file_path, "tempo:\n  bpm: 100\n").unwrap();

        let watcher = ConfigWatcher::new(&file_path, Some(100)).unwrap();
        assert_eq!(watcher.watched_path(), file_path.as_path());
        assert!(watcher.try_recv().is_none());
    }

    #[test]
    fn test_watcher_detects_changes() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("detect_test.yaml");
        fs::write(&file_path, "tempo:\n  bpm: 120\n").unwrap();

        let watcher = ConfigWatcher::new(&file_path, Some(100)).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        fs::write(&file_path, "tempo:\n  bpm: 140\n").unwrap();

        // Debounce plus processing, with generous headroom for slow machines
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reloaded = None;
        while reloaded.is_none() && Instant::now() < deadline {
            reloaded = watcher.latest();
            std::thread::sleep(Duration::from_millis(50));
        }

        let config = reloaded.expect("config change was not picked up");
        assert_eq!(config.tempo.bpm, 140);
    }

    #[test]
    fn test_watcher_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.yaml");
        fs::write(&file_path, "tempo:\n  bpm: 120\n").unwrap();

        let watcher = ConfigWatcher::new(&file_path, Some(100)).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        fs::write(&file_path, "tempo: [").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut error = None;
        while error.is_none() && Instant::now() < deadline {
            error = watcher
                .recv_all()
                .into_iter()
                .find(|event| matches!(event, ConfigEvent::Error(_)));
            std::thread::sleep(Duration::from_millis(50));
        }

        assert!(error.is_some(), "broken config was not reported");
        // A failed reload never surfaces as a config
        assert!(watcher.latest().is_none());
    }
}
