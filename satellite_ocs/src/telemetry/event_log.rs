use parking_lot::Mutex;
use shared_protocol::{EventType, SecurityEvent};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

use super::EventSink;
use crate::errors::SinkError;

/// Recent events kept in memory when the full history lives in a file.
pub const RECENT_EVENTS_CAPACITY: usize = 1024;

/// Event history, optionally mirrored to a JSON Lines writer.
///
/// History and mirror share one lock, so concurrent appends never interleave
/// and the two stay in the same order. A log with a mirror only keeps the most
/// recent events in memory; the mirror is the durable record.
pub struct EventLog {
    inner: Mutex<Inner>,
}

struct Inner {
    history: VecDeque<SecurityEvent>,
    capacity: Option<usize>,
    mirror: Option<Box<dyn Write + Send>>,
}

impl EventLog {
    /// Unbounded, memory only.
    pub fn in_memory() -> Self {
        Self::build(None, None)
    }

    /// Appends to `path` (creating it and its parent directory if needed).
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let f: File = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "security event log opened");
        Ok(Self::with_writer(f))
    }

    /// Mirror every event to `writer`, one JSON object per line.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self::build(Some(Box::new(writer)), Some(RECENT_EVENTS_CAPACITY))
    }

    /// Keep at most `capacity` events in memory, dropping the oldest.
    pub fn with_history_limit(self, capacity: usize) -> Self {
        {
            let mut g = self.inner.lock();
            g.capacity = Some(capacity);
            trim(&mut g.history, capacity);
        }
        self
    }

    fn build(mirror: Option<Box<dyn Write + Send>>, capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                history: VecDeque::new(),
                capacity,
                mirror,
            }),
        }
    }

    /// Snapshot of the retained events, oldest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_by_type(&self, event_type: EventType) -> usize {
        self.inner
            .lock()
            .history
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

fn trim(history: &mut VecDeque<SecurityEvent>, capacity: usize) {
    while history.len() > capacity {
        history.pop_front();
    }
}

impl EventSink for EventLog {
    fn append(&self, event: SecurityEvent) -> Result<(), SinkError> {
        let mut g = self.inner.lock();
        // durable copy first; an event that failed to persist is not kept.
        // One unbuffered write per line so nothing is left over after an error.
        if let Some(w) = g.mirror.as_mut() {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            w.write_all(&line)?;
            w.flush()?;
        }
        g.history.push_back(event);
        if let Some(cap) = g.capacity {
            trim(&mut g.history, cap);
        }
        Ok(())
    }
}

/// Read back a JSON Lines event file written by [`EventLog::with_file`].
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<SecurityEvent>, SinkError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
