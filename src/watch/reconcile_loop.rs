//! Event classification, debouncing, and at-most-one-in-flight
//! reconciliation scheduling. The actual parse→resolve→reconcile work
//! for a path is supplied by the caller as a callback; this module owns
//! only the scheduling discipline (§4.9).

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::watch::Debouncer;
use crate::{debug_event, log_event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventClass {
    /// Created or modified; parse and reconcile.
    Modified,
    /// Deleted; reconcile with empty new sets.
    Deleted,
}

pub struct WatchLoopBuilder {
    root: PathBuf,
    debounce_ms: u64,
}

impl WatchLoopBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            debounce_ms: 250,
        }
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn build(self) -> Result<WatchLoop, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;

        Ok(WatchLoop {
            debouncer: Debouncer::new(self.debounce_ms),
            event_rx: rx,
            _watcher: watcher,
        })
    }
}

pub struct WatchLoop {
    debouncer: Debouncer,
    event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl WatchLoop {
    /// Run until the event channel closes, invoking `on_event(path,
    /// class)` for each flushed event. New events for a path already
    /// in-flight are coalesced: they re-enter the debounce window once
    /// the in-flight call completes, rather than racing it.
    pub async fn run<F, Fut>(mut self, mut on_event: F) -> Result<(), WatchError>
    where
        F: FnMut(PathBuf, FileEventClass) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut in_flight: HashSet<PathBuf> = HashSet::new();
        let mut coalesced: HashSet<PathBuf> = HashSet::new();
        let mut tick = tokio::time::interval(Duration::from_millis(50));

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(Ok(event)) => {
                            let deletes = self.classify_and_record(&event);
                            for path in deletes {
                                if in_flight.contains(&path) {
                                    coalesced.insert(path);
                                    continue;
                                }
                                debug_event!("watcher", "delete event", "{}", path.display());
                                in_flight.insert(path.clone());
                                on_event(path.clone(), FileEventClass::Deleted).await;
                                in_flight.remove(&path);
                                coalesced.remove(&path);
                            }
                        }
                        Some(Err(e)) => log_event!("watcher", "filesystem event error", "{e}"),
                        None => return Err(WatchError::ChannelClosed),
                    }
                }
                _ = tick.tick() => {
                    for path in self.debouncer.take_ready() {
                        if in_flight.contains(&path) {
                            coalesced.insert(path);
                            continue;
                        }
                        in_flight.insert(path.clone());
                        on_event(path.clone(), FileEventClass::Modified).await;
                        in_flight.remove(&path);
                        if coalesced.remove(&path) {
                            self.debouncer.record(path);
                        }
                    }
                }
            }
        }
    }

    /// Record modify/create events in the debounce buffer; return paths
    /// whose delete event should skip debouncing entirely.
    fn classify_and_record(&mut self, event: &Event) -> Vec<PathBuf> {
        let mut deletes = Vec::new();
        for path in &event.paths {
            match event.kind {
                EventKind::Remove(_) => {
                    self.debouncer.remove(path);
                    deletes.push(path.clone());
                }
                EventKind::Modify(_) | EventKind::Create(_) => {
                    self.debouncer.record(path.clone());
                }
                _ => {}
            }
        }
        deletes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_event_class_is_copy_and_comparable() {
        assert_eq!(FileEventClass::Modified, FileEventClass::Modified);
        assert_ne!(FileEventClass::Modified, FileEventClass::Deleted);
    }
}
