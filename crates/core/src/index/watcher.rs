//! Filesystem watching with per-path debouncing.
//!
//! Raw `notify` events are converted to [`WatchEvent`]s, coalesced per path by
//! a [`Debouncer`] (the last event inside a window wins) and handed to a
//! callback in batches on the watcher thread.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }
}

/// Coalesces events per path.
///
/// Time is passed in explicitly so the window can be tested without sleeping.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, (WatchEventKind, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: HashMap::new() }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event. A pending event for the same path is replaced and its
    /// window restarts.
    pub fn push(&mut self, event: WatchEvent, now: Instant) {
        self.pending.insert(event.path, (event.kind, now));
    }

    /// Take every event whose window has elapsed at `now`, sorted by path.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        let window = self.window;
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| now.saturating_duration_since(*at) >= window)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events: Vec<WatchEvent> = ready
            .into_iter()
            .filter_map(|path| {
                let (kind, _) = self.pending.remove(&path)?;
                Some(WatchEvent { kind, path })
            })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    /// Earliest instant at which some pending event becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, at)| *at + self.window).min()
    }

    /// Take every pending event regardless of its window, sorted by path.
    pub fn flush(&mut self) -> Vec<WatchEvent> {
        let mut events: Vec<WatchEvent> = self
            .pending
            .drain()
            .map(|(path, (kind, _))| WatchEvent { kind, path })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Map a `notify` event onto zero or more watch events.
pub fn convert_event(event: &Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Added,
        EventKind::Remove(_) => WatchEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Added,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::new();
            if let Some(from) = event.paths.first() {
                events.push(WatchEvent::new(WatchEventKind::Removed, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                events.push(WatchEvent::new(WatchEventKind::Added, to.clone()));
            }
            return events;
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => WatchEventKind::Changed,
        EventKind::Access(_) => return Vec::new(),
    };

    event.paths.iter().map(|p| WatchEvent::new(kind, p.clone())).collect()
}

enum Message {
    Event(notify::Result<Event>),
    Stop,
}

/// A running recursive watch on one directory.
///
/// Dropping the watcher stops it; pending debounced events are discarded.
pub struct VaultWatcher {
    watcher: Option<RecommendedWatcher>,
    control: Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for VaultWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultWatcher").field("running", &self.thread.is_some()).finish()
    }
}

impl VaultWatcher {
    /// Watch `root` recursively, calling `handler` with each batch of
    /// debounced events.
    pub fn start<F>(root: &Path, debounce: Duration, handler: F) -> Result<Self, WatchError>
    where
        F: FnMut(Vec<WatchEvent>) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();

        let event_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(Message::Event(res));
        })
        .map_err(|source| WatchError::Notify { path: root.to_path_buf(), source })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify { path: root.to_path_buf(), source })?;

        let thread = thread::Builder::new()
            .name("vaultdex-watch".to_string())
            .spawn(move || run_loop(&rx, Debouncer::new(debounce), handler))
            .map_err(WatchError::Spawn)?;

        tracing::info!("Watching {} (debounce {}ms)", root.display(), debounce.as_millis());

        Ok(Self { watcher: Some(watcher), control: tx, thread: Some(thread) })
    }

    /// Stop watching and wait for the event thread to exit.
    pub fn stop(&mut self) {
        // Dropping the notify watcher ends the event source.
        self.watcher.take();
        let _ = self.control.send(Message::Stop);

        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Watcher thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for VaultWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<F>(rx: &Receiver<Message>, mut debouncer: Debouncer, mut handler: F)
where
    F: FnMut(Vec<WatchEvent>),
{
    loop {
        let received = match debouncer.next_deadline() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Message::Event(Ok(event))) => {
                let now = Instant::now();
                for watch_event in convert_event(&event) {
                    debouncer.push(watch_event, now);
                }
            }
            Ok(Message::Event(Err(e))) => tracing::warn!("File watcher error: {e}"),
            Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let ready = debouncer.drain_ready(Instant::now());
        if !ready.is_empty() {
            tracing::debug!("Dispatching {} debounced watch events", ready.len());
            handler(ready);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    const WINDOW: Duration = Duration::from_millis(300);

    fn ev(kind: WatchEventKind, path: &str) -> WatchEvent {
        WatchEvent::new(kind, path)
    }

    #[test]
    fn last_event_inside_window_wins() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.push(ev(WatchEventKind::Added, "/v/a.md"), start);
        debouncer.push(ev(WatchEventKind::Removed, "/v/a.md"), start + Duration::from_millis(50));
        assert_eq!(debouncer.len(), 1);

        let ready = debouncer.drain_ready(start + Duration::from_millis(400));
        assert_eq!(ready, vec![ev(WatchEventKind::Removed, "/v/a.md")]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn remove_then_add_resolves_to_add() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.push(ev(WatchEventKind::Removed, "/v/a.md"), start);
        debouncer.push(ev(WatchEventKind::Added, "/v/a.md"), start);

        assert_eq!(debouncer.flush(), vec![ev(WatchEventKind::Added, "/v/a.md")]);
    }

    #[test]
    fn events_wait_for_their_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.push(ev(WatchEventKind::Changed, "/v/a.md"), start);
        debouncer.push(ev(WatchEventKind::Changed, "/v/b.md"), start + Duration::from_millis(200));

        assert!(debouncer.drain_ready(start + Duration::from_millis(100)).is_empty());
        assert_eq!(debouncer.next_deadline(), Some(start + WINDOW));

        let ready = debouncer.drain_ready(start + WINDOW);
        assert_eq!(ready, vec![ev(WatchEventKind::Changed, "/v/a.md")]);
        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(500)));
    }

    #[test]
    fn a_new_event_restarts_the_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        debouncer.push(ev(WatchEventKind::Changed, "/v/a.md"), start);
        debouncer.push(ev(WatchEventKind::Changed, "/v/a.md"), start + Duration::from_millis(250));

        assert!(debouncer.drain_ready(start + WINDOW).is_empty());
        assert_eq!(debouncer.drain_ready(start + Duration::from_millis(550)).len(), 1);
    }

    #[test]
    fn drained_events_are_sorted_by_path() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        for name in ["/v/c.md", "/v/a.md", "/v/b.md"] {
            debouncer.push(ev(WatchEventKind::Changed, name), start);
        }

        let paths: Vec<_> =
            debouncer.drain_ready(start + WINDOW).into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/v/a.md"), PathBuf::from("/v/b.md"), PathBuf::from("/v/c.md")]
        );
    }

    #[test]
    fn convert_maps_notify_kinds() {
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path("/v/a.md".into());
        assert_eq!(convert_event(&create), vec![ev(WatchEventKind::Added, "/v/a.md")]);

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/v/a.md".into());
        assert_eq!(convert_event(&modify), vec![ev(WatchEventKind::Changed, "/v/a.md")]);

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/v/a.md".into());
        assert_eq!(convert_event(&remove), vec![ev(WatchEventKind::Removed, "/v/a.md")]);

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/v/old.md".into())
            .add_path("/v/new.md".into());
        assert_eq!(
            convert_event(&rename),
            vec![ev(WatchEventKind::Removed, "/v/old.md"), ev(WatchEventKind::Added, "/v/new.md")]
        );

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path("/v/a.md".into());
        assert!(convert_event(&access).is_empty());
    }
}
