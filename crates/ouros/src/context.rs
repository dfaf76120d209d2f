//! The capability-gated execution context mediating all I/O, per spec.md
//! §4.4/§6: a structured event log, compute-budget accounting, iterator and
//! file-handle registries, and the configuration a suspendable/replayable
//! run carries from start to finish.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    capability::{Capability, CapabilitySet},
    exception::{ExcType, Exception},
    io::{FilesystemBackend, WriteMode},
    resource::{ResourceError, ResourceTracker},
    value::Value,
};

/// One entry in the context's structured event log, per spec.md §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Assign { name: String, value_repr: String },
    Branch { taken: bool },
    LoopIter,
    CallEnter { name: String },
    CallExit { name: String },
    Exception { message: String },
    Output { text: String },
    SideEffect { description: String },
    FileOp { path: String, op: &'static str },
    Suspend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub step: u64,
}

/// Serializes an event log to JSON, for a host persisting a run's trace
/// across process boundaries (spec.md's "replayable execution").
pub fn events_to_json(events: &[Event]) -> serde_json::Result<String> {
    serde_json::to_string(events)
}

/// Parses an event log previously produced by [`events_to_json`], suitable
/// as the `expected` list for a [`ContextMode::Replay`] run.
pub fn events_from_json(json: &str) -> serde_json::Result<Vec<Event>> {
    serde_json::from_str(json)
}

/// Serializes an event log to `postcard`'s compact binary encoding, for a
/// host that wants to store or transmit a run's trace more cheaply than
/// JSON (e.g. persisting many sessions' histories).
pub fn events_to_bytes(events: &[Event]) -> postcard::Result<Vec<u8>> {
    postcard::to_allocvec(events)
}

/// Parses an event log previously produced by [`events_to_bytes`].
pub fn events_from_bytes(bytes: &[u8]) -> postcard::Result<Vec<Event>> {
    postcard::from_bytes(bytes)
}

/// Whether the context is driving a fresh run, verifying an existing event
/// log against re-execution, or discarding events entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextMode {
    Live,
    Replay { expected: Vec<EventKind>, cursor: usize },
    Noop,
}

/// Raised when a replayed run's event log diverges from the one it's being
/// checked against — the re-execution is not a pure function of the same
/// inputs, which during replay is always a bug rather than user-code
/// behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub step: u64,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for ReplayMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "replay divergence at step {}: expected {}, got {}", self.step, self.expected, self.actual)
    }
}

impl std::error::Error for ReplayMismatch {}

/// Which mode a called generator function is being driven in, per
/// spec.md §4.6/§9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorMode {
    /// Not currently inside generator-driving code.
    #[default]
    None,
    /// Run the generator body to completion, collecting every yielded
    /// value into `Context::accumulator` (what `list(gen())` uses).
    Accumulate,
    /// Suspend at the first `yield`, returning control to the host.
    Defer,
    /// Suspend at a `yield` reached via a nested `yield from` delegation.
    DeferInner,
}

/// Per-line/per-function counters collected when a run opts into profiling.
#[derive(Debug, Clone, Default)]
pub struct ProfileCounters {
    pub line_hits: HashMap<u32, u64>,
    pub call_counts: HashMap<String, u64>,
    pub inclusive_time: HashMap<String, Duration>,
}

enum HandleMode {
    Read { data: Vec<u8>, pos: usize },
    Write { mode: WriteMode, buffer: Vec<u8> },
}

struct FileHandleState {
    path: String,
    mode: HandleMode,
}

enum IterEntry {
    /// A plain sequence iterator (list/tuple/range/dict-view iteration).
    Native(std::collections::VecDeque<Value>),
    /// An instance whose class defines `__next__`; driving it is the
    /// evaluator's job (it needs to make method calls), so the context only
    /// tracks liveness and hands the underlying value back via
    /// [`Context::iter_items`].
    Instance(Value),
}

/// The execution context threaded through every evaluator call.
pub struct Context<R: ResourceTracker, FS: FilesystemBackend> {
    pub capabilities: CapabilitySet,
    pub mode: ContextMode,
    events: Vec<Event>,
    step: u64,
    tracker: R,
    last_instant: Instant,
    fs: FS,
    file_handles: HashMap<u64, FileHandleState>,
    next_handle_id: u64,
    iterators: HashMap<u64, IterEntry>,
    next_iter_id: u64,
    pub call_depth: usize,
    pub max_call_depth: usize,
    pub generator_mode: GeneratorMode,
    pub accumulator: Vec<Value>,
    pub profile: Option<ProfileCounters>,
}

impl<R: ResourceTracker, FS: FilesystemBackend> Context<R, FS> {
    pub fn new(tracker: R, fs: FS, capabilities: CapabilitySet, max_call_depth: usize) -> Self {
        Self {
            capabilities,
            mode: ContextMode::Live,
            events: Vec::new(),
            step: 0,
            tracker,
            last_instant: Instant::now(),
            fs,
            file_handles: HashMap::new(),
            next_handle_id: 0,
            iterators: HashMap::new(),
            next_iter_id: 0,
            call_depth: 0,
            max_call_depth,
            generator_mode: GeneratorMode::None,
            accumulator: Vec::new(),
            profile: None,
        }
    }

    pub fn enable_profiling(&mut self) {
        self.profile = Some(ProfileCounters::default());
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Appends `kind` to the log (in [`ContextMode::Live`]), checks it
    /// against the expected log (in [`ContextMode::Replay`]), or drops it
    /// (in [`ContextMode::Noop`]). Returns the step number assigned.
    pub fn record(&mut self, kind: EventKind) -> Result<u64, ReplayMismatch> {
        self.step += 1;
        match &mut self.mode {
            ContextMode::Live => {
                self.events.push(Event { kind, step: self.step });
            }
            ContextMode::Replay { expected, cursor } => {
                let Some(want) = expected.get(*cursor) else {
                    return Err(ReplayMismatch {
                        step: self.step,
                        expected: "<end of log>".into(),
                        actual: format!("{kind:?}"),
                    });
                };
                if *want != kind {
                    return Err(ReplayMismatch {
                        step: self.step,
                        expected: format!("{want:?}"),
                        actual: format!("{kind:?}"),
                    });
                }
                *cursor += 1;
            }
            ContextMode::Noop => {}
        }
        Ok(self.step)
    }

    /// Charges elapsed wall-clock time since the last check against the
    /// configured compute budget, called once per statement-loop iteration
    /// and loop body-entry per spec.md §4.6.
    pub fn check_deadline(&mut self) -> Result<(), ResourceError> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant);
        self.last_instant = now;
        self.tracker.charge(elapsed)
    }

    /// Marks the start of an I/O wait: compute time stops accruing.
    pub fn pause_compute(&mut self) {
        self.tracker.pause();
    }

    /// Marks the end of an I/O wait; resets the wall-clock anchor so the
    /// paused interval is never retroactively charged.
    pub fn resume_compute(&mut self) {
        self.tracker.resume();
        self.last_instant = Instant::now();
    }

    #[must_use]
    pub fn compute_elapsed(&self) -> Duration {
        self.tracker.elapsed()
    }

    // --- Iterator registry -------------------------------------------------

    pub fn new_iterator(&mut self, values: Vec<Value>) -> u64 {
        let id = self.next_iter_id;
        self.next_iter_id += 1;
        self.iterators.insert(id, IterEntry::Native(values.into()));
        id
    }

    pub fn new_instance_iterator(&mut self, instance: Value) -> u64 {
        let id = self.next_iter_id;
        self.next_iter_id += 1;
        self.iterators.insert(id, IterEntry::Instance(instance));
        id
    }

    /// Pops and returns the next value from a native iterator. Returns
    /// `None` both when the iterator is exhausted and when `id` names an
    /// instance iterator (the evaluator drives those through `__next__`
    /// directly via [`Context::iter_items`]).
    pub fn iter_next(&mut self, id: u64) -> Option<Value> {
        match self.iterators.get_mut(&id)? {
            IterEntry::Native(items) => items.pop_front(),
            IterEntry::Instance(_) => None,
        }
    }

    /// Returns the underlying instance `Value` for an instance iterator, so
    /// the evaluator can invoke its `__next__` method.
    #[must_use]
    pub fn iter_items(&self, id: u64) -> Option<&Value> {
        match self.iterators.get(&id)? {
            IterEntry::Instance(v) => Some(v),
            IterEntry::Native(_) => None,
        }
    }

    pub fn delete_iterator(&mut self, id: u64) {
        self.iterators.remove(&id);
    }

    // --- File handles --------------------------------------------------

    fn require_filesystem(&self, op: &str) -> Result<(), Exception> {
        self.capabilities
            .check(&Capability::Filesystem, op)
            .map_err(|denied| Exception::new(ExcType::PermissionError, denied.to_string()))
    }

    pub fn open_handle(&mut self, path: &str, write: bool, append: bool) -> Result<u64, Exception> {
        self.require_filesystem("open")?;
        self.pause_compute();
        let mode = if write {
            HandleMode::Write { mode: if append { WriteMode::Append } else { WriteMode::Truncate }, buffer: Vec::new() }
        } else {
            let data = self.fs.read(path)?;
            HandleMode::Read { data, pos: 0 }
        };
        self.resume_compute();
        let id = self.next_handle_id;
        self.next_handle_id += 1;
        self.file_handles.insert(id, FileHandleState { path: path.to_owned(), mode });
        let _ = self.record(EventKind::FileOp { path: path.to_owned(), op: "open" });
        Ok(id)
    }

    pub fn read_handle(&mut self, id: u64, size: Option<usize>) -> Result<Vec<u8>, Exception> {
        let handle = self.file_handles.get_mut(&id).ok_or_else(|| Exception::new(ExcType::ValueError, "I/O operation on closed file"))?;
        let HandleMode::Read { data, pos } = &mut handle.mode else {
            return Err(Exception::new(ExcType::IOError, "file not opened for reading"));
        };
        let end = size.map_or(data.len(), |n| (*pos + n).min(data.len()));
        let chunk = data[*pos..end].to_vec();
        *pos = end;
        Ok(chunk)
    }

    pub fn write_handle(&mut self, id: u64, data: &[u8]) -> Result<(), Exception> {
        let handle = self.file_handles.get_mut(&id).ok_or_else(|| Exception::new(ExcType::ValueError, "I/O operation on closed file"))?;
        let HandleMode::Write { buffer, .. } = &mut handle.mode else {
            return Err(Exception::new(ExcType::IOError, "file not opened for writing"));
        };
        buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn close_handle(&mut self, id: u64) -> Result<(), Exception> {
        let Some(handle) = self.file_handles.remove(&id) else {
            return Ok(());
        };
        if let HandleMode::Write { mode, buffer } = handle.mode {
            self.pause_compute();
            self.fs.write(&handle.path, &buffer, mode)?;
            self.resume_compute();
        }
        let _ = self.record(EventKind::FileOp { path: handle.path, op: "close" });
        Ok(())
    }

    #[must_use]
    pub fn filesystem(&self) -> &FS {
        &self.fs
    }

    pub fn filesystem_mut(&mut self) -> &mut FS {
        &mut self.fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capability::CapabilitySet, io::InMemoryFs, resource::NoLimitTracker};

    fn ctx() -> Context<NoLimitTracker, InMemoryFs> {
        Context::new(NoLimitTracker::default(), InMemoryFs::new(), CapabilitySet::unrestricted(), 1000)
    }

    #[test]
    fn replay_mode_detects_divergence() {
        let mut c = ctx();
        c.mode = ContextMode::Replay { expected: vec![EventKind::LoopIter], cursor: 0 };
        assert!(c.record(EventKind::Branch { taken: true }).is_err());
    }

    #[test]
    fn replay_mode_accepts_matching_log() {
        let mut c = ctx();
        c.mode = ContextMode::Replay { expected: vec![EventKind::LoopIter], cursor: 0 };
        assert!(c.record(EventKind::LoopIter).is_ok());
    }

    #[test]
    fn native_iterator_yields_in_order() {
        let mut c = ctx();
        let id = c.new_iterator(vec![Value::Int(1.into()), Value::Int(2.into())]);
        assert!(matches!(c.iter_next(id), Some(Value::Int(_))));
        assert!(matches!(c.iter_next(id), Some(Value::Int(_))));
        assert!(c.iter_next(id).is_none());
    }

    #[test]
    fn write_handle_is_committed_on_close() {
        let mut c = ctx();
        let id = c.open_handle("a.txt", true, false).unwrap();
        c.write_handle(id, b"hi").unwrap();
        c.close_handle(id).unwrap();
        assert_eq!(c.filesystem().read("a.txt").unwrap(), b"hi");
    }

    #[test]
    fn event_log_round_trips_through_json() {
        let events = vec![
            Event { kind: EventKind::Output { text: "hi".into() }, step: 1 },
            Event { kind: EventKind::LoopIter, step: 2 },
        ];
        let json = events_to_json(&events).unwrap();
        assert_eq!(events_from_json(&json).unwrap(), events);
    }

    #[test]
    fn event_log_round_trips_through_postcard() {
        let events = vec![Event { kind: EventKind::Suspend, step: 1 }];
        let bytes = events_to_bytes(&events).unwrap();
        assert_eq!(events_from_bytes(&bytes).unwrap(), events);
    }
}
