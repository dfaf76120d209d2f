//! A sandboxed Python-3 execution core: lex, parse, and tree-walk a
//! practical subset of Python through a capability-gated [`context::Context`],
//! with suspendable/replayable execution via a structured event log.
//!
//! See `run.rs` for the Core API entry points ([`run`], [`compile`],
//! [`Runner`]) most embedders start from.

pub mod ast;
pub mod builtins;
pub mod capability;
pub mod context;
pub mod environment;
pub mod evaluator;
pub mod exception;
pub mod heap;
pub mod intern;
pub mod io;
pub mod lexer;
pub mod methods;
pub mod modules;
pub mod object;
pub mod parser;
pub mod resource;
pub mod run;
pub mod session;
pub mod tracer;
pub mod types;
pub mod value;

pub use capability::{Capability, CapabilitySet, NetworkPolicy};
pub use context::{events_from_bytes, events_from_json, events_to_bytes, events_to_json, Context, Event, EventKind};
pub use exception::Exception;
pub use io::{CapturingPrint, InMemoryFs, LocalFs, PrintWriter, StdPrint};
pub use resource::{LimitedTracker, NoLimitTracker, ResourceLimits, ResourceTracker};
pub use run::{
    classify, compile, dispatch_route, output_of, run, run_with_telemetry, Error, ErrorKind, ProfileReport, RunConfig, Runner,
    RunProgress, Snapshot, Telemetry,
};
pub use session::{ExecuteOutput, SessionError, SessionInfo, SessionManager, SessionProgress, VariableInfo};
pub use tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, VmTracer};
pub use value::Value;
