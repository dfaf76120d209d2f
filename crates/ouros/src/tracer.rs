//! Execution tracing infrastructure, retargeted from the teacher's opcode
//! hooks to AST-node dispatch.
//!
//! The evaluator is parameterized over `Tr: VmTracer`; [`NoopTracer`]'s
//! methods compile away entirely via monomorphization, so a non-traced run
//! pays nothing for the hook points. [`StderrTracer`] is a human-readable
//! debugging aid; [`RecordingTracer`] collects a `Vec<TraceEvent>` for tests
//! and replay comparison.

/// One traced execution event.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Statement { line: u32, depth: usize },
    CallEnter { name: String, depth: usize },
    CallExit { name: String, depth: usize },
    GeneratorSuspend { name: String },
    GeneratorResume { name: String },
}

/// Hook points the evaluator calls at key points during execution.
pub trait VmTracer {
    fn on_statement(&mut self, _line: u32, _depth: usize) {}
    fn on_call_enter(&mut self, _name: &str, _depth: usize) {}
    fn on_call_exit(&mut self, _name: &str, _depth: usize) {}
    fn on_generator_suspend(&mut self, _name: &str) {}
    fn on_generator_resume(&mut self, _name: &str) {}
}

/// Zero-cost default: every hook is an empty inline function.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Logs a human-readable line per traced event to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn on_statement(&mut self, line: u32, depth: usize) {
        eprintln!("{}line {line}", "  ".repeat(depth));
    }

    fn on_call_enter(&mut self, name: &str, depth: usize) {
        eprintln!("{}-> {name}", "  ".repeat(depth));
    }

    fn on_call_exit(&mut self, name: &str, depth: usize) {
        eprintln!("{}<- {name}", "  ".repeat(depth));
    }

    fn on_generator_suspend(&mut self, name: &str) {
        eprintln!("generator {name} suspended");
    }

    fn on_generator_resume(&mut self, name: &str) {
        eprintln!("generator {name} resumed");
    }
}

/// Collects every traced event, for tests and deterministic replay
/// comparison.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    pub events: Vec<TraceEvent>,
}

impl VmTracer for RecordingTracer {
    fn on_statement(&mut self, line: u32, depth: usize) {
        self.events.push(TraceEvent::Statement { line, depth });
    }

    fn on_call_enter(&mut self, name: &str, depth: usize) {
        self.events.push(TraceEvent::CallEnter { name: name.to_owned(), depth });
    }

    fn on_call_exit(&mut self, name: &str, depth: usize) {
        self.events.push(TraceEvent::CallExit { name: name.to_owned(), depth });
    }

    fn on_generator_suspend(&mut self, name: &str) {
        self.events.push(TraceEvent::GeneratorSuspend { name: name.to_owned() });
    }

    fn on_generator_resume(&mut self, name: &str) {
        self.events.push(TraceEvent::GeneratorResume { name: name.to_owned() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_captures_call_pair() {
        let mut tracer = RecordingTracer::default();
        tracer.on_call_enter("f", 1);
        tracer.on_call_exit("f", 1);
        assert_eq!(tracer.events.len(), 2);
    }
}
