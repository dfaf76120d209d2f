use std::{env, process::ExitCode, time::Instant};

use ouros::{CapabilitySet, Error, LocalFs, NoopTracer, ResourceLimits, RunConfig, Runner, StdPrint, Value};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { args[1].as_str() } else { "example.py" };

    let source = match std::fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let root = std::env::current_dir().unwrap_or_else(|_| ".".into());
    let config = RunConfig {
        limits: ResourceLimits::default(),
        capabilities: CapabilitySet::unrestricted(),
        filesystem: LocalFs::new(root),
        tracer: Box::new(NoopTracer),
        print: Box::new(StdPrint),
        profile: false,
    };

    let start = Instant::now();
    let mut runner = match Runner::from_config(&source, config) {
        Ok(runner) => runner,
        Err(err) => return report(&err, start),
    };

    match runner.start() {
        Ok(ouros::RunProgress::Complete(value)) => {
            let elapsed = start.elapsed();
            if !matches!(value, Value::None) {
                eprintln!("success after {elapsed:?}: {}", runner.describe(&value));
            } else {
                eprintln!("success after {elapsed:?}");
            }
            ExitCode::SUCCESS
        }
        Ok(ouros::RunProgress::Suspended(_)) => {
            eprintln!("program called suspend(), which the CLI has no host loop to resume");
            ExitCode::FAILURE
        }
        Err(err) => report(&err, start),
    }
}

fn report(err: &Error, start: Instant) -> ExitCode {
    let elapsed = start.elapsed();
    eprintln!("error after {elapsed:?}: {err}");
    ExitCode::FAILURE
}
