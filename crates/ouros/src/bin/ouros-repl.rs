use std::{
    io::{self, Write},
    process::ExitCode,
};

use num_bigint::BigInt;
use ouros::{CapabilitySet, InMemoryFs, ResourceLimits, SessionError, SessionManager, SessionProgress, Value};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let mut manager = SessionManager::new(ResourceLimits::default(), CapabilitySet::unrestricted(), InMemoryFs::new());

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = execute_snippet(&mut manager, &source) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let mut source = String::new();
    loop {
        let prompt = if source.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }

        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        if needs_more_input(&source) {
            continue;
        }

        if let Err(err) = execute_snippet(&mut manager, &source) {
            eprintln!("{err}");
        }
        source.clear();
    }

    ExitCode::SUCCESS
}

/// Executes one source snippet against the default session, printing its
/// output and prompting at the terminal for a value whenever the snippet
/// calls `suspend()`, until the snippet (or its resumption) completes.
fn execute_snippet(manager: &mut SessionManager<InMemoryFs>, source: &str) -> Result<(), SessionError> {
    let mut output = manager.execute(None, source)?;
    loop {
        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
            let _ = io::stdout().flush();
        }
        match output.progress {
            SessionProgress::Complete(value) => {
                if !matches!(value, Value::None) {
                    println!("{}", manager.describe(None, &value)?);
                }
                return Ok(());
            }
            SessionProgress::Suspended => {
                let value = prompt_return_value();
                output = manager.resume(None, value)?;
            }
        }
    }
}

/// Reads and parses a host return value for a suspended `suspend()` call.
fn prompt_return_value() -> Value {
    loop {
        let Some(line) = read_line("resume> ") else {
            return Value::None;
        };
        match parse_value(&line) {
            Some(value) => return value,
            None => eprintln!("could not parse that as a value, try again"),
        }
    }
}

/// Supported forms: `None`, `True`, `False`, integer and float literals,
/// quoted strings (`'text'`/`"text"`); bare text falls back to a string.
fn parse_value(raw: &str) -> Option<Value> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if value == "None" {
        return Some(Value::None);
    }
    if value == "True" {
        return Some(Value::Bool(true));
    }
    if value == "False" {
        return Some(Value::Bool(false));
    }
    if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
        || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
    {
        return Some(Value::Str(value[1..value.len() - 1].into()));
    }
    if let Ok(int_value) = value.parse::<BigInt>() {
        return Some(Value::Int(int_value));
    }
    if let Ok(float_value) = value.parse::<f64>() {
        return Some(Value::Float(float_value));
    }
    Some(Value::Str(value.into()))
}

/// Heuristic multiline detector for interactive input: unbalanced brackets,
/// a trailing backslash continuation, or a trailing `:` on the last
/// non-blank line all mean "keep reading".
fn needs_more_input(source: &str) -> bool {
    let trimmed = source.trim_end();
    if trimmed.ends_with('\\') {
        return true;
    }

    let mut balance = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '(' | '[' | '{' => balance += 1,
            ')' | ']' | '}' => balance -= 1,
            _ => {}
        }
    }
    if balance > 0 {
        return true;
    }

    trimmed
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.trim_end().ends_with(':'))
}

/// Reads one line from stdin after printing a prompt. Returns `None` on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
