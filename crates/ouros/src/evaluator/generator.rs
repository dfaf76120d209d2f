//! Generator construction and driving, per spec.md §4.6 "Generators".
//!
//! A generator call doesn't run its body; it builds a [`GeneratorBody`]
//! holding the call environment and a single `ContFrame::Stmts` continuation
//! over the whole function body (see `types.rs`'s module doc). Consuming it
//! eagerly (`drain`, used by `for`/`list()`/unpacking) drives every frame to
//! completion under `GeneratorMode::Accumulate`, where `yield` never actually
//! suspends — it just appends to `ctx.accumulator` and keeps going. Stepping
//! it one value at a time (`next_value`, for the `next()` builtin) drives
//! the same frames under `GeneratorMode::Defer`, where `yield` does suspend,
//! and saves whatever continuation comes back for the following call.

use std::rc::Rc;

use crate::{
    context::GeneratorMode,
    environment::Environment,
    exception::{ExcType, Exception, RunError, RunResult},
    heap::{HeapData, HeapId},
    io::FilesystemBackend,
    resource::ResourceTracker,
    types::{ContFrame, GeneratorBody},
    value::{FunctionValue, Value},
};

use super::{stmt::{run_for_loop, run_while_loop}, Flow, Interpreter};

/// Builds the suspended state a call to a generator function produces,
/// without running any of its body yet.
pub fn make<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    f: &Rc<FunctionValue>,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<GeneratorBody> {
    let mut call_env = Environment::merge_closure_scopes(&f.captured_env);
    interp.bind_params(&f.params, &args, &kwargs, &mut call_env)?;
    Ok(GeneratorBody::new(Rc::clone(&f.body), call_env, f.name))
}

/// Fully consumes a generator, collecting every value it yields, per the
/// eager materialisation `iterate()` applies to every iterable kind.
///
/// If the generator's body raises partway through, the items it yielded
/// before the raise are discarded and the error propagates — the right
/// behavior for most iterable consumers (`list()`, `sum()`, unpacking, ...),
/// which never observe a partial result once the exception unwinds past
/// them. `for` needs the partial items instead, so it calls
/// [`drain_partial`] directly rather than going through this function.
pub fn drain<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, generator_id: HeapId, env: &mut Environment) -> RunResult<Vec<Value>> {
    let (values, deferred) = drain_partial(interp, generator_id, env);
    match deferred {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// Like [`drain`], but returns the items yielded before a raise alongside
/// the deferred error instead of discarding them, so a `for` loop can run
/// its body over the pre-exception items and re-raise only after the loop
/// (spec.md §4.6 "a generator iterable that ended with an exception
/// produces items up to that point and then re-raises the exception after
/// the loop").
pub fn drain_partial<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    generator_id: HeapId,
    _env: &mut Environment,
) -> (Vec<Value>, Option<RunError>) {
    let HeapData::Generator(gen) = interp.heap.get(generator_id) else { unreachable!() };
    if gen.finished {
        return (Vec::new(), None);
    }
    let HeapData::Generator(gen) = interp.heap.get_mut(generator_id) else { unreachable!() };
    let frames = std::mem::take(&mut gen.frames);
    let mut gen_env = gen.env.clone();
    gen.finished = true;

    let saved_mode = interp.ctx.generator_mode;
    let saved_accumulator = std::mem::take(&mut interp.ctx.accumulator);
    interp.ctx.generator_mode = GeneratorMode::Accumulate;
    let result = advance_frames(interp, frames, &mut gen_env);
    let values = std::mem::replace(&mut interp.ctx.accumulator, saved_accumulator);
    interp.ctx.generator_mode = saved_mode;
    match result {
        Ok(_) => (values, None),
        Err(e) => (values, Some(e)),
    }
}

/// Advances a generator by exactly one `yield`, for the `next()` builtin.
/// Raises `StopIteration` once the body runs to completion.
pub fn next_value<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, generator_id: HeapId, sent: Option<Value>) -> RunResult<Value> {
    let HeapData::Generator(gen) = interp.heap.get(generator_id) else { unreachable!() };
    if gen.finished {
        return Err(interp.raise(Exception::new(ExcType::StopIteration, "")));
    }
    let HeapData::Generator(gen) = interp.heap.get_mut(generator_id) else { unreachable!() };
    let frames = std::mem::take(&mut gen.frames);
    let mut gen_env = gen.env.clone();
    gen.pending_send = sent;

    let saved_mode = interp.ctx.generator_mode;
    interp.ctx.generator_mode = GeneratorMode::Defer;
    let result = advance_frames(interp, frames, &mut gen_env);
    interp.ctx.generator_mode = saved_mode;

    match result {
        Ok(Flow::Yield { value, frames }) => {
            let HeapData::Generator(gen) = interp.heap.get_mut(generator_id) else { unreachable!() };
            let name = interp.interner.resolve(gen.name).to_owned();
            gen.frames = frames;
            gen.env = gen_env;
            interp.tracer.on_generator_suspend(&name);
            Ok(value)
        }
        Ok(_) => {
            let HeapData::Generator(gen) = interp.heap.get_mut(generator_id) else { unreachable!() };
            gen.finished = true;
            Err(interp.raise(Exception::new(ExcType::StopIteration, "")))
        }
        Err(e) => {
            let HeapData::Generator(gen) = interp.heap.get_mut(generator_id) else { unreachable!() };
            gen.finished = true;
            Err(e)
        }
    }
}

/// Drives a continuation stack (innermost frame last, see `types.rs`) until
/// it either completes, returns, or — in `Defer`/`DeferInner` mode — yields.
/// A `Break` collapses to continuing the next outer frame; loop `else`
/// clauses aren't part of the continuation representation, so a loop that
/// breaks while suspended skips its `orelse` on resume.
fn advance_frames<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, mut frames: Vec<ContFrame>, env: &mut Environment) -> RunResult<Flow> {
    loop {
        let Some(frame) = frames.pop() else { return Ok(Flow::Normal) };
        let flow = match frame {
            ContFrame::Stmts { body, index } => interp.eval_block(&body[index..], env)?,
            ContFrame::For { target, remaining, body, .. } => run_for_loop(interp, &target, &body, remaining, None, env)?,
            ContFrame::While { test, body, .. } => run_while_loop(interp, &test, &body, None, env)?,
            ContFrame::YieldFrom { inner } => match next_value(interp, inner, None) {
                Ok(value) => {
                    frames.push(ContFrame::YieldFrom { inner });
                    return Ok(Flow::Yield { value, frames });
                }
                Err(RunError::Raised(e)) if e.matches("StopIteration") => Flow::Normal,
                Err(e) => return Err(e),
            },
        };
        match flow {
            Flow::Normal | Flow::Break | Flow::Continue => continue,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Yield { value, frames: mut inner_frames } => {
                frames.append(&mut inner_frames);
                return Ok(Flow::Yield { value, frames });
            }
        }
    }
}
