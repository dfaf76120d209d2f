//! Lexical scope stack and name resolution, per spec.md §4.3.
//!
//! A scope is an ordered, name-keyed map of bindings. Scopes are individually
//! reference-counted (`Rc<RefCell<_>>`) rather than the whole stack being
//! shared, so that capturing a closure's environment (cloning the `Vec` of
//! scope handles) shares the *existing* enclosing scopes with the closure
//! while still letting the closure push its own fresh call-local scope on
//! top. `global` and `nonlocal` therefore work by writing through the shared
//! handle of whichever scope declared the name, not by copying values
//! around.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::{
    exception::{ExcType, Exception},
    intern::StringId,
    value::Value,
};

type ScopeMap = IndexMap<StringId, Value>;

#[derive(Debug, Default)]
struct Scope {
    bindings: ScopeMap,
    /// Names declared `global` in this scope: writes go to scope 0 instead.
    globals: AHashSet<StringId>,
    /// Names declared `nonlocal` in this scope, with the scope handle they
    /// resolved to at declaration time.
    nonlocals: IndexMap<StringId, Rc<RefCell<Scope>>>,
}

/// A lexical scope stack. Scope 0 is always the module's global scope: that
/// invariant is what makes `global` a constant-time "write to slot 0"
/// operation instead of a search.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Rc<RefCell<Scope>>>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self { scopes: vec![Rc::new(RefCell::new(Scope::default()))] }
    }

    fn global_scope(&self) -> &Rc<RefCell<Scope>> {
        &self.scopes[0]
    }

    /// Resolves `name` by walking scopes from innermost to the global scope,
    /// per Python's LEGB rule restricted to Local/Enclosing/Global (no
    /// separate module-level "B" since builtins are resolved by the
    /// evaluator when a name lookup here fails entirely).
    #[must_use]
    pub fn get(&self, name: StringId) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.borrow().bindings.get(&name) {
                return Some(v.clone());
            }
        }
        None
    }

    /// Binds `name` in the innermost scope, honoring any `global`/`nonlocal`
    /// declaration already recorded for it there. This is the behavior
    /// ordinary `x = 1` assignment uses.
    pub fn put(&self, name: StringId, value: Value) {
        let top = self.scopes.last().unwrap();
        let redirect = {
            let s = top.borrow();
            if s.globals.contains(&name) {
                Some(self.global_scope().clone())
            } else {
                s.nonlocals.get(&name).cloned()
            }
        };
        match redirect {
            Some(target) => {
                target.borrow_mut().bindings.insert(name, value);
            }
            None => {
                top.borrow_mut().bindings.insert(name, value);
            }
        }
    }

    /// Assigns to `name` in whichever existing scope currently binds it
    /// (walking outward), falling back to creating it in the innermost scope
    /// if no scope already has it. This is the "smart" store a subscript-
    /// aliasing write-back or an augmented assignment to an existing free
    /// variable needs, distinct from `put`'s strict local-by-default rule.
    pub fn smart_put(&self, name: StringId, value: Value) {
        for scope in self.scopes.iter().rev() {
            if scope.borrow().bindings.contains_key(&name) {
                scope.borrow_mut().bindings.insert(name, value);
                return;
            }
        }
        self.put(name, value);
    }

    pub fn put_global(&self, name: StringId, value: Value) {
        self.global_scope().borrow_mut().bindings.insert(name, value);
    }

    /// Copies every binding currently in the global scope, used by a
    /// session's undo history to capture a restorable snapshot before each
    /// `execute`.
    #[must_use]
    pub fn snapshot_globals(&self) -> Vec<(StringId, Value)> {
        self.global_scope().borrow().bindings.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Replaces the global scope's bindings wholesale, as produced by
    /// `snapshot_globals`. Leaves `globals`/`nonlocals` declarations alone,
    /// since those only matter while the nested scope that declared them is
    /// still live, and a snapshot is only ever taken/restored at module
    /// top level where no such scope exists.
    pub fn restore_globals(&mut self, bindings: Vec<(StringId, Value)>) {
        let mut scope = self.global_scope().borrow_mut();
        scope.bindings.clear();
        scope.bindings.extend(bindings);
    }

    /// Writes `name` into the nearest enclosing (non-global, non-local)
    /// scope that already binds it; used internally by `nonlocal`
    /// resolution and by closures writing back to their defining scope.
    pub fn put_enclosing(&self, name: StringId, value: Value) -> Result<(), Exception> {
        let outer = &self.scopes[..self.scopes.len().saturating_sub(1)];
        for scope in outer.iter().rev() {
            if scope.borrow().bindings.contains_key(&name) {
                scope.borrow_mut().bindings.insert(name, value);
                return Ok(());
            }
        }
        Err(Exception::new(ExcType::SyntaxError, "no binding for nonlocal found in enclosing scopes".into()))
    }

    /// Declares `name` `global` in the current (innermost) scope: subsequent
    /// `put`/reads of that name inside this scope redirect to scope 0.
    pub fn declare_global(&self, name: StringId) {
        self.scopes.last().unwrap().borrow_mut().globals.insert(name);
    }

    /// Declares `name` `nonlocal`: resolves it against the *current* stack
    /// (excluding local and global) and binds the current scope's writes of
    /// `name` to that found scope handle.
    pub fn declare_nonlocal(&self, name: StringId) -> Result<(), Exception> {
        let found = self.scopes[1..self.scopes.len().saturating_sub(1)]
            .iter()
            .rev()
            .find(|s| s.borrow().bindings.contains_key(&name))
            .cloned();
        let Some(target) = found else {
            return Err(Exception::new(
                ExcType::SyntaxError,
                format!("no binding for nonlocal '{name:?}' found"),
            ));
        };
        self.scopes.last().unwrap().borrow_mut().nonlocals.insert(name, target);
        Ok(())
    }

    /// Pushes a fresh, empty scope (a function call or comprehension body).
    pub fn push_scope(&mut self) {
        self.scopes.push(Rc::new(RefCell::new(Scope::default())));
    }

    /// Pushes a fresh scope pre-populated with `bindings` (a function call's
    /// bound parameters).
    pub fn push_scope_with(&mut self, bindings: Vec<(StringId, Value)>) {
        let mut scope = Scope::default();
        scope.bindings.extend(bindings);
        self.scopes.push(Rc::new(RefCell::new(scope)));
    }

    /// Pops the innermost scope, returning to the enclosing one.
    pub fn drop_top_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Pops the innermost scope and returns its bindings, used by a `class`
    /// statement to turn its body's namespace into the class's attribute map.
    pub fn take_top_scope_bindings(&mut self) -> Vec<(StringId, Value)> {
        if self.scopes.len() <= 1 {
            return Vec::new();
        }
        let scope = self.scopes.pop().unwrap();
        match Rc::try_unwrap(scope) {
            Ok(cell) => cell.into_inner().bindings.into_iter().collect(),
            Err(shared) => shared.borrow().bindings.iter().map(|(k, v)| (*k, v.clone())).collect(),
        }
    }

    /// Writes `value` back into whichever scope `name`'s *binding site* is,
    /// used after a mutating method or subscript-assignment rewrites a
    /// container's `HeapId` handle and that handle must be visible wherever
    /// the name is already bound (see `heap.rs`'s module doc).
    pub fn put_at_source(&self, name: StringId, value: Value) {
        for scope in self.scopes.iter().rev() {
            if scope.borrow().bindings.contains_key(&name) {
                scope.borrow_mut().bindings.insert(name, value);
                return;
            }
        }
        self.put(name, value);
    }

    /// Removes `name` from whichever scope currently binds it (`del x`).
    /// Returns whether a binding was found and removed.
    pub fn delete(&self, name: StringId) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.borrow_mut().bindings.shift_remove(&name).is_some() {
                return true;
            }
        }
        false
    }

    /// Returns the scope stack depth, used by the evaluator to bound
    /// recursion (one call frame ≈ one pushed scope) independently of the
    /// host's actual call stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Produces the closure environment a `def`/`lambda` captures: every
    /// currently-visible scope, sharing the same underlying `Rc<RefCell<_>>`
    /// handles so writes through the closure are visible at the definition
    /// site and vice versa (required for mutual recursion between sibling
    /// closures and for `nonlocal` to reach through nested defs correctly).
    #[must_use]
    pub fn propagate_scopes(&self) -> Environment {
        Environment { scopes: self.scopes.clone() }
    }

    /// Merges a closure's captured scopes underneath the current call's own
    /// locals: the new top scope goes on top of the closure's full chain,
    /// so a call to a closure sees its defining scopes as its enclosing
    /// scopes without flattening or copying their bindings.
    #[must_use]
    pub fn merge_closure_scopes(captured: &Environment) -> Environment {
        let mut scopes = captured.scopes.clone();
        scopes.push(Rc::new(RefCell::new(Scope::default())));
        Environment { scopes }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn global_write_visible_from_nested_scope() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut env = Environment::new();
        env.put_global(x, Value::Int(1.into()));
        env.push_scope();
        env.declare_global(x);
        env.put(x, Value::Int(2.into()));
        env.drop_top_scope();
        assert!(matches!(env.get(x), Some(Value::Int(i)) if i == 2.into()));
    }

    #[test]
    fn nonlocal_write_reaches_enclosing_scope() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut env = Environment::new();
        env.push_scope();
        env.put(x, Value::Int(1.into()));
        env.push_scope();
        env.declare_nonlocal(x).unwrap();
        env.put(x, Value::Int(42.into()));
        env.drop_top_scope();
        assert!(matches!(env.get(x), Some(Value::Int(i)) if i == 42.into()));
    }

    #[test]
    fn closure_captures_share_enclosing_scope() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut env = Environment::new();
        env.push_scope();
        env.put(x, Value::Int(1.into()));
        let captured = env.propagate_scopes();
        let mut call_env = Environment::merge_closure_scopes(&captured);
        call_env.put_enclosing(x, Value::Int(99.into())).unwrap();
        assert!(matches!(env.get(x), Some(Value::Int(i)) if i == 99.into()));
    }
}
