//! Arena storage for mutable container bodies.
//!
//! Python lists, dicts, sets, classes, instances, and generators are
//! reference-semantic: two names can refer to the *same* mutable object, and
//! mutating through one name must be visible through the other. Rather than
//! sprinkling `Rc<RefCell<_>>` through every [`crate::value::Value`], this
//! follows the teacher's `heap.rs` strategy: containers live in one arena
//! indexed by an integer [`HeapId`], and `Value` only ever carries the
//! handle. Mutating methods and subscript-assignment rebind nothing in the
//! heap itself — they mutate the slot in place — while the *handle* gets
//! written back to the defining scope via `Environment::put_at_source`, which
//! is what makes aliasing and closures-over-mutable-containers behave
//! correctly without shared interior mutability in the evaluator's own
//! plumbing.

use std::fmt;

use indexmap::IndexMap;

use crate::{object::ClassBody, object::InstanceBody, types::GeneratorBody, value::{PyKey, Value}};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(u32);

impl HeapId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The data a [`HeapId`] can point to.
#[derive(Debug, Clone)]
pub enum HeapData {
    List(Vec<Value>),
    /// Insertion-order-preserving mapping; `IndexMap` gives O(1) lookup
    /// while keeping iteration order, matching CPython dict semantics since
    /// 3.7.
    Dict(IndexMap<PyKey, (Value, Value)>),
    /// A set is a dict of key to representative element: when two values
    /// hash-equal (e.g. `1` and `True`), the first inserted is kept, which
    /// is exactly CPython's observable behavior.
    Set(IndexMap<PyKey, Value>),
    Class(ClassBody),
    Instance(InstanceBody),
    Generator(GeneratorBody),
}

/// Snapshot of heap state, used for telemetry and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub live_objects: usize,
    pub free_slots: usize,
}

#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<HeapData>>,
    free: Vec<u32>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, data: HeapData) -> HeapId {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(data);
            return HeapId(index);
        }
        let index = u32::try_from(self.slots.len()).expect("heap overflow");
        self.slots.push(Some(data));
        HeapId(index)
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        self.slots[id.index()].as_ref().expect("dangling HeapId")
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.slots[id.index()].as_mut().expect("dangling HeapId")
    }

    /// Frees a slot for reuse. Only ever called by the iterator/generator
    /// registries that know a handle has no remaining references; ordinary
    /// container values are deliberately never freed mid-run since the
    /// tree-walking evaluator has no reference counting to tell it when the
    /// last name pointing at a list goes out of scope.
    pub fn free(&mut self, id: HeapId) {
        self.slots[id.index()] = None;
        self.free.push(id.0);
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.slots.iter().filter(|s| s.is_some()).count(),
            free_slots: self.free.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_get_round_trips() {
        let mut heap = Heap::new();
        let id = heap.alloc(HeapData::List(vec![Value::Bool(true)]));
        match heap.get(id) {
            HeapData::List(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let a = heap.alloc(HeapData::List(vec![]));
        heap.free(a);
        let b = heap.alloc(HeapData::List(vec![]));
        assert_eq!(a, b);
    }
}
