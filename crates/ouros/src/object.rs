//! Classes, instances, and C3-linearised method resolution order.
//!
//! A `class` statement's body evaluates into a fresh scope; that scope's
//! bindings become the class's attribute map ([`ClassBody::attrs`]). Instance
//! attribute lookup consults the instance first, then walks the MRO
//! ([`ClassBody::mro`]) computed once at class-definition time by
//! [`compute_mro`]. Methods retrieved off the MRO become [`crate::value::
//! BoundMethod`]s that remember which class they were found on, which is
//! exactly what lets `super()` skip the current class's own definition.

use indexmap::IndexMap;

use crate::{
    exception::{ExcType, Exception},
    heap::{Heap, HeapData, HeapId},
    intern::StringId,
    value::Value,
};

/// A route registered by a `{register_route, method, path, handler}`
/// decorator sentinel (spec.md §6), attached to the decorated object's
/// owning class under `__routes__`.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    pub handler: Value,
}

#[derive(Debug, Clone)]
pub struct ClassBody {
    pub name: StringId,
    pub bases: Vec<HeapId>,
    /// C3 linearisation, self first, computed once at class-definition time.
    pub mro: Vec<HeapId>,
    pub attrs: IndexMap<StringId, Value>,
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone)]
pub struct InstanceBody {
    pub class: HeapId,
    pub attrs: IndexMap<StringId, Value>,
}

/// C3 linearisation: `L(C) = C + merge(L(B1), .., L(Bn), [B1..Bn])`.
///
/// `merge` repeatedly takes the first head that is not in the tail of any
/// other list. If no such head exists the hierarchy has no consistent
/// linearisation; per spec.md §4.6 we fall back to a deterministic
/// left-to-right union rather than failing the class statement outright.
pub fn compute_mro(bases: &[HeapId], heap: &Heap) -> Vec<HeapId> {
    let base_mros: Vec<Vec<HeapId>> = bases
        .iter()
        .map(|&b| match heap.get(b) {
            HeapData::Class(c) => c.mro.clone(),
            _ => vec![b],
        })
        .collect();
    let mut sequences: Vec<Vec<HeapId>> = base_mros;
    sequences.push(bases.to_vec());
    merge(sequences)
}

fn merge(mut sequences: Vec<Vec<HeapId>>) -> Vec<HeapId> {
    let mut result = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return result;
        }
        let mut chosen = None;
        'candidates: for seq in &sequences {
            let candidate = seq[0];
            for other in &sequences {
                if other[1..].contains(&candidate) {
                    continue 'candidates;
                }
            }
            chosen = Some(candidate);
            break;
        }
        let Some(candidate) = chosen else {
            // No consistent linearisation: deterministic left-to-right
            // fallback instead of rejecting the class definition.
            for seq in &sequences {
                for &item in seq {
                    if !result.contains(&item) {
                        result.push(item);
                    }
                }
            }
            return result;
        };
        result.push(candidate);
        for seq in &mut sequences {
            seq.retain(|&x| x != candidate);
        }
    }
}

/// Looks up `name` on an instance: instance attrs first, then the class MRO
/// (skipping `skip_through`, used by `super()` to start past the calling
/// class). Returns the class the attribute was found on (for bound-method
/// `defining_class`) alongside the value.
pub fn resolve_attr(
    instance: &InstanceBody,
    name: StringId,
    heap: &Heap,
    skip_through: Option<HeapId>,
) -> Option<(Value, Option<HeapId>)> {
    if skip_through.is_none()
        && let Some(v) = instance.attrs.get(&name)
    {
        return Some((v.clone(), None));
    }
    let class = match heap.get(instance.class) {
        HeapData::Class(c) => c,
        _ => return None,
    };
    let mut mro_iter = class.mro.iter();
    if let Some(skip) = skip_through {
        for id in mro_iter.by_ref() {
            if *id == skip {
                break;
            }
        }
    }
    for &class_id in mro_iter {
        if let HeapData::Class(c) = heap.get(class_id)
            && let Some(v) = c.attrs.get(&name)
        {
            return Some((v.clone(), Some(class_id)));
        }
    }
    None
}

/// `AttributeError` raised when no attribute is found anywhere in the MRO.
#[must_use]
pub fn attribute_error(type_name: &str, attr: &str) -> Exception {
    Exception::new(ExcType::AttributeError, format!("'{type_name}' object has no attribute '{attr}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_class(heap: &mut Heap, name: &str, bases: Vec<HeapId>) -> HeapId {
        let mut interner = crate::intern::Interner::new();
        let name = interner.intern(name);
        let mro = compute_mro(&bases, heap);
        let mut full_mro = vec![];
        let id = heap.alloc(HeapData::Class(ClassBody {
            name,
            bases,
            mro: vec![],
            attrs: IndexMap::new(),
            routes: vec![],
        }));
        full_mro.push(id);
        full_mro.extend(mro);
        if let HeapData::Class(c) = heap.get_mut(id) {
            c.mro = full_mro;
        }
        id
    }

    #[test]
    fn diamond_inheritance_linearises_each_ancestor_once() {
        let mut heap = Heap::new();
        let o = make_class(&mut heap, "O", vec![]);
        let a = make_class(&mut heap, "A", vec![o]);
        let b = make_class(&mut heap, "B", vec![o]);
        let c = make_class(&mut heap, "C", vec![a, b]);
        let HeapData::Class(class_c) = heap.get(c) else { unreachable!() };
        let mro = &class_c.mro;
        assert_eq!(mro.iter().filter(|&&id| id == o).count(), 1);
        assert_eq!(mro[0], c);
        assert!(mro.iter().position(|&id| id == a).unwrap() < mro.iter().position(|&id| id == o).unwrap());
        assert!(mro.iter().position(|&id| id == b).unwrap() < mro.iter().position(|&id| id == o).unwrap());
    }
}
