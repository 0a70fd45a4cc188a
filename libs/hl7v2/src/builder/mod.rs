//! The builder backend: independent mutable nodes, serialized on
//! demand.
//!
//! Every non-leaf builder owns a sparse map from 1-based index to child
//! builder. Values join the map in ascending key order, repeating the
//! level's delimiter across gaps; assigning a value clears the map and
//! re-populates it by splitting. The root holds the delimiter set and
//! shares it with every descendant by reference, so changing `MSH-1` or
//! `MSH-2` re-renders the whole tree.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::element::Element;
use crate::encoding::Separators;

mod component;
mod field;
mod message;
mod repetition;
mod segment;
mod subcomponent;

pub use component::ComponentBuilder;
pub use field::FieldBuilder;
pub use message::MessageBuilder;
pub use repetition::RepetitionBuilder;
pub use segment::SegmentBuilder;
pub use subcomponent::SubcomponentBuilder;

/// Shared root state: the one delimiter set for the whole tree.
pub(crate) struct BuilderRoot {
    separators: RefCell<Separators>,
}

impl BuilderRoot {
    pub fn new(separators: Separators) -> Rc<Self> {
        Rc::new(Self {
            separators: RefCell::new(separators),
        })
    }

    pub fn separators(&self) -> Separators {
        *self.separators.borrow()
    }

    pub fn set_separators(&self, separators: Separators) {
        *self.separators.borrow_mut() = separators;
    }
}

/// A builder child whose index can be renumbered when siblings shift.
pub(crate) trait BuilderNode {
    fn assign_index(&self, index: usize);
}

/// Join a sparse child map up to its last existing child, repeating the
/// delimiter across gaps. `None` when no child exists.
pub(crate) fn join_children<T: Element>(
    map: &BTreeMap<usize, T>,
    delimiter: char,
) -> Option<String> {
    let last = map
        .iter()
        .rev()
        .find(|(_, child)| child.exists())
        .map(|(index, _)| *index)?;
    let mut out = String::new();
    for index in 1..=last {
        if index > 1 {
            out.push(delimiter);
        }
        if let Some(child) = map.get(&index) {
            if let Some(value) = child.value() {
                out.push_str(&value);
            }
        }
    }
    Some(out)
}

/// The last index holding an existing child, or 0.
pub(crate) fn last_existing<T: Element>(map: &BTreeMap<usize, T>) -> usize {
    map.iter()
        .rev()
        .find(|(_, child)| child.exists())
        .map(|(index, _)| *index)
        .unwrap_or(0)
}

/// Remove the child at `index` and renumber everything above it one
/// slot down.
pub(crate) fn delete_shift<T: BuilderNode>(map: &mut BTreeMap<usize, T>, index: usize) {
    map.remove(&index);
    let tail = map.split_off(&(index + 1));
    for (key, child) in tail {
        child.assign_index(key - 1);
        map.insert(key - 1, child);
    }
}

/// Renumber the child at `index` and everything above it one slot up,
/// leaving `index` free.
pub(crate) fn insert_shift<T: BuilderNode>(map: &mut BTreeMap<usize, T>, index: usize) {
    let tail = map.split_off(&index);
    for (key, child) in tail {
        child.assign_index(key + 1);
        map.insert(key + 1, child);
    }
}
