//! Field repetition builders.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::{delete_shift, insert_shift, join_children, last_existing, BuilderNode, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::{ComponentBuilder, FieldBuilder};

enum RepetitionKind {
    /// An ordinary repetition: a sparse map of components.
    Normal {
        components: RefCell<BTreeMap<usize, ComponentBuilder>>,
    },
    /// The single repetition of a virtual field; reads and writes pass
    /// through to it and never subdivide.
    Mirror { field: FieldBuilder },
}

/// One field repetition under construction.
#[derive(Clone)]
pub struct RepetitionBuilder {
    inner: Rc<RepetitionBuilderInner>,
}

struct RepetitionBuilderInner {
    root: Rc<BuilderRoot>,
    index: Cell<usize>,
    kind: RepetitionKind,
}

impl RepetitionBuilder {
    pub(crate) fn new(root: Rc<BuilderRoot>, index: usize) -> RepetitionBuilder {
        RepetitionBuilder {
            inner: Rc::new(RepetitionBuilderInner {
                root,
                index: Cell::new(index),
                kind: RepetitionKind::Normal {
                    components: RefCell::new(BTreeMap::new()),
                },
            }),
        }
    }

    pub(crate) fn mirror(field: FieldBuilder) -> RepetitionBuilder {
        let root = Rc::clone(field.root());
        RepetitionBuilder {
            inner: Rc::new(RepetitionBuilderInner {
                root,
                index: Cell::new(1),
                kind: RepetitionKind::Mirror { field },
            }),
        }
    }

    pub(crate) fn root(&self) -> &Rc<BuilderRoot> {
        &self.inner.root
    }

    fn is_mirror(&self) -> bool {
        matches!(self.inner.kind, RepetitionKind::Mirror { .. })
    }

    /// The component builder at a 1-based index.
    pub fn component(&self, index: usize) -> Result<ComponentBuilder> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        match &self.inner.kind {
            RepetitionKind::Normal { components } => {
                let mut components = components.borrow_mut();
                let component = components.entry(index).or_insert_with(|| {
                    ComponentBuilder::new(Rc::clone(&self.inner.root), index)
                });
                Ok(component.clone())
            }
            RepetitionKind::Mirror { .. } if index > 1 => Err(Error::InvalidOperation(
                "this repetition holds a single component".into(),
            )),
            RepetitionKind::Mirror { .. } => Ok(ComponentBuilder::mirror(self.clone())),
        }
    }

    /// Replace every component, populating from 1.
    pub fn set_components(&self, values: &[&str]) -> Result<&Self> {
        if let RepetitionKind::Normal { components } = &self.inner.kind {
            components.borrow_mut().clear();
        }
        self.set_components_from(1, values)
    }

    /// Overwrite components starting at `start`.
    pub fn set_components_from(&self, start: usize, values: &[&str]) -> Result<&Self> {
        if start < 1 {
            return Err(Error::index(start, "repetition"));
        }
        for (offset, value) in values.iter().enumerate() {
            Element::set_value(&self.component(start + offset)?, value)?;
        }
        Ok(self)
    }

    /// An independent copy of this repetition as an ordinary one.
    pub fn detached(&self) -> RepetitionBuilder {
        let copy = RepetitionBuilder::new(
            BuilderRoot::new(self.inner.root.separators()),
            self.inner.index.get(),
        );
        if let Some(value) = Element::value(self) {
            let _ = Element::set_value(&copy, &value);
        }
        copy
    }

    fn guard_structural(&self, operation: &str) -> Result<()> {
        if self.is_mirror() {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} components of a repetition that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl BuilderNode for RepetitionBuilder {
    fn assign_index(&self, index: usize) {
        self.inner.index.set(index);
    }
}

impl Element for RepetitionBuilder {
    fn index(&self) -> usize {
        self.inner.index.get()
    }

    fn delimiter(&self) -> Option<char> {
        match self.inner.kind {
            RepetitionKind::Normal { .. } => Some(self.inner.root.separators().component),
            RepetitionKind::Mirror { .. } => None,
        }
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        match &self.inner.kind {
            RepetitionKind::Normal { components } => {
                let separators = self.inner.root.separators();
                join_children(&components.borrow(), separators.component)
            }
            RepetitionKind::Mirror { field } => Element::value(field),
        }
    }

    fn set_value(&self, value: &str) -> Result<()> {
        match &self.inner.kind {
            RepetitionKind::Normal { components } => {
                components.borrow_mut().clear();
                let separators = self.inner.root.separators();
                for (offset, token) in value.split(separators.component).enumerate() {
                    if token.is_empty() {
                        continue;
                    }
                    Element::set_value(&self.component(offset + 1)?, token)?;
                }
                Ok(())
            }
            RepetitionKind::Mirror { field } => Element::set_value(field, value),
        }
    }

    fn count(&self) -> usize {
        match &self.inner.kind {
            RepetitionKind::Normal { components } => last_existing(&components.borrow()),
            RepetitionKind::Mirror { .. } => {
                if self.exists() {
                    1
                } else {
                    0
                }
            }
        }
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.component(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        self.guard_structural("delete")?;
        if let RepetitionKind::Normal { components } = &self.inner.kind {
            let mut components = components.borrow_mut();
            let occupied = components.get(&index).is_some_and(|c| c.exists());
            if occupied {
                delete_shift(&mut components, index);
            }
        }
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        self.guard_structural("insert")?;
        if let RepetitionKind::Normal { components } = &self.inner.kind {
            let mut components = components.borrow_mut();
            insert_shift(&mut components, index);
        }
        Element::set_value(&self.component(index)?, value)
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "repetition"));
        }
        self.guard_structural("move")?;
        if from == to {
            return Ok(());
        }
        let value = self
            .component(from)
            .ok()
            .and_then(|c| Element::value(&c))
            .unwrap_or_default();
        self.delete(from)?;
        self.insert(to, &value)
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(RepetitionBuilder);
