//! Component builders.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::{delete_shift, insert_shift, join_children, last_existing, BuilderNode, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::{RepetitionBuilder, SubcomponentBuilder};

enum ComponentKind {
    /// An ordinary component: a sparse map of subcomponents.
    Normal {
        subcomponents: RefCell<BTreeMap<usize, SubcomponentBuilder>>,
    },
    /// The single component of a mirrored repetition.
    Mirror { repetition: RepetitionBuilder },
}

/// One component under construction.
#[derive(Clone)]
pub struct ComponentBuilder {
    inner: Rc<ComponentBuilderInner>,
}

struct ComponentBuilderInner {
    root: Rc<BuilderRoot>,
    index: Cell<usize>,
    kind: ComponentKind,
}

impl ComponentBuilder {
    pub(crate) fn new(root: Rc<BuilderRoot>, index: usize) -> ComponentBuilder {
        ComponentBuilder {
            inner: Rc::new(ComponentBuilderInner {
                root,
                index: Cell::new(index),
                kind: ComponentKind::Normal {
                    subcomponents: RefCell::new(BTreeMap::new()),
                },
            }),
        }
    }

    pub(crate) fn mirror(repetition: RepetitionBuilder) -> ComponentBuilder {
        let root = Rc::clone(repetition.root());
        ComponentBuilder {
            inner: Rc::new(ComponentBuilderInner {
                root,
                index: Cell::new(1),
                kind: ComponentKind::Mirror { repetition },
            }),
        }
    }

    pub(crate) fn root(&self) -> &Rc<BuilderRoot> {
        &self.inner.root
    }

    fn is_mirror(&self) -> bool {
        matches!(self.inner.kind, ComponentKind::Mirror { .. })
    }

    /// The subcomponent builder at a 1-based index.
    pub fn subcomponent(&self, index: usize) -> Result<SubcomponentBuilder> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        match &self.inner.kind {
            ComponentKind::Normal { subcomponents } => {
                let mut subcomponents = subcomponents.borrow_mut();
                let subcomponent = subcomponents.entry(index).or_insert_with(|| {
                    SubcomponentBuilder::new(Rc::clone(&self.inner.root), index)
                });
                Ok(subcomponent.clone())
            }
            ComponentKind::Mirror { .. } if index > 1 => Err(Error::InvalidOperation(
                "this component holds a single subcomponent".into(),
            )),
            ComponentKind::Mirror { .. } => Ok(SubcomponentBuilder::mirror(self.clone())),
        }
    }

    /// Replace every subcomponent, populating from 1.
    pub fn set_subcomponents(&self, values: &[&str]) -> Result<&Self> {
        if let ComponentKind::Normal { subcomponents } = &self.inner.kind {
            subcomponents.borrow_mut().clear();
        }
        self.set_subcomponents_from(1, values)
    }

    /// Overwrite subcomponents starting at `start`.
    pub fn set_subcomponents_from(&self, start: usize, values: &[&str]) -> Result<&Self> {
        if start < 1 {
            return Err(Error::index(start, "component"));
        }
        for (offset, value) in values.iter().enumerate() {
            Element::set_value(&self.subcomponent(start + offset)?, value)?;
        }
        Ok(self)
    }

    /// An independent copy of this component as an ordinary one.
    pub fn detached(&self) -> ComponentBuilder {
        let copy = ComponentBuilder::new(
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
                "cannot {operation} subcomponents of a component that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl BuilderNode for ComponentBuilder {
    fn assign_index(&self, index: usize) {
        self.inner.index.set(index);
    }
}

impl Element for ComponentBuilder {
    fn index(&self) -> usize {
        self.inner.index.get()
    }

    fn delimiter(&self) -> Option<char> {
        match self.inner.kind {
            ComponentKind::Normal { .. } => Some(self.inner.root.separators().subcomponent),
            ComponentKind::Mirror { .. } => None,
        }
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        match &self.inner.kind {
            ComponentKind::Normal { subcomponents } => {
                let separators = self.inner.root.separators();
                join_children(&subcomponents.borrow(), separators.subcomponent)
            }
            ComponentKind::Mirror { repetition } => Element::value(repetition),
        }
    }

    fn set_value(&self, value: &str) -> Result<()> {
        match &self.inner.kind {
            ComponentKind::Normal { subcomponents } => {
                subcomponents.borrow_mut().clear();
                let separators = self.inner.root.separators();
                for (offset, token) in value.split(separators.subcomponent).enumerate() {
                    if token.is_empty() {
                        continue;
                    }
                    Element::set_value(&self.subcomponent(offset + 1)?, token)?;
                }
                Ok(())
            }
            ComponentKind::Mirror { repetition } => Element::set_value(repetition, value),
        }
    }

    fn count(&self) -> usize {
        match &self.inner.kind {
            ComponentKind::Normal { subcomponents } => last_existing(&subcomponents.borrow()),
            ComponentKind::Mirror { .. } => {
                if self.exists() {
                    1
                } else {
                    0
                }
            }
        }
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.subcomponent(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        self.guard_structural("delete")?;
        if let ComponentKind::Normal { subcomponents } = &self.inner.kind {
            let mut subcomponents = subcomponents.borrow_mut();
            let occupied = subcomponents.get(&index).is_some_and(|s| s.exists());
            if occupied {
                delete_shift(&mut subcomponents, index);
            }
        }
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        self.guard_structural("insert")?;
        if let ComponentKind::Normal { subcomponents } = &self.inner.kind {
            let mut subcomponents = subcomponents.borrow_mut();
            insert_shift(&mut subcomponents, index);
        }
        Element::set_value(&self.subcomponent(index)?, value)
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "component"));
        }
        self.guard_structural("move")?;
        if from == to {
            return Ok(());
        }
        let value = self
            .subcomponent(from)
            .ok()
            .and_then(|s| Element::value(&s))
            .unwrap_or_default();
        self.delete(from)?;
        self.insert(to, &value)
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(ComponentBuilder);
