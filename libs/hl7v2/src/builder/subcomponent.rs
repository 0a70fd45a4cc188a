//! Subcomponent builders: the leaves of the builder tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::builder::{BuilderNode, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::ComponentBuilder;

enum SubcomponentKind {
    /// An ordinary leaf holding its own text.
    Normal { value: RefCell<String> },
    /// The single subcomponent of a mirrored component.
    Mirror { component: ComponentBuilder },
}

/// One subcomponent under construction: a leaf holding raw text.
#[derive(Clone)]
pub struct SubcomponentBuilder {
    inner: Rc<SubcomponentBuilderInner>,
}

struct SubcomponentBuilderInner {
    root: Rc<BuilderRoot>,
    index: Cell<usize>,
    kind: SubcomponentKind,
}

impl SubcomponentBuilder {
    pub(crate) fn new(root: Rc<BuilderRoot>, index: usize) -> SubcomponentBuilder {
        SubcomponentBuilder {
            inner: Rc::new(SubcomponentBuilderInner {
                root,
                index: Cell::new(index),
                kind: SubcomponentKind::Normal {
                    value: RefCell::new(String::new()),
                },
            }),
        }
    }

    pub(crate) fn mirror(component: ComponentBuilder) -> SubcomponentBuilder {
        let root = Rc::clone(component.root());
        SubcomponentBuilder {
            inner: Rc::new(SubcomponentBuilderInner {
                root,
                index: Cell::new(1),
                kind: SubcomponentKind::Mirror { component },
            }),
        }
    }

    /// An independent copy of this subcomponent.
    pub fn detached(&self) -> SubcomponentBuilder {
        let copy = SubcomponentBuilder::new(
            BuilderRoot::new(self.inner.root.separators()),
            self.inner.index.get(),
        );
        if let Some(value) = Element::value(self) {
            let _ = Element::set_value(&copy, &value);
        }
        copy
    }

    fn leaf_error(&self) -> Error {
        Error::InvalidOperation("subcomponents have no children".into())
    }
}

impl BuilderNode for SubcomponentBuilder {
    fn assign_index(&self, index: usize) {
        self.inner.index.set(index);
    }
}

impl Element for SubcomponentBuilder {
    fn index(&self) -> usize {
        self.inner.index.get()
    }

    fn delimiter(&self) -> Option<char> {
        None
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        match &self.inner.kind {
            SubcomponentKind::Normal { value } => {
                let value = value.borrow();
                if value.is_empty() {
                    None
                } else {
                    Some(value.clone())
                }
            }
            SubcomponentKind::Mirror { component } => Element::value(component),
        }
    }

    fn set_value(&self, new_value: &str) -> Result<()> {
        match &self.inner.kind {
            SubcomponentKind::Normal { value } => {
                let mut value = value.borrow_mut();
                value.clear();
                value.push_str(new_value);
                Ok(())
            }
            SubcomponentKind::Mirror { component } => Element::set_value(component, new_value),
        }
    }

    fn count(&self) -> usize {
        0
    }

    fn child(&self, _index: usize) -> Result<Box<dyn Element>> {
        Err(self.leaf_error())
    }

    fn delete(&self, _index: usize) -> Result<()> {
        Err(self.leaf_error())
    }

    fn insert(&self, _index: usize, _value: &str) -> Result<()> {
        Err(self.leaf_error())
    }

    fn move_child(&self, _from: usize, _to: usize) -> Result<()> {
        Err(self.leaf_error())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(SubcomponentBuilder);
