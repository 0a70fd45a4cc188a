//! Subcomponent cursors: the leaves of the tree.

use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, SpanSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

/// One subcomponent: a leaf element with no delimiter of its own.
/// Setting its value splices the backing buffer directly.
#[derive(Clone)]
pub struct Subcomponent {
    inner: Rc<SubcomponentInner>,
}

struct SubcomponentInner {
    divider: Rc<Divider>,
    index: usize,
}

impl Subcomponent {
    pub(crate) fn in_component(
        component: &Rc<Divider>,
        division: usize,
        index: usize,
    ) -> Subcomponent {
        Subcomponent {
            inner: Rc::new(SubcomponentInner {
                divider: Divider::child(component, SpanSource::Division(division), Split::Verbatim),
                index,
            }),
        }
    }

    /// An independent copy of this subcomponent with its own backing
    /// text.
    pub fn detached(&self) -> Subcomponent {
        let buffer = Buffer::new(
            Element::value(self).unwrap_or_default(),
            EncodingSource::Fixed(self.inner.divider.separators()),
        );
        let root = Divider::root(buffer, Split::Verbatim);
        Subcomponent {
            inner: Rc::new(SubcomponentInner {
                divider: Divider::child(&root, SpanSource::Division(0), Split::Verbatim),
                index: self.inner.index,
            }),
        }
    }

    fn leaf_error(&self) -> Error {
        Error::InvalidOperation("subcomponents have no children".into())
    }
}

impl Element for Subcomponent {
    fn index(&self) -> usize {
        self.inner.index
    }

    fn delimiter(&self) -> Option<char> {
        None
    }

    fn separators(&self) -> Separators {
        self.inner.divider.separators()
    }

    fn value(&self) -> Option<String> {
        self.inner.divider.value()
    }

    fn set_value(&self, value: &str) -> Result<()> {
        self.inner.divider.set_value(value);
        Ok(())
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

impl_value_traits!(Subcomponent);
