//! Field repetition cursors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, SpanSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::Component;

/// One repetition of a field, split into components.
#[derive(Clone)]
pub struct Repetition {
    inner: Rc<RepetitionInner>,
}

struct RepetitionInner {
    divider: Rc<Divider>,
    index: usize,
    verbatim: bool,
    components: RefCell<HashMap<usize, Component>>,
}

impl Repetition {
    pub(crate) fn in_field(field: &Rc<Divider>, index: usize) -> Repetition {
        Repetition::over(
            Divider::child(field, SpanSource::Division(index - 1), Split::Components),
            index,
            false,
        )
    }

    /// The single repetition of a header field; never subdivided.
    pub(crate) fn verbatim(field: &Rc<Divider>) -> Repetition {
        Repetition::over(Divider::child(field, SpanSource::Division(0), Split::Verbatim), 1, true)
    }

    fn over(divider: Rc<Divider>, index: usize, verbatim: bool) -> Repetition {
        Repetition {
            inner: Rc::new(RepetitionInner {
                divider,
                index,
                verbatim,
                components: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The component at a 1-based index.
    pub fn component(&self, index: usize) -> Result<Component> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        if self.inner.verbatim && index > 1 {
            return Err(Error::InvalidOperation(
                "this repetition holds a single component".into(),
            ));
        }
        let mut components = self.inner.components.borrow_mut();
        if let Some(component) = components.get(&index) {
            return Ok(component.clone());
        }
        let component = if self.inner.verbatim {
            Component::verbatim(&self.inner.divider)
        } else {
            Component::in_repetition(&self.inner.divider, index)
        };
        components.insert(index, component.clone());
        Ok(component)
    }

    /// An independent copy of this repetition with its own backing
    /// text.
    pub fn detached(&self) -> Repetition {
        let buffer = Buffer::new(
            Element::value(self).unwrap_or_default(),
            EncodingSource::Fixed(self.inner.divider.separators()),
        );
        Repetition::over(
            Divider::root(buffer, Split::Components),
            self.inner.index,
            false,
        )
    }

    fn guard_structural(&self, operation: &str) -> Result<()> {
        if self.inner.verbatim {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} components of a repetition that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl Element for Repetition {
    fn index(&self) -> usize {
        self.inner.index
    }

    fn delimiter(&self) -> Option<char> {
        if self.inner.verbatim {
            None
        } else {
            Some(self.inner.divider.separators().component)
        }
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
        self.inner.divider.count()
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.component(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        self.guard_structural("delete")?;
        self.inner.divider.delete(index - 1);
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "repetition"));
        }
        self.guard_structural("insert")?;
        self.inner.divider.insert(index - 1, value);
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "repetition"));
        }
        self.guard_structural("move")?;
        self.inner.divider.move_division(from - 1, to - 1);
        Ok(())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(Repetition);
