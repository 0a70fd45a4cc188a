//! Component cursors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, SpanSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::Subcomponent;

/// One component of a repetition, split into subcomponents.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

struct ComponentInner {
    divider: Rc<Divider>,
    index: usize,
    verbatim: bool,
    subcomponents: RefCell<HashMap<usize, Subcomponent>>,
}

impl Component {
    pub(crate) fn in_repetition(repetition: &Rc<Divider>, index: usize) -> Component {
        Component::over(
            Divider::child(repetition, SpanSource::Division(index - 1), Split::Subcomponents),
            index,
            false,
        )
    }

    pub(crate) fn verbatim(repetition: &Rc<Divider>) -> Component {
        Component::over(
            Divider::child(repetition, SpanSource::Division(0), Split::Verbatim),
            1,
            true,
        )
    }

    fn over(divider: Rc<Divider>, index: usize, verbatim: bool) -> Component {
        Component {
            inner: Rc::new(ComponentInner {
                divider,
                index,
                verbatim,
                subcomponents: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The subcomponent at a 1-based index.
    pub fn subcomponent(&self, index: usize) -> Result<Subcomponent> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        if self.inner.verbatim && index > 1 {
            return Err(Error::InvalidOperation(
                "this component holds a single subcomponent".into(),
            ));
        }
        let mut subcomponents = self.inner.subcomponents.borrow_mut();
        if let Some(subcomponent) = subcomponents.get(&index) {
            return Ok(subcomponent.clone());
        }
        let division = if self.inner.verbatim { 0 } else { index - 1 };
        let subcomponent = Subcomponent::in_component(&self.inner.divider, division, index);
        subcomponents.insert(index, subcomponent.clone());
        Ok(subcomponent)
    }

    /// An independent copy of this component with its own backing text.
    pub fn detached(&self) -> Component {
        let buffer = Buffer::new(
            Element::value(self).unwrap_or_default(),
            EncodingSource::Fixed(self.inner.divider.separators()),
        );
        Component::over(
            Divider::root(buffer, Split::Subcomponents),
            self.inner.index,
            false,
        )
    }

    fn guard_structural(&self, operation: &str) -> Result<()> {
        if self.inner.verbatim {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} subcomponents of a component that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl Element for Component {
    fn index(&self) -> usize {
        self.inner.index
    }

    fn delimiter(&self) -> Option<char> {
        if self.inner.verbatim {
            None
        } else {
            Some(self.inner.divider.separators().subcomponent)
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
        Ok(Box::new(self.subcomponent(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        self.guard_structural("delete")?;
        self.inner.divider.delete(index - 1);
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "component"));
        }
        self.guard_structural("insert")?;
        self.inner.divider.insert(index - 1, value);
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "component"));
        }
        self.guard_structural("move")?;
        self.inner.divider.move_division(from - 1, to - 1);
        Ok(())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(Component);
