//! Segment cursors, including the header segment's asymmetries.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, SpanSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::Field;

/// One segment of a parsed message.
///
/// Index 0 addresses the three-letter type code. On an `MSH` segment,
/// field 1 is the literal field delimiter and field 2 the remaining
/// encoding characters; ordinary fields start at 3 there and at 1
/// everywhere else.
#[derive(Clone)]
pub struct Segment {
    inner: Rc<SegmentInner>,
}

struct SegmentInner {
    divider: Rc<Divider>,
    index: usize,
    /// MSH-ness as of the last field access; a flip drops the field
    /// cache because the external-to-division mapping changes with it.
    header: Cell<bool>,
    fields: RefCell<HashMap<usize, Field>>,
}

impl Segment {
    pub(crate) fn in_message(message: &Rc<Divider>, index: usize) -> Segment {
        Segment::over(
            Divider::child(message, SpanSource::Division(index - 1), Split::Fields),
            index,
        )
    }

    fn over(divider: Rc<Divider>, index: usize) -> Segment {
        let header = matches!(divider.get(0).as_deref(), Some("MSH"));
        Segment {
            inner: Rc::new(SegmentInner {
                divider,
                index,
                header: Cell::new(header),
                fields: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The three-letter type code, `None` on an empty segment.
    pub fn type_code(&self) -> Option<String> {
        self.inner.divider.get(0)
    }

    /// Whether this is the `MSH` header segment.
    pub fn is_header(&self) -> bool {
        self.type_code().as_deref() == Some("MSH")
    }

    /// Rewrite the type code. Changing a segment into or out of `MSH`
    /// is rejected: it would silently re-interpret fields 1 and 2 as
    /// (or as no longer) the delimiter declaration.
    pub fn set_type_code(&self, code: &str) -> Result<()> {
        if self.is_header() != (code == "MSH") {
            return Err(Error::InvalidOperation(
                "cannot change a segment into or out of the MSH header".into(),
            ));
        }
        self.inner.divider.set(0, code);
        Ok(())
    }

    /// The field at a 1-based index; 0 addresses the type code.
    pub fn field(&self, index: usize) -> Result<Field> {
        let header = self.refresh_header();
        let mut fields = self.inner.fields.borrow_mut();
        if let Some(field) = fields.get(&index) {
            return Ok(field.clone());
        }
        let field = Field::in_segment(&self.inner.divider, index, header);
        fields.insert(index, field.clone());
        Ok(field)
    }

    /// An independent copy of this segment with its own backing text
    /// and a snapshot of the current delimiter set.
    pub fn detached(&self) -> Segment {
        let buffer = Buffer::new(
            Element::value(self).unwrap_or_default(),
            EncodingSource::Fixed(self.inner.divider.separators()),
        );
        Segment::over(Divider::root(buffer, Split::Fields), self.inner.index)
    }

    fn refresh_header(&self) -> bool {
        let header = self.is_header();
        if header != self.inner.header.get() {
            self.inner.fields.borrow_mut().clear();
            self.inner.header.set(header);
        }
        header
    }

    /// Map an external field index to a division index, rejecting the
    /// header fields that are not ordinary divisions.
    fn division_for(&self, index: usize, operation: &str) -> Result<usize> {
        if index < 1 {
            return Err(Error::index(index, "segment"));
        }
        if self.refresh_header() {
            if index <= 2 {
                return Err(Error::InvalidOperation(format!(
                    "cannot {operation} field {index} of the MSH header; it is part of the delimiter declaration"
                )));
            }
            Ok(index - 1)
        } else {
            Ok(index)
        }
    }
}

impl Element for Segment {
    fn index(&self) -> usize {
        self.inner.index
    }

    fn delimiter(&self) -> Option<char> {
        Some(self.inner.divider.separators().field)
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
        if self.is_header() {
            // Field 1 is the delimiter character itself, so the raw
            // division count only undercounts when the segment is the
            // bare type code.
            if self.inner.divider.division_count() <= 1 {
                0
            } else {
                self.inner.divider.count()
            }
        } else {
            self.inner.divider.count().saturating_sub(1)
        }
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.field(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        let division = self.division_for(index, "delete")?;
        self.inner.divider.delete(division);
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        let division = self.division_for(index, "insert at")?;
        self.inner.divider.insert(division, value);
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        let from = self.division_for(from, "move")?;
        let to = self.division_for(to, "move to")?;
        self.inner.divider.move_division(from, to);
        Ok(())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(Segment);
