//! Field cursors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, SpanSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::Repetition;

/// What a field cursor stands for. The header segment bends the
/// ordinary field-to-division mapping: its first two fields are the
/// delimiter declaration and are never subdivided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Division 0 of the segment: the type code.
    TypeCode,
    /// The literal field delimiter character (`MSH-1`).
    HeaderDelimiter,
    /// The encoding characters, verbatim (`MSH-2`).
    HeaderEncoding,
    /// An ordinary field, split into repetitions.
    Normal,
}

/// One field of a segment.
#[derive(Clone)]
pub struct Field {
    inner: Rc<FieldInner>,
}

struct FieldInner {
    divider: Rc<Divider>,
    segment: Rc<Divider>,
    kind: FieldKind,
    index: usize,
    repetitions: RefCell<HashMap<usize, Repetition>>,
}

impl Field {
    pub(crate) fn in_segment(segment: &Rc<Divider>, index: usize, header: bool) -> Field {
        let (kind, divider) = if index == 0 {
            (
                FieldKind::TypeCode,
                Divider::child(segment, SpanSource::Division(0), Split::Verbatim),
            )
        } else if header && index == 1 {
            (
                FieldKind::HeaderDelimiter,
                Divider::child(segment, SpanSource::HeaderDelimiter, Split::Verbatim),
            )
        } else if header && index == 2 {
            (
                FieldKind::HeaderEncoding,
                Divider::child(segment, SpanSource::Division(1), Split::Verbatim),
            )
        } else {
            let division = if header { index - 1 } else { index };
            (
                FieldKind::Normal,
                Divider::child(segment, SpanSource::Division(division), Split::Repetitions),
            )
        };
        Field {
            inner: Rc::new(FieldInner {
                divider,
                segment: Rc::clone(segment),
                kind,
                index,
                repetitions: RefCell::new(HashMap::new()),
            }),
        }
    }

    fn over(divider: Rc<Divider>, segment: Rc<Divider>, index: usize) -> Field {
        Field {
            inner: Rc::new(FieldInner {
                divider,
                segment,
                kind: FieldKind::Normal,
                index,
                repetitions: RefCell::new(HashMap::new()),
            }),
        }
    }

    fn is_verbatim(&self) -> bool {
        self.inner.kind != FieldKind::Normal
    }

    /// The repetition at a 1-based index. The type code and the header
    /// fields hold exactly one verbatim repetition.
    pub fn repetition(&self, index: usize) -> Result<Repetition> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        if self.is_verbatim() && index > 1 {
            return Err(Error::InvalidOperation(
                "this field holds a single repetition".into(),
            ));
        }
        let mut repetitions = self.inner.repetitions.borrow_mut();
        if let Some(repetition) = repetitions.get(&index) {
            return Ok(repetition.clone());
        }
        let repetition = if self.is_verbatim() {
            Repetition::verbatim(&self.inner.divider)
        } else {
            Repetition::in_field(&self.inner.divider, index)
        };
        repetitions.insert(index, repetition.clone());
        Ok(repetition)
    }

    /// An independent copy of this field as an ordinary (splittable)
    /// field with its own backing text.
    pub fn detached(&self) -> Field {
        let separators = self.inner.divider.separators();
        let buffer = Buffer::new(
            Element::value(self).unwrap_or_default(),
            EncodingSource::Fixed(separators),
        );
        let root = Divider::root(buffer, Split::Repetitions);
        Field::over(Rc::clone(&root), root, self.inner.index)
    }

    fn guard_structural(&self, operation: &str) -> Result<()> {
        if self.is_verbatim() {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} repetitions of a field that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl Element for Field {
    fn index(&self) -> usize {
        self.inner.index
    }

    fn delimiter(&self) -> Option<char> {
        match self.inner.kind {
            FieldKind::Normal => Some(self.inner.divider.separators().repetition),
            _ => None,
        }
    }

    fn separators(&self) -> Separators {
        self.inner.divider.separators()
    }

    fn value(&self) -> Option<String> {
        self.inner.divider.value()
    }

    fn set_value(&self, value: &str) -> Result<()> {
        match self.inner.kind {
            FieldKind::TypeCode => {
                let currently = matches!(self.inner.segment.get(0).as_deref(), Some("MSH"));
                if currently != (value == "MSH") {
                    return Err(Error::InvalidOperation(
                        "cannot change a segment into or out of the MSH header".into(),
                    ));
                }
            }
            FieldKind::HeaderDelimiter => {
                let mut chars = value.chars();
                let (first, rest) = (chars.next(), chars.next());
                let field = match (first, rest) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(Error::InvalidDelimiter(
                            "the field delimiter must be a single character".into(),
                        ))
                    }
                };
                self.inner.divider.separators().with_field(field)?;
            }
            FieldKind::HeaderEncoding => {
                self.inner
                    .divider
                    .separators()
                    .with_encoding_characters(value)?;
            }
            FieldKind::Normal => {}
        }
        self.inner.divider.set_value(value);
        Ok(())
    }

    fn count(&self) -> usize {
        self.inner.divider.count()
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.repetition(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        self.guard_structural("delete")?;
        self.inner.divider.delete(index - 1);
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        self.guard_structural("insert")?;
        self.inner.divider.insert(index - 1, value);
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "field"));
        }
        self.guard_structural("move")?;
        self.inner.divider.move_division(from - 1, to - 1);
        Ok(())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(Field);
