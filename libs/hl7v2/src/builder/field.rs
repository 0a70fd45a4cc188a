//! Field builders, including the header segment's virtual fields.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::{delete_shift, insert_shift, join_children, last_existing, BuilderNode, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::{RepetitionBuilder, SegmentBuilder};

enum FieldKind {
    /// An ordinary field: a sparse map of repetitions.
    Normal {
        repetitions: RefCell<BTreeMap<usize, RepetitionBuilder>>,
    },
    /// Index 0 of a segment: a view of its type code.
    TypeCode { segment: SegmentBuilder },
    /// `MSH-1`: a view of the root field delimiter.
    HeaderDelimiter,
    /// `MSH-2`: a view of the root encoding characters.
    HeaderEncoding,
}

/// One field under construction.
#[derive(Clone)]
pub struct FieldBuilder {
    inner: Rc<FieldBuilderInner>,
}

struct FieldBuilderInner {
    root: Rc<BuilderRoot>,
    index: Cell<usize>,
    kind: FieldKind,
}

impl FieldBuilder {
    pub(crate) fn new(root: Rc<BuilderRoot>, index: usize) -> FieldBuilder {
        FieldBuilder::with_kind(
            root,
            index,
            FieldKind::Normal {
                repetitions: RefCell::new(BTreeMap::new()),
            },
        )
    }

    pub(crate) fn type_code(segment: SegmentBuilder) -> FieldBuilder {
        let root = Rc::clone(segment.root());
        FieldBuilder::with_kind(root, 0, FieldKind::TypeCode { segment })
    }

    pub(crate) fn header_delimiter(root: Rc<BuilderRoot>) -> FieldBuilder {
        FieldBuilder::with_kind(root, 1, FieldKind::HeaderDelimiter)
    }

    pub(crate) fn header_encoding(root: Rc<BuilderRoot>) -> FieldBuilder {
        FieldBuilder::with_kind(root, 2, FieldKind::HeaderEncoding)
    }

    fn with_kind(root: Rc<BuilderRoot>, index: usize, kind: FieldKind) -> FieldBuilder {
        FieldBuilder {
            inner: Rc::new(FieldBuilderInner {
                root,
                index: Cell::new(index),
                kind,
            }),
        }
    }

    pub(crate) fn root(&self) -> &Rc<BuilderRoot> {
        &self.inner.root
    }

    fn is_virtual(&self) -> bool {
        !matches!(self.inner.kind, FieldKind::Normal { .. })
    }

    /// The repetition builder at a 1-based index. The type code and
    /// the header fields hold exactly one mirrored repetition.
    pub fn repetition(&self, index: usize) -> Result<RepetitionBuilder> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        match &self.inner.kind {
            FieldKind::Normal { repetitions } => {
                let mut repetitions = repetitions.borrow_mut();
                let repetition = repetitions.entry(index).or_insert_with(|| {
                    RepetitionBuilder::new(Rc::clone(&self.inner.root), index)
                });
                Ok(repetition.clone())
            }
            _ if index > 1 => Err(Error::InvalidOperation(
                "this field holds a single repetition".into(),
            )),
            _ => Ok(RepetitionBuilder::mirror(self.clone())),
        }
    }

    /// Replace every repetition, populating from 1.
    pub fn set_repetitions(&self, values: &[&str]) -> Result<&Self> {
        if let FieldKind::Normal { repetitions } = &self.inner.kind {
            repetitions.borrow_mut().clear();
        }
        self.set_repetitions_from(1, values)
    }

    /// Overwrite repetitions starting at `start`.
    pub fn set_repetitions_from(&self, start: usize, values: &[&str]) -> Result<&Self> {
        if start < 1 {
            return Err(Error::index(start, "field"));
        }
        for (offset, value) in values.iter().enumerate() {
            Element::set_value(&self.repetition(start + offset)?, value)?;
        }
        Ok(self)
    }

    /// An independent copy of this field as an ordinary field.
    pub fn detached(&self) -> FieldBuilder {
        let copy = FieldBuilder::new(
            BuilderRoot::new(self.inner.root.separators()),
            self.inner.index.get(),
        );
        if let Some(value) = Element::value(self) {
            let _ = Element::set_value(&copy, &value);
        }
        copy
    }

    fn guard_structural(&self, operation: &str) -> Result<()> {
        if self.is_virtual() {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} repetitions of a field that is not subdivided"
            )));
        }
        Ok(())
    }
}

impl BuilderNode for FieldBuilder {
    fn assign_index(&self, index: usize) {
        self.inner.index.set(index);
    }
}

impl Element for FieldBuilder {
    fn index(&self) -> usize {
        self.inner.index.get()
    }

    fn delimiter(&self) -> Option<char> {
        match self.inner.kind {
            FieldKind::Normal { .. } => Some(self.inner.root.separators().repetition),
            _ => None,
        }
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        match &self.inner.kind {
            FieldKind::Normal { repetitions } => {
                let separators = self.inner.root.separators();
                join_children(&repetitions.borrow(), separators.repetition)
            }
            FieldKind::TypeCode { segment } => segment.type_code(),
            FieldKind::HeaderDelimiter => {
                Some(self.inner.root.separators().field.to_string())
            }
            FieldKind::HeaderEncoding => {
                Some(self.inner.root.separators().encoding_characters())
            }
        }
    }

    fn set_value(&self, value: &str) -> Result<()> {
        match &self.inner.kind {
            FieldKind::Normal { repetitions } => {
                repetitions.borrow_mut().clear();
                let separators = self.inner.root.separators();
                for (offset, token) in value.split(separators.repetition).enumerate() {
                    if token.is_empty() {
                        continue;
                    }
                    Element::set_value(&self.repetition(offset + 1)?, token)?;
                }
                Ok(())
            }
            FieldKind::TypeCode { segment } => segment.set_type_code(value),
            FieldKind::HeaderDelimiter => {
                let mut chars = value.chars();
                let field = match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(Error::InvalidDelimiter(
                            "the field delimiter must be a single character".into(),
                        ))
                    }
                };
                let separators = self.inner.root.separators().with_field(field)?;
                self.inner.root.set_separators(separators);
                Ok(())
            }
            FieldKind::HeaderEncoding => {
                let separators = self
                    .inner
                    .root
                    .separators()
                    .with_encoding_characters(value)?;
                self.inner.root.set_separators(separators);
                Ok(())
            }
        }
    }

    fn count(&self) -> usize {
        match &self.inner.kind {
            FieldKind::Normal { repetitions } => last_existing(&repetitions.borrow()),
            _ => {
                if self.exists() {
                    1
                } else {
                    0
                }
            }
        }
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.repetition(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        self.guard_structural("delete")?;
        if let FieldKind::Normal { repetitions } = &self.inner.kind {
            let mut repetitions = repetitions.borrow_mut();
            let occupied = repetitions.get(&index).is_some_and(|r| r.exists());
            if occupied {
                delete_shift(&mut repetitions, index);
            }
        }
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "field"));
        }
        self.guard_structural("insert")?;
        if let FieldKind::Normal { repetitions } = &self.inner.kind {
            let mut repetitions = repetitions.borrow_mut();
            insert_shift(&mut repetitions, index);
        }
        Element::set_value(&self.repetition(index)?, value)
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "field"));
        }
        self.guard_structural("move")?;
        if from == to {
            return Ok(());
        }
        let value = self
            .repetition(from)
            .ok()
            .and_then(|r| Element::value(&r))
            .unwrap_or_default();
        self.delete(from)?;
        self.insert(to, &value)
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(FieldBuilder);
