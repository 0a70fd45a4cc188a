//! Segment builders.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::{delete_shift, insert_shift, last_existing, BuilderNode, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::FieldBuilder;

/// One segment under construction.
///
/// The type code lives outside the field map. On an `MSH` segment,
/// fields 1 and 2 are views of the root delimiter set and the map holds
/// only ordinary fields (3 and up).
#[derive(Clone)]
pub struct SegmentBuilder {
    inner: Rc<SegmentBuilderInner>,
}

struct SegmentBuilderInner {
    root: Rc<BuilderRoot>,
    index: Cell<usize>,
    type_code: RefCell<String>,
    fields: RefCell<BTreeMap<usize, FieldBuilder>>,
}

impl SegmentBuilder {
    pub(crate) fn new(root: Rc<BuilderRoot>, index: usize) -> SegmentBuilder {
        SegmentBuilder {
            inner: Rc::new(SegmentBuilderInner {
                root,
                index: Cell::new(index),
                type_code: RefCell::new(String::new()),
                fields: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    pub(crate) fn root(&self) -> &Rc<BuilderRoot> {
        &self.inner.root
    }

    /// The three-letter type code, `None` while unset.
    pub fn type_code(&self) -> Option<String> {
        let code = self.inner.type_code.borrow();
        if code.is_empty() {
            None
        } else {
            Some(code.clone())
        }
    }

    /// Whether this is the `MSH` header segment.
    pub fn is_header(&self) -> bool {
        self.type_code().as_deref() == Some("MSH")
    }

    /// Rewrite the type code. Changing a segment into or out of `MSH`
    /// is rejected, as on the cursor backend.
    pub fn set_type_code(&self, code: &str) -> Result<()> {
        if self.is_header() != (code == "MSH") {
            return Err(Error::InvalidOperation(
                "cannot change a segment into or out of the MSH header".into(),
            ));
        }
        self.adopt_type_code(code);
        Ok(())
    }

    pub(crate) fn adopt_type_code(&self, code: &str) {
        let mut type_code = self.inner.type_code.borrow_mut();
        type_code.clear();
        type_code.push_str(code);
    }

    /// The field builder at a 1-based index; 0 addresses the type code.
    /// Header fields 1 and 2 are views of the delimiter set.
    pub fn field(&self, index: usize) -> Result<FieldBuilder> {
        if index == 0 {
            return Ok(FieldBuilder::type_code(self.clone()));
        }
        if self.is_header() && index <= 2 {
            return Ok(if index == 1 {
                FieldBuilder::header_delimiter(Rc::clone(&self.inner.root))
            } else {
                FieldBuilder::header_encoding(Rc::clone(&self.inner.root))
            });
        }
        let mut fields = self.inner.fields.borrow_mut();
        let field = fields
            .entry(index)
            .or_insert_with(|| FieldBuilder::new(Rc::clone(&self.inner.root), index));
        Ok(field.clone())
    }

    /// Replace every field, populating from 1.
    pub fn set_fields(&self, values: &[&str]) -> Result<&Self> {
        self.inner.fields.borrow_mut().clear();
        self.set_fields_from(1, values)
    }

    /// Overwrite fields starting at `start`, leaving earlier ones in
    /// place.
    pub fn set_fields_from(&self, start: usize, values: &[&str]) -> Result<&Self> {
        if start < 1 {
            return Err(Error::index(start, "segment"));
        }
        for (offset, value) in values.iter().enumerate() {
            Element::set_value(&self.field(start + offset)?, value)?;
        }
        Ok(self)
    }

    /// An independent copy of this segment.
    pub fn detached(&self) -> SegmentBuilder {
        let copy = SegmentBuilder::new(
            BuilderRoot::new(self.inner.root.separators()),
            self.inner.index.get(),
        );
        if let Some(value) = Element::value(self) {
            // Infallible: a serialized segment always re-parses.
            let _ = Element::set_value(&copy, &value);
        }
        copy
    }

    /// Map an external field index to a map key, rejecting the header
    /// fields that are not ordinary children.
    fn guard_structural(&self, index: usize, operation: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "segment"));
        }
        if self.is_header() && index <= 2 {
            return Err(Error::InvalidOperation(format!(
                "cannot {operation} field {index} of the MSH header; it is part of the delimiter declaration"
            )));
        }
        Ok(())
    }
}

impl BuilderNode for SegmentBuilder {
    fn assign_index(&self, index: usize) {
        self.inner.index.set(index);
    }
}

impl Element for SegmentBuilder {
    fn index(&self) -> usize {
        self.inner.index.get()
    }

    fn delimiter(&self) -> Option<char> {
        Some(self.inner.root.separators().field)
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        let separators = self.inner.root.separators();
        let fields = self.inner.fields.borrow();
        let type_code = self.inner.type_code.borrow();
        if self.is_header() {
            let mut out = String::from("MSH");
            out.push(separators.field);
            out.push_str(&separators.encoding_characters());
            let last = last_existing(&fields);
            for index in 3..=last.max(2) {
                out.push(separators.field);
                if let Some(value) = fields.get(&index).and_then(|f| f.value()) {
                    out.push_str(&value);
                }
            }
            return Some(out);
        }
        let last = last_existing(&fields);
        if type_code.is_empty() && last == 0 {
            return None;
        }
        let mut out = String::new();
        out.push_str(&type_code);
        for index in 1..=last {
            out.push(separators.field);
            if let Some(value) = fields.get(&index).and_then(|f| f.value()) {
                out.push_str(&value);
            }
        }
        Some(out)
    }

    fn set_value(&self, value: &str) -> Result<()> {
        self.inner.fields.borrow_mut().clear();
        if value.starts_with("MSH") && value.chars().count() > 3 {
            // An MSH line carries its own delimiter declaration; adopt
            // it for the whole tree, leniently.
            let separators = Separators::from_header(value);
            self.inner.root.set_separators(separators);
            self.adopt_type_code("MSH");
            for (offset, token) in value.split(separators.field).enumerate().skip(2) {
                if token.is_empty() {
                    continue;
                }
                Element::set_value(&self.field(offset + 1)?, token)?;
            }
            return Ok(());
        }
        let separators = self.inner.root.separators();
        let mut tokens = value.split(separators.field);
        self.adopt_type_code(tokens.next().unwrap_or_default());
        for (offset, token) in tokens.enumerate() {
            if token.is_empty() {
                continue;
            }
            Element::set_value(&self.field(offset + 1)?, token)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        let last = last_existing(&self.inner.fields.borrow());
        if self.is_header() {
            last.max(2)
        } else {
            last
        }
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.field(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        self.guard_structural(index, "delete")?;
        let mut fields = self.inner.fields.borrow_mut();
        let occupied = fields.get(&index).is_some_and(|f| f.exists());
        if occupied {
            delete_shift(&mut fields, index);
        }
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        self.guard_structural(index, "insert at")?;
        {
            let mut fields = self.inner.fields.borrow_mut();
            insert_shift(&mut fields, index);
        }
        Element::set_value(&self.field(index)?, value)
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        self.guard_structural(from, "move")?;
        self.guard_structural(to, "move to")?;
        if from == to {
            return Ok(());
        }
        let value = self
            .field(from)
            .ok()
            .and_then(|f| Element::value(&f))
            .unwrap_or_default();
        self.delete(from)?;
        self.insert(to, &value)
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(SegmentBuilder);
