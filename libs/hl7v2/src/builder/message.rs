//! The root message builder.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::{delete_shift, insert_shift, join_children, last_existing, BuilderRoot};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};
use crate::parser::Message;

use super::SegmentBuilder;

/// A message under construction. Starts with a default header segment
/// (`MSH|^~\&`) so the delimiter declaration always serializes.
///
/// Cloning a `MessageBuilder` handle aliases the same underlying tree;
/// use [`MessageBuilder::detached`] for an independent copy.
#[derive(Clone)]
pub struct MessageBuilder {
    inner: Rc<MessageBuilderInner>,
}

struct MessageBuilderInner {
    root: Rc<BuilderRoot>,
    segments: RefCell<BTreeMap<usize, SegmentBuilder>>,
}

impl MessageBuilder {
    /// A builder with the standard `|^~\&` delimiters and an `MSH`
    /// header at segment 1.
    pub fn new() -> MessageBuilder {
        let builder = MessageBuilder::bare(Separators::default());
        builder.seed_header();
        builder
    }

    /// A builder with a caller-chosen delimiter set.
    pub fn with_separators(separators: Separators) -> Result<MessageBuilder> {
        separators.validate()?;
        let builder = MessageBuilder::bare(separators);
        builder.seed_header();
        Ok(builder)
    }

    /// A builder populated from parsed message text. The delimiter set
    /// is adopted from the text's header.
    pub fn from_text(text: &str) -> MessageBuilder {
        let builder = MessageBuilder::bare(Separators::default());
        // Infallible: populating from text never hits a structural
        // guard.
        let _ = Element::set_value(&builder, text);
        builder
    }

    /// A builder copying the serialized value of a parsed message.
    pub fn from_message(message: &Message) -> MessageBuilder {
        MessageBuilder::from_text(&Element::value(message).unwrap_or_default())
    }

    /// Serialize and re-parse into the cursor backend.
    pub fn to_message(&self) -> Message {
        Message::parse(&Element::value(self).unwrap_or_default())
    }

    fn bare(separators: Separators) -> MessageBuilder {
        MessageBuilder {
            inner: Rc::new(MessageBuilderInner {
                root: BuilderRoot::new(separators),
                segments: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    fn seed_header(&self) {
        let segments = &mut *self.inner.segments.borrow_mut();
        let segment = SegmentBuilder::new(Rc::clone(&self.inner.root), 1);
        segment.adopt_type_code("MSH");
        segments.insert(1, segment);
    }

    /// The delimiter set in force for this tree.
    pub fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    /// The segment builder at a 1-based index, created on first access.
    pub fn segment(&self, index: usize) -> Result<SegmentBuilder> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        let mut segments = self.inner.segments.borrow_mut();
        let segment = segments
            .entry(index)
            .or_insert_with(|| SegmentBuilder::new(Rc::clone(&self.inner.root), index));
        Ok(segment.clone())
    }

    /// An independent copy of this builder.
    pub fn detached(&self) -> MessageBuilder {
        MessageBuilder::from_text(&Element::value(self).unwrap_or_default())
    }

    // ── Chainable coordinate setters ────────────────────────────────

    /// Assign segment `segment` wholesale.
    pub fn set_segment(&self, segment: usize, value: &str) -> Result<&Self> {
        Element::set_value(&self.segment(segment)?, value)?;
        Ok(self)
    }

    /// Assign field `field` of segment `segment`.
    pub fn set_field(&self, segment: usize, field: usize, value: &str) -> Result<&Self> {
        Element::set_value(&self.segment(segment)?.field(field)?, value)?;
        Ok(self)
    }

    /// Assign one repetition of a field.
    pub fn set_field_repetition(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        value: &str,
    ) -> Result<&Self> {
        let target = self.segment(segment)?.field(field)?.repetition(repetition)?;
        Element::set_value(&target, value)?;
        Ok(self)
    }

    /// Assign one component, in repetition `repetition` of the field.
    pub fn set_component(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        component: usize,
        value: &str,
    ) -> Result<&Self> {
        let target = self
            .segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .component(component)?;
        Element::set_value(&target, value)?;
        Ok(self)
    }

    /// Assign one subcomponent.
    pub fn set_subcomponent(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
        value: &str,
    ) -> Result<&Self> {
        let target = self
            .segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .component(component)?
            .subcomponent(subcomponent)?;
        Element::set_value(&target, value)?;
        Ok(self)
    }

    // ── Bulk setters ────────────────────────────────────────────────

    /// Replace every segment, populating from 1.
    pub fn set_segments(&self, values: &[&str]) -> Result<&Self> {
        self.inner.segments.borrow_mut().clear();
        self.set_segments_from(1, values)
    }

    /// Overwrite segments starting at `start`, leaving earlier ones in
    /// place.
    pub fn set_segments_from(&self, start: usize, values: &[&str]) -> Result<&Self> {
        for (offset, value) in values.iter().enumerate() {
            self.set_segment(start + offset, value)?;
        }
        Ok(self)
    }

    /// Replace every field of a segment, populating from 1.
    pub fn set_fields(&self, segment: usize, values: &[&str]) -> Result<&Self> {
        self.segment(segment)?.set_fields(values)?;
        Ok(self)
    }

    /// Overwrite fields of a segment starting at `start`.
    pub fn set_fields_from(
        &self,
        segment: usize,
        start: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?.set_fields_from(start, values)?;
        Ok(self)
    }

    /// Replace every repetition of a field, populating from 1.
    pub fn set_field_repetitions(
        &self,
        segment: usize,
        field: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?.field(field)?.set_repetitions(values)?;
        Ok(self)
    }

    /// Overwrite repetitions of a field starting at `start`.
    pub fn set_field_repetitions_from(
        &self,
        segment: usize,
        field: usize,
        start: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?
            .field(field)?
            .set_repetitions_from(start, values)?;
        Ok(self)
    }

    /// Replace every component of a repetition, populating from 1.
    pub fn set_components(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .set_components(values)?;
        Ok(self)
    }

    /// Overwrite components of a repetition starting at `start`.
    pub fn set_components_from(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        start: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .set_components_from(start, values)?;
        Ok(self)
    }

    /// Replace every subcomponent of a component, populating from 1.
    pub fn set_subcomponents(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        component: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .component(component)?
            .set_subcomponents(values)?;
        Ok(self)
    }

    /// Overwrite subcomponents of a component starting at `start`.
    pub fn set_subcomponents_from(
        &self,
        segment: usize,
        field: usize,
        repetition: usize,
        component: usize,
        start: usize,
        values: &[&str],
    ) -> Result<&Self> {
        self.segment(segment)?
            .field(field)?
            .repetition(repetition)?
            .component(component)?
            .set_subcomponents_from(start, values)?;
        Ok(self)
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        MessageBuilder::new()
    }
}

impl Element for MessageBuilder {
    fn index(&self) -> usize {
        1
    }

    fn delimiter(&self) -> Option<char> {
        Some(Separators::SEGMENT)
    }

    fn separators(&self) -> Separators {
        self.inner.root.separators()
    }

    fn value(&self) -> Option<String> {
        let segments = self.inner.segments.borrow();
        join_children(&segments, Separators::SEGMENT)
    }

    fn set_value(&self, value: &str) -> Result<()> {
        let normalized = value.replace("\r\n", "\r");
        let first = normalized
            .split(Separators::SEGMENT)
            .next()
            .unwrap_or_default();
        if first.starts_with("MSH") {
            // Adopt the text's delimiter declaration before any segment
            // splits on it. Lenient, like the cursor backend.
            self.inner
                .root
                .set_separators(Separators::from_header(first));
        }
        self.inner.segments.borrow_mut().clear();
        for (offset, line) in normalized.split(Separators::SEGMENT).enumerate() {
            if line.is_empty() {
                continue;
            }
            Element::set_value(&self.segment(offset + 1)?, line)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        last_existing(&self.inner.segments.borrow())
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.segment(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        let mut segments = self.inner.segments.borrow_mut();
        let occupied = segments.get(&index).is_some_and(|s| s.exists());
        if occupied {
            delete_shift(&mut segments, index);
        }
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        {
            let mut segments = self.inner.segments.borrow_mut();
            insert_shift(&mut segments, index);
        }
        self.set_segment(index, value)?;
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "message"));
        }
        if from == to {
            return Ok(());
        }
        let value = self
            .segment(from)
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

impl_value_traits!(MessageBuilder);
