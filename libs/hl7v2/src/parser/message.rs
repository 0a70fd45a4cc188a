//! The root of a parsed message.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::divider::{Buffer, Divider, EncodingSource, Split};
use crate::element::{impl_value_traits, Element};
use crate::encoding::Separators;
use crate::error::{Error, Result};

use super::Segment;

/// A parsed HL7 v2 message: the root element, owner of the backing
/// text.
///
/// Cloning a `Message` handle aliases the same underlying message; use
/// [`Message::detached`] for an independent copy.
#[derive(Clone)]
pub struct Message {
    inner: Rc<MessageInner>,
}

struct MessageInner {
    divider: Rc<Divider>,
    segments: RefCell<HashMap<usize, Segment>>,
}

impl Message {
    /// Parse message text. CRLF sequences are normalized to CR; LF on
    /// its own is left alone. The delimiter set is read live from the
    /// header, falling back to `|^~\&` where the header does not supply
    /// it.
    pub fn parse(text: &str) -> Message {
        let normalized = text.replace("\r\n", "\r");
        let buffer = Buffer::new(normalized, EncodingSource::Live);
        Message {
            inner: Rc::new(MessageInner {
                divider: Divider::root(buffer, Split::Segments),
                segments: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The delimiter set currently declared by the header.
    pub fn separators(&self) -> Separators {
        self.inner.divider.separators()
    }

    /// Strict header check: the first segment must be `MSH` and long
    /// enough to declare all five delimiters, and the declared set must
    /// be self-consistent. Lenient callers can skip this; parsing
    /// itself never fails.
    pub fn check_header(&self) -> Result<Separators> {
        let first = self.inner.divider.get(0).unwrap_or_default();
        if !first.starts_with("MSH") {
            return Err(Error::MalformedHeader(
                "first segment is not MSH".into(),
            ));
        }
        if first.chars().count() < 8 {
            return Err(Error::MalformedHeader(format!(
                "header {first:?} is too short to declare all five delimiters"
            )));
        }
        let separators = Separators::from_header(&first);
        separators
            .validate()
            .map_err(|e| Error::MalformedHeader(e.to_string()))?;
        Ok(separators)
    }

    /// The segment at a 1-based index. Indices past the end are legal
    /// and read as absent.
    pub fn segment(&self, index: usize) -> Result<Segment> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        let mut segments = self.inner.segments.borrow_mut();
        let segment = segments
            .entry(index)
            .or_insert_with(|| Segment::in_message(&self.inner.divider, index));
        Ok(segment.clone())
    }

    /// Iterate the segments present in the message.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (1..=self.count()).filter_map(move |index| self.segment(index).ok())
    }

    /// Iterate the segments with a given type code.
    pub fn segments_named<'a>(
        &'a self,
        type_code: &'a str,
    ) -> impl Iterator<Item = Segment> + 'a {
        self.segments()
            .filter(move |segment| segment.type_code().as_deref() == Some(type_code))
    }

    /// An independent copy of this message with its own backing text.
    pub fn detached(&self) -> Message {
        Message::parse(&Element::value(self).unwrap_or_default())
    }
}

impl Element for Message {
    fn index(&self) -> usize {
        1
    }

    fn delimiter(&self) -> Option<char> {
        Some(Separators::SEGMENT)
    }

    fn separators(&self) -> Separators {
        self.inner.divider.separators()
    }

    fn value(&self) -> Option<String> {
        self.inner.divider.value()
    }

    fn set_value(&self, value: &str) -> Result<()> {
        let normalized = value.replace("\r\n", "\r");
        self.inner.divider.set_value(&normalized);
        Ok(())
    }

    fn count(&self) -> usize {
        self.inner.divider.count()
    }

    fn child(&self, index: usize) -> Result<Box<dyn Element>> {
        Ok(Box::new(self.segment(index)?))
    }

    fn delete(&self, index: usize) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        self.inner.divider.delete(index - 1);
        Ok(())
    }

    fn insert(&self, index: usize, value: &str) -> Result<()> {
        if index < 1 {
            return Err(Error::index(index, "message"));
        }
        self.inner.divider.insert(index - 1, value);
        Ok(())
    }

    fn move_child(&self, from: usize, to: usize) -> Result<()> {
        if from < 1 || to < 1 {
            return Err(Error::index(from.min(to), "message"));
        }
        self.inner.divider.move_division(from - 1, to - 1);
        Ok(())
    }

    fn clone_detached(&self) -> Box<dyn Element> {
        Box::new(self.detached())
    }
}

impl_value_traits!(Message);
