//! Versioned string divider engine.
//!
//! A divider is a lazy view over a shared character buffer that splits
//! one span of it at a single delimiter. The root divider spans the
//! whole buffer; every descendant points at its parent and names one of
//! the parent's subdivisions. Division offsets are cached per divider
//! and tagged with the buffer's version counter; every splice goes
//! through [`Buffer::replace`], which advances the counter, so one
//! monotonic number invalidates every stale cache in the tree. A
//! divider re-scans only its own parent subdivision when it recomputes,
//! which keeps access at high indices proportional to the local
//! subdivision count rather than the message size.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::encoding::Separators;

/// One subdivision: a byte span into the backing buffer.
///
/// Delimiters are ASCII, so division boundaries always land on UTF-8
/// character boundaries regardless of the data between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Division {
    pub offset: usize,
    pub length: usize,
}

impl Division {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Where a tree reads its delimiter set from.
pub(crate) enum EncodingSource {
    /// Re-read from the first segment of the live text on every access.
    /// Editing a header character re-splits everything downstream.
    Live,
    /// A snapshot, used by detached clones below message level.
    Fixed(Separators),
}

/// The shared backing state owned by a root divider.
pub(crate) struct Buffer {
    text: RefCell<String>,
    version: Cell<u64>,
    encoding: EncodingSource,
}

impl Buffer {
    pub fn new(text: String, encoding: EncodingSource) -> Rc<Self> {
        Rc::new(Self {
            text: RefCell::new(text),
            version: Cell::new(0),
            encoding,
        })
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn text(&self) -> Ref<'_, String> {
        self.text.borrow()
    }

    pub fn len(&self) -> usize {
        self.text.borrow().len()
    }

    /// The delimiter set currently in force for this tree.
    pub fn separators(&self) -> Separators {
        match &self.encoding {
            EncodingSource::Fixed(separators) => *separators,
            EncodingSource::Live => {
                let text = self.text.borrow();
                let first = text.split(Separators::SEGMENT).next().unwrap_or("");
                Separators::from_header(first)
            }
        }
    }

    /// The single splice primitive. Every mutation in the tree funnels
    /// through here, and this is the only place the version advances.
    pub fn replace(&self, start: usize, length: usize, value: &str) {
        self.text
            .borrow_mut()
            .replace_range(start..start + length, value);
        self.version.set(self.version.get().wrapping_add(1));
    }
}

/// Which delimiter a divider splits its span at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Split {
    Segments,
    Fields,
    Repetitions,
    Components,
    Subcomponents,
    /// No splitting: the span is a single subdivision. Used for leaves
    /// and for the header fields that must not be subdivided.
    Verbatim,
}

impl Split {
    fn delimiter(self, separators: &Separators) -> Option<char> {
        match self {
            Split::Segments => Some(Separators::SEGMENT),
            Split::Fields => Some(separators.field),
            Split::Repetitions => Some(separators.repetition),
            Split::Components => Some(separators.component),
            Split::Subcomponents => Some(separators.subcomponent),
            Split::Verbatim => None,
        }
    }
}

/// How a divider locates its span inside its parent.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SpanSource {
    /// The whole buffer. Only the root uses this.
    Root,
    /// Subdivision `i` of the parent divider.
    Division(usize),
    /// The single delimiter character after the type code of a header
    /// segment (the `MSH-1` span).
    HeaderDelimiter,
}

struct DivisionCache {
    version: u64,
    span: Division,
    divisions: Vec<Division>,
}

/// A lazy, versioned view splitting one span of the shared buffer.
pub(crate) struct Divider {
    buffer: Rc<Buffer>,
    parent: Option<Rc<Divider>>,
    source: SpanSource,
    split: Split,
    cache: RefCell<Option<DivisionCache>>,
}

impl Divider {
    pub fn root(buffer: Rc<Buffer>, split: Split) -> Rc<Self> {
        Rc::new(Self {
            buffer,
            parent: None,
            source: SpanSource::Root,
            split,
            cache: RefCell::new(None),
        })
    }

    pub fn child(parent: &Rc<Divider>, source: SpanSource, split: Split) -> Rc<Divider> {
        Rc::new(Divider {
            buffer: Rc::clone(&parent.buffer),
            parent: Some(Rc::clone(parent)),
            source,
            split,
            cache: RefCell::new(None),
        })
    }

    pub fn separators(&self) -> Separators {
        self.buffer.separators()
    }

    fn delimiter(&self) -> Option<char> {
        self.split.delimiter(&self.buffer.separators())
    }

    /// The span this divider covers, or `None` when the parent does not
    /// (yet) have a subdivision for it.
    pub fn span(&self) -> Option<Division> {
        self.with_cache(|cache| cache.span)
    }

    fn compute_span(&self) -> Option<Division> {
        match self.source {
            SpanSource::Root => Some(Division {
                offset: 0,
                length: self.buffer.len(),
            }),
            SpanSource::Division(i) => self.parent.as_ref()?.division(i),
            SpanSource::HeaderDelimiter => {
                let parent = self.parent.as_ref()?;
                let span = parent.span()?;
                if span.length >= 4 {
                    Some(Division {
                        offset: span.offset + 3,
                        length: 1,
                    })
                } else {
                    None
                }
            }
        }
    }

    fn with_cache<R>(&self, f: impl FnOnce(&DivisionCache) -> R) -> Option<R> {
        let version = self.buffer.version();
        if let Some(cache) = self.cache.borrow().as_ref() {
            if cache.version == version {
                return Some(f(cache));
            }
        }
        let span = match self.compute_span() {
            Some(span) => span,
            None => {
                self.cache.borrow_mut().take();
                return None;
            }
        };
        let divisions = self.scan(span);
        let mut slot = self.cache.borrow_mut();
        Some(f(slot.insert(DivisionCache {
            version,
            span,
            divisions,
        })))
    }

    fn scan(&self, span: Division) -> Vec<Division> {
        let delimiter = match self.delimiter() {
            Some(d) => d,
            None => return vec![span],
        };
        let text = self.buffer.text();
        let slice = &text[span.offset..span.end()];
        let mut divisions = Vec::new();
        let mut start = span.offset;
        for (pos, c) in slice.char_indices() {
            if c == delimiter {
                let offset = span.offset + pos;
                divisions.push(Division {
                    offset: start,
                    length: offset - start,
                });
                start = offset + delimiter.len_utf8();
            }
        }
        divisions.push(Division {
            offset: start,
            length: span.end() - start,
        });
        divisions
    }

    pub fn division(&self, i: usize) -> Option<Division> {
        self.with_cache(|cache| cache.divisions.get(i).copied())
            .flatten()
    }

    /// The raw number of subdivisions, trailing empties included. Zero
    /// when the span does not exist.
    pub fn division_count(&self) -> usize {
        self.with_cache(|cache| cache.divisions.len()).unwrap_or(0)
    }

    /// The index of the last non-empty subdivision. Interior empties
    /// count, trailing empties do not.
    pub fn count(&self) -> usize {
        self.with_cache(|cache| {
            cache
                .divisions
                .iter()
                .rposition(|d| d.length > 0)
                .map(|i| i + 1)
                .unwrap_or(0)
        })
        .unwrap_or(0)
    }

    /// The text of this divider's whole span. `None` when the span is
    /// missing or empty.
    pub fn value(&self) -> Option<String> {
        let span = self.span()?;
        if span.length == 0 {
            return None;
        }
        let text = self.buffer.text();
        Some(text[span.offset..span.end()].to_string())
    }

    /// The text of subdivision `i`. `None` when it is missing or empty.
    pub fn get(&self, i: usize) -> Option<String> {
        let division = self.division(i)?;
        if division.length == 0 {
            return None;
        }
        let text = self.buffer.text();
        Some(text[division.offset..division.end()].to_string())
    }

    /// Make sure this divider's span exists, padding ancestors with
    /// delimiters as needed, and return it.
    fn ensure_span(&self) -> Division {
        if let Some(span) = self.span() {
            return span;
        }
        match self.source {
            // Root spans always exist.
            SpanSource::Root => Division {
                offset: 0,
                length: self.buffer.len(),
            },
            SpanSource::Division(i) => {
                let parent = self
                    .parent
                    .as_ref()
                    .expect("non-root divider has a parent");
                parent.pad_to(i)
            }
            SpanSource::HeaderDelimiter => {
                let parent = self
                    .parent
                    .as_ref()
                    .expect("non-root divider has a parent");
                parent.pad_to(1);
                self.span().unwrap_or_else(|| {
                    let span = parent.ensure_span();
                    Division {
                        offset: span.end(),
                        length: 0,
                    }
                })
            }
        }
    }

    /// Make sure at least `i + 1` subdivisions exist, appending empty
    /// ones (with their delimiters) at the end of the span, and return
    /// subdivision `i`.
    pub fn pad_to(&self, i: usize) -> Division {
        let span = self.ensure_span();
        if let Some(division) = self.division(i) {
            return division;
        }
        let delimiter = match self.delimiter() {
            Some(d) => d,
            // A verbatim span has exactly one subdivision.
            None => return span,
        };
        let existing = self.division_count().max(1);
        let mut pad = String::new();
        for _ in existing..=i {
            pad.push(delimiter);
        }
        self.buffer.replace(span.end(), 0, &pad);
        self.division(i).unwrap_or(Division {
            offset: span.end() + pad.len(),
            length: 0,
        })
    }

    /// Assign the whole span, creating it first when absent.
    pub fn set_value(&self, value: &str) {
        let span = self.ensure_span();
        self.buffer.replace(span.offset, span.length, value);
    }

    /// Assign subdivision `i`, splicing the buffer in place. Higher
    /// subdivisions keep their contents; missing ones are created.
    pub fn set(&self, i: usize, value: &str) {
        let span = self.ensure_span();
        if let Some(division) = self.division(i) {
            self.buffer.replace(division.offset, division.length, value);
            return;
        }
        match self.delimiter() {
            Some(delimiter) => {
                let existing = self.division_count().max(1);
                let mut tail = String::with_capacity(i - existing + 1 + value.len());
                for _ in existing..=i {
                    tail.push(delimiter);
                }
                tail.push_str(value);
                self.buffer.replace(span.end(), 0, &tail);
            }
            None => self.buffer.replace(span.offset, span.length, value),
        }
    }

    /// Remove subdivision `i` together with one adjacent delimiter: the
    /// one to its left when `i > 0`, otherwise the one to its right when
    /// any subdivisions follow. Empty or out-of-range subdivisions are
    /// left alone.
    pub fn delete(&self, i: usize) {
        let division = match self.division(i) {
            Some(d) if d.length > 0 => d,
            _ => return,
        };
        let following = self.division(i + 1);
        let (start, end) = if i > 0 {
            let previous = match self.division(i - 1) {
                Some(p) => p,
                None => return,
            };
            (previous.end(), division.end())
        } else if let Some(next) = following {
            (division.offset, next.offset)
        } else {
            (division.offset, division.end())
        };
        self.buffer.replace(start, end - start, "");
    }

    /// Rewrite subdivision `i` to `value + delimiter + previous
    /// contents`, shifting it and everything after it one slot higher.
    pub fn insert(&self, i: usize, value: &str) {
        let division = match self.division(i) {
            Some(d) => d,
            None => return self.set(i, value),
        };
        let delimiter = match self.delimiter() {
            Some(d) => d,
            None => return self.set(i, value),
        };
        let mut inserted = String::with_capacity(value.len() + 1);
        inserted.push_str(value);
        inserted.push(delimiter);
        self.buffer.replace(division.offset, 0, &inserted);
    }

    /// Delete subdivision `from`, then insert its old contents at `to`.
    pub fn move_division(&self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let value = self.get(from).unwrap_or_default();
        self.delete(from);
        self.insert(to, &value);
    }
}
