//! HL7 v2 pipe-delimited message reading, navigation, and editing.
//!
//! An HL7 v2 message is a sequence of segments; each segment splits
//! into fields, fields into repetitions, repetitions into components,
//! and components into subcomponents, with the delimiter characters
//! declared by the message's own header. This crate keeps two
//! representations of that tree behind one interface:
//!
//! 1. **Parser**: [`Message`] cursors over a live backing text. Reads
//!    resolve offsets lazily; writes splice the text in place and a
//!    version counter keeps every descendant coherent.
//! 2. **Builder**: [`MessageBuilder`] nodes owning sparse child maps,
//!    serialized on demand.
//!
//! Both implement [`Element`], so navigation, `value`/`values` access,
//! escaping, and typed conversion read the same either way:
//!
//! ```
//! use ferrum_hl7v2::{Element, Message};
//!
//! let message = Message::parse("MSH|^~\\&|SENDING|FAC\rPID|||123456^^^MRN");
//! let field = message.segment(2).unwrap().field(3).unwrap();
//! assert_eq!(field.value().as_deref(), Some("123456^^^MRN"));
//!
//! let component = field.repetition(1).unwrap().component(4).unwrap();
//! assert_eq!(component.value().as_deref(), Some("MRN"));
//! ```

pub mod builder;
pub mod convert;
mod divider;
pub mod element;
pub mod encoding;
pub mod error;
pub mod escape;
pub mod parser;

// Re-export main types
pub use builder::MessageBuilder;
pub use convert::Converter;
pub use element::{Element, Values};
pub use encoding::Separators;
pub use error::{Error, Result};
pub use parser::Message;
