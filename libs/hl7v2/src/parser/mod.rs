//! The parser backend: cursor elements over a live backing text.
//!
//! A parsed message owns one shared character buffer. Every descendant
//! element is a thin cursor created lazily on first access and cached by
//! index inside its parent; reads resolve offsets through the divider
//! engine, writes splice the buffer in place, and the buffer's version
//! counter keeps every cursor coherent without re-creating it.

mod component;
mod field;
mod message;
mod repetition;
mod segment;
mod subcomponent;

pub use component::Component;
pub use field::Field;
pub use message::Message;
pub use repetition::Repetition;
pub use segment::Segment;
pub use subcomponent::Subcomponent;
