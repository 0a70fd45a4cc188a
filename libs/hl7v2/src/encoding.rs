//! Delimiter configuration for HL7 v2 messages.
//!
//! A message declares its own delimiter alphabet in the header segment:
//! the field delimiter sits at character position 4 and the remaining
//! encoding characters (component, repetition, escape, subcomponent)
//! follow at positions 5 through 8. Parser-bound trees re-read these
//! characters from the live text so that editing the header changes how
//! the rest of the message splits; builder-bound trees hold a mutable
//! copy on the root.

use crate::error::{Error, Result};

/// The five delimiter characters declared by a message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Separators {
    /// The segment terminator. Never configurable.
    pub const SEGMENT: char = '\r';

    /// Read the delimiter set from the first segment of a message.
    ///
    /// Missing characters fall back to their defaults, so a short or
    /// absent header still yields a usable set. Strict callers go through
    /// [`crate::parser::Message::check_header`] instead.
    pub fn from_header(first_segment: &str) -> Self {
        let defaults = Self::default();
        let mut chars = first_segment.chars().skip(3);
        Self {
            field: chars.next().unwrap_or(defaults.field),
            component: chars.next().unwrap_or(defaults.component),
            repetition: chars.next().unwrap_or(defaults.repetition),
            escape: chars.next().unwrap_or(defaults.escape),
            subcomponent: chars.next().unwrap_or(defaults.subcomponent),
        }
    }

    /// The four encoding characters as they appear in `MSH-2`:
    /// component, repetition, escape, subcomponent.
    pub fn encoding_characters(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }

    /// Replace the encoding characters from an `MSH-2` style string.
    ///
    /// Between one and four characters are accepted; characters not
    /// supplied keep their current value. The result is validated.
    pub fn with_encoding_characters(&self, characters: &str) -> Result<Self> {
        let count = characters.chars().count();
        if count == 0 || count > 4 {
            return Err(Error::InvalidDelimiter(format!(
                "encoding characters must be 1 to 4 characters, got {count}"
            )));
        }
        let mut chars = characters.chars();
        let next = Self {
            field: self.field,
            component: chars.next().unwrap_or(self.component),
            repetition: chars.next().unwrap_or(self.repetition),
            escape: chars.next().unwrap_or(self.escape),
            subcomponent: chars.next().unwrap_or(self.subcomponent),
        };
        next.validate()?;
        Ok(next)
    }

    /// Replace the field delimiter. The result is validated.
    pub fn with_field(&self, field: char) -> Result<Self> {
        let next = Self { field, ..*self };
        next.validate()?;
        Ok(next)
    }

    /// Check that the five delimiters are pairwise distinct and that none
    /// collides with the segment terminator.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("field", self.field),
            ("component", self.component),
            ("repetition", self.repetition),
            ("escape", self.escape),
            ("subcomponent", self.subcomponent),
        ];
        for (name, c) in all {
            if c == Self::SEGMENT {
                return Err(Error::InvalidDelimiter(format!(
                    "{name} delimiter collides with the segment terminator"
                )));
            }
        }
        for (i, (a_name, a)) in all.iter().enumerate() {
            for (b_name, b) in &all[i + 1..] {
                if a == b {
                    return Err(Error::InvalidDelimiter(format!(
                        "{a_name} and {b_name} delimiters are both {a:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_separators() {
        let s = Separators::default();
        assert_eq!(s.field, '|');
        assert_eq!(s.encoding_characters(), "^~\\&");
    }

    #[test]
    fn test_from_header() {
        let s = Separators::from_header("MSH|^~\\&|SENDER");
        assert_eq!(s, Separators::default());

        let s = Separators::from_header("MSH#$%*+|rest");
        assert_eq!(s.field, '#');
        assert_eq!(s.component, '$');
        assert_eq!(s.repetition, '%');
        assert_eq!(s.escape, '*');
        assert_eq!(s.subcomponent, '+');
    }

    #[test]
    fn test_from_header_falls_back_when_short() {
        let s = Separators::from_header("MSH|^~");
        assert_eq!(s.field, '|');
        assert_eq!(s.component, '^');
        assert_eq!(s.repetition, '~');
        assert_eq!(s.escape, '\\');
        assert_eq!(s.subcomponent, '&');
    }

    #[test]
    fn test_validate_rejects_collisions() {
        let mut s = Separators::default();
        s.component = '|';
        assert!(s.validate().is_err());

        let mut s = Separators::default();
        s.repetition = '\r';
        assert!(s.validate().is_err());

        assert!(Separators::default().validate().is_ok());
    }

    #[test]
    fn test_with_encoding_characters_partial() {
        let s = Separators::default().with_encoding_characters("$%").unwrap();
        assert_eq!(s.component, '$');
        assert_eq!(s.repetition, '%');
        assert_eq!(s.escape, '\\');
        assert_eq!(s.subcomponent, '&');

        assert!(Separators::default().with_encoding_characters("").is_err());
        assert!(Separators::default().with_encoding_characters("^^~\\").is_err());
    }
}
