//! Sentence processing

pub mod parser;

pub use parser::{FixQuality, ParseError, ParsedFix, RawAxis, SentenceKind, SentenceParser};
