//! Document layer: the in-memory element tree and the XML loader that
//! builds it.
//!
//! The grammars in `syntax` only ever see `Element`s; nothing downstream
//! touches XML directly.

pub mod element;
pub mod parse;

pub use element::Element;
pub use parse::{MAX_DEPTH, parse_file, parse_str};
