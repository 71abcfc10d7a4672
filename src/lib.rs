//! Order-preserving tuple key codec and range-bounded iterator for
//! embedded key/value storage engines.
//!
//! See `SPEC_FULL.md` for the full design; `DESIGN.md` for grounding.

pub mod bytestring;
pub mod element;
pub mod error;
pub mod index;
pub mod iterator;
pub mod key;
pub mod source;
pub mod timestamp;
pub mod tuple;
pub mod varint;

pub use element::{Element, ElementKind};
pub use error::{Error, Result};
pub use key::{Key, KeyList, StorageMode};
pub use source::{Source, SinkRegistry};
pub use iterator::{Engine, RangeIter};
pub use timestamp::Timestamp;
