pub mod encoding;
pub mod key_spec;

pub use encoding::{encode_component_typed, encode_tuple_values_with_key_spec, IndexError};
pub use key_spec::{IndexDirection, IndexKeyPart, IndexSpecMatch, KeySpec, NullsOrder};
