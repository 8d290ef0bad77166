//! Value types for XMP properties

pub mod value;

pub use value::XmpValue;
