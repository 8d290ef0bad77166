//! # xmpcore
//!
//! Pure Rust implementation of the XMP (Extensible Metadata Platform)
//! core data model: a grammar-driven property path engine, the in-memory
//! property tree, and the bidirectional RDF/XML codec with compact and
//! canonical output modes.
//!
//! ## Example
//!
//! ```
//! use xmpcore::{ns, SerializeOptions, XmpMeta};
//!
//! let packet = r#"
//! <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
//!   <rdf:Description rdf:about=""
//!       xmlns:xmp="http://ns.adobe.com/xap/1.0/"
//!       xmp:Rating="3"/>
//! </rdf:RDF>"#;
//!
//! let mut meta = XmpMeta::parse(packet)?;
//!
//! assert_eq!(
//!     meta.get_property_integer(ns::XMP, "Rating")?,
//!     Some(3)
//! );
//!
//! meta.set_property(ns::XMP, "CreatorTool", "xmpcore")?;
//!
//! let output = meta.serialize(&SerializeOptions::compact())?;
//! assert!(output.contains("xmp:CreatorTool=\"xmpcore\""));
//! # Ok::<(), xmpcore::XmpError>(())
//! ```

pub mod core;
pub mod types;
pub mod utils;

pub use crate::core::{
    compose_array_item_path, compose_lang_selector, compose_qualifier_path,
    compose_struct_field_path, expand_path, find_alias, get_namespace_prefix, get_namespace_uri,
    is_namespace_registered, ns, register_alias, register_namespace, registered_namespaces,
    resolve_alias, AliasForm, AliasInfo, IteratorOptions, ParseOptions, PropertyOptions,
    SerializeOptions, XmpError, XmpIterator, XmpMeta, XmpNode, XmpPath, XmpPathSegment,
    XmpPathStepKind, XmpProperty, XmpPropertyInfo, XmpRegistry, XmpResult, ARRAY_LAST_ITEM,
};
pub use crate::types::XmpValue;
