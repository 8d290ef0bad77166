//! XMP core module
//!
//! This module contains the core functionality for XMP metadata
//! processing: the property tree, the path engine, the RDF/XML codec and
//! the namespace/alias registry.

pub mod constants;
pub mod dom;
pub mod error;
pub mod metadata;
pub mod navigator;
pub mod node;
pub mod normalizer;
pub mod options;
pub mod parser;
pub mod registry;
pub mod serializer;
pub mod xpath;

pub use error::{XmpError, XmpResult};
pub use metadata::{XmpIterator, XmpMeta, XmpProperty, XmpPropertyInfo};
pub use node::XmpNode;
pub use options::{
    AliasForm, IteratorOptions, ParseOptions, PropertyOptions, SerializeOptions,
};
pub use registry::{
    find_alias, get_namespace_prefix, get_namespace_uri, is_namespace_registered, ns,
    register_alias, register_namespace, registered_namespaces, resolve_alias, AliasInfo,
    XmpRegistry,
};
pub use xpath::{
    compose_array_item_path, compose_lang_selector, compose_qualifier_path,
    compose_struct_field_path, expand_path, XmpPath, XmpPathSegment, XmpPathStepKind,
    ARRAY_LAST_ITEM,
};
