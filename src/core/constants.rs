//! Constants of the XMP data model
//!
//! Namespace URIs live in [`crate::core::registry::ns`]; this module holds
//! the remaining well-known names and markers used across the tree model,
//! the RDF codec and the path engine.

/// Node name of an anonymous array item.
pub const ARRAY_ITEM_NAME: &str = "[]";

/// The fallback language of an alt-text array.
pub const X_DEFAULT: &str = "x-default";

/// Qualified name of the language qualifier.
pub const XML_LANG: &str = "xml:lang";

/// Qualified name of the type qualifier.
pub const RDF_TYPE: &str = "rdf:type";

/// Canonical string form of a boolean `true` property value.
pub const TRUE_STRING: &str = "True";

/// Canonical string form of a boolean `false` property value.
pub const FALSE_STRING: &str = "False";

/// Target of the packet processing instruction.
pub const XMP_PI: &str = "xpacket";

/// Local name of the metadata envelope element.
pub const TAG_XMPMETA: &str = "xmpmeta";

/// Older spelling of the metadata envelope element.
pub const TAG_XAPMETA: &str = "xapmeta";
