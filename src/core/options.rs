//! Option sets for properties, parsing, serialization and iteration
//!
//! `PropertyOptions` is the bitset stored on every tree node; the other
//! types are plain configuration structs consumed by the parser, the
//! writer and the iterator.

use crate::core::error::{XmpError, XmpResult};

/// The property flags describe the kind of a tree node: simple, struct,
/// array (with its ordering refinements), qualifier, or schema node, plus
/// the qualifier-related state of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyOptions(u32);

impl PropertyOptions {
    /// The value is a URI, serialized via `rdf:resource`.
    pub const URI: u32 = 0x0000_0002;
    /// The property has qualifiers.
    pub const HAS_QUALIFIERS: u32 = 0x0000_0010;
    /// The property is a qualifier of some other property.
    pub const QUALIFIER: u32 = 0x0000_0020;
    /// The property has an `xml:lang` qualifier.
    pub const HAS_LANGUAGE: u32 = 0x0000_0040;
    /// The property has an `rdf:type` qualifier.
    pub const HAS_TYPE: u32 = 0x0000_0080;
    /// The property contains nested fields.
    pub const STRUCT: u32 = 0x0000_0100;
    /// The property is an array, serialized as `rdf:Bag` by itself.
    pub const ARRAY: u32 = 0x0000_0200;
    /// The array is ordered, serialized as `rdf:Seq`.
    pub const ARRAY_ORDERED: u32 = 0x0000_0400;
    /// The array is alternative, serialized as `rdf:Alt`.
    pub const ARRAY_ALTERNATE: u32 = 0x0000_0800;
    /// The array is an alt-text array of language-tagged variants.
    pub const ARRAY_ALT_TEXT: u32 = 0x0000_1000;
    /// Delete any existing property before setting the new one.
    pub const DELETE_EXISTING: u32 = 0x2000_0000;
    /// The node is a schema node (direct child of the tree root).
    pub const SCHEMA_NODE: u32 = 0x8000_0000;

    /// Create an empty option set.
    pub fn new() -> Self {
        Self(0)
    }

    /// Create an option set from a raw bitmask.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bitmask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Query a single option bit.
    pub fn get_option(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Set or clear a mask of option bits.
    pub fn set_option(&mut self, mask: u32, value: bool) -> &mut Self {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self
    }

    pub fn is_uri(self) -> bool {
        self.get_option(Self::URI)
    }

    pub fn set_uri(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::URI, value)
    }

    pub fn has_qualifiers(self) -> bool {
        self.get_option(Self::HAS_QUALIFIERS)
    }

    pub fn set_has_qualifiers(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::HAS_QUALIFIERS, value)
    }

    pub fn is_qualifier(self) -> bool {
        self.get_option(Self::QUALIFIER)
    }

    pub fn set_qualifier(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::QUALIFIER, value)
    }

    pub fn has_language(self) -> bool {
        self.get_option(Self::HAS_LANGUAGE)
    }

    pub fn set_has_language(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::HAS_LANGUAGE, value)
    }

    pub fn has_type(self) -> bool {
        self.get_option(Self::HAS_TYPE)
    }

    pub fn set_has_type(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::HAS_TYPE, value)
    }

    pub fn is_struct(self) -> bool {
        self.get_option(Self::STRUCT)
    }

    pub fn set_struct(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::STRUCT, value)
    }

    pub fn is_array(self) -> bool {
        self.get_option(Self::ARRAY)
    }

    pub fn set_array(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::ARRAY, value)
    }

    pub fn is_array_ordered(self) -> bool {
        self.get_option(Self::ARRAY_ORDERED)
    }

    pub fn set_array_ordered(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::ARRAY_ORDERED, value)
    }

    pub fn is_array_alternate(self) -> bool {
        self.get_option(Self::ARRAY_ALTERNATE)
    }

    pub fn set_array_alternate(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::ARRAY_ALTERNATE, value)
    }

    pub fn is_array_alt_text(self) -> bool {
        self.get_option(Self::ARRAY_ALT_TEXT)
    }

    pub fn set_array_alt_text(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::ARRAY_ALT_TEXT, value)
    }

    pub fn is_schema_node(self) -> bool {
        self.get_option(Self::SCHEMA_NODE)
    }

    pub fn set_schema_node(&mut self, value: bool) -> &mut Self {
        self.set_option(Self::SCHEMA_NODE, value)
    }

    pub fn delete_existing(self) -> bool {
        self.get_option(Self::DELETE_EXISTING)
    }

    /// Whether the property is of composite type, an array or a struct.
    pub fn is_composite_property(self) -> bool {
        self.0 & (Self::ARRAY | Self::STRUCT) != 0
    }

    /// Whether the property is a simple leaf.
    pub fn is_simple(self) -> bool {
        self.0 & (Self::ARRAY | Self::STRUCT) == 0
    }

    /// Compares two option sets for array form compatibility.
    pub fn equal_array_types(self, other: PropertyOptions) -> bool {
        self.is_array() == other.is_array()
            && self.is_array_ordered() == other.is_array_ordered()
            && self.is_array_alternate() == other.is_array_alternate()
            && self.is_array_alt_text() == other.is_array_alt_text()
    }

    /// Merges the set bits of another option set into this one.
    pub fn merge_with(&mut self, other: PropertyOptions) {
        self.0 |= other.0;
    }

    /// Whether only array form bits are set.
    pub fn is_only_array_options(self) -> bool {
        self.0 & !(Self::ARRAY | Self::ARRAY_ORDERED | Self::ARRAY_ALTERNATE | Self::ARRAY_ALT_TEXT)
            == 0
    }

    /// Checks that the node is not a struct and an array at the same time,
    /// and that a URI value does not claim composite form.
    pub fn assert_consistency(self) -> XmpResult<()> {
        if self.0 & Self::STRUCT != 0 && self.0 & Self::ARRAY != 0 {
            return Err(XmpError::BadOptions(
                "IsStruct and IsArray options are mutually exclusive".to_string(),
            ));
        }

        if self.0 & Self::URI != 0 && self.0 & (Self::ARRAY | Self::STRUCT) != 0 {
            return Err(XmpError::BadOptions(
                "Structs and arrays can't have \"value\" options".to_string(),
            ));
        }

        Ok(())
    }
}

/// Verifies a `PropertyOptions` set for consistency and cascades the array
/// form bits as needed: alt-text implies alternate, alternate implies
/// ordered, ordered implies array. Composite properties must not carry a
/// non-empty value of their own.
pub fn verify_set_options(
    mut options: PropertyOptions,
    item_value: Option<&str>,
) -> XmpResult<PropertyOptions> {
    if options.is_array_alt_text() {
        options.set_array_alternate(true);
    }

    if options.is_array_alternate() {
        options.set_array_ordered(true);
    }

    if options.is_array_ordered() {
        options.set_array(true);
    }

    if options.is_composite_property() && item_value.is_some_and(|value| !value.is_empty()) {
        return Err(XmpError::BadOptions(
            "Structs and arrays can't have values".to_string(),
        ));
    }

    options.assert_consistency()?;

    Ok(options)
}

/// The form of an alias target: a direct (simple) property, the first item
/// of an array, or the `x-default` item of an alt-text array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AliasForm(u32);

impl AliasForm {
    /// A direct alias, same form on both sides.
    pub const DIRECT: AliasForm = AliasForm(0);

    /// Alias to the first item of an unordered array.
    pub fn array() -> Self {
        Self(PropertyOptions::ARRAY)
    }

    /// Alias to the first item of an ordered array.
    pub fn array_ordered() -> Self {
        Self(PropertyOptions::ARRAY | PropertyOptions::ARRAY_ORDERED)
    }

    /// Alias to the `x-default` item of an alt-text array.
    pub fn array_alt_text() -> Self {
        Self(
            PropertyOptions::ARRAY
                | PropertyOptions::ARRAY_ORDERED
                | PropertyOptions::ARRAY_ALTERNATE
                | PropertyOptions::ARRAY_ALT_TEXT,
        )
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_simple(self) -> bool {
        self.0 == 0
    }

    pub fn is_array(self) -> bool {
        self.0 & PropertyOptions::ARRAY != 0
    }

    pub fn is_array_alt_text(self) -> bool {
        self.0 & PropertyOptions::ARRAY_ALT_TEXT != 0
    }

    /// The property options an array created through this alias must carry.
    pub fn to_property_options(self) -> PropertyOptions {
        PropertyOptions::from_bits(self.0)
    }
}

/// Options for parsing an XMP packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Require an `x:xmpmeta` envelope around the `rdf:RDF` element.
    pub require_xmp_meta: bool,
    /// Verify that alias and base subtrees match when both are present.
    pub strict_aliasing: bool,
    /// Skip the normalization pass after parsing.
    pub omit_normalization: bool,
}

/// Options for serializing an XMP object.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Omit the `<?xpacket?>` processing instructions.
    pub omit_packet_wrapper: bool,
    /// Omit the `x:xmpmeta` envelope element.
    pub omit_xmp_meta_element: bool,
    /// Mark the packet trailer read-only (`end="r"` instead of `end="w"`).
    pub read_only_packet: bool,
    /// Collapse unqualified simple properties into XML attributes.
    /// This is the default encoding; the flag exists for explicitness.
    pub use_compact_format: bool,
    /// Use element form for every property.
    pub use_canonical_format: bool,
    /// Sort schemas and properties alphabetically before writing.
    pub sort: bool,
}

impl SerializeOptions {
    /// Compact encoding, the default.
    pub fn compact() -> Self {
        Self {
            use_compact_format: true,
            ..Self::default()
        }
    }

    /// Canonical element-form encoding.
    pub fn canonical() -> Self {
        Self {
            use_canonical_format: true,
            ..Self::default()
        }
    }
}

/// Options for property iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IteratorOptions {
    /// Visit only the immediate children of the start node.
    pub just_children: bool,
    /// Visit only leaf nodes.
    pub just_leaf_nodes: bool,
    /// Report only the leaf name, not the full path.
    pub just_leaf_name: bool,
    /// Skip qualifiers entirely.
    pub omit_qualifiers: bool,
    /// Also report registered aliases whose base property exists.
    pub include_aliases: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_bits() {
        let mut options = PropertyOptions::new();
        assert!(options.is_simple());

        options.set_array(true).set_array_ordered(true);
        assert!(options.is_array());
        assert!(options.is_array_ordered());
        assert!(options.is_composite_property());
        assert!(!options.is_simple());

        options.set_array_ordered(false);
        assert!(!options.is_array_ordered());
    }

    #[test]
    fn test_struct_array_exclusion() {
        let mut options = PropertyOptions::new();
        options.set_struct(true).set_array(true);
        assert!(options.assert_consistency().is_err());
    }

    #[test]
    fn test_verify_set_options_cascade() {
        let mut options = PropertyOptions::new();
        options.set_array_alt_text(true);

        let verified = verify_set_options(options, None).unwrap();
        assert!(verified.is_array());
        assert!(verified.is_array_ordered());
        assert!(verified.is_array_alternate());
    }

    #[test]
    fn test_verify_set_options_rejects_composite_value() {
        let mut options = PropertyOptions::new();
        options.set_struct(true);
        assert!(verify_set_options(options, Some("value")).is_err());
    }

    #[test]
    fn test_alias_form() {
        assert!(AliasForm::DIRECT.is_simple());
        assert!(AliasForm::array_ordered().is_array());
        assert!(AliasForm::array_alt_text().is_array_alt_text());

        let options = AliasForm::array_alt_text().to_property_options();
        assert!(options.is_array_alt_text());
    }
}
