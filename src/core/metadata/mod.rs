//! XMP metadata object
//!
//! [`XmpMeta`] is the DOM-style representation of one XMP packet. It has
//! methods to read and modify all kinds of properties, iterate over the
//! tree, and parse from / serialize to RDF/XML.
//!
//! Properties are addressed by a schema namespace URI plus a property
//! path expression; the path may be a general expression covering struct
//! fields, array items, selectors and qualifiers. Legacy alias names are
//! resolved transparently on every access.

use crate::core::constants::{ARRAY_ITEM_NAME, X_DEFAULT, XML_LANG};
use crate::core::error::{XmpError, XmpResult};
use crate::core::navigator::{
    self, append_lang_item, choose_localized_text, delete_at, find_node, lookup_node, node_at,
    node_at_mut, set_node_value, LocalizedTextResult,
};
use crate::core::node::XmpNode;
use crate::core::normalizer;
use crate::core::options::{
    verify_set_options, IteratorOptions, ParseOptions, PropertyOptions, SerializeOptions,
};
use crate::core::parser;
use crate::core::serializer;
use crate::core::xpath::{
    compose_array_item_path, compose_qualifier_path, compose_struct_field_path, expand_path,
};
use crate::types::value::{convert_to_boolean, convert_to_double, convert_to_integer};
use crate::types::XmpValue;
use std::fmt;
use std::str::FromStr;

mod iterator;

pub use iterator::{XmpIterator, XmpPropertyInfo};

/// Bits that make a property composite.
const COMPOSITE_MASK: u32 = PropertyOptions::ARRAY
    | PropertyOptions::ARRAY_ORDERED
    | PropertyOptions::ARRAY_ALTERNATE
    | PropertyOptions::ARRAY_ALT_TEXT
    | PropertyOptions::STRUCT;

/// A property value returned by the getter methods: the text value (absent
/// on composite nodes), the option flags, and for localized text the
/// language of the chosen item.
#[derive(Debug, Clone, PartialEq)]
pub struct XmpProperty {
    pub value: Option<String>,
    pub options: PropertyOptions,
    pub language: Option<String>,
}

/// The set of XMP metadata of one packet.
#[derive(Debug, Clone, Default)]
pub struct XmpMeta {
    /// Root of the metadata tree. Its name holds the `rdf:about` value.
    root: XmpNode,
    /// Content of the xpacket processing instruction, when parsed from a
    /// wrapped packet.
    packet_header: Option<String>,
}

impl XmpMeta {
    /// Create an empty metadata object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a packet with default options: envelope optional,
    /// normalization on.
    pub fn parse(input: &str) -> XmpResult<Self> {
        Self::parse_with_options(input, &ParseOptions::default())
    }

    /// Parse a packet, including de-aliasing and normalization unless
    /// disabled.
    pub fn parse_with_options(input: &str, options: &ParseOptions) -> XmpResult<Self> {
        let (mut root, packet_header) = parser::parse(input, options)?;

        if !options.omit_normalization {
            normalizer::normalize(&mut root, options)?;
        }

        Ok(Self {
            root,
            packet_header,
        })
    }

    /// Parse a packet from raw bytes; the buffer must hold UTF-8 text.
    pub fn parse_from_buffer(buffer: &[u8]) -> XmpResult<Self> {
        let input = std::str::from_utf8(buffer)
            .map_err(|err| XmpError::BadStream(format!("Packet is not valid UTF-8: {}", err)))?;

        Self::parse(input)
    }

    /// Serialize to RDF/XML according to the options.
    pub fn serialize(&self, options: &SerializeOptions) -> XmpResult<String> {
        serializer::serialize(&self.root, options)
    }

    /// Serialize with default options: packet wrapper, envelope, compact
    /// encoding.
    pub fn serialize_default(&self) -> XmpResult<String> {
        self.serialize(&SerializeOptions::default())
    }

    /// Read access to the metadata tree for advanced callers.
    pub fn root(&self) -> &XmpNode {
        &self.root
    }

    /// Re-run the normalization pass on this object.
    pub fn normalize(&mut self, options: &ParseOptions) -> XmpResult<()> {
        normalizer::normalize(&mut self.root, options)
    }

    // ---------------------------------------------------------------
    // basic property access

    /// Get a property. Returns `Ok(None)` if the property does not exist.
    pub fn get_property(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<XmpProperty>> {
        verify_params(schema_ns, prop_name)?;

        let path = expand_path(schema_ns, prop_name)?;

        let Some(location) = lookup_node(&self.root, &path)? else {
            return Ok(None);
        };

        let node = node_at(&self.root, &location);

        Ok(Some(XmpProperty {
            value: node.value.clone(),
            options: node.options,
            language: None,
        }))
    }

    /// Get a property value as a string.
    pub fn get_property_string(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<String>> {
        Ok(self.get_property(schema_ns, prop_name)?.and_then(|p| p.value))
    }

    /// Get a property as a boolean, failing with `BadValue` when the text
    /// does not convert.
    pub fn get_property_bool(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<bool>> {
        match self.get_simple_value(schema_ns, prop_name)? {
            Some(value) => Ok(Some(convert_to_boolean(&value)?)),
            None => Ok(None),
        }
    }

    /// Get a property as an integer, failing with `BadValue` when the
    /// text does not convert.
    pub fn get_property_integer(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<i64>> {
        match self.get_simple_value(schema_ns, prop_name)? {
            Some(value) => Ok(Some(convert_to_integer(&value)?)),
            None => Ok(None),
        }
    }

    /// Get a property as a double, failing with `BadValue` when the text
    /// does not convert.
    pub fn get_property_double(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<f64>> {
        match self.get_simple_value(schema_ns, prop_name)? {
            Some(value) => Ok(Some(convert_to_double(&value)?)),
            None => Ok(None),
        }
    }

    fn get_simple_value(&self, schema_ns: &str, prop_name: &str) -> XmpResult<Option<String>> {
        let Some(property) = self.get_property(schema_ns, prop_name)? else {
            return Ok(None);
        };

        if property.options.is_composite_property() {
            return Err(XmpError::BadXPath(
                "Property must be simple when a value type is requested".to_string(),
            ));
        }

        Ok(Some(property.value.unwrap_or_default()))
    }

    /// Set a simple property value, creating the property and any missing
    /// intermediate nodes.
    pub fn set_property(&mut self, schema_ns: &str, prop_name: &str, value: &str) -> XmpResult<()> {
        self.set_property_with_options(schema_ns, prop_name, Some(value), PropertyOptions::new())
    }

    /// Set a property with explicit options; pass `None` as value to
    /// create a composite node (struct or array, per the options).
    pub fn set_property_with_options(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        value: Option<&str>,
        options: PropertyOptions,
    ) -> XmpResult<()> {
        verify_params(schema_ns, prop_name)?;

        let verified_options = verify_set_options(options, value)?;

        let path = expand_path(schema_ns, prop_name)?;

        let location = find_node(&mut self.root, &path, true, Some(verified_options))?
            .ok_or_else(|| {
                XmpError::BadXPath("Specified property does not exist".to_string())
            })?;

        let node = node_at_mut(&mut self.root, &location);

        set_node(node, value, verified_options, false)
    }

    /// Set a typed property value.
    pub fn set_property_value(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        value: &XmpValue,
    ) -> XmpResult<()> {
        self.set_property(schema_ns, prop_name, &value.serialize())
    }

    /// Set a boolean property.
    pub fn set_property_bool(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        value: bool,
    ) -> XmpResult<()> {
        self.set_property_value(schema_ns, prop_name, &XmpValue::Boolean(value))
    }

    /// Set an integer property.
    pub fn set_property_integer(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        value: i64,
    ) -> XmpResult<()> {
        self.set_property_value(schema_ns, prop_name, &XmpValue::Integer(value))
    }

    /// Set a double property.
    pub fn set_property_double(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        value: f64,
    ) -> XmpResult<()> {
        self.set_property_value(schema_ns, prop_name, &XmpValue::Double(value))
    }

    /// Deletes the subtree rooted at the given property. It is not an
    /// error if the property does not exist.
    pub fn delete_property(&mut self, schema_ns: &str, prop_name: &str) -> XmpResult<()> {
        verify_params(schema_ns, prop_name)?;

        let path = expand_path(schema_ns, prop_name)?;

        if let Some(location) = lookup_node(&self.root, &path)? {
            delete_at(&mut self.root, &location);
        }

        Ok(())
    }

    /// Whether the property exists. Never fails; malformed paths count as
    /// "does not exist".
    pub fn does_property_exist(&self, schema_ns: &str, prop_name: &str) -> bool {
        let Ok(path) = expand_path(schema_ns, prop_name) else {
            return false;
        };

        matches!(lookup_node(&self.root, &path), Ok(Some(_)))
    }

    // ---------------------------------------------------------------
    // array access

    /// Get an item of an array by its 1-based index;
    /// [`crate::core::xpath::ARRAY_LAST_ITEM`] addresses the last item.
    pub fn get_array_item(
        &self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
    ) -> XmpResult<Option<XmpProperty>> {
        let item_path = compose_array_item_path(array_name, item_index)?;
        self.get_property(schema_ns, &item_path)
    }

    /// The number of items of an array, failing when the property is not
    /// an array.
    pub fn count_array_items(&self, schema_ns: &str, array_name: &str) -> XmpResult<usize> {
        verify_params(schema_ns, array_name)?;

        let path = expand_path(schema_ns, array_name)?;

        let Some(location) = lookup_node(&self.root, &path)? else {
            return Ok(0);
        };

        let node = node_at(&self.root, &location);

        if !node.options.is_array() {
            return Err(XmpError::BadXPath(
                "The named property is not an array".to_string(),
            ));
        }

        Ok(node.children_len())
    }

    /// Replaces an item within an existing array. A new item is appended
    /// if the index is the array size plus 1.
    pub fn set_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
        item_value: &str,
    ) -> XmpResult<()> {
        let location = self.require_array(schema_ns, array_name)?;
        let array_node = node_at_mut(&mut self.root, &location);

        do_set_array_item(array_node, item_index, item_value, PropertyOptions::new(), false)
    }

    /// Inserts an item into an existing array before the given index.
    pub fn insert_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
        item_value: &str,
    ) -> XmpResult<()> {
        let location = self.require_array(schema_ns, array_name)?;
        let array_node = node_at_mut(&mut self.root, &location);

        do_set_array_item(array_node, item_index, item_value, PropertyOptions::new(), true)
    }

    /// Appends an item to an array, creating the array when necessary.
    /// The array options decide what kind of array is created; when the
    /// array exists they must be compatible.
    pub fn append_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        array_options: PropertyOptions,
        item_value: &str,
    ) -> XmpResult<()> {
        verify_params(schema_ns, array_name)?;

        if !array_options.is_only_array_options() {
            return Err(XmpError::BadOptions(
                "Only array form flags allowed for arrayOptions".to_string(),
            ));
        }

        let verified_array_options = verify_set_options(array_options, None)?;

        let path = expand_path(schema_ns, array_name)?;

        let location = match lookup_node(&self.root, &path)? {
            Some(location) => {
                // the array exists, make sure the form is compatible
                if !node_at(&self.root, &location).options.is_array() {
                    return Err(XmpError::BadXPath(
                        "The named property is not an array".to_string(),
                    ));
                }

                location
            }
            None => {
                if !verified_array_options.is_array() {
                    return Err(XmpError::BadOptions(
                        "Explicit arrayOptions required to create new array".to_string(),
                    ));
                }

                find_node(&mut self.root, &path, true, Some(verified_array_options))?
                    .ok_or_else(|| {
                        XmpError::BadXPath("Failure creating array node".to_string())
                    })?
            }
        };

        let array_node = node_at_mut(&mut self.root, &location);

        do_set_array_item(
            array_node,
            crate::core::xpath::ARRAY_LAST_ITEM,
            item_value,
            PropertyOptions::new(),
            true,
        )
    }

    /// Deletes an array item. It is not an error if it does not exist.
    pub fn delete_array_item(
        &mut self,
        schema_ns: &str,
        array_name: &str,
        item_index: i32,
    ) -> XmpResult<()> {
        let item_path = compose_array_item_path(array_name, item_index)?;
        self.delete_property(schema_ns, &item_path)
    }

    /// Whether the array item exists.
    pub fn does_array_item_exist(&self, schema_ns: &str, array_name: &str, item_index: i32) -> bool {
        match compose_array_item_path(array_name, item_index) {
            Ok(item_path) => self.does_property_exist(schema_ns, &item_path),
            Err(_) => false,
        }
    }

    fn require_array(&mut self, schema_ns: &str, array_name: &str) -> XmpResult<navigator::NodeLocation> {
        verify_params(schema_ns, array_name)?;

        let path = expand_path(schema_ns, array_name)?;

        lookup_node(&self.root, &path)?.ok_or_else(|| {
            XmpError::BadXPath("Specified array does not exist".to_string())
        })
    }

    // ---------------------------------------------------------------
    // struct and qualifier access

    /// Get a field within a nested structure. The field namespace is
    /// passed as a URI; the prefix is resolved through the registry.
    pub fn get_struct_field(
        &self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> XmpResult<Option<XmpProperty>> {
        let field_path = format!(
            "{}{}",
            struct_name,
            compose_struct_field_path(field_ns, field_name)?
        );

        self.get_property(schema_ns, &field_path)
    }

    /// Set a field within a nested structure, creating the struct when
    /// necessary.
    pub fn set_struct_field(
        &mut self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
        field_value: &str,
    ) -> XmpResult<()> {
        let field_path = format!(
            "{}{}",
            struct_name,
            compose_struct_field_path(field_ns, field_name)?
        );

        self.set_property(schema_ns, &field_path, field_value)
    }

    /// Deletes a struct field. It is not an error if it does not exist.
    pub fn delete_struct_field(
        &mut self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> XmpResult<()> {
        let field_path = format!(
            "{}{}",
            struct_name,
            compose_struct_field_path(field_ns, field_name)?
        );

        self.delete_property(schema_ns, &field_path)
    }

    /// Whether the struct field exists.
    pub fn does_struct_field_exist(
        &self,
        schema_ns: &str,
        struct_name: &str,
        field_ns: &str,
        field_name: &str,
    ) -> bool {
        match compose_struct_field_path(field_ns, field_name) {
            Ok(field_path) => {
                self.does_property_exist(schema_ns, &format!("{}{}", struct_name, field_path))
            }
            Err(_) => false,
        }
    }

    /// Get a qualifier attached to a property.
    pub fn get_qualifier(
        &self,
        schema_ns: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> XmpResult<Option<XmpProperty>> {
        let qual_path = format!("{}{}", prop_name, compose_qualifier_path(qual_ns, qual_name)?);
        self.get_property(schema_ns, &qual_path)
    }

    /// Set a qualifier on an existing property.
    pub fn set_qualifier(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
        qual_value: &str,
    ) -> XmpResult<()> {
        verify_params(schema_ns, prop_name)?;

        if !self.does_property_exist(schema_ns, prop_name) {
            return Err(XmpError::BadXPath(
                "Specified property does not exist".to_string(),
            ));
        }

        let qual_path = format!("{}{}", prop_name, compose_qualifier_path(qual_ns, qual_name)?);

        self.set_property(schema_ns, &qual_path, qual_value)
    }

    /// Deletes a qualifier. It is not an error if it does not exist.
    pub fn delete_qualifier(
        &mut self,
        schema_ns: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> XmpResult<()> {
        let qual_path = format!("{}{}", prop_name, compose_qualifier_path(qual_ns, qual_name)?);
        self.delete_property(schema_ns, &qual_path)
    }

    /// Whether the qualifier exists.
    pub fn does_qualifier_exist(
        &self,
        schema_ns: &str,
        prop_name: &str,
        qual_ns: &str,
        qual_name: &str,
    ) -> bool {
        match compose_qualifier_path(qual_ns, qual_name) {
            Ok(qual_path) => {
                self.does_property_exist(schema_ns, &format!("{}{}", prop_name, qual_path))
            }
            Err(_) => false,
        }
    }

    // ---------------------------------------------------------------
    // localized text

    /// Get the best fitting item of an alt-text array for the given
    /// languages: exact match, then generic partial match, then
    /// `x-default`, then the first item.
    pub fn get_localized_text(
        &self,
        schema_ns: &str,
        alt_text_name: &str,
        generic_lang: Option<&str>,
        specific_lang: &str,
    ) -> XmpResult<Option<XmpProperty>> {
        verify_params(schema_ns, alt_text_name)?;

        if specific_lang.is_empty() {
            return Err(XmpError::BadParam("Empty specific language".to_string()));
        }

        let generic = generic_lang.map(crate::utils::normalize_lang_value);
        let specific = crate::utils::normalize_lang_value(specific_lang);

        let path = expand_path(schema_ns, alt_text_name)?;

        let Some(location) = lookup_node(&self.root, &path)? else {
            return Ok(None);
        };

        let array_node = node_at(&self.root, &location);

        let (result, item_index) = choose_localized_text(array_node, generic.as_deref(), &specific)?;

        if result == LocalizedTextResult::NoValues {
            return Ok(None);
        }

        let item = array_node.child(item_index.ok_or_else(|| {
            XmpError::Internal("Localized text match without item".to_string())
        })?);

        Ok(Some(XmpProperty {
            value: item.value.clone(),
            options: item.options,
            language: item.qualifier(1).value.clone(),
        }))
    }

    /// Modifies the value of a selected item in an alt-text array,
    /// creating an appropriate item if necessary and maintaining the
    /// `x-default` item per the standard rules.
    pub fn set_localized_text(
        &mut self,
        schema_ns: &str,
        alt_text_name: &str,
        generic_lang: Option<&str>,
        specific_lang: &str,
        item_value: &str,
    ) -> XmpResult<()> {
        verify_params(schema_ns, alt_text_name)?;

        if specific_lang.is_empty() {
            return Err(XmpError::BadParam("Empty specific language".to_string()));
        }

        let generic = generic_lang.map(crate::utils::normalize_lang_value);
        let specific = crate::utils::normalize_lang_value(specific_lang);

        let path = expand_path(schema_ns, alt_text_name)?;

        let mut alt_text_options = PropertyOptions::new();
        alt_text_options.set_array_alt_text(true);
        let alt_text_options = verify_set_options(alt_text_options, None)?;

        let location = find_node(&mut self.root, &path, true, Some(alt_text_options))?
            .ok_or_else(|| {
                XmpError::BadXPath("Failed to find or create array node".to_string())
            })?;

        let array_node = node_at_mut(&mut self.root, &location);

        if !array_node.options.is_array_alt_text() {
            if !array_node.has_children() && array_node.options.is_array_alternate() {
                array_node.options.set_array_alt_text(true);
            } else {
                return Err(XmpError::BadXPath(
                    "Specified property is no alt-text array".to_string(),
                ));
            }
        }

        // Make sure the x-default item, if any, is first.
        let mut have_x_default = false;
        let mut x_default_index: Option<usize> = None;

        for index in 1..=array_node.children_len() {
            let item = array_node.child(index);

            if !item.has_qualifiers() || item.qualifier(1).name != XML_LANG {
                return Err(XmpError::BadXPath(
                    "Language qualifier must be first".to_string(),
                ));
            }

            if item.qualifier(1).value.as_deref() == Some(X_DEFAULT) {
                x_default_index = Some(index);
                have_x_default = true;
                break;
            }
        }

        if let Some(index) = x_default_index {
            if index != 1 && array_node.children_len() > 1 {
                let item = array_node.remove_child(index);
                array_node.add_child_at(1, item);
            }

            x_default_index = Some(1);
        }

        let (result, item_index) = choose_localized_text(array_node, generic.as_deref(), &specific)?;

        let specific_x_default = specific == X_DEFAULT;

        match result {
            LocalizedTextResult::NoValues => {
                // create items for x-default and the specific language,
                // x-default first
                append_lang_item(array_node, X_DEFAULT, item_value);
                have_x_default = true;

                if !specific_x_default {
                    append_lang_item(array_node, &specific, item_value);
                }
            }
            LocalizedTextResult::SpecificMatch | LocalizedTextResult::SingleGeneric => {
                let item_index = item_index.ok_or_else(|| {
                    XmpError::Internal("Localized text match without item".to_string())
                })?;

                if !specific_x_default || result == LocalizedTextResult::SingleGeneric {
                    // update the item; update x-default too when it
                    // carried the same value
                    if let Some(xd) = x_default_index {
                        if xd != item_index
                            && array_node.child(xd).value == array_node.child(item_index).value
                        {
                            array_node.child_mut(xd).value = Some(item_value.to_string());
                        }
                    }

                    array_node.child_mut(item_index).value = Some(item_value.to_string());
                } else {
                    // setting x-default itself: update all items that
                    // match the old x-default value
                    let x_default = x_default_index.ok_or_else(|| {
                        XmpError::Internal("x-default match without item".to_string())
                    })?;

                    let old_value = array_node.child(x_default).value.clone();

                    for index in 1..=array_node.children_len() {
                        if index == x_default || array_node.child(index).value != old_value {
                            continue;
                        }

                        array_node.child_mut(index).value = Some(item_value.to_string());
                    }

                    array_node.child_mut(x_default).value = Some(item_value.to_string());
                }
            }
            LocalizedTextResult::FirstItem | LocalizedTextResult::MultipleGeneric => {
                // create the specific language, ignore x-default
                append_lang_item(array_node, &specific, item_value);

                if specific_x_default {
                    have_x_default = true;
                }
            }
            LocalizedTextResult::XDefault => {
                // create the specific language, update x-default if it
                // was the only item
                if let Some(xd) = x_default_index {
                    if array_node.children_len() == 1 {
                        array_node.child_mut(xd).value = Some(item_value.to_string());
                    }
                }

                append_lang_item(array_node, &specific, item_value);
            }
        }

        // add an x-default at the front when a single item remains
        if !have_x_default && array_node.children_len() == 1 {
            append_lang_item(array_node, X_DEFAULT, item_value);
        }

        Ok(())
    }

    // ---------------------------------------------------------------
    // iteration, sorting, object state

    /// Iterate over all properties of the tree.
    pub fn iterator(&self) -> XmpIterator {
        iterator::iterate(self, None, None, IteratorOptions::default())
            .unwrap_or_else(|_| XmpIterator::empty())
    }

    /// Iterate over all properties with the given options.
    pub fn iterator_with_options(&self, options: IteratorOptions) -> XmpIterator {
        iterator::iterate(self, None, None, options).unwrap_or_else(|_| XmpIterator::empty())
    }

    /// Iterate starting at a schema or an arbitrary property path.
    pub fn iterator_for(
        &self,
        schema_ns: Option<&str>,
        prop_name: Option<&str>,
        options: IteratorOptions,
    ) -> XmpResult<XmpIterator> {
        iterator::iterate(self, schema_ns, prop_name, options)
    }

    /// Sorts the data model: schemas by prefix, properties and qualifiers
    /// by name, arrays untouched.
    pub fn sort(&mut self) {
        self.root.sort();
    }

    /// The name of the XMP object, the `rdf:about` value.
    pub fn object_name(&self) -> &str {
        &self.root.name
    }

    /// Renames the XMP object.
    pub fn set_object_name(&mut self, name: impl Into<String>) {
        self.root.name = name.into();
    }

    /// The content of the `<?xpacket?>` processing instruction of the
    /// parsed packet, if any.
    pub fn packet_header(&self) -> Option<&str> {
        self.packet_header.as_deref()
    }
}

impl FromStr for XmpMeta {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for XmpMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.serialize_default() {
            Ok(output) => f.write_str(&output),
            Err(_) => Err(fmt::Error),
        }
    }
}

fn verify_params(schema_ns: &str, prop_name: &str) -> XmpResult<()> {
    if schema_ns.is_empty() {
        return Err(XmpError::BadParam("Empty schema namespace URI".to_string()));
    }

    if prop_name.is_empty() {
        return Err(XmpError::BadParam("Empty property name".to_string()));
    }

    Ok(())
}

/// The internals of the setter calls, applied after the node is found or
/// created.
fn set_node(
    node: &mut XmpNode,
    value: Option<&str>,
    new_options: PropertyOptions,
    delete_existing: bool,
) -> XmpResult<()> {
    if delete_existing {
        node.value = None;
        node.options = PropertyOptions::new();
        node.remove_children();
        node.remove_qualifiers();
    }

    node.options.merge_with(new_options);

    if node.options.bits() & COMPOSITE_MASK == 0 {
        // setting the value of a leaf node
        match value {
            Some(value) => set_node_value(node, value),
            None => node.value = None,
        }
    } else {
        if value.is_some_and(|value| !value.is_empty()) {
            return Err(XmpError::BadXPath(
                "Composite nodes can't have values".to_string(),
            ));
        }

        // can't change an array to a struct, or vice versa
        if new_options.bits() & COMPOSITE_MASK != 0
            && new_options.bits() & COMPOSITE_MASK != node.options.bits() & COMPOSITE_MASK
        {
            return Err(XmpError::BadXPath(
                "Requested and existing composite form mismatch".to_string(),
            ));
        }

        node.remove_children();
    }

    Ok(())
}

/// Locate or create the item node and set the value. The index is
/// 1-based; in insert mode the index after the last is allowed, and
/// `ARRAY_LAST_ITEM` points to the index after the last.
fn do_set_array_item(
    array_node: &mut XmpNode,
    item_index: i32,
    item_value: &str,
    item_options: PropertyOptions,
    insert: bool,
) -> XmpResult<()> {
    if !array_node.options.is_array() {
        return Err(XmpError::BadXPath(
            "The named property is not an array".to_string(),
        ));
    }

    let verified_options = verify_set_options(item_options, Some(item_value))?;

    let max_index = if insert {
        array_node.children_len() + 1
    } else {
        array_node.children_len()
    };

    let limited_index = if item_index == crate::core::xpath::ARRAY_LAST_ITEM {
        max_index as i64
    } else {
        item_index as i64
    };

    if limited_index < 1 || limited_index > max_index as i64 {
        return Err(XmpError::BadXPath("Array index out of bounds".to_string()));
    }

    let limited_index = limited_index as usize;

    let mut item_node = XmpNode::new(ARRAY_ITEM_NAME, None, PropertyOptions::new());
    set_node(&mut item_node, Some(item_value), verified_options, false)?;

    if !insert {
        array_node.remove_child(limited_index);
    }

    array_node.add_child_at(limited_index, item_node);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ns;

    #[test]
    fn test_set_and_get_property() {
        let mut meta = XmpMeta::new();

        meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();

        assert_eq!(
            meta.get_property_string(ns::XMP, "CreatorTool").unwrap().as_deref(),
            Some("TestApp")
        );
        assert!(meta.does_property_exist(ns::XMP, "CreatorTool"));
        assert!(!meta.does_property_exist(ns::XMP, "Missing"));
    }

    #[test]
    fn test_delete_property() {
        let mut meta = XmpMeta::new();

        meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();
        meta.delete_property(ns::XMP, "CreatorTool").unwrap();

        assert!(!meta.does_property_exist(ns::XMP, "CreatorTool"));
        // the schema node went away with its last property
        assert!(!meta.root().has_children());

        // deleting again is not an error
        meta.delete_property(ns::XMP, "CreatorTool").unwrap();
    }

    #[test]
    fn test_typed_accessors() {
        let mut meta = XmpMeta::new();

        meta.set_property_bool(ns::XMP, "Flag", true).unwrap();
        meta.set_property_integer(ns::XMP, "Rating", 5).unwrap();

        assert_eq!(meta.get_property_bool(ns::XMP, "Flag").unwrap(), Some(true));
        assert_eq!(meta.get_property_integer(ns::XMP, "Rating").unwrap(), Some(5));
        assert_eq!(
            meta.get_property_string(ns::XMP, "Flag").unwrap().as_deref(),
            Some("True")
        );

        meta.set_property(ns::XMP, "NotANumber", "xyz").unwrap();
        assert!(matches!(
            meta.get_property_integer(ns::XMP, "NotANumber"),
            Err(XmpError::BadValue(_))
        ));
    }

    #[test]
    fn test_array_operations() {
        let mut meta = XmpMeta::new();

        let mut ordered = PropertyOptions::new();
        ordered.set_array_ordered(true);

        meta.append_array_item(ns::DC, "creator", ordered, "First").unwrap();
        meta.append_array_item(ns::DC, "creator", PropertyOptions::new(), "Second")
            .unwrap();

        assert_eq!(meta.count_array_items(ns::DC, "creator").unwrap(), 2);

        meta.set_array_item(ns::DC, "creator", 1, "Replaced").unwrap();
        assert_eq!(
            meta.get_array_item(ns::DC, "creator", 1).unwrap().unwrap().value.as_deref(),
            Some("Replaced")
        );

        meta.insert_array_item(ns::DC, "creator", 1, "Inserted").unwrap();
        assert_eq!(meta.count_array_items(ns::DC, "creator").unwrap(), 3);
        assert_eq!(
            meta.get_array_item(ns::DC, "creator", 1).unwrap().unwrap().value.as_deref(),
            Some("Inserted")
        );

        meta.delete_array_item(ns::DC, "creator", 1).unwrap();
        assert_eq!(meta.count_array_items(ns::DC, "creator").unwrap(), 2);
    }

    #[test]
    fn test_array_append_boundary() {
        let mut meta = XmpMeta::new();

        let mut bag = PropertyOptions::new();
        bag.set_array(true);
        meta.append_array_item(ns::DC, "subject", bag, "one").unwrap();

        // set_property via index size+1 appends
        meta.set_property(ns::DC, "subject[2]", "two").unwrap();
        assert_eq!(meta.count_array_items(ns::DC, "subject").unwrap(), 2);

        // a gap beyond size+1 is rejected
        assert!(matches!(
            meta.set_property(ns::DC, "subject[4]", "nope"),
            Err(XmpError::BadXPath(_))
        ));
    }

    #[test]
    fn test_struct_field() {
        let mut meta = XmpMeta::new();

        meta.set_struct_field(ns::XMP_MM, "DerivedFrom", ns::TYPE_RESOURCE_REF, "instanceID", "xmp.iid:1")
            .unwrap();

        assert!(meta.does_struct_field_exist(
            ns::XMP_MM,
            "DerivedFrom",
            ns::TYPE_RESOURCE_REF,
            "instanceID"
        ));

        let field = meta
            .get_struct_field(ns::XMP_MM, "DerivedFrom", ns::TYPE_RESOURCE_REF, "instanceID")
            .unwrap()
            .unwrap();
        assert_eq!(field.value.as_deref(), Some("xmp.iid:1"));

        meta.delete_struct_field(ns::XMP_MM, "DerivedFrom", ns::TYPE_RESOURCE_REF, "instanceID")
            .unwrap();
        assert!(!meta.does_struct_field_exist(
            ns::XMP_MM,
            "DerivedFrom",
            ns::TYPE_RESOURCE_REF,
            "instanceID"
        ));
    }

    #[test]
    fn test_qualifier() {
        let mut meta = XmpMeta::new();

        meta.set_property(ns::XMP, "CreatorTool", "App").unwrap();
        meta.set_qualifier(ns::XMP, "CreatorTool", ns::XML, "lang", "en")
            .unwrap();

        assert!(meta.does_qualifier_exist(ns::XMP, "CreatorTool", ns::XML, "lang"));

        let qual = meta
            .get_qualifier(ns::XMP, "CreatorTool", ns::XML, "lang")
            .unwrap()
            .unwrap();
        assert_eq!(qual.value.as_deref(), Some("en"));

        // qualifiers need an existing property
        assert!(meta
            .set_qualifier(ns::XMP, "Missing", ns::XML, "lang", "en")
            .is_err());
    }

    #[test]
    fn test_alias_transparency() {
        let mut meta = XmpMeta::new();

        // set through the alias, read through the base
        meta.set_property(ns::XMP, "Author", "A. Writer").unwrap();

        assert_eq!(
            meta.get_property_string(ns::DC, "creator[1]").unwrap().as_deref(),
            Some("A. Writer")
        );

        // and the other way around
        let mut meta = XmpMeta::new();
        let mut ordered = PropertyOptions::new();
        ordered.set_array_ordered(true);
        meta.append_array_item(ns::DC, "creator", ordered, "B. Writer").unwrap();

        assert_eq!(
            meta.get_property_string(ns::XMP, "Author").unwrap().as_deref(),
            Some("B. Writer")
        );
    }

    #[test]
    fn test_localized_text_roundtrip() {
        let mut meta = XmpMeta::new();

        meta.set_localized_text(ns::DC, "title", None, "en-US", "Color").unwrap();

        // a lone language got an x-default companion
        assert_eq!(meta.count_array_items(ns::DC, "title").unwrap(), 2);

        let chosen = meta
            .get_localized_text(ns::DC, "title", Some("en"), "en-US")
            .unwrap()
            .unwrap();
        assert_eq!(chosen.value.as_deref(), Some("Color"));
        assert_eq!(chosen.language.as_deref(), Some("en-US"));

        // updating the specific language also updates the matching x-default
        meta.set_localized_text(ns::DC, "title", None, "en-US", "Colour").unwrap();

        let fallback = meta
            .get_localized_text(ns::DC, "title", None, "de")
            .unwrap()
            .unwrap();
        assert_eq!(fallback.value.as_deref(), Some("Colour"));
        assert_eq!(fallback.language.as_deref(), Some(X_DEFAULT));
    }

    #[test]
    fn test_set_composite_rejects_value() {
        let mut meta = XmpMeta::new();

        let mut struct_options = PropertyOptions::new();
        struct_options.set_struct(true);

        assert!(meta
            .set_property_with_options(ns::XMP_MM, "DerivedFrom", Some("value"), struct_options)
            .is_err());

        assert!(meta
            .set_property_with_options(ns::XMP_MM, "DerivedFrom", None, struct_options)
            .is_ok());
    }

    #[test]
    fn test_object_name() {
        let mut meta = XmpMeta::new();
        assert_eq!(meta.object_name(), "");

        meta.set_object_name("uuid:1234");
        assert_eq!(meta.object_name(), "uuid:1234");
    }
}
