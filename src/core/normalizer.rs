//! Post-parse normalization
//!
//! A single repair pass run once after parsing, before the tree is
//! exposed: moves explicit aliases to their base locations, fixes a fixed
//! set of known legacy shapes (Acrobat 5 Dublin Core denormalization,
//! alt-text arrays without language qualifiers, instance IDs stored in
//! `rdf:about`), and removes schema nodes left empty by the cleanup. The
//! pass is idempotent; running it twice produces no further change.

use crate::core::constants::{ARRAY_ITEM_NAME, X_DEFAULT, XML_LANG};
use crate::core::error::{XmpError, XmpResult};
use crate::core::navigator::{find_node, find_schema_node, lookup_language_item, node_at_mut};
use crate::core::node::XmpNode;
use crate::core::options::{ParseOptions, PropertyOptions};
use crate::core::registry::{self, ns};
use crate::core::xpath::expand_path;
use crate::utils::{check_uuid_format, UUID_LENGTH};

/// Normalizes a raw parsed tree.
pub fn normalize(tree: &mut XmpNode, options: &ParseOptions) -> XmpResult<()> {
    touch_up_data_model(tree)?;
    move_explicit_aliases(tree, options)?;
    tweak_old_xmp(tree)?;
    delete_empty_schemas(tree);

    Ok(())
}

/// Visit all schemas to do general fixes and handle special cases.
fn touch_up_data_model(tree: &mut XmpNode) -> XmpResult<()> {
    // Make sure the DC schema exists, it might be needed within the
    // normalization; if untouched it is removed by delete_empty_schemas.
    find_schema_node(tree, ns::DC, None, true)?;

    for schema_index in 0..tree.children_len() {
        let schema = &mut tree.children_mut()[schema_index];

        match schema.name.as_str() {
            ns::DC => normalize_dc_arrays(schema),
            ns::EXIF => {
                if let Some(user_comment) = schema.find_child_by_name_mut("exif:UserComment") {
                    repair_alt_text(user_comment);
                }
            }
            ns::XMP_RIGHTS => {
                if let Some(usage_terms) = schema.find_child_by_name_mut("xmpRights:UsageTerms") {
                    repair_alt_text(usage_terms);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// The correct array form of the known Dublin Core array properties.
fn dc_array_form(prop_name: &str) -> Option<PropertyOptions> {
    let mut form = PropertyOptions::new();

    match prop_name {
        // properties supposed to be a "Bag"
        "dc:contributor" | "dc:language" | "dc:publisher" | "dc:relation" | "dc:subject"
        | "dc:type" => {
            form.set_array(true);
        }
        // properties supposed to be a "Seq"
        "dc:creator" | "dc:date" => {
            form.set_array(true).set_array_ordered(true);
        }
        // properties supposed to be an "Alt" in alternative-text form
        "dc:description" | "dc:rights" | "dc:title" => {
            form.set_array(true)
                .set_array_ordered(true)
                .set_array_alternate(true)
                .set_array_alt_text(true);
        }
        _ => return None,
    }

    Some(form)
}

/// Undo the denormalization performed by the XMP used in Acrobat 5: a
/// Dublin Core array with only one item was serialized as a simple
/// property, and the `xml:lang` attribute was dropped from an alt-text
/// item when the language was `x-default`.
fn normalize_dc_arrays(dc_schema: &mut XmpNode) {
    for index in 1..=dc_schema.children_len() {
        let Some(array_form) = dc_array_form(&dc_schema.child(index).name) else {
            continue;
        };

        if dc_schema.child(index).options.is_simple() {
            // a formerly simple property becomes the only item of a new
            // array
            let mut current_prop = dc_schema.remove_child(index);

            let mut new_array = XmpNode::new(current_prop.name.clone(), None, array_form);

            current_prop.name = ARRAY_ITEM_NAME.to_string();

            if array_form.is_array_alt_text() && !current_prop.options.has_language() {
                current_prop.add_qualifier(XmpNode::leaf(XML_LANG, X_DEFAULT));
            }

            new_array.add_child(current_prop);
            dc_schema.add_child_at(index, new_array);
        } else {
            // clear the array options and apply the corrected form
            let current_prop = dc_schema.child_mut(index);

            current_prop.options.set_option(
                PropertyOptions::ARRAY
                    | PropertyOptions::ARRAY_ORDERED
                    | PropertyOptions::ARRAY_ALTERNATE
                    | PropertyOptions::ARRAY_ALT_TEXT,
                false,
            );

            current_prop.options.merge_with(array_form);

            if array_form.is_array_alt_text() {
                repair_alt_text(current_prop);
            }
        }
    }
}

/// Make sure the array is well-formed alt-text: every item must be simple
/// and carry an `xml:lang` qualifier. Simple non-empty items are kept by
/// stamping them with the language `x-repair`; composite or empty
/// unlabeled items are deleted.
fn repair_alt_text(array_node: &mut XmpNode) {
    if !array_node.options.is_array() {
        // already OK or not even an array
        return;
    }

    array_node
        .options
        .set_array_ordered(true)
        .set_array_alternate(true)
        .set_array_alt_text(true);

    array_node.children_mut().retain_mut(|child| {
        if child.options.is_composite_property() {
            // delete non-simple children
            return false;
        }

        if child.options.has_language() {
            return true;
        }

        let is_empty = child.value.as_deref().map_or(true, str::is_empty);

        if is_empty {
            // delete empty valued children that have no xml:lang
            false
        } else {
            child.add_qualifier(XmpNode::leaf(XML_LANG, "x-repair"));
            true
        }
    });
}

/// Visit all top level nodes looking for aliases. If there is no base,
/// transplant the alias subtree; if there is a base and strict aliasing
/// is on, make sure the alias and base subtrees match.
fn move_explicit_aliases(tree: &mut XmpNode, options: &ParseOptions) -> XmpResult<()> {
    if !tree.has_aliases {
        return Ok(());
    }

    tree.has_aliases = false;

    let strict_aliasing = options.strict_aliasing;

    let mut schema_index = 0;

    while schema_index < tree.children_len() {
        if !tree.children()[schema_index].has_aliases {
            schema_index += 1;
            continue;
        }

        let mut prop_index = 1;

        while prop_index <= tree.children()[schema_index].children_len() {
            let prop = tree.children()[schema_index].child(prop_index);
            let (prop_is_alias, prop_name) = (prop.is_alias, prop.name.clone());

            if !prop_is_alias {
                prop_index += 1;
                continue;
            }

            let Some(info) = registry::find_alias(&prop_name) else {
                tree.children_mut()[schema_index].child_mut(prop_index).is_alias = false;
                prop_index += 1;
                continue;
            };

            let mut current_prop = tree.children_mut()[schema_index].remove_child(prop_index);
            current_prop.is_alias = false;

            let base_name = format!("{}:{}", info.prefix, info.prop_name);

            // find or create the base schema
            let base_schema_index = find_schema_node(tree, &info.namespace, None, true)?
                .ok_or_else(|| {
                    XmpError::Internal("SchemaNode should have been created".to_string())
                })?;

            let base_schema = &mut tree.children_mut()[base_schema_index];
            base_schema.implicit = false;

            match base_schema.find_child_index(&base_name) {
                None => {
                    if info.form.is_simple() {
                        // a top-to-top alias, transplant the property
                        current_prop.name = base_name;
                        base_schema.add_child(current_prop);
                    } else {
                        // an alias to an array item, create the array
                        // and transplant the property
                        let mut base_node =
                            XmpNode::new(base_name, None, info.form.to_property_options());

                        transplant_array_item_alias(current_prop, &mut base_node)?;
                        base_schema.add_child(base_node);
                    }
                }
                Some(base_index) => {
                    if info.form.is_simple() {
                        // the base node exists; check for conflicts when
                        // strict aliasing is on, then drop the alias
                        if strict_aliasing {
                            compare_aliased_subtrees(
                                &current_prop,
                                &base_schema.children()[base_index],
                                true,
                            )?;
                        }
                    } else {
                        // an alias to an array item and the array exists
                        let base_node = &mut base_schema.children_mut()[base_index];

                        let item_index = if info.form.is_array_alt_text() {
                            lookup_language_item(base_node, X_DEFAULT)?
                        } else if base_node.has_children() {
                            Some(1)
                        } else {
                            None
                        };

                        match item_index {
                            None => transplant_array_item_alias(current_prop, base_node)?,
                            Some(item_index) => {
                                if strict_aliasing {
                                    compare_aliased_subtrees(
                                        &current_prop,
                                        base_node.child(item_index),
                                        true,
                                    )?;
                                }
                            }
                        }
                    }
                }
            }
        }

        tree.children_mut()[schema_index].has_aliases = false;
        schema_index += 1;
    }

    Ok(())
}

/// Moves an alias node of array form into the base array as an item.
fn transplant_array_item_alias(mut child_node: XmpNode, base_array: &mut XmpNode) -> XmpResult<()> {
    if base_array.options.is_array_alt_text() {
        if child_node.options.has_language() {
            return Err(XmpError::BadXmp(
                "Alias to x-default already has a language qualifier".to_string(),
            ));
        }

        child_node.add_qualifier(XmpNode::leaf(XML_LANG, X_DEFAULT));
    }

    child_node.name = ARRAY_ITEM_NAME.to_string();
    base_array.add_child(child_node);

    Ok(())
}

/// The outermost call is special: the names almost certainly differ, and
/// the qualifiers differ for an alias to the `x-default` item of an
/// alt-text array.
fn compare_aliased_subtrees(
    alias_node: &XmpNode,
    base_node: &XmpNode,
    outer_call: bool,
) -> XmpResult<()> {
    if alias_node.value != base_node.value
        || alias_node.children_len() != base_node.children_len()
    {
        return Err(XmpError::BadXmp(
            "Mismatch between alias and base nodes".to_string(),
        ));
    }

    if !outer_call
        && (alias_node.name != base_node.name
            || alias_node.options != base_node.options
            || alias_node.qualifiers_len() != base_node.qualifiers_len())
    {
        return Err(XmpError::BadXmp(
            "Mismatch between alias and base nodes".to_string(),
        ));
    }

    for (alias_child, base_child) in alias_node.children().iter().zip(base_node.children()) {
        compare_aliased_subtrees(alias_child, base_child, false)?;
    }

    for (alias_qual, base_qual) in alias_node.qualifiers().iter().zip(base_node.qualifiers()) {
        compare_aliased_subtrees(alias_qual, base_qual, false)?;
    }

    Ok(())
}

/// Tweak old XMP: move an instance ID from `rdf:about` to the
/// `xmpMM:InstanceID` property. An old instance ID usually looks like
/// "uuid:bac965c4-9d87-11d9-9a30-000d936b79c4"; InDesign 3.0 wrote them
/// without the scheme.
fn tweak_old_xmp(tree: &mut XmpNode) -> XmpResult<()> {
    if tree.name.len() < UUID_LENGTH {
        return Ok(());
    }

    let mut name = tree.name.to_lowercase();

    if let Some(stripped) = name.strip_prefix("uuid:") {
        name = stripped.to_string();
    }

    if !check_uuid_format(&name) {
        return Ok(());
    }

    // move the UUID to xmpMM:InstanceID and remove it from the tree name
    let path = expand_path(ns::XMP_MM, "InstanceID")?;

    let location = find_node(tree, &path, true, None)?.ok_or_else(|| {
        XmpError::Internal("Failure creating xmpMM:InstanceID".to_string())
    })?;

    let id_node = node_at_mut(tree, &location);

    // clobber any existing xmpMM:InstanceID
    id_node.options = PropertyOptions::new();
    id_node.value = Some(format!("uuid:{}", name));
    id_node.remove_children();
    id_node.remove_qualifiers();

    tree.name = String::new();

    Ok(())
}

/// Remove all empty schema nodes generated during parsing. Done last,
/// other cleanup can make schemas empty.
fn delete_empty_schemas(tree: &mut XmpNode) {
    tree.children_mut().retain(XmpNode::has_children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::navigator::{lookup_node, node_at};
    use crate::core::parser;

    fn parse_and_normalize(input: &str) -> XmpNode {
        let options = ParseOptions::default();
        let (mut tree, _) = parser::parse(input, &options).unwrap();
        normalize(&mut tree, &options).unwrap();
        tree
    }

    fn get_node<'a>(root: &'a XmpNode, schema: &str, path: &str) -> Option<&'a XmpNode> {
        let expanded = expand_path(schema, path).unwrap();
        lookup_node(root, &expanded)
            .unwrap()
            .map(|location| {
                let node: &XmpNode = node_at(root, &location);
                node
            })
    }

    const RDF_START: &str =
        "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">";

    #[test]
    fn test_simple_dc_property_becomes_array() {
        // Acrobat 5 style: dc:creator written as a simple property
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
              dc:creator=\"Sole Author\"/></rdf:RDF>",
            RDF_START
        ));

        let array = get_node(&tree, ns::DC, "creator").unwrap();
        assert!(array.options.is_array());
        assert!(array.options.is_array_ordered());
        assert_eq!(array.children_len(), 1);
        assert_eq!(array.child(1).value.as_deref(), Some("Sole Author"));
    }

    #[test]
    fn test_simple_dc_alt_text_gets_x_default() {
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
              dc:title=\"My Title\"/></rdf:RDF>",
            RDF_START
        ));

        let array = get_node(&tree, ns::DC, "title").unwrap();
        assert!(array.options.is_array_alt_text());
        assert_eq!(
            array.child(1).qualifier(1).value.as_deref(),
            Some(X_DEFAULT)
        );
    }

    #[test]
    fn test_alias_is_moved_to_base() {
        // tiff:Artist is an alias for the first dc:creator item
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:tiff=\"http://ns.adobe.com/tiff/1.0/\" \
              tiff:Artist=\"Ansel\"/></rdf:RDF>",
            RDF_START
        ));

        let array = get_node(&tree, ns::DC, "creator").unwrap();
        assert!(array.options.is_array());
        assert_eq!(array.child(1).value.as_deref(), Some("Ansel"));

        // the tiff schema is gone, nothing was left behind
        assert!(tree.find_child_by_name(ns::TIFF).is_none());

        // reading through the alias name reaches the base item
        let via_alias = get_node(&tree, ns::TIFF, "Artist").unwrap();
        assert_eq!(via_alias.value.as_deref(), Some("Ansel"));
    }

    #[test]
    fn test_alias_with_existing_base_is_dropped() {
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
              xmlns:tiff=\"http://ns.adobe.com/tiff/1.0/\" \
              tiff:Software=\"OldApp\" xmp:CreatorTool=\"NewApp\"/></rdf:RDF>",
            RDF_START
        ));

        // the base wins, the alias subtree is dropped
        let node = get_node(&tree, ns::XMP, "CreatorTool").unwrap();
        assert_eq!(node.value.as_deref(), Some("NewApp"));
        assert!(tree.find_child_by_name(ns::TIFF).is_none());

        // the alias name now reads the base value
        let via_alias = get_node(&tree, ns::TIFF, "Software").unwrap();
        assert_eq!(via_alias.value.as_deref(), Some("NewApp"));
    }

    #[test]
    fn test_strict_aliasing_detects_mismatch() {
        let options = ParseOptions {
            strict_aliasing: true,
            ..ParseOptions::default()
        };

        let (mut tree, _) = parser::parse(
            &format!(
                "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
                  xmlns:tiff=\"http://ns.adobe.com/tiff/1.0/\" \
                  tiff:Software=\"OldApp\" xmp:CreatorTool=\"NewApp\"/></rdf:RDF>",
                RDF_START
            ),
            &options,
        )
        .unwrap();

        assert!(matches!(
            normalize(&mut tree, &options),
            Err(XmpError::BadXmp(_))
        ));
    }

    #[test]
    fn test_uuid_about_moves_to_instance_id() {
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"uuid:bac965c4-9d87-11d9-9a30-000d936b79c4\" \
              xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"4\"/></rdf:RDF>",
            RDF_START
        ));

        assert_eq!(tree.name, "");

        let node = get_node(&tree, ns::XMP_MM, "InstanceID").unwrap();
        assert_eq!(
            node.value.as_deref(),
            Some("uuid:bac965c4-9d87-11d9-9a30-000d936b79c4")
        );
    }

    #[test]
    fn test_empty_schemas_are_removed() {
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
              xmp:Rating=\"4\"/></rdf:RDF>",
            RDF_START
        ));

        // only the xmp schema is left; the ensured dc schema was empty
        assert_eq!(tree.children_len(), 1);
        assert_eq!(tree.child(1).name, ns::XMP);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
              xmlns:tiff=\"http://ns.adobe.com/tiff/1.0/\" \
              dc:title=\"My Title\" tiff:Artist=\"Ansel\"/></rdf:RDF>",
            RDF_START
        );

        let options = ParseOptions::default();
        let (mut tree, _) = parser::parse(&input, &options).unwrap();
        normalize(&mut tree, &options).unwrap();

        let once = tree.clone();
        normalize(&mut tree, &options).unwrap();

        assert_eq!(tree, once);
    }

    #[test]
    fn test_repair_alt_text_stamps_missing_language() {
        let tree = parse_and_normalize(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
             <dc:rights><rdf:Alt><rdf:li>All rights reserved</rdf:li></rdf:Alt></dc:rights>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        let array = get_node(&tree, ns::DC, "rights").unwrap();
        assert!(array.options.is_array_alt_text());
        assert_eq!(array.child(1).qualifier(1).name, XML_LANG);
        assert_eq!(array.child(1).qualifier(1).value.as_deref(), Some("x-repair"));
    }
}
