//! Path navigator
//!
//! Walks an expanded [`XmpPath`] over the property tree to locate or
//! create nodes. Because the tree is an owned structure, the walk first
//! resolves a path into a [`NodeLocation`] (a list of child/qualifier
//! positions from the root); the location is then turned into a reference
//! with [`node_at`]/[`node_at_mut`]. Nodes created on the way are marked
//! implicit and the whole implicitly created subtree is removed again if a
//! later step fails or does not match.

use crate::core::constants::{ARRAY_ITEM_NAME, X_DEFAULT, XML_LANG};
use crate::core::error::{XmpError, XmpResult};
use crate::core::node::XmpNode;
use crate::core::options::PropertyOptions;
use crate::core::registry;
use crate::core::xpath::{XmpPath, XmpPathStepKind, STEP_ROOT_PROP};
use crate::utils::{normalize_lang_value, split_name_and_value};

/// One selection step of a resolved location (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSel {
    Child(usize),
    Qualifier(usize),
}

/// A resolved position in the tree, as selection steps from the root.
pub type NodeLocation = Vec<ChildSel>;

/// Result classes of [`choose_localized_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizedTextResult {
    NoValues,
    SpecificMatch,
    SingleGeneric,
    MultipleGeneric,
    XDefault,
    FirstItem,
}

/// The node at a resolved location.
pub fn node_at<'a>(root: &'a XmpNode, location: &[ChildSel]) -> &'a XmpNode {
    let mut current = root;

    for sel in location {
        current = match *sel {
            ChildSel::Child(index) => &current.children()[index],
            ChildSel::Qualifier(index) => &current.qualifiers()[index],
        };
    }

    current
}

/// Mutable access to the node at a resolved location.
pub fn node_at_mut<'a>(root: &'a mut XmpNode, location: &[ChildSel]) -> &'a mut XmpNode {
    let mut current = root;

    for sel in location {
        current = match *sel {
            ChildSel::Child(index) => &mut current.children_mut()[index],
            ChildSel::Qualifier(index) => current.qualifier_mut(index + 1),
        };
    }

    current
}

/// Deletes the node at the given location, together with its subtree.
/// A schema node left without children is removed as well.
pub fn delete_at(root: &mut XmpNode, location: &[ChildSel]) {
    let Some((last, parent_loc)) = location.split_last() else {
        return;
    };

    {
        let parent = node_at_mut(root, parent_loc);

        match *last {
            ChildSel::Child(index) => {
                parent.remove_child(index + 1);
            }
            ChildSel::Qualifier(index) => {
                parent.remove_qualifier(index + 1);
            }
        }
    }

    // delete schema nodes that lost their last child
    if !parent_loc.is_empty() {
        let parent = node_at(root, parent_loc);

        if parent.options.is_schema_node() && !parent.has_children() {
            if let ChildSel::Child(schema_index) = parent_loc[0] {
                root.remove_child(schema_index + 1);
            }
        }
    }
}

/// Find the schema node for a namespace URI below the tree root,
/// optionally creating it. A created schema node carries the registered
/// prefix as its value; an unregistered namespace without a suggested
/// prefix is a `BadSchema` error.
pub fn find_schema_node(
    root: &mut XmpNode,
    namespace_uri: &str,
    suggested_prefix: Option<&str>,
    create_nodes: bool,
) -> XmpResult<Option<usize>> {
    if let Some(index) = root.find_child_index(namespace_uri) {
        return Ok(Some(index));
    }

    if !create_nodes {
        return Ok(None);
    }

    let prefix = match registry::get_namespace_prefix(namespace_uri) {
        Some(prefix) => prefix,
        None => match suggested_prefix {
            Some(suggested) if !suggested.is_empty() => {
                registry::register_namespace(namespace_uri, suggested)?
            }
            _ => {
                return Err(XmpError::BadSchema(
                    "Unregistered schema namespace URI".to_string(),
                ))
            }
        },
    };

    let mut options = PropertyOptions::new();
    options.set_schema_node(true);

    let mut schema_node = XmpNode::new(namespace_uri, Some(prefix), options);
    schema_node.implicit = true;

    root.add_child(schema_node);

    Ok(Some(root.children_len() - 1))
}

/// Find or create a named child under a parent node. Named children are
/// only allowed for schema and struct nodes; an implicit parent is turned
/// into a struct when nodes may be created.
pub fn find_child_node(
    parent: &mut XmpNode,
    child_name: &str,
    create_nodes: bool,
) -> XmpResult<Option<usize>> {
    if !parent.options.is_schema_node() && !parent.options.is_struct() {
        if !parent.implicit {
            return Err(XmpError::BadXPath(format!(
                "Named children only allowed for schemas and structs: {}",
                child_name
            )));
        }

        if parent.options.is_array() {
            return Err(XmpError::BadXPath(format!(
                "Named children not allowed for arrays: {}",
                child_name
            )));
        }

        if create_nodes {
            parent.options.set_struct(true);
        }
    }

    if let Some(index) = parent.find_child_index(child_name) {
        return Ok(Some(index));
    }

    if !create_nodes {
        return Ok(None);
    }

    let mut child_node = XmpNode::new(child_name, None, PropertyOptions::new());
    child_node.implicit = true;

    parent.add_child(child_node);

    Ok(Some(parent.children_len() - 1))
}

/// Find or create a qualifier node under a parent node. The name must not
/// carry the leading `?` of the path step.
fn find_qualifier_node(
    parent: &mut XmpNode,
    qual_name: &str,
    create_nodes: bool,
) -> XmpResult<Option<usize>> {
    debug_assert!(!qual_name.starts_with('?'));

    if let Some(index) = parent.find_qualifier_index(qual_name) {
        return Ok(Some(index));
    }

    if !create_nodes {
        return Ok(None);
    }

    let mut qual_node = XmpNode::new(qual_name, None, PropertyOptions::new());
    qual_node.implicit = true;

    parent.add_qualifier(qual_node);

    // xml:lang is kept at the front, so look the position up again
    Ok(parent.find_qualifier_index(qual_name))
}

/// Parses a numeric index step such as `[2]` and returns the 1-based
/// index. When nodes may be created, an index of `size + 1` appends a new
/// item; any larger index is left out of range for the caller to reject.
fn find_indexed_item(array_node: &mut XmpNode, segment: &str, create_nodes: bool) -> XmpResult<usize> {
    let inner = &segment[1..segment.len() - 1];

    let index: usize = inner
        .parse()
        .map_err(|_| XmpError::BadXPath("Array index not digits.".to_string()))?;

    if index < 1 {
        return Err(XmpError::BadXPath(
            "Array index must be larger than zero".to_string(),
        ));
    }

    if create_nodes && index == array_node.children_len() + 1 {
        // append a new last + 1 node
        let mut new_item = XmpNode::new(ARRAY_ITEM_NAME, None, PropertyOptions::new());
        new_item.implicit = true;
        array_node.add_child(new_item);
    }

    Ok(index)
}

/// Searches an array of structs for an item whose named field has the
/// given value. The first match wins. With `create_nodes`, a miss appends
/// a new item with the selector's field pre-set.
fn lookup_field_selector(
    array_node: &mut XmpNode,
    field_name: &str,
    field_value: &str,
    create_nodes: bool,
) -> XmpResult<Option<usize>> {
    for (index, item) in array_node.children().iter().enumerate() {
        if !item.options.is_struct() {
            return Err(XmpError::BadXPath(
                "Field selector must be used on array of struct".to_string(),
            ));
        }

        for field in item.children() {
            if field.name == field_name && field.value.as_deref() == Some(field_value) {
                return Ok(Some(index + 1));
            }
        }
    }

    if !create_nodes {
        return Ok(None);
    }

    let mut options = PropertyOptions::new();
    options.set_struct(true);

    let mut new_item = XmpNode::new(ARRAY_ITEM_NAME, None, options);
    new_item.add_child(XmpNode::leaf(field_name, field_value));

    array_node.add_child(new_item);

    Ok(Some(array_node.children_len()))
}

/// Searches an array for an item carrying a qualifier with the given
/// value. For `xml:lang` the value is compared in normalized form. With
/// `create_nodes`, a miss creates the item with the qualifier pre-set; an
/// `x-default` language item is inserted first, everything else appends.
fn lookup_qual_selector(
    array_node: &mut XmpNode,
    qual_name: &str,
    qual_value: &str,
    create_nodes: bool,
) -> XmpResult<Option<usize>> {
    if qual_name == XML_LANG {
        let normalized_value = normalize_lang_value(qual_value);

        if let Some(index) = lookup_language_item(array_node, &normalized_value)? {
            return Ok(Some(index));
        }

        if !create_nodes {
            return Ok(None);
        }

        let mut lang_item = XmpNode::new(ARRAY_ITEM_NAME, None, PropertyOptions::new());
        lang_item.add_qualifier(XmpNode::leaf(XML_LANG, normalized_value.clone()));

        if normalized_value == X_DEFAULT {
            array_node.add_child_at(1, lang_item);
            Ok(Some(1))
        } else {
            array_node.add_child(lang_item);
            Ok(Some(array_node.children_len()))
        }
    } else {
        for (index, item) in array_node.children().iter().enumerate() {
            for qualifier in item.qualifiers() {
                if qualifier.name == qual_name && qualifier.value.as_deref() == Some(qual_value) {
                    return Ok(Some(index + 1));
                }
            }
        }

        if !create_nodes {
            return Ok(None);
        }

        let mut new_item = XmpNode::new(ARRAY_ITEM_NAME, None, PropertyOptions::new());
        new_item.add_qualifier(XmpNode::leaf(qual_name, qual_value));

        array_node.add_child(new_item);

        Ok(Some(array_node.children_len()))
    }
}

/// After path expansion a step can be of these forms:
///
/// - `qualName` - a top level property or struct field
/// - `[index]` - an element of an array
/// - `[last()]` - the last element of an array
/// - `[qualName="value"]` - an element in an array of structs, chosen by a
///   field value
/// - `[?qualName="value"]` - an element in an array, chosen by a qualifier
///   value
/// - `?qualName` - a general qualifier
///
/// Finds the appropriate child or qualifier, optionally creating it.
fn follow_path_step(
    parent: &mut XmpNode,
    segment_kind: XmpPathStepKind,
    segment_name: &str,
    create_nodes: bool,
) -> XmpResult<Option<ChildSel>> {
    match segment_kind {
        XmpPathStepKind::StructField | XmpPathStepKind::SchemaNode => {
            Ok(find_child_node(parent, segment_name, create_nodes)?.map(ChildSel::Child))
        }
        XmpPathStepKind::Qualifier => {
            Ok(find_qualifier_node(parent, &segment_name[1..], create_nodes)?
                .map(ChildSel::Qualifier))
        }
        _ => {
            // an array indexing step; get the index, then the node
            if !parent.options.is_array() {
                return Err(XmpError::BadXPath(
                    "Indexing applied to non-array".to_string(),
                ));
            }

            let index = match segment_kind {
                XmpPathStepKind::ArrayIndex => {
                    Some(find_indexed_item(parent, segment_name, create_nodes)?)
                }
                XmpPathStepKind::ArrayLast => Some(parent.children_len()),
                XmpPathStepKind::FieldSelector => {
                    let (field_name, field_value) = split_name_and_value(segment_name);
                    lookup_field_selector(parent, &field_name, &field_value, create_nodes)?
                }
                XmpPathStepKind::QualSelector => {
                    let (qual_name, qual_value) = split_name_and_value(segment_name);
                    lookup_qual_selector(parent, &qual_name, &qual_value, create_nodes)?
                }
                _ => {
                    return Err(XmpError::Internal(
                        "Unknown array indexing step".to_string(),
                    ))
                }
            };

            Ok(match index {
                Some(index) if 1 <= index && index <= parent.children_len() => {
                    Some(ChildSel::Child(index - 1))
                }
                _ => None,
            })
        }
    }
}

/// Follow an expanded path to find or create a node, returning its
/// location. Returns `Ok(None)` if the node does not exist (or an
/// intermediate array index is out of range); nodes created on a failed
/// walk are removed again.
pub fn find_node(
    root: &mut XmpNode,
    path: &XmpPath,
    create_nodes: bool,
    leaf_options: Option<PropertyOptions>,
) -> XmpResult<Option<NodeLocation>> {
    if path.is_empty() {
        return Err(XmpError::BadXPath("Empty XMPPath".to_string()));
    }

    let mut location: NodeLocation = Vec::new();
    let mut implicit_root: Option<NodeLocation> = None;

    let Some(schema_index) =
        find_schema_node(root, &path.segment(0).name, None, create_nodes)?
    else {
        return Ok(None);
    };

    location.push(ChildSel::Child(schema_index));

    let schema_node = node_at_mut(root, &location);

    if schema_node.implicit {
        schema_node.implicit = false;
        implicit_root = Some(location.clone());
    }

    match walk_remaining_steps(root, path, create_nodes, &mut location, &mut implicit_root) {
        Ok(true) => {
            if implicit_root.is_some() {
                if let Some(options) = leaf_options {
                    node_at_mut(root, &location).options.merge_with(options);
                }
            }

            Ok(Some(location))
        }
        Ok(false) => {
            if let Some(implicit_location) = implicit_root {
                delete_at(root, &implicit_location);
            }

            Ok(None)
        }
        Err(err) => {
            if let Some(implicit_location) = implicit_root {
                delete_at(root, &implicit_location);
            }

            Err(err)
        }
    }
}

fn walk_remaining_steps(
    root: &mut XmpNode,
    path: &XmpPath,
    create_nodes: bool,
    location: &mut NodeLocation,
    implicit_root: &mut Option<NodeLocation>,
) -> XmpResult<bool> {
    for index in 1..path.len() {
        let segment = path.segment(index);

        let parent = node_at_mut(root, location);
        let Some(sel) = follow_path_step(parent, segment.kind, &segment.name, create_nodes)?
        else {
            return Ok(false);
        };

        location.push(sel);

        let node = node_at_mut(root, location);

        if node.implicit {
            node.implicit = false;

            if index == STEP_ROOT_PROP && segment.is_alias && !segment.alias_form.is_simple() {
                // an array-form alias auto-creates the base array
                node.options.set_option(segment.alias_form.bits(), true);
            } else if index < path.len() - 1
                && segment.kind == XmpPathStepKind::StructField
                && !node.options.is_composite_property()
            {
                node.options.set_struct(true);
            }

            if implicit_root.is_none() {
                *implicit_root = Some(location.clone());
            }
        }
    }

    Ok(true)
}

/// Read-only variant of [`find_node`]: never creates nodes and never
/// mutates the tree.
pub fn lookup_node(root: &XmpNode, path: &XmpPath) -> XmpResult<Option<NodeLocation>> {
    if path.is_empty() {
        return Err(XmpError::BadXPath("Empty XMPPath".to_string()));
    }

    let mut location: NodeLocation = Vec::new();

    let Some(schema_index) = root.find_child_index(&path.segment(0).name) else {
        return Ok(None);
    };

    location.push(ChildSel::Child(schema_index));

    for index in 1..path.len() {
        let segment = path.segment(index);
        let parent = node_at(root, &location);

        let sel = match segment.kind {
            XmpPathStepKind::StructField | XmpPathStepKind::SchemaNode => {
                if !parent.options.is_schema_node() && !parent.options.is_struct() {
                    return Err(XmpError::BadXPath(format!(
                        "Named children only allowed for schemas and structs: {}",
                        segment.name
                    )));
                }

                parent.find_child_index(&segment.name).map(ChildSel::Child)
            }
            XmpPathStepKind::Qualifier => parent
                .find_qualifier_index(&segment.name[1..])
                .map(ChildSel::Qualifier),
            _ => {
                if !parent.options.is_array() {
                    return Err(XmpError::BadXPath(
                        "Indexing applied to non-array".to_string(),
                    ));
                }

                let found = match segment.kind {
                    XmpPathStepKind::ArrayIndex => {
                        let inner = &segment.name[1..segment.name.len() - 1];
                        let index: usize = inner.parse().map_err(|_| {
                            XmpError::BadXPath("Array index not digits.".to_string())
                        })?;

                        if index < 1 {
                            return Err(XmpError::BadXPath(
                                "Array index must be larger than zero".to_string(),
                            ));
                        }

                        Some(index)
                    }
                    XmpPathStepKind::ArrayLast => Some(parent.children_len()),
                    XmpPathStepKind::FieldSelector => {
                        let (field_name, field_value) = split_name_and_value(&segment.name);
                        lookup_field_selector_ref(parent, &field_name, &field_value)?
                    }
                    XmpPathStepKind::QualSelector => {
                        let (qual_name, qual_value) = split_name_and_value(&segment.name);
                        lookup_qual_selector_ref(parent, &qual_name, &qual_value)?
                    }
                    _ => None,
                };

                match found {
                    Some(index) if 1 <= index && index <= parent.children_len() => {
                        Some(ChildSel::Child(index - 1))
                    }
                    _ => None,
                }
            }
        };

        match sel {
            Some(sel) => location.push(sel),
            None => return Ok(None),
        }
    }

    Ok(Some(location))
}

fn lookup_field_selector_ref(
    array_node: &XmpNode,
    field_name: &str,
    field_value: &str,
) -> XmpResult<Option<usize>> {
    for (index, item) in array_node.children().iter().enumerate() {
        if !item.options.is_struct() {
            return Err(XmpError::BadXPath(
                "Field selector must be used on array of struct".to_string(),
            ));
        }

        for field in item.children() {
            if field.name == field_name && field.value.as_deref() == Some(field_value) {
                return Ok(Some(index + 1));
            }
        }
    }

    Ok(None)
}

fn lookup_qual_selector_ref(
    array_node: &XmpNode,
    qual_name: &str,
    qual_value: &str,
) -> XmpResult<Option<usize>> {
    let qual_value = if qual_name == XML_LANG {
        normalize_lang_value(qual_value)
    } else {
        qual_value.to_string()
    };

    for (index, item) in array_node.children().iter().enumerate() {
        for qualifier in item.qualifiers() {
            if qualifier.name == qual_name && qualifier.value.as_deref() == Some(qual_value.as_str())
            {
                return Ok(Some(index + 1));
            }
        }
    }

    Ok(None)
}

/// Sets the value of a leaf node, replacing control characters and
/// normalizing `xml:lang` qualifier values.
pub fn set_node_value(node: &mut XmpNode, value: &str) {
    let clean_value = crate::utils::replace_control_chars_with_space(value);

    if node.options.is_qualifier() && node.name == XML_LANG {
        node.value = Some(normalize_lang_value(&clean_value));
    } else {
        node.value = Some(clean_value);
    }
}

/// Looks for the item with the given (normalized) language in an alt-text
/// array. Returns the 1-based index if found.
pub fn lookup_language_item(array_node: &XmpNode, language: &str) -> XmpResult<Option<usize>> {
    if !array_node.options.is_array() {
        return Err(XmpError::BadXPath(
            "Language item must be used on array".to_string(),
        ));
    }

    for (index, child) in array_node.children().iter().enumerate() {
        if !child.has_qualifiers() || child.qualifier(1).name != XML_LANG {
            continue;
        }

        if child.qualifier(1).value.as_deref() == Some(language) {
            return Ok(Some(index + 1));
        }
    }

    Ok(None)
}

/// Appends a language item to an alt-text array; an `x-default` item goes
/// to the front.
pub fn append_lang_item(array_node: &mut XmpNode, item_lang: &str, item_value: &str) {
    let mut new_item = XmpNode::leaf(ARRAY_ITEM_NAME, item_value);
    let lang_qual = XmpNode::leaf(XML_LANG, normalize_lang_value(item_lang));

    let is_x_default = lang_qual.value.as_deref() == Some(X_DEFAULT);
    new_item.add_qualifier(lang_qual);

    if is_x_default {
        array_node.add_child_at(1, new_item);
    } else {
        array_node.add_child(new_item);
    }
}

/// Make sure the `x-default` item of an alt-text array is first. Touch up
/// "single value" arrays that have a default plus one real language: both
/// items should carry the same value, since older writers only ever read
/// the `x-default` item.
pub fn normalize_lang_array(array_node: &mut XmpNode) {
    if !array_node.options.is_array_alt_text() {
        return;
    }

    for index in 2..=array_node.children_len() {
        let child = array_node.child(index);

        if child.has_qualifiers() && child.qualifier(1).value.as_deref() == Some(X_DEFAULT) {
            let moved = array_node.remove_child(index);
            let moved_value = moved.value.clone();

            array_node.add_child_at(1, moved);

            if index == 2 {
                array_node.child_mut(2).value = moved_value;
            }

            break;
        }
    }
}

/// See if an `rdf:Alt` array is an alt-text array; if so, flag it and make
/// sure the `x-default` item is first.
pub fn detect_alt_text(array_node: &mut XmpNode) {
    if array_node.options.is_array_alternate() && array_node.has_children() {
        let is_alt_text = array_node
            .children()
            .iter()
            .any(|child| child.options.has_language());

        if is_alt_text {
            array_node.options.set_array_alt_text(true);
            normalize_lang_array(array_node);
        }
    }
}

/// Choose the best fitting item of an alt-text array:
///
/// 1. Look for an exact match with the specific language.
/// 2. If a generic language is given, look for partial matches.
/// 3. Look for an `x-default` item.
/// 4. Choose the first item.
///
/// Returns the result class and the 1-based index of the chosen item.
pub fn choose_localized_text(
    array_node: &XmpNode,
    generic_lang: Option<&str>,
    specific_lang: &str,
) -> XmpResult<(LocalizedTextResult, Option<usize>)> {
    if !array_node.options.is_array_alt_text() {
        return Err(XmpError::BadXPath(
            "Localized text array is not alt-text".to_string(),
        ));
    }

    if !array_node.has_children() {
        return Ok((LocalizedTextResult::NoValues, None));
    }

    let mut found_generic_matches = 0;
    let mut result_index = None;
    let mut x_default_index = None;

    for (index, item) in array_node.children().iter().enumerate() {
        if item.options.is_composite_property() {
            return Err(XmpError::BadXPath(
                "Alt-text array item is not simple".to_string(),
            ));
        }

        if !item.has_qualifiers() || item.qualifier(1).name != XML_LANG {
            return Err(XmpError::BadXPath(
                "Alt-text array item has no language qualifier".to_string(),
            ));
        }

        let current_lang = item.qualifier(1).value.as_deref().unwrap_or_default();

        if current_lang == specific_lang {
            return Ok((LocalizedTextResult::SpecificMatch, Some(index + 1)));
        }

        if let Some(generic) = generic_lang {
            if current_lang.starts_with(generic) {
                if result_index.is_none() {
                    result_index = Some(index + 1);
                }

                // keep looking for other matches
                found_generic_matches += 1;
                continue;
            }
        }

        if current_lang == X_DEFAULT {
            x_default_index = Some(index + 1);
        }
    }

    Ok(match found_generic_matches {
        1 => (LocalizedTextResult::SingleGeneric, result_index),
        n if n > 1 => (LocalizedTextResult::MultipleGeneric, result_index),
        _ => match x_default_index {
            Some(index) => (LocalizedTextResult::XDefault, Some(index)),
            None => (LocalizedTextResult::FirstItem, Some(1)),
        },
    })
}
