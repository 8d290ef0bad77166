//! Property iteration
//!
//! Walks the property tree with an explicit stack (no recursion, so
//! deeply nested input cannot exhaust the native stack) and yields one
//! [`XmpPropertyInfo`] per visited node. The traversal is pre-order:
//! a node first, then its qualifiers, then its children.

use crate::core::error::{XmpError, XmpResult};
use crate::core::metadata::XmpMeta;
use crate::core::navigator::{lookup_node, node_at};
use crate::core::node::XmpNode;
use crate::core::options::IteratorOptions;
use crate::core::registry;
use crate::core::xpath::expand_path;

/// One property reported by the iterator.
#[derive(Debug, Clone, PartialEq)]
pub struct XmpPropertyInfo {
    /// The schema namespace URI the property belongs to.
    pub namespace: String,
    /// The path of the property, relative to the schema.
    pub path: String,
    /// The value, absent on composite nodes and schema nodes.
    pub value: Option<String>,
    /// The option flags of the node.
    pub options: crate::core::options::PropertyOptions,
}

/// Iterator over the properties of an [`XmpMeta`] object.
pub struct XmpIterator {
    items: std::vec::IntoIter<XmpPropertyInfo>,
}

impl XmpIterator {
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new().into_iter(),
        }
    }
}

impl Iterator for XmpIterator {
    type Item = XmpPropertyInfo;

    fn next(&mut self) -> Option<XmpPropertyInfo> {
        self.items.next()
    }
}

/// Creates an iterator for the given start point: the whole tree, one
/// schema, or the subtree below a property path.
pub(crate) fn iterate(
    meta: &XmpMeta,
    schema_ns: Option<&str>,
    prop_name: Option<&str>,
    options: IteratorOptions,
) -> XmpResult<XmpIterator> {
    let root = meta.root();

    let mut items = Vec::new();

    match (schema_ns, prop_name) {
        (None, None) => {
            for schema in root.children() {
                collect_schema(schema, &options, &mut items);
            }
        }
        (Some(schema_ns), None) => {
            if let Some(schema) = root.find_child_by_name(schema_ns) {
                collect_schema(schema, &options, &mut items);
            }

            if options.include_aliases {
                collect_aliases(root, schema_ns, &mut items);
            }
        }
        (Some(schema_ns), Some(prop_name)) => {
            let path = expand_path(schema_ns, prop_name)?;

            if let Some(location) = lookup_node(root, &path)? {
                let base_node = node_at(root, &location);
                let base_path = path.segment(1).name.clone();

                collect_subtree(base_node, schema_ns, base_path, &options, &mut items);
            }
        }
        (None, Some(_)) => {
            return Err(XmpError::BadParam(
                "Property iteration requires a schema namespace".to_string(),
            ));
        }
    }

    Ok(XmpIterator {
        items: items.into_iter(),
    })
}

/// Collects a schema node and its properties.
fn collect_schema(schema: &XmpNode, options: &IteratorOptions, items: &mut Vec<XmpPropertyInfo>) {
    if !options.just_leaf_nodes {
        items.push(XmpPropertyInfo {
            namespace: schema.name.clone(),
            path: String::new(),
            value: None,
            options: schema.options,
        });
    }

    if options.just_children {
        for child in schema.children() {
            items.push(property_info(child, &schema.name, &child.name, options));
        }

        return;
    }

    for child in schema.children() {
        collect_subtree(child, &schema.name, child.name.clone(), options, items);
    }
}

/// Collects the subtree below a node using an explicit work stack.
fn collect_subtree(
    base_node: &XmpNode,
    namespace: &str,
    base_path: String,
    options: &IteratorOptions,
    items: &mut Vec<XmpPropertyInfo>,
) {
    if options.just_children {
        items.push(property_info(base_node, namespace, &base_path, options));

        for (index, child) in base_node.children().iter().enumerate() {
            let path = child_path(base_node, &base_path, child, index);
            items.push(property_info(child, namespace, &path, options));
        }

        return;
    }

    let mut stack: Vec<(&XmpNode, String)> = vec![(base_node, base_path)];

    while let Some((node, path)) = stack.pop() {
        let is_leaf = !node.options.is_composite_property();

        if !options.just_leaf_nodes || is_leaf {
            items.push(property_info(node, namespace, &path, options));
        }

        // children pushed in reverse so they pop in document order;
        // qualifiers pushed last so they are visited directly after the
        // node itself
        for (index, child) in node.children().iter().enumerate().rev() {
            let next_path = child_path(node, &path, child, index);
            stack.push((child, next_path));
        }

        if !options.omit_qualifiers {
            for qualifier in node.qualifiers().iter().rev() {
                let qual_path = format!("{}/?{}", path, qualifier.name);
                stack.push((qualifier, qual_path));
            }
        }
    }
}

fn child_path(parent: &XmpNode, parent_path: &str, child: &XmpNode, index: usize) -> String {
    if parent.options.is_array() {
        format!("{}[{}]", parent_path, index + 1)
    } else if parent_path.is_empty() {
        child.name.clone()
    } else {
        format!("{}/{}", parent_path, child.name)
    }
}

fn property_info(
    node: &XmpNode,
    namespace: &str,
    path: &str,
    options: &IteratorOptions,
) -> XmpPropertyInfo {
    let path = if options.just_leaf_name {
        match path.rfind(['/', '[']) {
            Some(pos) if path.as_bytes()[pos] == b'[' => path[pos..].to_string(),
            Some(pos) => path[pos + 1..].to_string(),
            None => path.to_string(),
        }
    } else {
        path.to_string()
    };

    XmpPropertyInfo {
        namespace: namespace.to_string(),
        path,
        value: node.value.clone(),
        options: node.options,
    }
}

/// Reports registered aliases of the given namespace whose base property
/// exists, reading through to the base location.
fn collect_aliases(root: &XmpNode, alias_ns: &str, items: &mut Vec<XmpPropertyInfo>) {
    for (qname, _info) in registry::find_aliases(alias_ns) {
        let Some(alias_name) = qname.split(':').nth(1) else {
            continue;
        };

        let Ok(path) = expand_path(alias_ns, alias_name) else {
            continue;
        };

        let Ok(Some(location)) = lookup_node(root, &path) else {
            continue;
        };

        let node = node_at(root, &location);

        items.push(XmpPropertyInfo {
            namespace: alias_ns.to_string(),
            path: alias_name.to_string(),
            value: node.value.clone(),
            options: node.options,
        });
    }
}
