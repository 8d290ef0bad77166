//! The XMP property tree node
//!
//! A node can be a schema node, a property node, an array node, an array
//! item, a struct node or a qualifier node (without the `?`). The kind is
//! carried in the node's [`PropertyOptions`]; children and qualifiers are
//! exclusively owned, ordered lists. Within the qualifiers `xml:lang` is
//! always kept first and `rdf:type` directly after it.

use crate::core::constants::{ARRAY_ITEM_NAME, RDF_TYPE, XML_LANG};
use crate::core::options::PropertyOptions;
use std::cmp::Ordering;

/// A node in the XMP tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpNode {
    /// Name of the node: a qualified name for properties and qualifiers,
    /// the namespace URI for schema nodes, `[]` for array items.
    pub name: String,
    /// Value of the node: present on leaves (and holding the registered
    /// prefix on schema nodes), absent on composite nodes.
    pub value: Option<String>,
    /// Options describing the kind of the node.
    pub options: PropertyOptions,

    children: Vec<XmpNode>,
    qualifiers: Vec<XmpNode>,

    /// The node was created as a side effect of a "create missing steps"
    /// walk and has not been committed yet.
    pub(crate) implicit: bool,
    /// Some direct child of this schema node (or some schema below this
    /// root) is an alias.
    pub(crate) has_aliases: bool,
    /// The node itself is an alias.
    pub(crate) is_alias: bool,
    /// The node holds an implicit `rdf:value` child.
    pub(crate) has_value_child: bool,
}

impl XmpNode {
    /// Create a node with the given name, value and options.
    pub fn new(name: impl Into<String>, value: Option<String>, options: PropertyOptions) -> Self {
        Self {
            name: name.into(),
            value,
            options,
            ..Self::default()
        }
    }

    /// Create a simple leaf node.
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Some(value.into()), PropertyOptions::new())
    }

    /// The children of this node in document order.
    pub fn children(&self) -> &[XmpNode] {
        &self.children
    }

    /// Mutable access to the children of this node.
    pub fn children_mut(&mut self) -> &mut Vec<XmpNode> {
        &mut self.children
    }

    /// The child at the given 1-based index.
    pub fn child(&self, index: usize) -> &XmpNode {
        &self.children[index - 1]
    }

    /// Mutable child at the given 1-based index.
    pub fn child_mut(&mut self, index: usize) -> &mut XmpNode {
        &mut self.children[index - 1]
    }

    pub fn children_len(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Appends a child. Doubled names are ignored, except for array items
    /// which all share the `[]` name.
    pub fn add_child(&mut self, node: XmpNode) {
        if self.child_exists(&node.name) {
            return;
        }

        self.children.push(node);
    }

    /// Inserts a child at the given 1-based index. Doubled names are
    /// ignored.
    pub fn add_child_at(&mut self, index: usize, node: XmpNode) {
        if self.child_exists(&node.name) {
            return;
        }

        self.children.insert(index - 1, node);
    }

    /// Replaces the child at the given 1-based index.
    pub fn replace_child(&mut self, index: usize, node: XmpNode) {
        self.children[index - 1] = node;
    }

    /// Removes and returns the child at the given 1-based index.
    pub fn remove_child(&mut self, index: usize) -> XmpNode {
        self.children.remove(index - 1)
    }

    /// Removes all children from the node.
    pub fn remove_children(&mut self) {
        self.children.clear();
    }

    /// The 0-based position of the first child with the given name.
    pub fn find_child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|child| child.name == name)
    }

    pub fn find_child_by_name(&self, name: &str) -> Option<&XmpNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn find_child_by_name_mut(&mut self, name: &str) -> Option<&mut XmpNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// The qualifiers of this node; `xml:lang` first when present.
    pub fn qualifiers(&self) -> &[XmpNode] {
        &self.qualifiers
    }

    /// The qualifier at the given 1-based index.
    pub fn qualifier(&self, index: usize) -> &XmpNode {
        &self.qualifiers[index - 1]
    }

    /// Mutable qualifier at the given 1-based index.
    pub fn qualifier_mut(&mut self, index: usize) -> &mut XmpNode {
        &mut self.qualifiers[index - 1]
    }

    pub fn qualifiers_len(&self) -> usize {
        self.qualifiers.len()
    }

    pub fn has_qualifiers(&self) -> bool {
        !self.qualifiers.is_empty()
    }

    /// Attaches a qualifier, maintaining the ordering constraints:
    /// `xml:lang` is always first, `rdf:type` first or directly after
    /// `xml:lang`, everything else is appended. Doubled qualifier names
    /// are ignored.
    pub fn add_qualifier(&mut self, mut qual_node: XmpNode) {
        if self.qualifier_exists(&qual_node.name) {
            return;
        }

        qual_node.options.set_qualifier(true);
        self.options.set_has_qualifiers(true);

        if qual_node.name == XML_LANG {
            self.options.set_has_language(true);
            self.qualifiers.insert(0, qual_node);
        } else if qual_node.name == RDF_TYPE {
            self.options.set_has_type(true);
            let index = usize::from(self.options.has_language());
            self.qualifiers.insert(index, qual_node);
        } else {
            self.qualifiers.push(qual_node);
        }
    }

    /// Removes and returns the qualifier at the given 1-based index,
    /// fixing the option flags.
    pub fn remove_qualifier(&mut self, index: usize) -> XmpNode {
        let qual_node = self.qualifiers.remove(index - 1);

        if qual_node.name == XML_LANG {
            self.options.set_has_language(false);
        } else if qual_node.name == RDF_TYPE {
            self.options.set_has_type(false);
        }

        if self.qualifiers.is_empty() {
            self.options.set_has_qualifiers(false);
        }

        qual_node
    }

    /// Removes all qualifiers from the node and clears the related flags.
    pub fn remove_qualifiers(&mut self) {
        self.options
            .set_has_qualifiers(false)
            .set_has_language(false)
            .set_has_type(false);

        self.qualifiers.clear();
    }

    /// The 0-based position of the first qualifier with the given name.
    pub fn find_qualifier_index(&self, name: &str) -> Option<usize> {
        self.qualifiers.iter().position(|qual| qual.name == name)
    }

    pub fn find_qualifier_by_name(&self, name: &str) -> Option<&XmpNode> {
        self.qualifiers.iter().find(|qual| qual.name == name)
    }

    pub fn find_qualifier_by_name_mut(&mut self, name: &str) -> Option<&mut XmpNode> {
        self.qualifiers.iter_mut().find(|qual| qual.name == name)
    }

    /// Sorts the complete data model according to the following rules:
    ///
    /// - Nodes at one level are sorted by name, schema nodes by prefix.
    /// - Children and qualifiers are sorted recursively.
    /// - Arrays keep their item order.
    /// - Within qualifiers `xml:lang` and/or `rdf:type` stay at the top in
    ///   that order, all others are sorted.
    pub fn sort(&mut self) {
        if self.has_qualifiers() {
            let mut sort_from = 0;

            while sort_from < self.qualifiers.len()
                && (self.qualifiers[sort_from].name == XML_LANG
                    || self.qualifiers[sort_from].name == RDF_TYPE)
            {
                sort_from += 1;
            }

            self.qualifiers[sort_from..].sort_by(compare_nodes);

            for qual in &mut self.qualifiers {
                qual.sort();
            }
        }

        if self.has_children() {
            if !self.options.is_array() {
                self.children.sort_by(compare_nodes);
            }

            for child in &mut self.children {
                child.sort();
            }
        }
    }

    fn child_exists(&self, child_name: &str) -> bool {
        child_name != ARRAY_ITEM_NAME && self.find_child_by_name(child_name).is_some()
    }

    fn qualifier_exists(&self, qual_name: &str) -> bool {
        qual_name != ARRAY_ITEM_NAME && self.find_qualifier_by_name(qual_name).is_some()
    }
}

/// Schema nodes compare by their value (the prefix), all others by name.
fn compare_nodes(a: &XmpNode, b: &XmpNode) -> Ordering {
    if a.options.is_schema_node() {
        a.value.cmp(&b.value)
    } else {
        a.name.cmp(&b.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::X_DEFAULT;

    #[test]
    fn test_add_and_find_children() {
        let mut node = XmpNode::default();
        node.add_child(XmpNode::leaf("dc:format", "image/jpeg"));
        node.add_child(XmpNode::leaf("dc:identifier", "id1"));

        assert_eq!(node.children_len(), 2);
        assert_eq!(node.child(1).name, "dc:format");
        assert_eq!(node.find_child_index("dc:identifier"), Some(1));

        // doubled names are ignored
        node.add_child(XmpNode::leaf("dc:format", "other"));
        assert_eq!(node.children_len(), 2);
        assert_eq!(node.child(1).value.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_array_items_share_name() {
        let mut array = XmpNode::default();
        array.options.set_array(true);

        array.add_child(XmpNode::leaf(ARRAY_ITEM_NAME, "one"));
        array.add_child(XmpNode::leaf(ARRAY_ITEM_NAME, "two"));
        assert_eq!(array.children_len(), 2);
    }

    #[test]
    fn test_qualifier_ordering() {
        let mut node = XmpNode::leaf("dc:title", "Hello");

        node.add_qualifier(XmpNode::leaf("ns:custom", "q"));
        node.add_qualifier(XmpNode::leaf(RDF_TYPE, "some:Type"));
        node.add_qualifier(XmpNode::leaf(XML_LANG, X_DEFAULT));

        assert_eq!(node.qualifier(1).name, XML_LANG);
        assert_eq!(node.qualifier(2).name, RDF_TYPE);
        assert_eq!(node.qualifier(3).name, "ns:custom");

        assert!(node.options.has_qualifiers());
        assert!(node.options.has_language());
        assert!(node.options.has_type());
        assert!(node.qualifier(1).options.is_qualifier());
    }

    #[test]
    fn test_remove_qualifier_fixes_flags() {
        let mut node = XmpNode::leaf("dc:title", "Hello");
        node.add_qualifier(XmpNode::leaf(XML_LANG, "en"));

        let removed = node.remove_qualifier(1);
        assert_eq!(removed.name, XML_LANG);
        assert!(!node.options.has_language());
        assert!(!node.options.has_qualifiers());
    }

    #[test]
    fn test_sort_pins_lang_and_type() {
        let mut node = XmpNode::leaf("dc:title", "Hello");
        node.add_qualifier(XmpNode::leaf("z:last", "z"));
        node.add_qualifier(XmpNode::leaf("a:first", "a"));
        node.add_qualifier(XmpNode::leaf(XML_LANG, "en"));

        node.sort();

        assert_eq!(node.qualifier(1).name, XML_LANG);
        assert_eq!(node.qualifier(2).name, "a:first");
        assert_eq!(node.qualifier(3).name, "z:last");
    }

    #[test]
    fn test_sort_keeps_array_order() {
        let mut array = XmpNode::default();
        array.options.set_array(true).set_array_ordered(true);
        array.add_child(XmpNode::leaf(ARRAY_ITEM_NAME, "z"));
        array.add_child(XmpNode::leaf(ARRAY_ITEM_NAME, "a"));

        array.sort();

        assert_eq!(array.child(1).value.as_deref(), Some("z"));
        assert_eq!(array.child(2).value.as_deref(), Some("a"));
    }
}
