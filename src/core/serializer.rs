//! RDF/XML writer
//!
//! Serializes a property tree using the standard RDF serialization
//! format, in one of two byte-stable output modes: compact form collapses
//! unqualified simple leaves into XML attributes on the enclosing
//! `rdf:Description`, canonical form uses element form for every
//! property. Namespace prefixes used in the output are declared once on
//! the `rdf:Description` element.

use crate::core::constants::{ARRAY_ITEM_NAME, XML_LANG};
use crate::core::error::{XmpError, XmpResult};
use crate::core::navigator::normalize_lang_array;
use crate::core::node::XmpNode;
use crate::core::options::SerializeOptions;
use crate::core::registry;
use crate::utils::escape_xml;
use std::collections::HashSet;

/// linefeed (U+000A) is the standard XML line terminator. XMP defaults to it.
const XMP_DEFAULT_NEWLINE: &str = "\n";

/// Two ASCII spaces (U+0020) are the default indent for XMP files.
const XMP_DEFAULT_INDENT: &str = "  ";

const PACKET_HEADER: &str =
    "<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";

/// The w/r mode character goes in between.
const PACKET_TRAILER: &str = "<?xpacket end=\"";

const PACKET_TRAILER2: &str = "\"?>";

const RDF_XMPMETA_START: &str = "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\" x:xmptk=\"";

const RDF_XMPMETA_END: &str = "</x:xmpmeta>";

const RDF_RDF_START: &str =
    "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">";

const RDF_RDF_END: &str = "</rdf:RDF>";

const RDF_SCHEMA_START: &str = "<rdf:Description rdf:about=";

const RDF_SCHEMA_END: &str = "</rdf:Description>";

const RDF_STRUCT_START: &str = "<rdf:Description";

const RDF_STRUCT_END: &str = "</rdf:Description>";

const RDF_EMPTY_STRUCT: &str = "<rdf:Description/>";

/// The toolkit name written into the `x:xmptk` attribute.
const XMP_TOOLKIT_VERSION: &str = concat!("xmpcore ", env!("CARGO_PKG_VERSION"));

/// The qualifiers that are written as XML attributes of a property
/// element rather than forcing the qualified property form.
const RDF_ATTR_QUALIFIER: [&str; 5] =
    [XML_LANG, "rdf:resource", "rdf:ID", "rdf:bagID", "rdf:nodeID"];

/// Serializes a property tree according to the options. The tree itself
/// is left untouched; alt-text reordering and the optional sort are
/// applied to a working copy.
pub fn serialize(tree_root: &XmpNode, options: &SerializeOptions) -> XmpResult<String> {
    let mut root = tree_root.clone();

    normalize_alt_arrays(&mut root);

    if options.sort {
        root.sort();
    }

    let writer = RdfWriter {
        root: &root,
        options,
    };

    writer.serialize()
}

/// Alt-text arrays must serialize with their `x-default` item first in
/// either output mode.
fn normalize_alt_arrays(node: &mut XmpNode) {
    if node.options.is_array_alt_text() {
        normalize_lang_array(node);
    }

    for child in node.children_mut() {
        normalize_alt_arrays(child);
    }

    for index in 1..=node.qualifiers_len() {
        normalize_alt_arrays(node.qualifier_mut(index));
    }
}

struct RdfWriter<'a> {
    root: &'a XmpNode,
    options: &'a SerializeOptions,
}

impl RdfWriter<'_> {
    fn serialize(&self) -> XmpResult<String> {
        let mut sb = String::new();

        self.serialize_as_rdf(&mut sb)?;

        Ok(sb)
    }

    /// Writes the (optional) packet header and the outer rdf tags.
    fn serialize_as_rdf(&self, sb: &mut String) -> XmpResult<()> {
        let mut level = 0;

        if !self.options.omit_packet_wrapper {
            write_indent(sb, level);
            sb.push_str(PACKET_HEADER);
            sb.push_str(XMP_DEFAULT_NEWLINE);
        }

        if !self.options.omit_xmp_meta_element {
            write_indent(sb, level);
            sb.push_str(RDF_XMPMETA_START);
            sb.push_str(XMP_TOOLKIT_VERSION);
            sb.push_str("\">");
            sb.push_str(XMP_DEFAULT_NEWLINE);

            level += 1;
        }

        write_indent(sb, level);
        sb.push_str(RDF_RDF_START);
        sb.push_str(XMP_DEFAULT_NEWLINE);

        if self.options.use_canonical_format {
            self.serialize_canonical_rdf_schemas(sb, level)?;
        } else {
            self.serialize_compact_rdf_schemas(sb, level)?;
        }

        write_indent(sb, level);
        sb.push_str(RDF_RDF_END);
        sb.push_str(XMP_DEFAULT_NEWLINE);

        if !self.options.omit_xmp_meta_element {
            level -= 1;

            write_indent(sb, level);
            sb.push_str(RDF_XMPMETA_END);
            sb.push_str(XMP_DEFAULT_NEWLINE);
        }

        if !self.options.omit_packet_wrapper {
            sb.push_str(PACKET_TRAILER);
            sb.push(if self.options.read_only_packet { 'r' } else { 'w' });
            sb.push_str(PACKET_TRAILER2);
        }

        Ok(())
    }

    fn write_tree_name(&self, sb: &mut String) {
        sb.push('"');
        append_node_value(sb, &self.root.name, true);
        sb.push('"');
    }

    /// Serializes the metadata in pretty-printed manner: a single
    /// rdf:Description with one property element per property.
    fn serialize_canonical_rdf_schemas(&self, sb: &mut String, level: usize) -> XmpResult<()> {
        if self.root.has_children() {
            self.start_outer_rdf_description(sb, level);

            for schema in self.root.children() {
                for prop_node in schema.children() {
                    self.serialize_canonical_rdf_property(sb, prop_node, true, false, level + 2)?;
                }
            }

            self.end_outer_rdf_description(sb, level);
        } else {
            // special case an empty XMP object
            write_indent(sb, level + 1);
            sb.push_str(RDF_SCHEMA_START);
            self.write_tree_name(sb);
            sb.push_str("/>");
            sb.push_str(XMP_DEFAULT_NEWLINE);
        }

        Ok(())
    }

    /// Serializes the metadata in compact manner: simple unqualified
    /// properties become attributes of the rdf:Description element.
    fn serialize_compact_rdf_schemas(&self, sb: &mut String, level: usize) -> XmpResult<()> {
        write_indent(sb, level + 1);
        sb.push_str(RDF_SCHEMA_START);
        self.write_tree_name(sb);

        // write all necessary xmlns attributes
        let mut used_prefixes: HashSet<String> = HashSet::new();
        used_prefixes.insert("xml".to_string());
        used_prefixes.insert("rdf".to_string());

        for schema in self.root.children() {
            declare_used_namespaces(sb, schema, &mut used_prefixes, level + 3);
        }

        // write the top level attribute properties
        let mut all_are_attrs = true;

        for schema in self.root.children() {
            all_are_attrs &= serialize_compact_rdf_attr_props(sb, schema, level + 2);
        }

        if all_are_attrs {
            sb.push_str("/>");
            sb.push_str(XMP_DEFAULT_NEWLINE);
            // done if all properties in all schemas are attributes
            return Ok(());
        }

        sb.push('>');
        sb.push_str(XMP_DEFAULT_NEWLINE);

        // write the remaining properties for each schema
        for schema in self.root.children() {
            self.serialize_compact_rdf_element_props(sb, schema, level + 2)?;
        }

        write_indent(sb, level + 1);
        sb.push_str(RDF_SCHEMA_END);
        sb.push_str(XMP_DEFAULT_NEWLINE);

        Ok(())
    }

    /// Recursively handles the value of a node that must be written as an
    /// RDF property element in compact mode. It does not matter if it is
    /// a top level property, a field of a struct, or an item of an array.
    fn serialize_compact_rdf_element_props(
        &self,
        sb: &mut String,
        parent_node: &XmpNode,
        indent: usize,
    ) -> XmpResult<()> {
        for node in parent_node.children() {
            if can_be_rdf_attr_prop(node) {
                continue;
            }

            let mut emit_end_tag = true;
            let mut indent_end_tag = true;

            let elem_name = if node.name == ARRAY_ITEM_NAME {
                "rdf:li"
            } else {
                node.name.as_str()
            };

            write_indent(sb, indent);
            sb.push('<');
            sb.push_str(elem_name);

            // Look over the qualifiers to decide on "normal" versus
            // "rdf:value" form; emit the attribute qualifiers here.
            let mut has_general_qualifiers = false;
            let mut has_rdf_resource_qual = false;

            for qualifier in node.qualifiers() {
                if !RDF_ATTR_QUALIFIER.contains(&qualifier.name.as_str()) {
                    has_general_qualifiers = true;
                } else {
                    has_rdf_resource_qual |= qualifier.name == "rdf:resource";
                    sb.push(' ');
                    sb.push_str(&qualifier.name);
                    sb.push_str("=\"");
                    append_node_value(sb, qualifier.value.as_deref().unwrap_or_default(), true);
                    sb.push('"');
                }
            }

            if has_general_qualifiers {
                self.serialize_compact_rdf_general_qualifier(sb, indent, node)?;
            } else if !node.options.is_composite_property() {
                let (emit, indent_end) = serialize_compact_rdf_simple_prop(sb, node);
                emit_end_tag = emit;
                indent_end_tag = indent_end;
            } else if node.options.is_array() {
                self.serialize_compact_rdf_array_prop(sb, node, indent)?;
            } else {
                emit_end_tag =
                    self.serialize_compact_rdf_struct_prop(sb, node, indent, has_rdf_resource_qual)?;
            }

            if emit_end_tag {
                if indent_end_tag {
                    write_indent(sb, indent);
                }

                sb.push_str("</");
                sb.push_str(elem_name);
                sb.push('>');
                sb.push_str(XMP_DEFAULT_NEWLINE);
            }
        }

        Ok(())
    }

    /// Serializes an array property in compact mode.
    fn serialize_compact_rdf_array_prop(
        &self,
        sb: &mut String,
        node: &XmpNode,
        indent: usize,
    ) -> XmpResult<()> {
        sb.push('>');
        sb.push_str(XMP_DEFAULT_NEWLINE);

        emit_rdf_array_tag(sb, node, true, indent + 1);
        self.serialize_compact_rdf_element_props(sb, node, indent + 2)?;
        emit_rdf_array_tag(sb, node, false, indent + 1);

        Ok(())
    }

    /// Serializes a struct property in compact mode, choosing between the
    /// empty element, attribute-only, element-only and mixed forms.
    fn serialize_compact_rdf_struct_prop(
        &self,
        sb: &mut String,
        node: &XmpNode,
        indent: usize,
        has_rdf_resource_qual: bool,
    ) -> XmpResult<bool> {
        let mut has_attr_fields = false;
        let mut has_elem_fields = false;

        for field in node.children() {
            if can_be_rdf_attr_prop(field) {
                has_attr_fields = true;
            } else {
                has_elem_fields = true;
            }

            if has_attr_fields && has_elem_fields {
                break;
            }
        }

        if has_rdf_resource_qual && has_elem_fields {
            return Err(XmpError::BadRdf(
                "Can't mix rdf:resource qualifier and element fields".to_string(),
            ));
        }

        if !node.has_children() {
            // An empty struct as a special case; an empty XML element
            // would get reparsed as a simple property with an empty
            // value.
            sb.push_str(" rdf:parseType=\"Resource\"/>");
            sb.push_str(XMP_DEFAULT_NEWLINE);
            return Ok(false);
        }

        if !has_elem_fields {
            // all fields can be attributes, use the emptyPropertyElt form
            serialize_compact_rdf_attr_props(sb, node, indent + 1);
            sb.push_str("/>");
            sb.push_str(XMP_DEFAULT_NEWLINE);
            return Ok(false);
        }

        if !has_attr_fields {
            // all fields must be elements, use parseType="Resource"
            sb.push_str(" rdf:parseType=\"Resource\">");
            sb.push_str(XMP_DEFAULT_NEWLINE);
            self.serialize_compact_rdf_element_props(sb, node, indent + 1)?;
            return Ok(true);
        }

        // a mix of attributes and elements, use an inner rdf:Description
        sb.push('>');
        sb.push_str(XMP_DEFAULT_NEWLINE);
        write_indent(sb, indent + 1);
        sb.push_str(RDF_STRUCT_START);
        serialize_compact_rdf_attr_props(sb, node, indent + 2);
        sb.push('>');
        sb.push_str(XMP_DEFAULT_NEWLINE);
        self.serialize_compact_rdf_element_props(sb, node, indent + 1)?;
        write_indent(sb, indent + 1);
        sb.push_str(RDF_STRUCT_END);
        sb.push_str(XMP_DEFAULT_NEWLINE);

        Ok(true)
    }

    /// The node has general qualifiers, ones that can't be attributes on
    /// a property element. Emit using the qualified property
    /// pseudo-struct form.
    fn serialize_compact_rdf_general_qualifier(
        &self,
        sb: &mut String,
        indent: usize,
        node: &XmpNode,
    ) -> XmpResult<()> {
        sb.push_str(" rdf:parseType=\"Resource\">");
        sb.push_str(XMP_DEFAULT_NEWLINE);

        self.serialize_canonical_rdf_property(sb, node, false, true, indent + 1)?;

        for qualifier in node.qualifiers() {
            self.serialize_canonical_rdf_property(sb, qualifier, false, false, indent + 1)?;
        }

        Ok(())
    }

    /// Start the outer rdf:Description element, including all needed
    /// xmlns attributes.
    fn start_outer_rdf_description(&self, sb: &mut String, level: usize) {
        write_indent(sb, level + 1);
        sb.push_str(RDF_SCHEMA_START);
        self.write_tree_name(sb);

        let mut used_prefixes: HashSet<String> = HashSet::new();
        used_prefixes.insert("xml".to_string());
        used_prefixes.insert("rdf".to_string());

        declare_used_namespaces(sb, self.root, &mut used_prefixes, level + 3);

        sb.push('>');
        sb.push_str(XMP_DEFAULT_NEWLINE);
    }

    fn end_outer_rdf_description(&self, sb: &mut String, level: usize) {
        write_indent(sb, level + 1);
        sb.push_str(RDF_SCHEMA_END);
        sb.push_str(XMP_DEFAULT_NEWLINE);
    }

    /// Recursively handles the value of a node as a property element. An
    /// xml:lang qualifier is written as an attribute of the property
    /// start tag, not by itself forcing the qualified property form.
    ///
    /// `emit_as_rdf_value` renders the node as `rdf:value` element;
    /// `use_canonical_rdf` selects the inner rdf:Description form over
    /// `rdf:parseType="Resource"`.
    fn serialize_canonical_rdf_property(
        &self,
        sb: &mut String,
        node: &XmpNode,
        use_canonical_rdf: bool,
        emit_as_rdf_value: bool,
        indent: usize,
    ) -> XmpResult<()> {
        let mut actual_indent = indent;
        let mut emit_end_tag = true;
        let mut indent_end_tag = true;

        let elem_name = if emit_as_rdf_value {
            "rdf:value"
        } else if node.name == ARRAY_ITEM_NAME {
            "rdf:li"
        } else {
            node.name.as_str()
        };

        write_indent(sb, actual_indent);
        sb.push('<');
        sb.push_str(elem_name);

        let mut has_general_qualifiers = false;
        let mut has_rdf_resource_qual = false;

        for qualifier in node.qualifiers() {
            if !RDF_ATTR_QUALIFIER.contains(&qualifier.name.as_str()) {
                has_general_qualifiers = true;
            } else {
                has_rdf_resource_qual |= qualifier.name == "rdf:resource";

                if !emit_as_rdf_value {
                    sb.push(' ');
                    sb.push_str(&qualifier.name);
                    sb.push_str("=\"");
                    append_node_value(sb, qualifier.value.as_deref().unwrap_or_default(), true);
                    sb.push('"');
                }
            }
        }

        if has_general_qualifiers && !emit_as_rdf_value {
            // This node has general, non-attribute, qualifiers. Emit
            // using the qualified property form; the value is output by
            // a recursive call on the same node with emit_as_rdf_value
            // set.
            if has_rdf_resource_qual {
                return Err(XmpError::BadRdf(
                    "Can't mix rdf:resource and general qualifiers".to_string(),
                ));
            }

            if use_canonical_rdf {
                sb.push('>');
                sb.push_str(XMP_DEFAULT_NEWLINE);
                actual_indent += 1;
                write_indent(sb, actual_indent);
                sb.push_str(RDF_STRUCT_START);
                sb.push('>');
            } else {
                sb.push_str(" rdf:parseType=\"Resource\">");
            }

            sb.push_str(XMP_DEFAULT_NEWLINE);

            self.serialize_canonical_rdf_property(
                sb,
                node,
                use_canonical_rdf,
                true,
                actual_indent + 1,
            )?;

            for qualifier in node.qualifiers() {
                if !RDF_ATTR_QUALIFIER.contains(&qualifier.name.as_str()) {
                    self.serialize_canonical_rdf_property(
                        sb,
                        qualifier,
                        use_canonical_rdf,
                        false,
                        actual_indent + 1,
                    )?;
                }
            }

            if use_canonical_rdf {
                write_indent(sb, actual_indent);
                sb.push_str(RDF_STRUCT_END);
                sb.push_str(XMP_DEFAULT_NEWLINE);
                actual_indent -= 1;
            }
        } else if !node.options.is_composite_property() {
            // a simple property
            if node.options.is_uri() {
                sb.push_str(" rdf:resource=\"");
                append_node_value(sb, node.value.as_deref().unwrap_or_default(), true);
                sb.push_str("\"/>");
                sb.push_str(XMP_DEFAULT_NEWLINE);

                emit_end_tag = false;
            } else if node.value.as_deref().map_or(true, str::is_empty) {
                sb.push_str("/>");
                sb.push_str(XMP_DEFAULT_NEWLINE);

                emit_end_tag = false;
            } else {
                sb.push('>');
                append_node_value(sb, node.value.as_deref().unwrap_or_default(), false);

                indent_end_tag = false;
            }
        } else if node.options.is_array() {
            sb.push('>');
            sb.push_str(XMP_DEFAULT_NEWLINE);

            emit_rdf_array_tag(sb, node, true, actual_indent + 1);

            for child in node.children() {
                self.serialize_canonical_rdf_property(
                    sb,
                    child,
                    use_canonical_rdf,
                    false,
                    actual_indent + 2,
                )?;
            }

            emit_rdf_array_tag(sb, node, false, actual_indent + 1);
        } else if !has_rdf_resource_qual {
            // a "normal" struct, use the rdf:parseType="Resource" form
            if !node.has_children() {
                if use_canonical_rdf {
                    sb.push('>');
                    sb.push_str(XMP_DEFAULT_NEWLINE);
                    write_indent(sb, actual_indent + 1);
                    sb.push_str(RDF_EMPTY_STRUCT);
                } else {
                    sb.push_str(" rdf:parseType=\"Resource\"/>");
                    emit_end_tag = false;
                }

                sb.push_str(XMP_DEFAULT_NEWLINE);
            } else {
                if use_canonical_rdf {
                    sb.push('>');
                    sb.push_str(XMP_DEFAULT_NEWLINE);
                    actual_indent += 1;
                    write_indent(sb, actual_indent);
                    sb.push_str(RDF_STRUCT_START);
                    sb.push('>');
                } else {
                    sb.push_str(" rdf:parseType=\"Resource\">");
                }

                sb.push_str(XMP_DEFAULT_NEWLINE);

                for child in node.children() {
                    self.serialize_canonical_rdf_property(
                        sb,
                        child,
                        use_canonical_rdf,
                        false,
                        actual_indent + 1,
                    )?;
                }

                if use_canonical_rdf {
                    write_indent(sb, actual_indent);
                    sb.push_str(RDF_STRUCT_END);
                    sb.push_str(XMP_DEFAULT_NEWLINE);
                    actual_indent -= 1;
                }
            }
        } else {
            // a struct with an rdf:resource attribute, use the empty
            // property element form
            for child in node.children() {
                if !can_be_rdf_attr_prop(child) {
                    return Err(XmpError::BadRdf(
                        "Can't mix rdf:resource and complex fields".to_string(),
                    ));
                }

                sb.push_str(XMP_DEFAULT_NEWLINE);
                write_indent(sb, actual_indent + 1);
                sb.push(' ');
                sb.push_str(&child.name);
                sb.push_str("=\"");
                append_node_value(sb, child.value.as_deref().unwrap_or_default(), true);
                sb.push('"');
            }

            sb.push_str("/>");
            sb.push_str(XMP_DEFAULT_NEWLINE);

            emit_end_tag = false;
        }

        if emit_end_tag {
            if indent_end_tag {
                write_indent(sb, actual_indent);
            }

            sb.push_str("</");
            sb.push_str(elem_name);
            sb.push('>');
            sb.push_str(XMP_DEFAULT_NEWLINE);
        }

        Ok(())
    }
}

/// Write each of the parent's simple unqualified properties as an
/// attribute. Returns true if all of the properties were written as
/// attributes.
fn serialize_compact_rdf_attr_props(sb: &mut String, parent_node: &XmpNode, indent: usize) -> bool {
    let mut all_are_attrs = true;

    for prop in parent_node.children() {
        if can_be_rdf_attr_prop(prop) {
            sb.push_str(XMP_DEFAULT_NEWLINE);
            write_indent(sb, indent);
            sb.push_str(&prop.name);
            sb.push_str("=\"");
            append_node_value(sb, prop.value.as_deref().unwrap_or_default(), true);
            sb.push('"');
        } else {
            all_are_attrs = false;
        }
    }

    all_are_attrs
}

/// Serializes a simple property in compact mode. Returns the end tag
/// flags `(emit_end_tag, indent_end_tag)`.
fn serialize_compact_rdf_simple_prop(sb: &mut String, node: &XmpNode) -> (bool, bool) {
    if node.options.is_uri() {
        sb.push_str(" rdf:resource=\"");
        append_node_value(sb, node.value.as_deref().unwrap_or_default(), true);
        sb.push_str("\"/>");
        sb.push_str(XMP_DEFAULT_NEWLINE);
        (false, true)
    } else if node.value.as_deref().map_or(true, str::is_empty) {
        sb.push_str("/>");
        sb.push_str(XMP_DEFAULT_NEWLINE);
        (false, true)
    } else {
        sb.push('>');
        append_node_value(sb, node.value.as_deref().unwrap_or_default(), false);
        (true, false)
    }
}

/// Writes all namespaces used by the subtree to the output, once each.
fn declare_used_namespaces(
    sb: &mut String,
    node: &XmpNode,
    used_prefixes: &mut HashSet<String>,
    indent: usize,
) {
    if node.options.is_schema_node() {
        // the schema node name is the URI, the value is the prefix
        let prefix = node.value.clone().unwrap_or_default();
        declare_namespace(sb, &prefix, Some(&node.name), used_prefixes, indent);
    } else if node.options.is_struct() {
        for field in node.children() {
            declare_namespace(sb, &field.name, None, used_prefixes, indent);
        }
    }

    for child in node.children() {
        declare_used_namespaces(sb, child, used_prefixes, indent);
    }

    for qualifier in node.qualifiers() {
        declare_namespace(sb, &qualifier.name, None, used_prefixes, indent);
        declare_used_namespaces(sb, qualifier, used_prefixes, indent);
    }
}

/// Writes one namespace declaration to the output. `prefix` is either a
/// plain prefix (with `namespace` given) or a qualified name whose prefix
/// is looked up in the registry.
fn declare_namespace(
    sb: &mut String,
    prefix: &str,
    namespace: Option<&str>,
    used_prefixes: &mut HashSet<String>,
    indent: usize,
) {
    let (prefix, namespace) = match namespace {
        Some(namespace) => (prefix.to_string(), namespace.to_string()),
        None => {
            // the prefix contains a qname; extract the prefix and look
            // up the namespace
            let Some((qname_prefix, _)) = prefix.split_once(':') else {
                return;
            };

            let Some(namespace) = registry::get_namespace_uri(qname_prefix) else {
                return;
            };

            (qname_prefix.to_string(), namespace)
        }
    };

    if used_prefixes.contains(&prefix) {
        return;
    }

    sb.push_str(XMP_DEFAULT_NEWLINE);
    write_indent(sb, indent);
    sb.push_str("xmlns:");
    sb.push_str(&prefix);
    sb.push_str("=\"");
    sb.push_str(&namespace);
    sb.push('"');

    used_prefixes.insert(prefix);
}

/// Writes the array start or end tag.
fn emit_rdf_array_tag(sb: &mut String, array_node: &XmpNode, is_start_tag: bool, indent: usize) {
    if !is_start_tag && !array_node.has_children() {
        return;
    }

    write_indent(sb, indent);
    sb.push_str(if is_start_tag { "<rdf:" } else { "</rdf:" });

    if array_node.options.is_array_alternate() {
        sb.push_str("Alt");
    } else if array_node.options.is_array_ordered() {
        sb.push_str("Seq");
    } else {
        sb.push_str("Bag");
    }

    if is_start_tag && !array_node.has_children() {
        sb.push_str("/>");
    } else {
        sb.push('>');
    }

    sb.push_str(XMP_DEFAULT_NEWLINE);
}

/// Serializes a node value in XML encoding, for tag bodies and
/// attributes. Attributes are always delimited by double quotes.
fn append_node_value(sb: &mut String, value: &str, for_attribute: bool) {
    sb.push_str(&escape_xml(value, for_attribute, true));
}

/// A node can be serialized as an RDF attribute if it is not an array
/// item, has no qualifiers, is not a URI and is not a composite property.
fn can_be_rdf_attr_prop(node: &XmpNode) -> bool {
    !node.has_qualifiers()
        && !node.options.is_uri()
        && !node.options.is_composite_property()
        && node.name != ARRAY_ITEM_NAME
}

fn write_indent(sb: &mut String, times: usize) {
    for _ in 0..times {
        sb.push_str(XMP_DEFAULT_INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::X_DEFAULT;
    use crate::core::options::{ParseOptions, PropertyOptions};
    use crate::core::parser;
    use crate::core::registry::ns;

    fn parse_tree(input: &str) -> XmpNode {
        parser::parse(input, &ParseOptions::default()).unwrap().0
    }

    fn bare_options(canonical: bool) -> SerializeOptions {
        SerializeOptions {
            omit_packet_wrapper: true,
            omit_xmp_meta_element: true,
            use_canonical_format: canonical,
            ..SerializeOptions::default()
        }
    }

    #[test]
    fn test_empty_tree() {
        let root = XmpNode::default();
        let output = serialize(&root, &bare_options(true)).unwrap();

        assert!(output.starts_with("<rdf:RDF"));
        assert!(output.contains("<rdf:Description rdf:about=\"\"/>"));
        assert!(output.ends_with("</rdf:RDF>\n"));
    }

    #[test]
    fn test_rating_compact_vs_canonical() {
        let root = parse_tree(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"3\"/>\
             </rdf:RDF>",
        );

        let compact = serialize(&root, &bare_options(false)).unwrap();
        assert!(compact.contains("xmp:Rating=\"3\""), "compact output:\n{}", compact);
        assert!(!compact.contains("<xmp:Rating>"));

        let canonical = serialize(&root, &bare_options(true)).unwrap();
        assert!(canonical.contains("<xmp:Rating>3</xmp:Rating>"), "canonical output:\n{}", canonical);
    }

    #[test]
    fn test_namespaces_declared_once_on_description() {
        let root = parse_tree(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
              xmp:Rating=\"3\" xmp:CreatorTool=\"App\"/>\
             </rdf:RDF>",
        );

        let output = serialize(&root, &bare_options(false)).unwrap();
        assert_eq!(output.matches("xmlns:xmp=").count(), 1);
    }

    #[test]
    fn test_alt_text_writes_x_default_first() {
        let root = parse_tree(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
             <dc:title><rdf:Alt>\
             <rdf:li xml:lang=\"en\">Hello</rdf:li>\
             <rdf:li xml:lang=\"x-default\">Hi</rdf:li>\
             </rdf:Alt></dc:title>\
             </rdf:Description></rdf:RDF>",
        );

        let output = serialize(&root, &bare_options(true)).unwrap();

        let default_pos = output.find(X_DEFAULT).unwrap();
        let en_pos = output.find("xml:lang=\"en\"").unwrap();
        assert!(default_pos < en_pos, "output:\n{}", output);
    }

    #[test]
    fn test_single_item_array_is_not_collapsed() {
        let root = parse_tree(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
             <dc:creator><rdf:Seq><rdf:li>Sole Author</rdf:li></rdf:Seq></dc:creator>\
             </rdf:Description></rdf:RDF>",
        );

        for canonical in [false, true] {
            let output = serialize(&root, &bare_options(canonical)).unwrap();
            assert!(output.contains("<rdf:Seq>"), "output:\n{}", output);
            assert!(output.contains("<rdf:li>Sole Author</rdf:li>"));
        }
    }

    #[test]
    fn test_packet_wrapper_and_envelope() {
        let root = XmpNode::default();

        let output = serialize(&root, &SerializeOptions::default()).unwrap();
        assert!(output.starts_with("<?xpacket begin="));
        assert!(output.contains("<x:xmpmeta"));
        assert!(output.ends_with("<?xpacket end=\"w\"?>"));

        let read_only = SerializeOptions {
            read_only_packet: true,
            ..SerializeOptions::default()
        };
        let output = serialize(&root, &read_only).unwrap();
        assert!(output.ends_with("<?xpacket end=\"r\"?>"));
    }

    #[test]
    fn test_sort_orders_properties() {
        let root = parse_tree(
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
              xmp:Rating=\"3\" xmp:CreatorTool=\"App\"/>\
             </rdf:RDF>",
        );

        let mut options = bare_options(true);
        options.sort = true;

        let output = serialize(&root, &options).unwrap();
        let creator_pos = output.find("xmp:CreatorTool").unwrap();
        let rating_pos = output.find("xmp:Rating").unwrap();
        assert!(creator_pos < rating_pos);
    }

    #[test]
    fn test_uri_value_writes_rdf_resource() {
        let mut root = XmpNode::default();

        let mut schema_options = PropertyOptions::new();
        schema_options.set_schema_node(true);
        let mut schema = XmpNode::new(ns::XMP, Some("xmp".to_string()), schema_options);

        let mut uri_options = PropertyOptions::new();
        uri_options.set_uri(true);
        schema.add_child(XmpNode::new(
            "xmp:BaseURL",
            Some("http://www.adobe.com/".to_string()),
            uri_options,
        ));

        root.add_child(schema);

        let output = serialize(&root, &bare_options(true)).unwrap();
        assert!(output.contains("rdf:resource=\"http://www.adobe.com/\""));
    }

    #[test]
    fn test_escaping_in_values() {
        let mut root = XmpNode::default();

        let mut schema_options = PropertyOptions::new();
        schema_options.set_schema_node(true);
        let mut schema = XmpNode::new(ns::XMP, Some("xmp".to_string()), schema_options);
        schema.add_child(XmpNode::leaf("xmp:CreatorTool", "Tools <&> \"Co\""));
        root.add_child(schema);

        let compact = serialize(&root, &bare_options(false)).unwrap();
        assert!(compact.contains("Tools &lt;&amp;&gt; &quot;Co&quot;"));

        let canonical = serialize(&root, &bare_options(true)).unwrap();
        assert!(canonical.contains("Tools &lt;&amp;&gt; \"Co\""));
    }
}
