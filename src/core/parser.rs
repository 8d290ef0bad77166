//! RDF/XML parser
//!
//! Builds the property tree from a parsed element tree. This is a raw
//! parse of the constrained RDF subset XMP uses; normalization of the
//! resulting tree happens in [`crate::core::normalizer`].
//!
//! The walk recognizes the RDF syntax productions for node elements,
//! property elements (resource, literal, parseType="Resource" and empty
//! forms) and the container elements `rdf:Bag`/`rdf:Seq`/`rdf:Alt`. Both
//! property encodings are accepted: attribute form directly on
//! `rdf:Description`, and element form as child elements.

use crate::core::constants::{ARRAY_ITEM_NAME, TAG_XAPMETA, TAG_XMPMETA, XML_LANG, XMP_PI};
use crate::core::dom::{self, XmlAttr, XmlDocument, XmlElement, XmlNode};
use crate::core::error::{XmpError, XmpResult};
use crate::core::navigator::{detect_alt_text, find_schema_node};
use crate::core::node::XmpNode;
use crate::core::options::{ParseOptions, PropertyOptions};
use crate::core::registry::{self, ns};
use crate::utils::normalize_lang_value;

/// Prefix registered for namespaces that are declared without one.
pub const DEFAULT_PREFIX: &str = "_dflt";

/// Bound for the RDF nesting depth, on top of the DOM depth bound.
const MAX_RDF_DEPTH: usize = 128;

/// The RDF terms of the constrained subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RdfTerm {
    Other,
    Rdf,
    Id,
    About,
    ParseType,
    Resource,
    NodeId,
    Datatype,
    Description,
    Li,
    AboutEach,
    AboutEachPrefix,
    BagId,
}

impl RdfTerm {
    /// 7.2.2 coreSyntaxTerms: rdf:RDF | rdf:ID | rdf:about | rdf:parseType
    /// | rdf:resource | rdf:nodeID | rdf:datatype
    fn is_core_syntax_term(self) -> bool {
        matches!(
            self,
            RdfTerm::Rdf
                | RdfTerm::Id
                | RdfTerm::About
                | RdfTerm::ParseType
                | RdfTerm::Resource
                | RdfTerm::NodeId
                | RdfTerm::Datatype
        )
    }

    /// 7.2.4 oldTerms: rdf:aboutEach | rdf:aboutEachPrefix | rdf:bagID
    fn is_old_term(self) -> bool {
        matches!(
            self,
            RdfTerm::AboutEach | RdfTerm::AboutEachPrefix | RdfTerm::BagId
        )
    }

    /// 7.2.6 propertyElementURIs: anyURI - (coreSyntaxTerms |
    /// rdf:Description | oldTerms)
    fn is_property_element_name(self) -> bool {
        self != RdfTerm::Description && !self.is_old_term() && !self.is_core_syntax_term()
    }
}

/// A resolved XML name, shared between elements and attributes.
#[derive(Debug, Clone, Copy)]
struct XmlName<'a> {
    ns_uri: Option<&'a str>,
    prefix: Option<&'a str>,
    local_name: &'a str,
}

impl<'a> XmlName<'a> {
    fn of_element(element: &'a XmlElement) -> Self {
        Self {
            ns_uri: element.ns_uri.as_deref(),
            prefix: element.prefix.as_deref(),
            local_name: &element.local_name,
        }
    }

    fn of_attr(attr: &'a XmlAttr) -> Self {
        Self {
            ns_uri: attr.ns_uri.as_deref(),
            prefix: attr.prefix.as_deref(),
            local_name: &attr.local_name,
        }
    }
}

/// Determines the RDF term for a name. Handles the fact that `rdf:about`
/// and `rdf:ID` sometimes come without the prefix on elements in the RDF
/// namespace.
fn rdf_term_kind(name: XmlName<'_>, is_attr: bool, owner_ns: Option<&str>) -> RdfTerm {
    let must_be_rdf = name.ns_uri.map_or(true, str::is_empty)
        && (name.local_name == "about" || name.local_name == "ID")
        && is_attr
        && owner_ns == Some(ns::RDF);

    if !must_be_rdf && name.ns_uri != Some(ns::RDF) {
        return RdfTerm::Other;
    }

    match name.local_name {
        "li" => RdfTerm::Li,
        "parseType" => RdfTerm::ParseType,
        "Description" => RdfTerm::Description,
        "about" => RdfTerm::About,
        "resource" => RdfTerm::Resource,
        "RDF" => RdfTerm::Rdf,
        "ID" => RdfTerm::Id,
        "nodeID" => RdfTerm::NodeId,
        "datatype" => RdfTerm::Datatype,
        "aboutEach" => RdfTerm::AboutEach,
        "aboutEachPrefix" => RdfTerm::AboutEachPrefix,
        "bagID" => RdfTerm::BagId,
        _ => RdfTerm::Other,
    }
}

fn is_numbered_array_item_name(node_name: &str) -> bool {
    if node_name == "rdf:li" {
        return true;
    }

    match node_name.strip_prefix("rdf:_") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Parse an XMP packet string into the raw property tree. Returns the
/// tree root (the `rdf:about` value as its name) and the body of the
/// `<?xpacket?>` processing instruction when one was present.
pub fn parse(input: &str, options: &ParseOptions) -> XmpResult<(XmpNode, Option<String>)> {
    if input.trim().is_empty() {
        return Err(XmpError::BadXmp(
            "XMP input must not be a blank string".to_string(),
        ));
    }

    let mut packet_header: Option<String> = None;

    let (document, envelope_in_prefix) = parse_document_lenient(input, &mut packet_header)?;

    let require_envelope = options.require_xmp_meta && !envelope_in_prefix;

    let rdf_element = find_root_node(&document.children, require_envelope, &mut packet_header)
        .ok_or_else(|| XmpError::BadXmp("XMP RDF was not found".to_string()))?;

    let mut tree_root = XmpNode::default();
    parse_rdf_root(&mut tree_root, rdf_element, options)?;

    Ok((tree_root, packet_header))
}

/// Parse the document, tolerating trailing junk after the closing
/// `</rdf:RDF>` by trimming to the `<rdf:RDF>...</rdf:RDF>` span when the
/// full text does not parse. When trimming, the discarded prefix is still
/// scanned for the packet header and the metadata envelope.
fn parse_document_lenient(
    input: &str,
    packet_header: &mut Option<String>,
) -> XmpResult<(XmlDocument, bool)> {
    let first_error = match dom::parse_document(input) {
        Ok(document) => return Ok((document, false)),
        Err(err) => err,
    };

    let (Some(start), Some(end)) = (input.find("<rdf:RDF"), input.rfind("</rdf:RDF>")) else {
        return Err(first_error);
    };

    let end = end + "</rdf:RDF>".len();

    if end <= start {
        return Err(first_error);
    }

    let document = dom::parse_document(&input[start..end])?;

    let prefix_text = &input[..start];

    if let Some(pi_start) = prefix_text.find("<?xpacket") {
        if let Some(pi_len) = prefix_text[pi_start..].find("?>") {
            let body = &prefix_text[pi_start + "<?xpacket".len()..pi_start + pi_len];
            *packet_header = Some(body.trim().to_string());
        }
    }

    let saw_envelope =
        prefix_text.contains("<x:xmpmeta") || prefix_text.contains("<x:xapmeta");

    Ok((document, saw_envelope))
}

/// Find the XML element that is the root of the XMP data tree: the first
/// `x:xmpmeta` envelope, or a bare `rdf:RDF` if the envelope is not
/// required. The search is depth first over the generic XML around the
/// packet, and picks up the `<?xpacket?>` header on the way.
fn find_root_node<'a>(
    children: &'a [XmlNode],
    xmp_meta_required: bool,
    packet_header: &mut Option<String>,
) -> Option<&'a XmlElement> {
    for child in children {
        match child {
            XmlNode::ProcessingInstruction { target, data } if target == XMP_PI => {
                *packet_header = Some(data.clone());
            }
            XmlNode::Element(element) => {
                let is_envelope = (element.local_name == TAG_XMPMETA
                    || element.local_name == TAG_XAPMETA)
                    && element.ns_uri.as_deref() == Some(ns::X);

                if is_envelope {
                    // inside the envelope the rdf:RDF element is valid on
                    // its own
                    return find_root_node(&element.children, false, packet_header);
                }

                if !xmp_meta_required
                    && element.local_name == "RDF"
                    && element.ns_uri.as_deref() == Some(ns::RDF)
                {
                    return Some(element);
                }

                if let Some(found) =
                    find_root_node(&element.children, xmp_meta_required, packet_header)
                {
                    return Some(found);
                }
            }
            _ => {}
        }
    }

    None
}

/// Walk the children of `rdf:RDF`: each one is a node element, normally
/// `rdf:Description`. Multiple descriptions sharing one `rdf:about` merge
/// into the same tree.
fn parse_rdf_root(
    tree_root: &mut XmpNode,
    rdf_element: &XmlElement,
    options: &ParseOptions,
) -> XmpResult<()> {
    if rdf_element.ns_uri.as_deref() != Some(ns::RDF) || rdf_element.local_name != "RDF" {
        return Err(XmpError::BadRdf(
            "Root node should be of type rdf:RDF".to_string(),
        ));
    }

    for child in &rdf_element.children {
        if child.is_whitespace() {
            continue;
        }

        let XmlNode::Element(element) = child else {
            return Err(XmpError::BadRdf(
                "Expected rdf:Description element".to_string(),
            ));
        };

        parse_rdf_node_element(tree_root, element, true, options, 0)?;
    }

    Ok(())
}

/// 7.2.11 nodeElement: an `rdf:Description` or a typed node, with an
/// optional `rdf:about` and property attributes, followed by the property
/// element list.
fn parse_rdf_node_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
    options: &ParseOptions,
    depth: usize,
) -> XmpResult<()> {
    if depth > MAX_RDF_DEPTH {
        return Err(XmpError::BadXmp(
            "Maximum RDF nesting depth exceeded".to_string(),
        ));
    }

    let node_term = rdf_term_kind(XmlName::of_element(xml_node), false, None);

    if node_term != RdfTerm::Description && node_term != RdfTerm::Other {
        return Err(XmpError::BadRdf(
            "Node element must be rdf:Description or typed node".to_string(),
        ));
    }

    if is_top_level && node_term == RdfTerm::Other {
        return Err(XmpError::BadXmp("Top level typed node not allowed".to_string()));
    }

    parse_rdf_node_element_attrs(xmp_parent, xml_node, is_top_level)?;
    parse_rdf_property_element_list(xmp_parent, xml_node, is_top_level, options, depth)?;

    Ok(())
}

/// Process the attribute list of an RDF node element. A property
/// attribute is anything other than an RDF term; `rdf:ID` and
/// `rdf:nodeID` are ignored, `rdf:about` on the top level names the tree.
fn parse_rdf_node_element_attrs(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
) -> XmpResult<()> {
    // used to detect attributes that are mutually exclusive
    let mut exclusive_attrs = 0;

    for attribute in &xml_node.attributes {
        let attr_term = rdf_term_kind(
            XmlName::of_attr(attribute),
            true,
            xml_node.ns_uri.as_deref(),
        );

        match attr_term {
            RdfTerm::Id | RdfTerm::NodeId | RdfTerm::About => {
                if exclusive_attrs > 0 {
                    return Err(XmpError::BadRdf(
                        "Mutually exclusive about, ID, nodeID attributes".to_string(),
                    ));
                }

                exclusive_attrs += 1;

                if is_top_level && attr_term == RdfTerm::About {
                    // The rdf:about attribute on a top level node names
                    // the tree; every description must agree on it.
                    if !xmp_parent.name.is_empty() {
                        if xmp_parent.name != attribute.value {
                            return Err(XmpError::BadXmp(
                                "Mismatched top level rdf:about values".to_string(),
                            ));
                        }
                    } else {
                        xmp_parent.name = attribute.value.clone();
                    }
                }
            }
            RdfTerm::Other => {
                add_child_node(
                    xmp_parent,
                    XmlName::of_attr(attribute),
                    Some(attribute.value.clone()),
                    is_top_level,
                )?;
            }
            _ => {
                return Err(XmpError::BadRdf("Invalid nodeElement attribute".to_string()));
            }
        }
    }

    Ok(())
}

/// 7.2.13 propertyEltList: ws* (propertyElt ws*)*
fn parse_rdf_property_element_list(
    xmp_parent: &mut XmpNode,
    xml_parent: &XmlElement,
    is_top_level: bool,
    options: &ParseOptions,
    depth: usize,
) -> XmpResult<()> {
    for child in &xml_parent.children {
        if child.is_whitespace() {
            continue;
        }

        let XmlNode::Element(element) = child else {
            return Err(XmpError::BadRdf(
                "Expected property element node not found".to_string(),
            ));
        };

        parse_rdf_property_element(xmp_parent, element, is_top_level, options, depth)?;
    }

    Ok(())
}

/// 7.2.14 propertyElt: the various property element forms are mostly
/// distinguished by their attributes; resource and literal property
/// elements are distinguished by their XML content.
fn parse_rdf_property_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
    options: &ParseOptions,
    depth: usize,
) -> XmpResult<()> {
    let node_term = rdf_term_kind(XmlName::of_element(xml_node), false, None);

    if !node_term.is_property_element_name() {
        return Err(XmpError::BadRdf("Invalid property element name".to_string()));
    }

    let attributes = &xml_node.attributes;

    if attributes.len() > 3 {
        // only an emptyPropertyElt can have more than 3 attributes
        return parse_empty_property_element(xmp_parent, xml_node, is_top_level);
    }

    // Look through the attributes for one that isn't rdf:ID or xml:lang;
    // it will usually tell what we are dealing with. The called routines
    // must verify their specific syntax.
    for attribute in attributes {
        let attr_name = attribute.node_name();
        let attr_term = rdf_term_kind(
            XmlName::of_attr(attribute),
            true,
            xml_node.ns_uri.as_deref(),
        );

        if attr_name == XML_LANG || attr_term == RdfTerm::Id {
            continue;
        }

        return match attr_term {
            RdfTerm::Datatype => {
                parse_rdf_literal_property_element(xmp_parent, xml_node, is_top_level)
            }
            RdfTerm::ParseType => match attribute.value.as_str() {
                "Literal" => Err(XmpError::BadXmp(
                    "Literal property element not allowed".to_string(),
                )),
                "Resource" => parse_type_resource_property_element(
                    xmp_parent,
                    xml_node,
                    is_top_level,
                    options,
                    depth,
                ),
                "Collection" => Err(XmpError::BadXmp(
                    "Collection property element forbidden".to_string(),
                )),
                _ => Err(XmpError::BadXmp(
                    "Other property element not allowed".to_string(),
                )),
            },
            _ => parse_empty_property_element(xmp_parent, xml_node, is_top_level),
        };
    }

    // Only rdf:ID and xml:lang: this is a resourcePropertyElt, a
    // literalPropertyElt or an emptyPropertyElt. The child XML nodes
    // decide which.
    if !xml_node.children.is_empty() {
        let has_element_child = xml_node
            .children
            .iter()
            .any(|child| matches!(child, XmlNode::Element(_)));

        if has_element_child {
            parse_rdf_resource_property_element(xmp_parent, xml_node, is_top_level, options, depth)
        } else {
            parse_rdf_literal_property_element(xmp_parent, xml_node, is_top_level)
        }
    } else {
        parse_empty_property_element(xmp_parent, xml_node, is_top_level)
    }
}

/// 7.2.15 resourcePropertyElt: handles structs using an `rdf:Description`
/// node, arrays using `rdf:Bag`/`Seq`/`Alt`, and typed nodes. Also
/// catches and cleans up qualified properties written with
/// `rdf:Description` and `rdf:value`.
fn parse_rdf_resource_property_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
    options: &ParseOptions,
    depth: usize,
) -> XmpResult<()> {
    // strip old "punchcard" chaff with the "iX:" prefix
    if is_top_level && xml_node.node_name() == "iX:changes" {
        return Ok(());
    }

    let new_compound = add_child_node(xmp_parent, XmlName::of_element(xml_node), None, is_top_level)?;

    for attribute in &xml_node.attributes {
        let attr_name = attribute.node_name();

        if attr_name == XML_LANG {
            add_qualifier_node(new_compound, XML_LANG, &attribute.value);
        } else if attribute.ns_uri.as_deref() == Some(ns::RDF) && attribute.local_name == "ID" {
            continue;
        } else {
            return Err(XmpError::BadRdf(
                "Invalid attribute for resource property element".to_string(),
            ));
        }
    }

    let mut found = false;

    for child in &xml_node.children {
        if child.is_whitespace() {
            continue;
        }

        match child {
            XmlNode::Element(element) if !found => {
                let is_rdf = element.ns_uri.as_deref() == Some(ns::RDF);

                match element.local_name.as_str() {
                    "Bag" if is_rdf => {
                        new_compound.options.set_array(true);
                    }
                    "Seq" if is_rdf => {
                        new_compound.options.set_array(true).set_array_ordered(true);
                    }
                    "Alt" if is_rdf => {
                        new_compound
                            .options
                            .set_array(true)
                            .set_array_ordered(true)
                            .set_array_alternate(true);
                    }
                    local_name => {
                        new_compound.options.set_struct(true);

                        if !is_rdf && local_name != "Description" {
                            let type_ns = element.ns_uri.as_deref().ok_or_else(|| {
                                XmpError::BadXmp(
                                    "All XML elements must be in a namespace".to_string(),
                                )
                            })?;

                            let type_name = format!("{}:{}", type_ns, local_name);
                            add_qualifier_node(new_compound, "rdf:type", &type_name);
                        }
                    }
                }

                parse_rdf_node_element(new_compound, element, false, options, depth + 1)?;

                if new_compound.has_value_child {
                    fixup_qualified_node(new_compound)?;
                } else if new_compound.options.is_array_alternate() {
                    detect_alt_text(new_compound);
                }

                found = true;
            }
            XmlNode::Element(_) => {
                return Err(XmpError::BadRdf(
                    "Invalid child of resource property element".to_string(),
                ));
            }
            _ => {
                return Err(XmpError::BadRdf(
                    "Children of resource property element must be XML elements".to_string(),
                ));
            }
        }
    }

    if !found {
        return Err(XmpError::BadRdf(
            "Missing child of resource property element".to_string(),
        ));
    }

    Ok(())
}

/// 7.2.16 literalPropertyElt: a leaf node with the text value and
/// qualifiers for the attributes.
fn parse_rdf_literal_property_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
) -> XmpResult<()> {
    let new_child = add_child_node(xmp_parent, XmlName::of_element(xml_node), None, is_top_level)?;

    for attribute in &xml_node.attributes {
        let attr_name = attribute.node_name();

        if attr_name == XML_LANG {
            add_qualifier_node(new_child, XML_LANG, &attribute.value);
        } else if attribute.ns_uri.as_deref() == Some(ns::RDF)
            && (attribute.local_name == "ID" || attribute.local_name == "datatype")
        {
            continue;
        } else {
            return Err(XmpError::BadRdf(
                "Invalid attribute for literal property element".to_string(),
            ));
        }
    }

    let mut text_value = String::new();

    for child in &xml_node.children {
        let XmlNode::Text(text) = child else {
            return Err(XmpError::BadRdf(
                "Invalid child of literal property element".to_string(),
            ));
        };

        text_value.push_str(text);
    }

    new_child.value = Some(text_value);

    Ok(())
}

/// 7.2.18 parseTypeResourcePropertyElt: a new struct node whose fields
/// come from the XML child nodes.
fn parse_type_resource_property_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
    options: &ParseOptions,
    depth: usize,
) -> XmpResult<()> {
    let new_struct = add_child_node(xmp_parent, XmlName::of_element(xml_node), None, is_top_level)?;

    new_struct.options.set_struct(true);

    for attribute in &xml_node.attributes {
        let attr_name = attribute.node_name();

        if attr_name == XML_LANG {
            add_qualifier_node(new_struct, XML_LANG, &attribute.value);
        } else if attribute.ns_uri.as_deref() == Some(ns::RDF)
            && (attribute.local_name == "ID" || attribute.local_name == "parseType")
        {
            // the caller ensured the value is "Resource"
            continue;
        } else {
            return Err(XmpError::BadRdf(
                "Invalid attribute for ParseTypeResource property element".to_string(),
            ));
        }
    }

    parse_rdf_property_element_list(new_struct, xml_node, false, options, depth + 1)?;

    if new_struct.has_value_child {
        fixup_qualified_node(new_struct)?;
    }

    Ok(())
}

/// 7.2.21 emptyPropertyElt: an element with no content, just attributes.
///
/// The XMP mapping rules are:
///
/// 1. An `rdf:value` attribute makes it a simple property with a text
///    value; all other attributes are qualifiers.
/// 2. An `rdf:resource` attribute makes it a simple property with a URI
///    value; all other attributes are qualifiers.
/// 3. Only `xml:lang`, `rdf:ID` or `rdf:nodeID` attributes make it a
///    simple property with an empty value.
/// 4. Otherwise it is a struct, the other attributes are fields.
fn parse_empty_property_element(
    xmp_parent: &mut XmpNode,
    xml_node: &XmlElement,
    is_top_level: bool,
) -> XmpResult<()> {
    let mut has_property_attrs = false;
    let mut has_resource_attr = false;
    let mut has_node_id_attr = false;
    let mut has_value_attr = false;
    let mut value_attr_index: Option<usize> = None;

    if !xml_node.children.is_empty() {
        return Err(XmpError::BadRdf(
            "Nested content not allowed with rdf:resource or property attributes".to_string(),
        ));
    }

    // First figure out what XMP this maps to and remember the attribute
    // holding a simple value.
    for (index, attribute) in xml_node.attributes.iter().enumerate() {
        let attr_term = rdf_term_kind(
            XmlName::of_attr(attribute),
            true,
            xml_node.ns_uri.as_deref(),
        );

        match attr_term {
            RdfTerm::Id | RdfTerm::About => continue,
            RdfTerm::Resource => {
                if has_node_id_attr {
                    return Err(XmpError::BadRdf(
                        "Empty property element can't have both rdf:resource and rdf:nodeID"
                            .to_string(),
                    ));
                }

                if has_value_attr {
                    return Err(XmpError::BadXmp(
                        "Empty property element can't have both rdf:value and rdf:resource"
                            .to_string(),
                    ));
                }

                has_resource_attr = true;

                if !has_value_attr {
                    value_attr_index = Some(index);
                }
            }
            RdfTerm::NodeId => {
                if has_resource_attr {
                    return Err(XmpError::BadRdf(
                        "Empty property element can't have both rdf:resource and rdf:nodeID"
                            .to_string(),
                    ));
                }

                has_node_id_attr = true;
            }
            RdfTerm::Other => {
                if attribute.local_name == "value" && attribute.ns_uri.as_deref() == Some(ns::RDF)
                {
                    if has_resource_attr {
                        return Err(XmpError::BadXmp(
                            "Empty property element can't have both rdf:value and rdf:resource"
                                .to_string(),
                        ));
                    }

                    has_value_attr = true;
                    value_attr_index = Some(index);
                } else if attribute.node_name() != XML_LANG {
                    has_property_attrs = true;
                }
            }
            _ => {
                return Err(XmpError::BadRdf(
                    "Unrecognized attribute of empty property element".to_string(),
                ));
            }
        }
    }

    // Create the right kind of child node and visit the attributes again
    // to add the fields or qualifiers.
    let child_node = add_child_node(xmp_parent, XmlName::of_element(xml_node), None, is_top_level)?;

    let mut child_is_struct = false;

    if has_value_attr || has_resource_attr {
        let value = value_attr_index
            .map(|index| xml_node.attributes[index].value.clone())
            .unwrap_or_default();

        child_node.value = Some(value);

        if !has_value_attr {
            // ! might have both rdf:value and rdf:resource
            child_node.options.set_uri(true);
        }
    } else if has_property_attrs {
        child_node.options.set_struct(true);
        child_is_struct = true;
    } else {
        child_node.value = Some(String::new());
    }

    for (index, attribute) in xml_node.attributes.iter().enumerate() {
        if Some(index) == value_attr_index {
            // skip the rdf:value or rdf:resource attribute holding the value
            continue;
        }

        let attr_term = rdf_term_kind(
            XmlName::of_attr(attribute),
            true,
            xml_node.ns_uri.as_deref(),
        );

        match attr_term {
            RdfTerm::Id | RdfTerm::NodeId | RdfTerm::About => continue,
            RdfTerm::Resource => {
                add_qualifier_node(child_node, "rdf:resource", &attribute.value);
            }
            RdfTerm::Other => {
                if !child_is_struct {
                    add_qualifier_node(child_node, &attribute.node_name(), &attribute.value);
                } else if attribute.node_name() == XML_LANG {
                    add_qualifier_node(child_node, XML_LANG, &attribute.value);
                } else {
                    add_child_node(
                        child_node,
                        XmlName::of_attr(attribute),
                        Some(attribute.value.clone()),
                        false,
                    )?;
                }
            }
            _ => {
                return Err(XmpError::BadRdf(
                    "Unrecognized attribute of empty property element".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Adds a child node for an element or attribute to the tree. On the top
/// level the schema node is found or created first and the child is
/// placed below it; alias names are flagged for the normalizer.
fn add_child_node<'a>(
    xmp_parent: &'a mut XmpNode,
    xml_name: XmlName<'_>,
    value: Option<String>,
    is_top_level: bool,
) -> XmpResult<&'a mut XmpNode> {
    let mut namespace = match xml_name.ns_uri {
        Some(uri) if !uri.is_empty() => uri,
        _ => {
            return Err(XmpError::BadRdf(
                "XML namespace required for all elements and attributes".to_string(),
            ))
        }
    };

    // fix the legacy DC namespace
    if namespace == ns::DC_DEPRECATED {
        namespace = ns::DC;
    }

    let prefix = match registry::get_namespace_prefix(namespace) {
        Some(prefix) => prefix,
        None => {
            let suggested = xml_name.prefix.unwrap_or(DEFAULT_PREFIX);
            registry::register_namespace(namespace, suggested)?
        }
    };

    let child_name = format!("{}:{}", prefix, xml_name.local_name);

    let mut is_alias = false;

    let actual_parent: &mut XmpNode = if is_top_level {
        // Lookup the schema node, adjusting the parent pointer; the
        // incoming parent is the tree root.
        let schema_index = find_schema_node(xmp_parent, namespace, Some(DEFAULT_PREFIX), true)?
            .ok_or_else(|| XmpError::Internal("SchemaNode should have been created".to_string()))?;

        if registry::find_alias(&child_name).is_some() {
            is_alias = true;
            xmp_parent.has_aliases = true;
        }

        let schema_node = &mut xmp_parent.children_mut()[schema_index];
        schema_node.implicit = false;

        if is_alias {
            schema_node.has_aliases = true;
        }

        schema_node
    } else {
        xmp_parent
    };

    let is_array_item = is_numbered_array_item_name(&child_name);
    let is_value_node = child_name == "rdf:value";
    let is_parent_array = actual_parent.options.is_array();

    match (is_parent_array, is_array_item) {
        (false, true) => {
            return Err(XmpError::BadRdf("Misplaced rdf:li element".to_string()));
        }
        (true, false) => {
            return Err(XmpError::BadRdf(
                "Arrays cannot have arbitrary child names".to_string(),
            ));
        }
        _ => {}
    }

    if is_value_node && (is_top_level || !actual_parent.options.is_struct()) {
        return Err(XmpError::BadRdf("Misplaced rdf:value element".to_string()));
    }

    // Merge a doubled named node instead of growing a dangling sibling;
    // array items all share one name and always append.
    if !is_array_item && !is_value_node {
        if let Some(existing) = actual_parent.find_child_index(&child_name) {
            let existing_node = &mut actual_parent.children_mut()[existing];

            if value.is_some() {
                existing_node.value = value;
            }

            existing_node.is_alias = existing_node.is_alias || is_alias;

            return Ok(existing_node);
        }
    }

    let final_name = if is_array_item {
        ARRAY_ITEM_NAME
    } else {
        child_name.as_str()
    };

    let mut new_child = XmpNode::new(final_name, value, PropertyOptions::new());
    new_child.is_alias = is_alias;

    let child_index = if is_value_node {
        actual_parent.has_value_child = true;
        actual_parent.add_child_at(1, new_child);
        0
    } else {
        actual_parent.add_child(new_child);
        actual_parent.children_len() - 1
    };

    Ok(&mut actual_parent.children_mut()[child_index])
}

/// Adds a qualifier node, normalizing the value of language qualifiers.
fn add_qualifier_node(xmp_parent: &mut XmpNode, name: &str, value: &str) {
    let normalized_value = if name == XML_LANG {
        normalize_lang_value(value)
    } else {
        value.to_string()
    };

    xmp_parent.add_qualifier(XmpNode::leaf(name, normalized_value));
}

/// The parent is an RDF pseudo-struct containing an `rdf:value` field.
/// Fix the data model: the `rdf:value` node must be the first child, the
/// other children are qualifiers. The form, value and children of the
/// `rdf:value` node are the real ones; its qualifiers are merged with the
/// others.
fn fixup_qualified_node(xmp_parent: &mut XmpNode) -> XmpResult<()> {
    if !xmp_parent.options.is_struct() || !xmp_parent.has_children() {
        return Err(XmpError::Internal(
            "Qualified node fixup on a non-struct".to_string(),
        ));
    }

    if xmp_parent.child(1).name != "rdf:value" {
        return Err(XmpError::Internal(
            "Expected rdf:value as first child".to_string(),
        ));
    }

    let mut value_node = xmp_parent.remove_child(1);

    // Move the qualifiers of the value node to the parent, an xml:lang
    // qualifier stays at the front.
    if value_node.options.has_language() {
        if xmp_parent.options.has_language() {
            return Err(XmpError::BadXmp(
                "Redundant xml:lang for rdf:value element".to_string(),
            ));
        }

        let lang_qual = value_node.remove_qualifier(1);
        xmp_parent.add_qualifier(lang_qual);
    }

    while value_node.has_qualifiers() {
        let qualifier = value_node.remove_qualifier(1);
        xmp_parent.add_qualifier(qualifier);
    }

    // the parent's other children become qualifiers
    while xmp_parent.has_children() {
        let qualifier = xmp_parent.remove_child(1);
        xmp_parent.add_qualifier(qualifier);
    }

    xmp_parent.has_value_child = false;
    xmp_parent.options.set_struct(false);
    xmp_parent.options.merge_with(value_node.options);
    xmp_parent.value = value_node.value.take();

    for child in std::mem::take(value_node.children_mut()) {
        xmp_parent.add_child(child);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::X_DEFAULT;
    use crate::core::navigator::{lookup_node, node_at};
    use crate::core::xpath::expand_path;

    fn parse_str(input: &str) -> XmpNode {
        parse(input, &ParseOptions::default()).unwrap().0
    }

    fn get_value(root: &XmpNode, schema: &str, path: &str) -> Option<String> {
        let expanded = expand_path(schema, path).unwrap();
        lookup_node(root, &expanded)
            .unwrap()
            .and_then(|location| node_at(root, &location).value.clone())
    }

    const RDF_START: &str =
        "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">";

    #[test]
    fn test_attribute_form_property() {
        let root = parse_str(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about="" xmp:CreatorTool="MyApp" xmp:Rating="3"/>
</rdf:RDF>"#,
        );

        assert_eq!(get_value(&root, ns::XMP, "CreatorTool").as_deref(), Some("MyApp"));
        assert_eq!(get_value(&root, ns::XMP, "Rating").as_deref(), Some("3"));
    }

    #[test]
    fn test_element_form_property() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\
               <xmp:CreatorTool>MyApp</xmp:CreatorTool>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        assert_eq!(get_value(&root, ns::XMP, "CreatorTool").as_deref(), Some("MyApp"));
    }

    #[test]
    fn test_merged_descriptions_share_subject() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"5\"/>\
              <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:CreatorTool=\"App\"/>\
             </rdf:RDF>",
            RDF_START
        ));

        // both properties landed in one xmp schema node
        assert_eq!(root.children_len(), 1);
        assert_eq!(get_value(&root, ns::XMP, "Rating").as_deref(), Some("5"));
        assert_eq!(get_value(&root, ns::XMP, "CreatorTool").as_deref(), Some("App"));
    }

    #[test]
    fn test_mismatched_about_fails() {
        let result = parse(
            &format!(
                "{}<rdf:Description rdf:about=\"uuid:a\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"5\"/>\
                  <rdf:Description rdf:about=\"uuid:b\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:CreatorTool=\"App\"/>\
                 </rdf:RDF>",
                RDF_START
            ),
            &ParseOptions::default(),
        );

        assert!(matches!(result, Err(XmpError::BadXmp(_))));
    }

    #[test]
    fn test_seq_array() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
               <dc:creator><rdf:Seq>\
                 <rdf:li>First Author</rdf:li>\
                 <rdf:li>Second Author</rdf:li>\
               </rdf:Seq></dc:creator>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        let path = expand_path(ns::DC, "creator").unwrap();
        let location = lookup_node(&root, &path).unwrap().unwrap();
        let array = node_at(&root, &location);

        assert!(array.options.is_array());
        assert!(array.options.is_array_ordered());
        assert_eq!(array.children_len(), 2);
        assert_eq!(get_value(&root, ns::DC, "creator[2]").as_deref(), Some("Second Author"));
    }

    #[test]
    fn test_alt_text_array_with_lang() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
               <dc:title><rdf:Alt>\
                 <rdf:li xml:lang=\"en\">Hello</rdf:li>\
                 <rdf:li xml:lang=\"x-default\">Hi</rdf:li>\
               </rdf:Alt></dc:title>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        let path = expand_path(ns::DC, "title").unwrap();
        let location = lookup_node(&root, &path).unwrap().unwrap();
        let array = node_at(&root, &location);

        assert!(array.options.is_array_alt_text());
        // the x-default item was moved to the front by detect_alt_text
        assert_eq!(array.child(1).qualifier(1).value.as_deref(), Some(X_DEFAULT));
        assert_eq!(array.child(1).value.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_parse_type_resource_struct() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmpMM=\"http://ns.adobe.com/xap/1.0/mm/\" \
                xmlns:stRef=\"http://ns.adobe.com/xap/1.0/sType/ResourceRef#\">\
               <xmpMM:DerivedFrom rdf:parseType=\"Resource\">\
                 <stRef:instanceID>xmp.iid:1</stRef:instanceID>\
                 <stRef:documentID>xmp.did:2</stRef:documentID>\
               </xmpMM:DerivedFrom>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        assert_eq!(
            get_value(&root, ns::XMP_MM, "DerivedFrom/stRef:instanceID").as_deref(),
            Some("xmp.iid:1")
        );

        let path = expand_path(ns::XMP_MM, "DerivedFrom").unwrap();
        let location = lookup_node(&root, &path).unwrap().unwrap();
        assert!(node_at(&root, &location).options.is_struct());
    }

    #[test]
    fn test_empty_property_element_as_struct() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmpMM=\"http://ns.adobe.com/xap/1.0/mm/\" \
                xmlns:stRef=\"http://ns.adobe.com/xap/1.0/sType/ResourceRef#\">\
               <xmpMM:DerivedFrom stRef:instanceID=\"xmp.iid:1\" stRef:documentID=\"xmp.did:2\"/>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        assert_eq!(
            get_value(&root, ns::XMP_MM, "DerivedFrom/stRef:documentID").as_deref(),
            Some("xmp.did:2")
        );
    }

    #[test]
    fn test_rdf_value_fixup() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" \
                xmlns:ns1=\"http://example.com/q/\">\
               <xmp:BaseURL rdf:parseType=\"Resource\">\
                 <rdf:value>http://www.adobe.com/</rdf:value>\
                 <ns1:role>primary</ns1:role>\
               </xmp:BaseURL>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        let path = expand_path(ns::XMP, "BaseURL").unwrap();
        let location = lookup_node(&root, &path).unwrap().unwrap();
        let node = node_at(&root, &location);

        // the pseudo-struct collapsed into a qualified simple property
        assert!(!node.options.is_struct());
        assert_eq!(node.value.as_deref(), Some("http://www.adobe.com/"));
        assert_eq!(node.qualifiers_len(), 1);
        assert_eq!(node.qualifier(1).name, "ns1:role");
        assert_eq!(node.qualifier(1).value.as_deref(), Some("primary"));
    }

    #[test]
    fn test_rdf_resource_becomes_uri_value() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\
               <xmp:BaseURL rdf:resource=\"http://www.adobe.com/\"/>\
             </rdf:Description></rdf:RDF>",
            RDF_START
        ));

        let path = expand_path(ns::XMP, "BaseURL").unwrap();
        let location = lookup_node(&root, &path).unwrap().unwrap();
        let node = node_at(&root, &location);

        assert!(node.options.is_uri());
        assert_eq!(node.value.as_deref(), Some("http://www.adobe.com/"));
    }

    #[test]
    fn test_packet_wrapper_and_header() {
        let (root, header) = parse(
            "<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\
             <x:xmpmeta xmlns:x=\"adobe:ns:meta/\" x:xmptk=\"test\">\
             <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
             <rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"3\"/>\
             </rdf:RDF></x:xmpmeta>\
             <?xpacket end=\"w\"?>",
            &ParseOptions::default(),
        )
        .unwrap();

        assert_eq!(get_value(&root, ns::XMP, "Rating").as_deref(), Some("3"));
        assert!(header.unwrap().contains("W5M0MpCehiHzreSzNTczkc9d"));
    }

    #[test]
    fn test_require_xmp_meta() {
        let bare = format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"3\"/></rdf:RDF>",
            RDF_START
        );

        let options = ParseOptions {
            require_xmp_meta: true,
            ..ParseOptions::default()
        };

        assert!(matches!(parse(&bare, &options), Err(XmpError::BadXmp(_))));
        assert!(parse(&bare, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_trailing_junk_is_trimmed() {
        let input = format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:Rating=\"3\"/></rdf:RDF>\u{0}\u{0}garbage",
            RDF_START
        );

        let root = parse_str(&input);
        assert_eq!(get_value(&root, ns::XMP, "Rating").as_deref(), Some("3"));
    }

    #[test]
    fn test_unknown_namespace_is_registered() {
        let root = parse_str(&format!(
            "{}<rdf:Description rdf:about=\"\" xmlns:pet=\"http://example.com/pet/1.0/\" pet:Name=\"Rex\"/></rdf:RDF>",
            RDF_START
        ));

        assert!(registry::get_namespace_prefix("http://example.com/pet/1.0/").is_some());
        assert_eq!(
            get_value(&root, "http://example.com/pet/1.0/", "Name").as_deref(),
            Some("Rex")
        );
    }

    #[test]
    fn test_misplaced_li_fails() {
        let result = parse(
            &format!(
                "{}<rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
                   <dc:creator><rdf:Description><rdf:li>x</rdf:li></rdf:Description></dc:creator>\
                 </rdf:Description></rdf:RDF>",
                RDF_START
            ),
            &ParseOptions::default(),
        );

        assert!(matches!(result, Err(XmpError::BadRdf(_))));
    }

    #[test]
    fn test_blank_input() {
        assert!(matches!(
            parse("   ", &ParseOptions::default()),
            Err(XmpError::BadXmp(_))
        ));
    }
}
