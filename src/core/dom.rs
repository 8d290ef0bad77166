//! Element-tree abstraction over the XML tokenizer
//!
//! The RDF parser walks a small DOM instead of raw tokenizer events: an
//! element carries its resolved namespace, prefix and local name, an
//! ordered attribute list (namespace declarations are consumed during
//! resolution and do not appear), and ordered child nodes. Processing
//! instructions are kept because the packet header travels as one.

use crate::core::error::{XmpError, XmpResult};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

/// Nesting bound for the element tree; deeper input is rejected instead of
/// recursing without limit later on.
const MAX_XML_DEPTH: usize = 200;

/// An XML attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttr {
    /// Resolved namespace URI, if the attribute is prefixed.
    pub ns_uri: Option<String>,
    /// The prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Unescaped value.
    pub value: String,
}

impl XmlAttr {
    /// The attribute name as written (`prefix:local` or `local`).
    pub fn node_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// An XML element with its resolved namespace, attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Resolved namespace URI.
    pub ns_uri: Option<String>,
    /// The prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Attributes in document order, namespace declarations excluded.
    pub attributes: Vec<XmlAttr>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// The element name as written (`prefix:local` or `local`).
    pub fn node_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }
}

/// One node of the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    ProcessingInstruction { target: String, data: String },
}

impl XmlNode {
    /// Whether the node is a text node consisting only of whitespace.
    pub fn is_whitespace(&self) -> bool {
        match self {
            XmlNode::Text(text) => text.chars().all(char::is_whitespace),
            _ => false,
        }
    }
}

/// A parsed XML document: the top level nodes, including processing
/// instructions outside the document element.
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    pub children: Vec<XmlNode>,
}

/// Parse an XML string into an element tree.
///
/// Namespace declarations are resolved while reading; entity references in
/// text and attribute values are unescaped.
pub fn parse_document(xml: &str) -> XmpResult<XmlDocument> {
    let mut reader = NsReader::from_str(xml);

    let mut document = XmlDocument::default();
    let mut stack: Vec<XmlElement> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(XmpError::BadXml(
                        "Maximum element nesting depth exceeded".to_string(),
                    ));
                }

                let element = build_element(&reader, &e)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = build_element(&reader, &e)?;
                append_node(&mut document, &mut stack, XmlNode::Element(element));
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    XmpError::BadXml("Unexpected closing tag".to_string())
                })?;

                append_node(&mut document, &mut stack, XmlNode::Element(element));
            }
            Ok(Event::Text(e)) => {
                let raw_text = String::from_utf8_lossy(e.as_ref()).to_string();
                let text = match unescape(&raw_text) {
                    Ok(unescaped) => unescaped.to_string(),
                    Err(_) => raw_text,
                };

                append_node(&mut document, &mut stack, XmlNode::Text(text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).to_string();
                append_node(&mut document, &mut stack, XmlNode::Text(text));
            }
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(&e).to_string();
                let text = resolve_reference(&name)?;
                append_node(&mut document, &mut stack, XmlNode::Text(text));
            }
            Ok(Event::PI(e)) => {
                let content = String::from_utf8_lossy(e.as_ref()).to_string();

                let (target, data) = match content.split_once(char::is_whitespace) {
                    Some((target, data)) => (target.to_string(), data.trim().to_string()),
                    None => (content, String::new()),
                };

                append_node(
                    &mut document,
                    &mut stack,
                    XmlNode::ProcessingInstruction { target, data },
                );
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // declaration, comments, doctype
            Err(e) => {
                return Err(XmpError::BadXml(format!("XML parsing error: {}", e)));
            }
        }
    }

    if !stack.is_empty() {
        return Err(XmpError::BadXml("Unclosed element".to_string()));
    }

    Ok(document)
}

/// Resolves a general or character reference to its text. Only the five
/// predefined entities and numeric character references are supported.
fn resolve_reference(name: &str) -> XmpResult<String> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "apos" => '\'',
        "quot" => '"',
        _ => {
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => name.strip_prefix('#').and_then(|dec| dec.parse().ok()),
            };

            code.and_then(char::from_u32).ok_or_else(|| {
                XmpError::BadXml(format!("Unresolvable entity reference: &{};", name))
            })?
        }
    };

    Ok(resolved.to_string())
}

fn append_node(document: &mut XmlDocument, stack: &mut [XmlElement], node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => document.children.push(node),
    }
}

fn build_element(reader: &NsReader<&[u8]>, e: &BytesStart<'_>) -> XmpResult<XmlElement> {
    let (resolve_result, local_name) = reader.resolve_element(e.name());

    let ns_uri = resolved_uri(&resolve_result);
    let prefix = e
        .name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).to_string());
    let local_name = String::from_utf8_lossy(local_name.as_ref()).to_string();

    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmpError::BadXml(format!("Bad attribute: {}", err)))?;

        let key = attr.key;

        // namespace declarations are consumed by the resolver
        if key.as_ref() == b"xmlns" || key.prefix().is_some_and(|p| p.as_ref() == b"xmlns") {
            continue;
        }

        let (attr_resolve, attr_local) = reader.resolve_attribute(key);

        let raw_value = String::from_utf8_lossy(attr.value.as_ref()).to_string();
        let value = match unescape(&raw_value) {
            Ok(unescaped) => unescaped.to_string(),
            Err(_) => raw_value,
        };

        attributes.push(XmlAttr {
            ns_uri: resolved_uri(&attr_resolve),
            prefix: key
                .prefix()
                .map(|p| String::from_utf8_lossy(p.as_ref()).to_string()),
            local_name: String::from_utf8_lossy(attr_local.as_ref()).to_string(),
            value,
        });
    }

    Ok(XmlElement {
        ns_uri,
        prefix,
        local_name,
        attributes,
        children: Vec::new(),
    })
}

fn resolved_uri(result: &ResolveResult) -> Option<String> {
    match result {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_document() {
        let document = parse_document(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""/>
</rdf:RDF>"#,
        )
        .unwrap();

        let root = match &document.children[0] {
            XmlNode::Element(element) => element,
            other => panic!("expected element, got {:?}", other),
        };

        assert_eq!(root.local_name, "RDF");
        assert_eq!(root.prefix.as_deref(), Some("rdf"));
        assert_eq!(
            root.ns_uri.as_deref(),
            Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#")
        );
        // xmlns declarations are not reported as attributes
        assert!(root.attributes.is_empty());

        let description = root.child_elements().next().unwrap();
        assert_eq!(description.local_name, "Description");
        assert_eq!(description.attributes.len(), 1);
        assert_eq!(description.attributes[0].node_name(), "rdf:about");
    }

    #[test]
    fn test_text_is_unescaped() {
        let document = parse_document("<a>x &amp; y &#x21;</a>").unwrap();

        let root = match &document.children[0] {
            XmlNode::Element(element) => element,
            _ => unreachable!(),
        };

        // references may arrive as separate text nodes
        let text: String = root
            .children
            .iter()
            .map(|child| match child {
                XmlNode::Text(text) => text.as_str(),
                _ => "",
            })
            .collect();

        assert_eq!(text, "x & y !");
    }

    #[test]
    fn test_processing_instruction() {
        let document =
            parse_document("<?xpacket begin=\"\" id=\"W5M0\"?><a/>").unwrap();

        match &document.children[0] {
            XmlNode::ProcessingInstruction { target, data } => {
                assert_eq!(target, "xpacket");
                assert!(data.contains("W5M0"));
            }
            other => panic!("expected PI, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a").is_err());
    }

    #[test]
    fn test_depth_bound() {
        let mut xml = String::new();
        for _ in 0..300 {
            xml.push_str("<a>");
        }
        for _ in 0..300 {
            xml.push_str("</a>");
        }

        assert!(matches!(parse_document(&xml), Err(XmpError::BadXml(_))));
    }

    #[test]
    fn test_whitespace_detection() {
        assert!(XmlNode::Text("  \n\t ".to_string()).is_whitespace());
        assert!(!XmlNode::Text("  x ".to_string()).is_whitespace());
    }
}
