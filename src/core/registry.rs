//! Namespace and alias registry
//!
//! The registry keeps track of all namespaces and aliases used in XMP
//! metadata. At initialisation time the default namespaces and aliases are
//! registered. Namespaces must be registered before they are used in
//! schema parameters or path expressions; additional namespaces
//! encountered while parsing RDF are registered automatically.
//!
//! Aliases are multiple names for the same property: an alias name points
//! to an actual (base) name, which is the preferred name for output. The
//! alias must be a top level property name; the actual may be a top level
//! property, the first item of a top level array, or the `x-default` item
//! of an alt-text array.

use crate::core::error::{XmpError, XmpResult};
use crate::core::options::{verify_set_options, AliasForm};
use crate::utils::is_xml_name_ns;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

// Shared default registry. Registration calls must be serialized by the
// caller relative to concurrent parse/serialize operations; concurrent
// reads are safe.
static GLOBAL_REGISTRY: OnceLock<RwLock<XmpRegistry>> = OnceLock::new();

/// Built-in XMP namespaces
pub mod ns {
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// Dublin Core namespace
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// Deprecated Dublin Core namespace, normalized to [`DC`] while parsing
    pub const DC_DEPRECATED: &str = "http://purl.org/dc/1.1/";
    /// IPTC Core namespace
    pub const IPTC_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
    /// IPTC Extension namespace
    pub const IPTC_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
    /// Namespace of the metadata envelope element
    pub const X: &str = "adobe:ns:meta/";
    /// Legacy "punchcard" namespace
    pub const IX: &str = "http://ns.adobe.com/iX/1.0/";
    /// XMP Basic namespace
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    /// XMP Rights namespace
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    /// XMP Media Management namespace
    pub const XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
    /// XMP Basic Job Ticket namespace
    pub const XMP_BJ: &str = "http://ns.adobe.com/xap/1.0/bj/";
    /// XMP Note namespace
    pub const XMP_NOTE: &str = "http://ns.adobe.com/xmp/note/";
    /// PDF namespace
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    /// PDF/X namespace
    pub const PDFX: &str = "http://ns.adobe.com/pdfx/1.3/";
    /// PDF/A identification namespace
    pub const PDFA_ID: &str = "http://www.aiim.org/pdfa/ns/id/";
    /// Photoshop namespace
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    /// Camera Raw namespace
    pub const CAMERA_RAW: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
    /// EXIF namespace
    pub const EXIF: &str = "http://ns.adobe.com/exif/1.0/";
    /// EXIF 2.3 (CIPA) namespace
    pub const EXIF_CIPA: &str = "http://cipa.jp/exif/1.0/";
    /// EXIF Aux namespace
    pub const EXIF_AUX: &str = "http://ns.adobe.com/exif/1.0/aux/";
    /// TIFF namespace
    pub const TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
    /// PNG namespace
    pub const PNG: &str = "http://ns.adobe.com/png/1.0/";
    /// JPEG namespace
    pub const JPEG: &str = "http://ns.adobe.com/jpeg/1.0/";
    /// XMP Dynamic Media namespace
    pub const XMP_DM: &str = "http://ns.adobe.com/xmp/1.0/DynamicMedia/";
    /// XMP PagedText type namespace
    pub const TYPE_PAGED_FILE: &str = "http://ns.adobe.com/xap/1.0/t/pg/";
    /// XMP Text type namespace
    pub const TYPE_TEXT: &str = "http://ns.adobe.com/xap/1.0/t/";
    /// XMP Graphics type namespace
    pub const TYPE_GRAPHICS: &str = "http://ns.adobe.com/xap/1.0/g/";
    /// XMP Image type namespace
    pub const TYPE_IMAGE: &str = "http://ns.adobe.com/xap/1.0/g/img/";
    /// Font type namespace
    pub const TYPE_FONT: &str = "http://ns.adobe.com/xap/1.0/sType/Font#";
    /// Dimensions type namespace
    pub const TYPE_DIMENSIONS: &str = "http://ns.adobe.com/xap/1.0/sType/Dimensions#";
    /// ResourceEvent type namespace
    pub const TYPE_RESOURCE_EVENT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";
    /// ResourceRef type namespace
    pub const TYPE_RESOURCE_REF: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceRef#";
    /// Version type namespace
    pub const TYPE_ST_VERSION: &str = "http://ns.adobe.com/xap/1.0/sType/Version#";
    /// Job type namespace
    pub const TYPE_ST_JOB: &str = "http://ns.adobe.com/xap/1.0/sType/Job#";
    /// Identifier qualifier namespace
    pub const TYPE_IDENTIFIER_QUAL: &str = "http://ns.adobe.com/xmp/Identifier/qual/1.0/";
}

/// Information about a registered alias: the base (actual) location an
/// alias name redirects to, and the form of the base property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasInfo {
    /// Namespace URI of the base property.
    pub namespace: String,
    /// Registered prefix of the base namespace.
    pub prefix: String,
    /// Local name of the base property.
    pub prop_name: String,
    /// Form of the base property.
    pub form: AliasForm,
}

/// Bidirectional namespace URI ⟷ prefix table plus the alias table.
#[derive(Debug, Clone)]
pub struct XmpRegistry {
    ns_to_prefix: HashMap<String, String>,
    prefix_to_ns: HashMap<String, String>,
    aliases: HashMap<String, AliasInfo>,
}

impl XmpRegistry {
    /// Create a registry seeded with the standard namespaces and aliases.
    pub fn new() -> Self {
        let mut registry = Self {
            ns_to_prefix: HashMap::new(),
            prefix_to_ns: HashMap::new(),
            aliases: HashMap::new(),
        };

        registry.register_standard_namespaces();
        registry.register_standard_aliases();
        registry
    }

    /// Register a namespace URI with a suggested prefix. It is not an
    /// error if the URI is already registered, no matter what the prefix
    /// is. If the URI is not registered but the suggested prefix is in
    /// use, a unique prefix is derived from the suggested one. The actual
    /// registered prefix is always returned.
    pub fn register_namespace(&mut self, uri: &str, suggested_prefix: &str) -> XmpResult<String> {
        if uri.is_empty() {
            return Err(XmpError::BadParam(
                "Empty schema namespace URI".to_string(),
            ));
        }

        if suggested_prefix.is_empty() {
            return Err(XmpError::BadParam("Empty prefix".to_string()));
        }

        if !is_xml_name_ns(suggested_prefix) {
            return Err(XmpError::BadXml("The prefix is a bad XML name".to_string()));
        }

        if let Some(registered) = self.ns_to_prefix.get(uri) {
            return Ok(registered.clone());
        }

        let mut prefix = suggested_prefix.to_string();

        if self.prefix_to_ns.contains_key(&prefix) {
            // the namespace is new but the prefix is already engaged,
            // generate a fresh prefix out of the suggested one
            let mut i = 1;

            while self.prefix_to_ns.contains_key(&prefix) {
                prefix = format!("{}_{}_", suggested_prefix, i);
                i += 1;
            }
        }

        self.prefix_to_ns.insert(prefix.clone(), uri.to_string());
        self.ns_to_prefix.insert(uri.to_string(), prefix.clone());

        Ok(prefix)
    }

    /// The prefix registered for a namespace URI. It is not an error if
    /// the URI is not registered.
    pub fn get_namespace_prefix(&self, uri: &str) -> Option<&str> {
        self.ns_to_prefix.get(uri).map(|s| s.as_str())
    }

    /// The URI registered for a namespace prefix. It is not an error if
    /// the prefix is not registered.
    pub fn get_namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.prefix_to_ns.get(prefix).map(|s| s.as_str())
    }

    /// Check if a namespace URI is registered.
    pub fn has_namespace(&self, uri: &str) -> bool {
        self.ns_to_prefix.contains_key(uri)
    }

    /// All registered namespaces as (uri, prefix) pairs.
    pub fn namespaces(&self) -> Vec<(String, String)> {
        self.ns_to_prefix
            .iter()
            .map(|(uri, prefix)| (uri.clone(), prefix.clone()))
            .collect()
    }

    /// Deletes a namespace from the registry. Does nothing if the URI is
    /// not registered.
    pub fn delete_namespace(&mut self, uri: &str) {
        if let Some(prefix) = self.ns_to_prefix.remove(uri) {
            self.prefix_to_ns.remove(&prefix);
        }
    }

    /// Associates an alias name with an actual (base) name. Both property
    /// names must be simple names, not general path expressions. Multiple
    /// alias names may map to the same actual name; alias chains are not
    /// allowed.
    pub fn register_alias(
        &mut self,
        alias_ns: &str,
        alias_prop: &str,
        actual_ns: &str,
        actual_prop: &str,
        form: AliasForm,
    ) -> XmpResult<()> {
        if alias_ns.is_empty() || actual_ns.is_empty() {
            return Err(XmpError::BadParam(
                "Empty schema namespace URI".to_string(),
            ));
        }

        if alias_prop.is_empty() || actual_prop.is_empty() {
            return Err(XmpError::BadParam("Empty property name".to_string()));
        }

        let is_simple =
            |name: &str| !name.contains(['/', '*', '?', '[', ']']);

        if !is_simple(alias_prop) || !is_simple(actual_prop) {
            return Err(XmpError::BadXPath(
                "Alias and actual property names must be simple".to_string(),
            ));
        }

        // cascade the array form bits before storing
        let form =
            AliasForm::from_bits(verify_set_options(form.to_property_options(), None)?.bits());

        let alias_prefix = self
            .get_namespace_prefix(alias_ns)
            .ok_or_else(|| XmpError::BadSchema("Alias namespace is not registered".to_string()))?
            .to_string();

        let actual_prefix = self
            .get_namespace_prefix(actual_ns)
            .ok_or_else(|| XmpError::BadSchema("Actual namespace is not registered".to_string()))?
            .to_string();

        let key = format!("{}:{}", alias_prefix, alias_prop);
        let actual_key = format!("{}:{}", actual_prefix, actual_prop);

        if self.aliases.contains_key(&key) {
            return Err(XmpError::BadParam("Alias is already existing".to_string()));
        }

        if self.aliases.contains_key(&actual_key) {
            return Err(XmpError::BadParam(
                "Actual property is already an alias, use the base property".to_string(),
            ));
        }

        self.aliases.insert(
            key,
            AliasInfo {
                namespace: actual_ns.to_string(),
                prefix: actual_prefix,
                prop_name: actual_prop.to_string(),
                form,
            },
        );

        Ok(())
    }

    /// Searches the alias table for a qualified name (`prefix:name`).
    pub fn find_alias(&self, qname: &str) -> Option<&AliasInfo> {
        self.aliases.get(qname)
    }

    /// Determines if a namespace/name pair is an alias, and what it is
    /// aliased to.
    pub fn resolve_alias(&self, alias_ns: &str, alias_prop: &str) -> Option<&AliasInfo> {
        let prefix = self.get_namespace_prefix(alias_ns)?;
        self.aliases.get(&format!("{}:{}", prefix, alias_prop))
    }

    /// Collects all aliases registered in the given namespace, as
    /// (alias qname, info) pairs.
    pub fn find_aliases(&self, alias_ns: &str) -> Vec<(String, AliasInfo)> {
        let Some(prefix) = self.get_namespace_prefix(alias_ns) else {
            return Vec::new();
        };

        let prefix = format!("{}:", prefix);

        let mut result: Vec<(String, AliasInfo)> = self
            .aliases
            .iter()
            .filter(|(qname, _)| qname.starts_with(&prefix))
            .map(|(qname, info)| (qname.clone(), info.clone()))
            .collect();

        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Register the standard namespaces of schemas and types that are
    /// included in the XMP specification.
    fn register_standard_namespaces(&mut self) {
        // These cannot fail on an empty registry.
        self.register_namespace(ns::XML, "xml").unwrap();
        self.register_namespace(ns::RDF, "rdf").unwrap();
        self.register_namespace(ns::DC, "dc").unwrap();
        self.register_namespace(ns::IPTC_CORE, "Iptc4xmpCore").unwrap();
        self.register_namespace(ns::IPTC_EXT, "Iptc4xmpExt").unwrap();

        self.register_namespace(ns::X, "x").unwrap();
        self.register_namespace(ns::IX, "iX").unwrap();
        self.register_namespace(ns::XMP, "xmp").unwrap();
        self.register_namespace(ns::XMP_RIGHTS, "xmpRights").unwrap();
        self.register_namespace(ns::XMP_MM, "xmpMM").unwrap();
        self.register_namespace(ns::XMP_BJ, "xmpBJ").unwrap();
        self.register_namespace(ns::XMP_NOTE, "xmpNote").unwrap();
        self.register_namespace(ns::PDF, "pdf").unwrap();
        self.register_namespace(ns::PDFX, "pdfx").unwrap();
        self.register_namespace(ns::PDFA_ID, "pdfaid").unwrap();
        self.register_namespace(ns::PHOTOSHOP, "photoshop").unwrap();
        self.register_namespace(ns::CAMERA_RAW, "crs").unwrap();
        self.register_namespace(ns::EXIF, "exif").unwrap();
        self.register_namespace(ns::EXIF_CIPA, "exifEX").unwrap();
        self.register_namespace(ns::EXIF_AUX, "aux").unwrap();
        self.register_namespace(ns::TIFF, "tiff").unwrap();
        self.register_namespace(ns::PNG, "png").unwrap();
        self.register_namespace(ns::JPEG, "jpeg").unwrap();
        self.register_namespace(ns::XMP_DM, "xmpDM").unwrap();

        self.register_namespace(ns::TYPE_TEXT, "xmpT").unwrap();
        self.register_namespace(ns::TYPE_PAGED_FILE, "xmpTPg").unwrap();
        self.register_namespace(ns::TYPE_GRAPHICS, "xmpG").unwrap();
        self.register_namespace(ns::TYPE_IMAGE, "xmpGImg").unwrap();
        self.register_namespace(ns::TYPE_FONT, "stFnt").unwrap();
        self.register_namespace(ns::TYPE_DIMENSIONS, "stDim").unwrap();
        self.register_namespace(ns::TYPE_RESOURCE_EVENT, "stEvt").unwrap();
        self.register_namespace(ns::TYPE_RESOURCE_REF, "stRef").unwrap();
        self.register_namespace(ns::TYPE_ST_VERSION, "stVer").unwrap();
        self.register_namespace(ns::TYPE_ST_JOB, "stJob").unwrap();
        self.register_namespace(ns::TYPE_IDENTIFIER_QUAL, "xmpidq").unwrap();
    }

    /// Register the standard aliases.
    fn register_standard_aliases(&mut self) {
        let ordered = AliasForm::array_ordered();
        let alt_text = AliasForm::array_alt_text();
        let direct = AliasForm::DIRECT;

        // Aliases from XMP to DC.
        self.register_alias(ns::XMP, "Author", ns::DC, "creator", ordered).unwrap();
        self.register_alias(ns::XMP, "Authors", ns::DC, "creator", direct).unwrap();
        self.register_alias(ns::XMP, "Description", ns::DC, "description", direct).unwrap();
        self.register_alias(ns::XMP, "Format", ns::DC, "format", direct).unwrap();
        self.register_alias(ns::XMP, "Keywords", ns::DC, "subject", direct).unwrap();
        self.register_alias(ns::XMP, "Locale", ns::DC, "language", direct).unwrap();
        self.register_alias(ns::XMP, "Title", ns::DC, "title", direct).unwrap();
        self.register_alias(ns::XMP_RIGHTS, "Copyright", ns::DC, "rights", direct).unwrap();

        // Aliases from PDF to DC and XMP.
        self.register_alias(ns::PDF, "Author", ns::DC, "creator", ordered).unwrap();
        self.register_alias(ns::PDF, "BaseURL", ns::XMP, "BaseURL", direct).unwrap();
        self.register_alias(ns::PDF, "CreationDate", ns::XMP, "CreateDate", direct).unwrap();
        self.register_alias(ns::PDF, "Creator", ns::XMP, "CreatorTool", direct).unwrap();
        self.register_alias(ns::PDF, "ModDate", ns::XMP, "ModifyDate", direct).unwrap();
        self.register_alias(ns::PDF, "Subject", ns::DC, "description", alt_text).unwrap();
        self.register_alias(ns::PDF, "Title", ns::DC, "title", alt_text).unwrap();

        // Aliases from Photoshop to DC and XMP.
        self.register_alias(ns::PHOTOSHOP, "Author", ns::DC, "creator", ordered).unwrap();
        self.register_alias(ns::PHOTOSHOP, "Caption", ns::DC, "description", alt_text).unwrap();
        self.register_alias(ns::PHOTOSHOP, "Copyright", ns::DC, "rights", alt_text).unwrap();
        self.register_alias(ns::PHOTOSHOP, "Keywords", ns::DC, "subject", direct).unwrap();
        self.register_alias(ns::PHOTOSHOP, "Marked", ns::XMP_RIGHTS, "Marked", direct).unwrap();
        self.register_alias(ns::PHOTOSHOP, "Title", ns::DC, "title", alt_text).unwrap();
        self.register_alias(ns::PHOTOSHOP, "WebStatement", ns::XMP_RIGHTS, "WebStatement", direct)
            .unwrap();

        // Aliases from TIFF and EXIF to DC and XMP.
        self.register_alias(ns::TIFF, "Artist", ns::DC, "creator", ordered).unwrap();
        self.register_alias(ns::TIFF, "Copyright", ns::DC, "rights", direct).unwrap();
        self.register_alias(ns::TIFF, "DateTime", ns::XMP, "ModifyDate", direct).unwrap();
        self.register_alias(ns::EXIF, "DateTimeDigitized", ns::XMP, "CreateDate", direct).unwrap();
        self.register_alias(ns::TIFF, "ImageDescription", ns::DC, "description", direct).unwrap();
        self.register_alias(ns::TIFF, "Software", ns::XMP, "CreatorTool", direct).unwrap();

        // Aliases from PNG (Acrobat ImageCapture) to DC and XMP.
        self.register_alias(ns::PNG, "Author", ns::DC, "creator", ordered).unwrap();
        self.register_alias(ns::PNG, "Copyright", ns::DC, "rights", alt_text).unwrap();
        self.register_alias(ns::PNG, "CreationTime", ns::XMP, "CreateDate", direct).unwrap();
        self.register_alias(ns::PNG, "Description", ns::DC, "description", alt_text).unwrap();
        self.register_alias(ns::PNG, "ModificationTime", ns::XMP, "ModifyDate", direct).unwrap();
        self.register_alias(ns::PNG, "Software", ns::XMP, "CreatorTool", direct).unwrap();
        self.register_alias(ns::PNG, "Title", ns::DC, "title", alt_text).unwrap();
    }
}

impl Default for XmpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn global_registry() -> &'static RwLock<XmpRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(XmpRegistry::new()))
}

/// Register a namespace URI with a suggested prefix in the shared
/// registry, returning the actual prefix.
///
/// Registration calls must be serialized by the caller relative to
/// concurrent parse/serialize operations.
pub fn register_namespace(uri: &str, suggested_prefix: &str) -> XmpResult<String> {
    let mut guard = global_registry().write().expect("registry lock poisoned");
    guard.register_namespace(uri, suggested_prefix)
}

/// The prefix registered for a namespace URI in the shared registry.
pub fn get_namespace_prefix(uri: &str) -> Option<String> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.get_namespace_prefix(uri).map(|s| s.to_string())
}

/// The URI registered for a namespace prefix in the shared registry.
pub fn get_namespace_uri(prefix: &str) -> Option<String> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.get_namespace_uri(prefix).map(|s| s.to_string())
}

/// Check if a namespace URI is registered in the shared registry.
pub fn is_namespace_registered(uri: &str) -> bool {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.has_namespace(uri)
}

/// All namespaces of the shared registry as (uri, prefix) pairs.
pub fn registered_namespaces() -> Vec<(String, String)> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.namespaces()
}

/// Register an alias in the shared registry.
pub fn register_alias(
    alias_ns: &str,
    alias_prop: &str,
    actual_ns: &str,
    actual_prop: &str,
    form: AliasForm,
) -> XmpResult<()> {
    let mut guard = global_registry().write().expect("registry lock poisoned");
    guard.register_alias(alias_ns, alias_prop, actual_ns, actual_prop, form)
}

/// Searches the shared alias table for a qualified name.
pub fn find_alias(qname: &str) -> Option<AliasInfo> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.find_alias(qname).cloned()
}

/// Determines if a namespace/name pair is an alias in the shared registry.
pub fn resolve_alias(alias_ns: &str, alias_prop: &str) -> Option<AliasInfo> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.resolve_alias(alias_ns, alias_prop).cloned()
}

/// All aliases of the shared registry registered in the given namespace.
pub fn find_aliases(alias_ns: &str) -> Vec<(String, AliasInfo)> {
    let guard = global_registry().read().expect("registry lock poisoned");
    guard.find_aliases(alias_ns)
}
