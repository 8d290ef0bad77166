//! Path expression parser
//!
//! Splits a property path expression apart at its conceptual steps and
//! resolves the root step against the namespace and alias registry. The
//! result is an [`XmpPath`], an ordered list of typed segments: the schema
//! step, the root property step, and any number of struct field,
//! qualifier, array index or selector steps.
//!
//! The grammar is deliberately permissive about array shorthand: the
//! separating `/` and a leading `*` are optional, so `array/*[2]`,
//! `array/[2]`, `array*[2]` and `array[2]` all compile to the same two
//! steps. Selector values are quoted with `'` or `"`; a doubled quoting
//! character escapes a literal quote, and the value may be empty.

use crate::core::error::{XmpError, XmpResult};
use crate::core::options::AliasForm;
use crate::core::registry;
use crate::utils::{is_xml_name, is_xml_name_ns, normalize_lang_value};
use std::fmt;

/// Index of the schema step in an expanded path.
pub const STEP_SCHEMA: usize = 0;

/// Index of the root property step in an expanded path.
pub const STEP_ROOT_PROP: usize = 1;

/// Marker index addressing the last item of an array.
pub const ARRAY_LAST_ITEM: i32 = -1;

/// The kind of one path step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmpPathStepKind {
    /// Step to a schema node, the name holds the namespace URI.
    SchemaNode,
    /// Step to a struct field or top level property, the name holds the
    /// qualified name.
    StructField,
    /// Step to a qualifier, the name holds `?` plus the qualified name.
    Qualifier,
    /// Step to an array item by 1-based index, e.g. `[2]`.
    ArrayIndex,
    /// Step to the last item of an array, `[last()]`.
    ArrayLast,
    /// Step to an array item chosen by a field value, e.g.
    /// `[stEvt:action='saved']`.
    FieldSelector,
    /// Step to an array item chosen by a qualifier value, e.g.
    /// `[?xml:lang='x-default']`.
    QualSelector,
}

/// One segment of an expanded path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPathSegment {
    /// The name or bracket expression of the segment.
    pub name: String,
    /// The kind of the segment.
    pub kind: XmpPathStepKind,
    /// The segment was produced by expanding an alias.
    pub is_alias: bool,
    /// The form of the alias that produced this segment.
    pub alias_form: AliasForm,
}

impl XmpPathSegment {
    fn new(name: impl Into<String>, kind: XmpPathStepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_alias: false,
            alias_form: AliasForm::DIRECT,
        }
    }
}

/// An expanded path expression: an ordered list of typed segments.
///
/// Segment 0 is always the schema step; segment 1 is the root property
/// step, possibly followed by a synthetic selector or index step injected
/// for array-form aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpPath {
    segments: Vec<XmpPathSegment>,
}

impl XmpPath {
    fn add(&mut self, segment: XmpPathSegment) {
        self.segments.push(segment);
    }

    /// The segment at the given index.
    pub fn segment(&self, index: usize) -> &XmpPathSegment {
        &self.segments[index]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[XmpPathSegment] {
        &self.segments
    }
}

impl fmt::Display for XmpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 && !segment.name.starts_with('[') {
                write!(f, "/")?;
            }
            write!(f, "{}", segment.name)?;
        }
        Ok(())
    }
}

/// Value-type cursor over the path string, scoped to one [`expand_path`]
/// call. All offsets are byte positions; the scanned delimiters are ASCII,
/// so slicing at these offsets never splits a character.
#[derive(Debug, Clone, Copy, Default)]
struct PathPosition {
    step_begin: usize,
    step_end: usize,
    name_start: usize,
    name_end: usize,
}

/// Split a path expression apart at the conceptual steps, adding the root
/// namespace prefix to the first property component. The schema URI is put
/// in the first slot of the expanded path. If the top level component is
/// an alias, the expansion redirects to the base property and, for
/// array-form aliases, injects the step addressing the aliased item.
pub fn expand_path(schema_ns: &str, path: &str) -> XmpResult<XmpPath> {
    let mut expanded = XmpPath::default();
    let mut pos = PathPosition::default();

    // Pull out the first component and do the special root processing on
    // it: add the schema namespace prefix and see if it is an alias.
    parse_root_node(schema_ns, path, &mut pos, &mut expanded)?;

    let bytes = path.as_bytes();

    while pos.step_end < path.len() {
        pos.step_begin = pos.step_end;

        skip_path_delimiter(path, &mut pos)?;

        pos.step_end = pos.step_begin;

        let mut segment = if bytes[pos.step_begin] != b'[' {
            // a struct field or qualifier
            parse_struct_segment(path, &mut pos)?
        } else {
            // one of the array forms
            parse_index_segment(path, &mut pos)?
        };

        if segment.kind == XmpPathStepKind::StructField {
            if segment.name.starts_with('@') {
                segment.name = format!("?{}", &segment.name[1..]);

                if segment.name != "?xml:lang" {
                    return Err(XmpError::BadXPath(
                        "Only xml:lang allowed with '@'".to_string(),
                    ));
                }
            }

            if segment.name.starts_with('?') {
                pos.name_start += 1;
                segment.kind = XmpPathStepKind::Qualifier;
            }

            verify_qual_name(&path[pos.name_start..pos.name_end])?;
        } else if segment.kind == XmpPathStepKind::FieldSelector {
            if segment.name.as_bytes().get(1) == Some(&b'@') {
                segment.name = format!("[?{}", &segment.name[2..]);

                if !segment.name.starts_with("[?xml:lang=") {
                    return Err(XmpError::BadXPath(
                        "Only xml:lang allowed with '@'".to_string(),
                    ));
                }
            }

            if segment.name.as_bytes().get(1) == Some(&b'?') {
                pos.name_start += 1;
                segment.kind = XmpPathStepKind::QualSelector;

                verify_qual_name(&path[pos.name_start..pos.name_end])?;
            }
        }

        expanded.add(segment);
    }

    Ok(expanded)
}

fn skip_path_delimiter(path: &str, pos: &mut PathPosition) -> XmpResult<()> {
    let bytes = path.as_bytes();

    if bytes[pos.step_begin] == b'/' {
        pos.step_begin += 1;

        if pos.step_begin >= path.len() {
            return Err(XmpError::BadXPath("Empty XMPPath segment".to_string()));
        }
    }

    if bytes[pos.step_begin] == b'*' {
        pos.step_begin += 1;

        if pos.step_begin >= path.len() || bytes[pos.step_begin] != b'[' {
            return Err(XmpError::BadXPath("Missing '[' after '*'".to_string()));
        }
    }

    Ok(())
}

fn parse_struct_segment(path: &str, pos: &mut PathPosition) -> XmpResult<XmpPathSegment> {
    let bytes = path.as_bytes();

    pos.name_start = pos.step_begin;

    while pos.step_end < path.len() && !matches!(bytes[pos.step_end], b'/' | b'[' | b'*') {
        pos.step_end += 1;
    }

    pos.name_end = pos.step_end;

    if pos.step_end == pos.step_begin {
        return Err(XmpError::BadXPath("Empty XMPPath segment".to_string()));
    }

    Ok(XmpPathSegment::new(
        &path[pos.step_begin..pos.step_end],
        XmpPathStepKind::StructField,
    ))
}

/// Parses an array index segment: a numeric index, `[last()]`, or one of
/// the selector forms.
fn parse_index_segment(path: &str, pos: &mut PathPosition) -> XmpResult<XmpPathSegment> {
    let bytes = path.as_bytes();

    // look at the character after the leading '['
    pos.step_end += 1;

    let kind = if bytes.get(pos.step_end).is_some_and(u8::is_ascii_digit) {
        // a numeric (decimal integer) array index
        while pos.step_end < path.len() && bytes[pos.step_end].is_ascii_digit() {
            pos.step_end += 1;
        }

        XmpPathStepKind::ArrayIndex
    } else {
        // could be "[last()]" or one of the selector forms;
        // find the ']' or '='
        while pos.step_end < path.len() && bytes[pos.step_end] != b']' && bytes[pos.step_end] != b'='
        {
            pos.step_end += 1;
        }

        if pos.step_end >= path.len() {
            return Err(XmpError::BadXPath(
                "Missing ']' or '=' for array index".to_string(),
            ));
        }

        if bytes[pos.step_end] == b']' {
            if &path[pos.step_begin..pos.step_end] != "[last()" {
                return Err(XmpError::BadXPath(
                    "Invalid non-numeric array index".to_string(),
                ));
            }

            XmpPathStepKind::ArrayLast
        } else {
            pos.name_start = pos.step_begin + 1;
            pos.name_end = pos.step_end;

            // absorb the '=', remember the quote
            pos.step_end += 1;

            let quote = *bytes.get(pos.step_end).ok_or_else(|| {
                XmpError::BadXPath("No terminating quote for array selector".to_string())
            })?;

            if quote != b'\'' && quote != b'"' {
                return Err(XmpError::BadXPath(
                    "Invalid quote in array selector".to_string(),
                ));
            }

            // absorb the leading quote
            pos.step_end += 1;

            while pos.step_end < path.len() {
                if bytes[pos.step_end] == quote {
                    // check for an escaped (doubled) quote
                    if pos.step_end + 1 >= path.len() || bytes[pos.step_end + 1] != quote {
                        break;
                    }

                    pos.step_end += 1;
                }

                pos.step_end += 1;
            }

            if pos.step_end >= path.len() {
                return Err(XmpError::BadXPath(
                    "No terminating quote for array selector".to_string(),
                ));
            }

            // absorb the trailing quote
            pos.step_end += 1;

            // touched up later, also changing '@' to '?'
            XmpPathStepKind::FieldSelector
        }
    };

    if pos.step_end >= path.len() || bytes[pos.step_end] != b']' {
        return Err(XmpError::BadXPath(
            "Missing ']' for array index".to_string(),
        ));
    }

    pos.step_end += 1;

    Ok(XmpPathSegment::new(
        &path[pos.step_begin..pos.step_end],
        kind,
    ))
}

/// Parses the root step of a path, checks that the namespace and any
/// prefix fit together and redirects to the base property if the root is
/// an alias.
fn parse_root_node(
    schema_ns: &str,
    path: &str,
    pos: &mut PathPosition,
    expanded: &mut XmpPath,
) -> XmpResult<()> {
    let bytes = path.as_bytes();

    while pos.step_end < path.len() && !matches!(bytes[pos.step_end], b'/' | b'[' | b'*') {
        pos.step_end += 1;
    }

    if pos.step_end == pos.step_begin {
        return Err(XmpError::BadXPath("Empty initial XMPPath step".to_string()));
    }

    let root_prop = verify_xpath_root(schema_ns, &path[pos.step_begin..pos.step_end])?;

    let Some(alias_info) = registry::find_alias(&root_prop) else {
        expanded.add(XmpPathSegment::new(schema_ns, XmpPathStepKind::SchemaNode));
        expanded.add(XmpPathSegment::new(root_prop, XmpPathStepKind::StructField));
        return Ok(());
    };

    // add the schema step and the base step of the alias
    expanded.add(XmpPathSegment::new(
        alias_info.namespace.clone(),
        XmpPathStepKind::SchemaNode,
    ));

    let mut root_step = XmpPathSegment::new(
        verify_xpath_root(&alias_info.namespace, &alias_info.prop_name)?,
        XmpPathStepKind::StructField,
    );

    root_step.is_alias = true;
    root_step.alias_form = alias_info.form;

    expanded.add(root_step);

    if alias_info.form.is_array_alt_text() {
        let mut qual_selector_step = XmpPathSegment::new(
            "[?xml:lang='x-default']",
            XmpPathStepKind::QualSelector,
        );

        qual_selector_step.is_alias = true;
        qual_selector_step.alias_form = alias_info.form;

        expanded.add(qual_selector_step);
    } else if alias_info.form.is_array() {
        let mut index_step = XmpPathSegment::new("[1]", XmpPathStepKind::ArrayIndex);

        index_step.is_alias = true;
        index_step.alias_form = alias_info.form;

        expanded.add(index_step);
    }

    Ok(())
}

/// Fails if the qualifier name is not XML conformant or its namespace
/// prefix has not been registered.
fn verify_qual_name(qual_name: &str) -> XmpResult<()> {
    if let Some(colon_pos) = qual_name.find(':') {
        if colon_pos > 0 {
            let prefix = &qual_name[..colon_pos];

            if is_xml_name_ns(prefix) {
                if registry::get_namespace_uri(prefix).is_some() {
                    return Ok(());
                }

                return Err(XmpError::BadXPath(
                    "Unknown namespace prefix for qualified name".to_string(),
                ));
            }
        }
    }

    Err(XmpError::BadXPath(format!(
        "Ill-formed qualified name: {}",
        qual_name
    )))
}

fn verify_simple_xml_name(name: &str) -> XmpResult<()> {
    if !is_xml_name(name) {
        return Err(XmpError::BadXPath("Bad XML name".to_string()));
    }

    Ok(())
}

/// Verifies the root property name against the schema namespace and
/// returns it as a qualified name. An unqualified name is prefixed with
/// the registered prefix of the schema; a qualified name must carry
/// exactly that prefix.
fn verify_xpath_root(schema_ns: &str, root_prop: &str) -> XmpResult<String> {
    if schema_ns.is_empty() {
        return Err(XmpError::BadSchema(
            "Schema namespace URI is required".to_string(),
        ));
    }

    if root_prop.starts_with('?') || root_prop.starts_with('@') {
        return Err(XmpError::BadXPath(format!(
            "Top level name must not be a qualifier, but was '{}'",
            root_prop
        )));
    }

    if root_prop.contains('/') || root_prop.contains('[') {
        return Err(XmpError::BadXPath(format!(
            "Top level name must be simple, but was '{}'",
            root_prop
        )));
    }

    let prefix = registry::get_namespace_prefix(schema_ns).ok_or_else(|| {
        XmpError::BadSchema(format!("Unregistered schema namespace URI: {}", schema_ns))
    })?;

    match root_prop.find(':') {
        None => {
            // the name is unqualified, use the prefix of the schema
            verify_simple_xml_name(root_prop)?;

            Ok(format!("{}:{}", prefix, root_prop))
        }
        Some(colon_pos) => {
            // the name is qualified, make sure the prefix is legitimate
            // and matches the one registered for the schema
            verify_simple_xml_name(&root_prop[..colon_pos])?;
            verify_simple_xml_name(&root_prop[colon_pos..])?;

            if &root_prop[..colon_pos] != prefix {
                return Err(XmpError::BadSchema(
                    "Schema namespace URI and prefix mismatch".to_string(),
                ));
            }

            Ok(root_prop.to_string())
        }
    }
}

/// Compose the path expression of an item in an array. An index of
/// [`ARRAY_LAST_ITEM`] addresses the last existing item.
pub fn compose_array_item_path(array_name: &str, item_index: i32) -> XmpResult<String> {
    if item_index > 0 {
        Ok(format!("{}[{}]", array_name, item_index))
    } else if item_index == ARRAY_LAST_ITEM {
        Ok(format!("{}[last()]", array_name))
    } else {
        Err(XmpError::BadParam("Array index must be larger than zero".to_string()))
    }
}

/// Compose the path expression to select a struct field, e.g.
/// `/stDim:w`. The result can be appended to an existing path.
pub fn compose_struct_field_path(field_ns: &str, field_name: &str) -> XmpResult<String> {
    if field_ns.is_empty() {
        return Err(XmpError::BadParam("Empty field namespace URI".to_string()));
    }

    if field_name.is_empty() {
        return Err(XmpError::BadParam("Empty field name".to_string()));
    }

    let field_path = expand_path(field_ns, field_name)?;

    if field_path.len() != 2 {
        return Err(XmpError::BadXPath(
            "The field name must be simple".to_string(),
        ));
    }

    Ok(format!("/{}", field_path.segment(STEP_ROOT_PROP).name))
}

/// Compose the path expression to select a qualifier, e.g. `/?xml:lang`.
pub fn compose_qualifier_path(qual_ns: &str, qual_name: &str) -> XmpResult<String> {
    if qual_ns.is_empty() {
        return Err(XmpError::BadParam("Empty qualifier namespace URI".to_string()));
    }

    if qual_name.is_empty() {
        return Err(XmpError::BadParam("Empty qualifier name".to_string()));
    }

    let qual_path = expand_path(qual_ns, qual_name)?;

    if qual_path.len() != 2 {
        return Err(XmpError::BadXPath(
            "The qualifier name must be simple".to_string(),
        ));
    }

    Ok(format!("/?{}", qual_path.segment(STEP_ROOT_PROP).name))
}

/// Compose the selector of an alt-text array item by language, e.g.
/// `[?xml:lang="x-default"]`.
pub fn compose_lang_selector(lang_name: &str) -> String {
    format!("[?xml:lang=\"{}\"]", normalize_lang_value(lang_name))
}
