//! Utility functions shared by the path engine and the RDF codec

/// Number of `-` separators in a UUID.
const UUID_SEGMENT_COUNT: usize = 4;

/// Length of a UUID including separators.
pub const UUID_LENGTH: usize = 32 + UUID_SEGMENT_COUNT;

/// Normalize an `xml:lang` value so that comparisons are effectively case
/// insensitive as required by RFC 3066. The normalization rules:
///
/// - The primary subtag is lower case, the suggested practice of ISO 639.
/// - All 2 letter secondary subtags are upper case, the suggested practice
///   of ISO 3166.
/// - All other subtags are lower case.
pub fn normalize_lang_value(value: &str) -> String {
    // x-default is a reserved marker, not a language tag
    if value == crate::core::constants::X_DEFAULT {
        return value.to_string();
    }

    let mut subtag = 1;
    let mut buffer = String::with_capacity(value.len());

    for ch in value.chars() {
        match ch {
            '-' | '_' => {
                // move to the next subtag and convert underscore to hyphen
                buffer.push('-');
                subtag += 1;
            }
            ' ' => {}
            _ => {
                if subtag != 2 {
                    buffer.extend(ch.to_lowercase());
                } else {
                    buffer.extend(ch.to_uppercase());
                }
            }
        }
    }

    buffer
}

/// Split the name and value parts of a field or qualifier selector:
///
/// - `[qualName="value"]` - an element in an array of structs, chosen by a
///   field value.
/// - `[?qualName="value"]` - an element in an array, chosen by a qualifier
///   value.
///
/// The value portion is a string quoted by `'` or `"`. It may contain any
/// character including a doubled quoting character, and it may be empty.
/// The expression is assumed to be formally correct (the path parser has
/// already validated it).
pub fn split_name_and_value(selector: &str) -> (String, String) {
    let chars: Vec<char> = selector.chars().collect();

    let eq = chars.iter().position(|&c| c == '=').unwrap_or(0);

    let mut pos = 1;
    if chars[pos] == '?' {
        pos += 1;
    }

    let name: String = chars[pos..eq].iter().collect();

    // the character after '=' is the quote
    pos = eq + 1;
    let quote = chars[pos];
    pos += 1;

    let end = chars.len() - 2; // trailing quote and ']'
    let mut value = String::new();

    while pos < end {
        value.push(chars[pos]);
        pos += 1;
        if chars[pos] == quote {
            // skip one quote of a doubled pair
            pos += 1;
        }
    }

    (name, value)
}

/// Check some requirements for a UUID: a length of 36 and the four `-`
/// delimiters at offsets 8, 13, 18 and 23.
pub fn check_uuid_format(uuid: &str) -> bool {
    let mut result = true;
    let mut delim_count = 0;
    let mut delim_pos = 0;

    for ch in uuid.chars() {
        if ch == '-' {
            delim_count += 1;
            result =
                result && (delim_pos == 8 || delim_pos == 13 || delim_pos == 18 || delim_pos == 23);
        }
        delim_pos += 1;
    }

    result && delim_count == UUID_SEGMENT_COUNT && delim_pos == UUID_LENGTH
}

/// Simple check for valid XML names. Within the ASCII range
/// `:` | `[A-Z]` | `_` | `[a-z]` | `[#xC0-#xD6]` | `[#xD8-#xF6]` are
/// accepted as start characters, plus the non-ASCII ranges of the XML 1.1
/// specification.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();

    if let Some(first) = chars.next() {
        if !is_name_start_char(first) {
            return false;
        }
    }

    chars.all(is_name_char)
}

/// Checks if the value is a legal "unqualified" XML name, as defined in the
/// XML Namespaces recommendation: an XML name that contains no colon.
pub fn is_xml_name_ns(name: &str) -> bool {
    let mut chars = name.chars();

    if let Some(first) = chars.next() {
        if !is_name_start_char(first) || first == ':' {
            return false;
        }
    }

    chars.all(|c| is_name_char(c) && c != ':')
}

/// Serializes a node value in XML encoding, for tag bodies and attributes.
///
/// The attribute is always delimited by double quotes, which is why
/// `&apos;` is never emitted. When `escape_whitespace` is set, TAB, LF and
/// CR are written as character references so they survive attribute-value
/// normalization.
pub fn escape_xml(value: &str, for_attribute: bool, escape_whitespace: bool) -> String {
    let needs_escaping = value.chars().any(|c| {
        let is_ws_control = c == '\t' || c == '\n' || c == '\r';
        c == '<' || c == '>' || c == '&' || (escape_whitespace && is_ws_control)
            || (for_attribute && c == '"')
    });

    if !needs_escaping {
        return value.to_string();
    }

    let mut buffer = String::with_capacity(value.len() * 4 / 3);

    for c in value.chars() {
        let is_ws_control = c == '\t' || c == '\n' || c == '\r';

        if escape_whitespace && is_ws_control {
            buffer.push_str("&#x");
            buffer.push_str(&format!("{:X}", c as u32));
            buffer.push(';');
            continue;
        }

        match c {
            '<' => buffer.push_str("&lt;"),
            '>' => buffer.push_str("&gt;"),
            '&' => buffer.push_str("&amp;"),
            '"' if for_attribute => buffer.push_str("&quot;"),
            _ => buffer.push(c),
        }
    }

    buffer
}

/// Replaces ASCII control chars in a node value with a space.
pub fn replace_control_chars_with_space(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Simple check if a character is a valid XML start name char, according to
/// the XML 1.1 specification (http://www.w3.org/TR/xml11/#NT-NameStartChar).
fn is_name_start_char(c: char) -> bool {
    let code = c as u32;

    matches!(c, ':' | '_' | 'A'..='Z' | 'a'..='z')
        || (0xC0..=0xD6).contains(&code)
        || (0xD8..=0xF6).contains(&code)
        || (0xF8..=0x2FF).contains(&code)
        || (0x370..=0x37D).contains(&code)
        || (0x37F..=0x1FFF).contains(&code)
        || (0x200C..=0x200D).contains(&code)
        || (0x2070..=0x218F).contains(&code)
        || (0x2C00..=0x2FEF).contains(&code)
        || (0x3001..=0xD7FF).contains(&code)
        || (0xF900..=0xFDCF).contains(&code)
        || (0xFDF0..=0xFFFD).contains(&code)
        || (0x10000..=0xEFFFF).contains(&code)
}

/// Simple check if a character is a valid XML name char (every char except
/// the first one), according to the XML 1.1 specification.
fn is_name_char(c: char) -> bool {
    let code = c as u32;

    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9')
        || code == 0xB7
        || (0x300..=0x36F).contains(&code)
        || (0x203F..=0x2040).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lang_value() {
        assert_eq!(normalize_lang_value("EN-us"), "en-US");
        assert_eq!(normalize_lang_value("DE"), "de");
        assert_eq!(normalize_lang_value("zh_hans_CN"), "zh-HANS-cn");
        assert_eq!(normalize_lang_value("x-default"), "x-default");
    }

    #[test]
    fn test_normalize_lang_second_subtag_upper() {
        assert_eq!(normalize_lang_value("en-gb"), "en-GB");
        assert_eq!(normalize_lang_value("en-gb-scouse"), "en-GB-scouse");
    }

    #[test]
    fn test_split_name_and_value() {
        let (name, value) = split_name_and_value("[stEvt:action='saved']");
        assert_eq!(name, "stEvt:action");
        assert_eq!(value, "saved");

        let (name, value) = split_name_and_value("[?xml:lang=\"x-default\"]");
        assert_eq!(name, "xml:lang");
        assert_eq!(value, "x-default");
    }

    #[test]
    fn test_split_doubled_quote() {
        let (_, value) = split_name_and_value("[x='a''b']");
        assert_eq!(value, "a'b");

        let (_, value) = split_name_and_value("[x='']");
        assert_eq!(value, "");
    }

    #[test]
    fn test_check_uuid_format() {
        assert!(check_uuid_format("bac965c4-9d87-11d9-9a30-000d936b79c4"));
        assert!(!check_uuid_format("bac965c4-9d87-11d9-9a30"));
        assert!(!check_uuid_format("bac965c49d8711d99a30000d936b79c4"));
    }

    #[test]
    fn test_is_xml_name() {
        assert!(is_xml_name("CreatorTool"));
        assert!(is_xml_name("_private"));
        assert!(!is_xml_name("2fast"));
        assert!(is_xml_name_ns("dc"));
        assert!(!is_xml_name_ns("dc:creator"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b", false, true), "a&lt;b");
        assert_eq!(escape_xml("a\"b", true, true), "a&quot;b");
        assert_eq!(escape_xml("a\"b", false, true), "a\"b");
        assert_eq!(escape_xml("a\nb", true, true), "a&#xA;b");
        assert_eq!(escape_xml("plain", true, true), "plain");
    }

    #[test]
    fn test_replace_control_chars() {
        assert_eq!(replace_control_chars_with_space("a\u{0001}b"), "a b");
    }
}
