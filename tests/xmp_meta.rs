//! Tests for the XmpMeta API surface

use pretty_assertions::assert_eq;
use xmpcore::{ns, IteratorOptions, PropertyOptions, XmpMeta};

const SIMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="test 1.0">
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"/>
</rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

#[test]
fn new_empty() {
    let meta = XmpMeta::new();
    assert!(!meta.does_property_exist(ns::XMP, "CreatorTool"));
    assert_eq!(meta.object_name(), "");
}

#[test]
fn from_str_happy_path() {
    let meta = SIMPLE_XMP.parse::<XmpMeta>().unwrap();

    assert_eq!(
        meta.get_property_string(ns::XMP, "CreatorTool")
            .unwrap()
            .as_deref(),
        Some("Adobe Photoshop CS2 Windows")
    );

    assert!(meta.packet_header().unwrap().contains("W5M0MpCehiHzreSzNTczkc9d"));
}

#[test]
fn from_str_invalid_xml() {
    assert!("not valid xml".parse::<XmpMeta>().is_err());
    assert!("".parse::<XmpMeta>().is_err());
}

#[test]
fn set_get_delete_roundtrip() {
    let mut meta = XmpMeta::new();

    meta.set_property(ns::XMP, "CreatorTool", "TestApp").unwrap();
    meta.set_property_integer(ns::XMP, "Rating", 4).unwrap();

    assert_eq!(
        meta.get_property_string(ns::XMP, "CreatorTool").unwrap().as_deref(),
        Some("TestApp")
    );
    assert_eq!(meta.get_property_integer(ns::XMP, "Rating").unwrap(), Some(4));

    meta.delete_property(ns::XMP, "Rating").unwrap();
    assert!(!meta.does_property_exist(ns::XMP, "Rating"));
    assert!(meta.does_property_exist(ns::XMP, "CreatorTool"));
}

#[test]
fn nested_struct_paths() {
    let mut meta = XmpMeta::new();

    meta.set_property(ns::XMP_MM, "DerivedFrom/stRef:instanceID", "xmp.iid:1")
        .unwrap();
    meta.set_property(ns::XMP_MM, "DerivedFrom/stRef:documentID", "xmp.did:2")
        .unwrap();

    assert_eq!(
        meta.get_property_string(ns::XMP_MM, "DerivedFrom/stRef:instanceID")
            .unwrap()
            .as_deref(),
        Some("xmp.iid:1")
    );

    let parent = meta.get_property(ns::XMP_MM, "DerivedFrom").unwrap().unwrap();
    assert!(parent.options.is_struct());
}

#[test]
fn field_selector_addresses_struct_items() {
    let mut meta = XmpMeta::new();

    let mut ordered = PropertyOptions::new();
    ordered.set_array_ordered(true);
    meta.set_property_with_options(ns::XMP_MM, "History", None, ordered).unwrap();

    let mut struct_item = PropertyOptions::new();
    struct_item.set_struct(true);

    meta.set_property_with_options(ns::XMP_MM, "History[1]", None, struct_item)
        .unwrap();
    meta.set_property(ns::XMP_MM, "History[1]/stEvt:action", "created").unwrap();

    meta.set_property_with_options(ns::XMP_MM, "History[2]", None, struct_item)
        .unwrap();
    meta.set_property(ns::XMP_MM, "History[2]/stEvt:action", "saved").unwrap();
    meta.set_property(ns::XMP_MM, "History[2]/stEvt:when", "2024-01-01").unwrap();

    // select the item whose action field is "saved"
    assert_eq!(
        meta.get_property_string(ns::XMP_MM, "History[stEvt:action='saved']/stEvt:when")
            .unwrap()
            .as_deref(),
        Some("2024-01-01")
    );

    // no match is "not found", not an error
    assert_eq!(
        meta.get_property_string(ns::XMP_MM, "History[stEvt:action='printed']/stEvt:when")
            .unwrap(),
        None
    );
}

#[test]
fn last_index_shorthand() {
    let mut meta = XmpMeta::new();

    let mut bag = PropertyOptions::new();
    bag.set_array(true);
    meta.append_array_item(ns::DC, "subject", bag, "first").unwrap();
    meta.append_array_item(ns::DC, "subject", PropertyOptions::new(), "last").unwrap();

    assert_eq!(
        meta.get_property_string(ns::DC, "subject[last()]").unwrap().as_deref(),
        Some("last")
    );
}

#[test]
fn alias_set_and_read_both_directions() {
    // write via alias, read via base
    let mut meta = XmpMeta::new();
    meta.set_property(ns::XMP, "Author", "First Author").unwrap();

    assert_eq!(
        meta.get_property_string(ns::DC, "creator[1]").unwrap().as_deref(),
        Some("First Author")
    );

    // write via base, read via alias
    let mut meta = XmpMeta::new();
    let mut seq = PropertyOptions::new();
    seq.set_array_ordered(true);
    meta.append_array_item(ns::DC, "creator", seq, "Second Author").unwrap();

    assert_eq!(
        meta.get_property_string(ns::XMP, "Author").unwrap().as_deref(),
        Some("Second Author")
    );

    // an alt-text alias reads the x-default item
    let mut meta = XmpMeta::new();
    meta.set_localized_text(ns::DC, "title", None, "x-default", "The Title")
        .unwrap();

    assert_eq!(
        meta.get_property_string(ns::PDF, "Title").unwrap().as_deref(),
        Some("The Title")
    );
}

#[test]
fn serialized_output_uses_canonical_names_only() {
    let mut meta = XmpMeta::new();
    meta.set_property(ns::XMP, "Author", "A. Writer").unwrap();

    let output = meta.serialize_default().unwrap();

    assert!(output.contains("dc:creator"), "output:\n{}", output);
    assert!(!output.contains("xmp:Author"), "output:\n{}", output);
}

#[test]
fn iteration_covers_all_leaves() {
    let mut meta = XmpMeta::new();
    meta.set_property(ns::XMP, "CreatorTool", "App").unwrap();
    meta.set_property(ns::XMP_MM, "DerivedFrom/stRef:instanceID", "xmp.iid:1")
        .unwrap();

    let options = IteratorOptions {
        just_leaf_nodes: true,
        ..IteratorOptions::default()
    };

    let leaves: Vec<(String, String)> = meta
        .iterator_with_options(options)
        .map(|info| (info.path, info.value.unwrap_or_default()))
        .collect();

    assert_eq!(
        leaves,
        vec![
            ("xmp:CreatorTool".to_string(), "App".to_string()),
            (
                "xmpMM:DerivedFrom/stRef:instanceID".to_string(),
                "xmp.iid:1".to_string()
            ),
        ]
    );
}

#[test]
fn qualified_property_keeps_value_and_qualifier() {
    let mut meta = XmpMeta::new();

    meta.set_property(ns::XMP, "CreatorTool", "App").unwrap();
    meta.set_qualifier(ns::XMP, "CreatorTool", ns::XML, "lang", "en")
        .unwrap();

    // the property still reads normally
    assert_eq!(
        meta.get_property_string(ns::XMP, "CreatorTool").unwrap().as_deref(),
        Some("App")
    );

    // and the qualifier via its path form
    assert_eq!(
        meta.get_property_string(ns::XMP, "CreatorTool/?xml:lang")
            .unwrap()
            .as_deref(),
        Some("en")
    );

    // a qualified leaf is forced into element form even in compact mode
    let output = meta.serialize_default().unwrap();
    assert!(!output.contains("xmp:CreatorTool=\""), "output:\n{}", output);
}
