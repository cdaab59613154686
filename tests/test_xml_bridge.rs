
use fixtures::*;

use mapped_json::err::MappedJsonError;
use mapped_json::xml::{stream_xml, write_xml};
use mapped_json::{ArrayHint, MappedJsonDriver, NodePath, TreeSink, WriterSettings};
use pretty_assertions::assert_eq;
use quick_xml::Reader;
use std::fs;

fn xml_to_json(xml: &str, settings: WriterSettings) -> Result<String, MappedJsonError> {
    let driver = MappedJsonDriver::new(settings)?;
    let mut writer = driver.create_writer(Vec::new());
    stream_xml(Reader::from_str(xml), &driver.collection_hints(), &mut writer)?;
    Ok(String::from_utf8(writer.close()?).expect("utf-8 output"))
}

#[test]
fn test_sample_xml_converts_to_sample_json() {
    ensure_env_logger_initialized();
    let xml = fs::read_to_string(order_xml()).unwrap();
    let expected = fs::read_to_string(order_json()).unwrap();

    let json = xml_to_json(&xml, WriterSettings::new().serialize_as_array("item")).unwrap();

    assert_eq!(json, expected.trim_end());
}

#[test]
fn test_sample_json_converts_back_to_xml() {
    let driver = MappedJsonDriver::new(WriterSettings::new()).unwrap();
    let reader = driver
        .create_reader(fs::File::open(order_json()).unwrap())
        .unwrap();

    let xml = write_xml(reader.document(), Vec::new(), false).unwrap();
    assert_eq!(
        String::from_utf8(xml).unwrap(),
        concat!(
            r#"<order id="7" currency="EUR"><customer>Ada &amp; Co</customer>"#,
            r#"<item sku="a-1">apple</item><item sku="p-2">pear</item>"#,
            r#"<item sku="q-3">quince</item>"#,
            r#"<note/></order>"#
        )
    );
}

#[test]
fn test_a_lone_collection_member_is_still_an_array() {
    let json = xml_to_json(
        "<order><item>apple</item></order>",
        WriterSettings::new().serialize_as_array("item"),
    )
    .unwrap();

    assert_eq!(json, r#"{"order":{"item":["apple"]}}"#);
}

#[test]
fn test_without_hints_repeated_elements_collapse() {
    let json = xml_to_json(
        "<order><item>apple</item><item>pear</item></order>",
        WriterSettings::new()
            .serialize_as_array("item")
            .use_array_hints(false),
    )
    .unwrap();

    assert_eq!(json, r#"{"order":{"item":"pear"}}"#);
}

#[test]
fn test_unhinted_duplicates_are_kept() {
    ensure_env_logger_initialized();
    let json = xml_to_json(
        "<order><item>apple</item><item>pear</item></order>",
        WriterSettings::new(),
    )
    .unwrap();

    assert_eq!(json, r#"{"order":{"item":["apple","pear"]}}"#);
}

#[test]
fn test_hints_can_depend_on_the_parent_path() {
    let hints = |parent: &NodePath, name: &str| {
        if name == "entry" && parent.to_string() == "/feed" {
            ArrayHint::Member
        } else {
            ArrayHint::None
        }
    };
    let mut sink = TreeSink::new();
    stream_xml(
        Reader::from_str("<feed><entry><entry/></entry></feed>"),
        &hints,
        &mut sink,
    )
    .unwrap();

    let doc = sink.finish().unwrap();
    let outer = &doc.root().children()[0];
    assert_eq!(outer.hint(), ArrayHint::Member);
    assert_eq!(outer.children()[0].hint(), ArrayHint::None);
}

#[test]
fn test_unbalanced_xml_fails() {
    let err = xml_to_json("<order><item></order>", WriterSettings::new()).unwrap_err();

    assert!(matches!(err, MappedJsonError::Xml { .. }), "{:?}", err);
}

#[test]
fn test_truncated_xml_fails() {
    let err = xml_to_json("<order><item>", WriterSettings::new()).unwrap_err();

    // Either the parser notices the missing end tags or the writer refuses to close.
    assert!(
        matches!(
            err,
            MappedJsonError::Xml { .. } | MappedJsonError::Serialization(_)
        ),
        "{:?}",
        err
    );
}
