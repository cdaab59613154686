
use fixtures::*;

use mapped_json::err::SerializationError;
use mapped_json::{
    ArrayHint, Document, HierarchicalStreamWriter, MappedJsonDriver, Node, NodeValue, TreeSink,
    WriterSettings,
};
use pretty_assertions::assert_eq;

fn render(
    settings: WriterSettings,
    write: impl FnOnce(&mut dyn HierarchicalStreamWriter),
) -> String {
    let driver = MappedJsonDriver::new(settings).unwrap();
    let mut writer = driver.create_writer(Vec::new());
    write(&mut writer);
    String::from_utf8(writer.close().unwrap()).unwrap()
}

#[test]
fn test_node_count_matches_start_calls() {
    ensure_env_logger_initialized();
    let mut sink = TreeSink::new();
    let mut started = 0;

    sink.start_node("library", ArrayHint::None).unwrap();
    started += 1;
    for (shelf, books) in [("a", 3), ("b", 0), ("c", 1)] {
        sink.start_node("shelf", ArrayHint::Member).unwrap();
        started += 1;
        sink.add_attribute("label", shelf).unwrap();
        for n in 0..books {
            sink.start_node("book", ArrayHint::Member).unwrap();
            started += 1;
            sink.set_typed_value(NodeValue::Integer(n)).unwrap();
            sink.end_node().unwrap();
        }
        sink.end_node().unwrap();
    }
    sink.end_node().unwrap();

    assert_eq!(sink.finish().unwrap().node_count(), started);
}

#[test]
fn test_three_hinted_items_render_as_an_array() {
    let json = render(WriterSettings::new(), |w| {
        write_empty_items(w, 3, ArrayHint::Member).unwrap()
    });

    assert_eq!(json, r#"{"list":{"item":["","",""]}}"#);
}

#[test]
fn test_marked_empty_collection_renders_as_empty_array() {
    let json = render(WriterSettings::new(), |w| {
        write_empty_items(w, 1, ArrayHint::EmptyCollection).unwrap()
    });

    assert_eq!(json, r#"{"list":{"item":[]}}"#);
}

#[test]
fn test_unmarked_leaf_renders_as_empty_string() {
    let json = render(WriterSettings::new(), |w| {
        write_empty_items(w, 1, ArrayHint::None).unwrap()
    });

    assert_eq!(json, r#"{"list":{"item":""}}"#);
}

#[test]
fn test_single_member_is_still_an_array() {
    let json = render(WriterSettings::new(), |w| {
        write_empty_items(w, 1, ArrayHint::Member).unwrap()
    });

    assert_eq!(json, r#"{"list":{"item":[""]}}"#);
}

#[test]
fn test_legacy_mode_keeps_the_last_sibling() {
    ensure_env_logger_initialized();
    let json = render(WriterSettings::new().use_array_hints(false), |w| {
        w.start_node("list", ArrayHint::None).unwrap();
        for value in ["first", "second", "last"] {
            w.start_node("item", ArrayHint::Member).unwrap();
            w.set_value(value).unwrap();
            w.end_node().unwrap();
        }
        w.end_node().unwrap();
    });

    assert_eq!(json, r#"{"list":{"item":"last"}}"#);
}

#[test]
fn test_legacy_mode_on_empty_items() {
    let json = render(WriterSettings::new().use_array_hints(false), |w| {
        write_empty_items(w, 3, ArrayHint::Member).unwrap()
    });

    assert_eq!(json, r#"{"list":{"item":""}}"#);
}

#[test]
fn test_end_node_on_empty_stack_leaves_no_state() {
    let mut sink = TreeSink::new();

    let err = sink.end_node().unwrap_err();
    assert!(matches!(err, SerializationError::InvalidState { .. }));
    assert!(sink.is_aborted());
    assert_eq!(sink.depth(), 0);

    // Nothing can be salvaged from an aborted session.
    assert!(sink.start_node("a", ArrayHint::None).is_err());
    assert!(matches!(
        sink.finish().unwrap_err(),
        SerializationError::InvalidState { .. }
    ));
}

#[test]
fn test_failed_session_writes_nothing() {
    let driver = MappedJsonDriver::new(WriterSettings::new()).unwrap();
    let mut out = Vec::new();
    let mut writer = driver.create_writer(&mut out);

    writer.start_node("a", ArrayHint::None).unwrap();
    writer.end_node().unwrap();
    assert!(writer.end_node().is_err());
    assert!(writer.close().is_err());

    assert!(out.is_empty());
}

#[test]
fn test_errors_carry_the_node_path() {
    let mut sink = TreeSink::new();
    sink.start_node("order", ArrayHint::None).unwrap();
    sink.start_node("item", ArrayHint::Member).unwrap();
    sink.set_value("x").unwrap();

    let err = sink.add_attribute("sku", "1").unwrap_err();
    assert!(
        matches!(err, SerializationError::InvalidState { ref path, .. } if path == "/order/item"),
        "{:?}",
        err
    );
}

#[test]
fn test_writer_and_sink_build_the_same_document() {
    let driver = MappedJsonDriver::new(WriterSettings::new()).unwrap();
    let mut writer = driver.create_writer(Vec::new());
    write_empty_items(&mut writer, 2, ArrayHint::Member).unwrap();

    assert_eq!(
        writer.into_document().unwrap(),
        Document::new(
            Node::new("list")
                .with_child(Node::new("item").with_hint(ArrayHint::Member))
                .with_child(Node::new("item").with_hint(ArrayHint::Member))
        )
    );
}
