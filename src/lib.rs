#![deny(unused_must_use)]
#![forbid(unsafe_code)]
//! A hierarchical stream writer and reader for the mapped JSON convention.
//!
//! Callers describe a document through the four-call
//! [`HierarchicalStreamWriter`] contract (`start_node`, `add_attribute`,
//! `set_value`, `end_node`). Each `start_node` carries an [`ArrayHint`] telling
//! the writer whether the node belongs to a collection, since JSON can only
//! express repeated elements as arrays.
//!
//! ```
//! use mapped_json::{ArrayHint, HierarchicalStreamWriter, MappedJsonDriver, WriterSettings};
//!
//! let driver = MappedJsonDriver::new(WriterSettings::new()).unwrap();
//! let mut writer = driver.create_writer(Vec::new());
//!
//! writer.start_node("order", ArrayHint::None).unwrap();
//! writer.add_attribute("id", "7").unwrap();
//! for name in ["apple", "pear"] {
//!     writer.start_node("item", ArrayHint::Member).unwrap();
//!     writer.set_value(name).unwrap();
//!     writer.end_node().unwrap();
//! }
//! writer.end_node().unwrap();
//!
//! let json = String::from_utf8(writer.close().unwrap()).unwrap();
//! assert_eq!(json, r#"{"order":{"@id":"7","item":["apple","pear"]}}"#);
//! ```

pub use driver::{MappedJsonDriver, MappedJsonWriter};
pub use emitter::{JsonEmitter, ValueEmitter};
pub use hints::{ArrayHint, CollectionHints, NamedCollections, NoHints};
pub use json_writer::JsonStreamEmitter;
pub use model::{Attribute, Document, Node, NodePath, NodeValue};
pub use reader::{DROPPED_ROOT_NAME, MappedJsonReader};
pub use serializer::Serializer;
pub use settings::{MixedContentPolicy, WriterSettings};
pub use tree_sink::{HierarchicalStreamWriter, TreeSink};

mod array_policy;
mod convention;
mod driver;
mod emitter;
pub mod err;
mod hints;
mod json_writer;
pub mod model;
mod reader;
mod serializer;
mod settings;
mod tree_sink;
pub mod xml;

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;
    use std::sync::Once;

    static LOGGER_INIT: Once = Once::new();

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
