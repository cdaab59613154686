use crate::emitter::ValueEmitter;
use crate::err::{
    DeserializationError, DeserializationResult, MappedJsonError, Result, SerializationError,
    SerializationResult,
};
use crate::hints::{ArrayHint, NamedCollections};
use crate::json_writer::JsonStreamEmitter;
use crate::model::{Document, NodePath, NodeValue};
use crate::reader::MappedJsonReader;
use crate::serializer::Serializer;
use crate::settings::WriterSettings;
use crate::tree_sink::{HierarchicalStreamWriter, TreeSink};

use encoding::label::encoding_from_whatwg_label;
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use log::{debug, warn};
use std::io::{Read, Write};

const UTF_8: &str = "utf-8";

/// Creates writers and readers for the mapped JSON convention.
///
/// With `use_array_hints` (the default) writers keep the caller's
/// [`ArrayHint`]s and repeated collection members render as arrays. Without
/// it, writers discard hints and repeated names keep their last node, which
/// matches documents written before hints existed but does not round-trip.
pub struct MappedJsonDriver {
    settings: WriterSettings,
    serializer: Serializer,
    encoding: EncodingRef,
}

impl MappedJsonDriver {
    pub fn new(settings: WriterSettings) -> Result<Self> {
        settings
            .validate()
            .map_err(|message| MappedJsonError::InvalidSettings { message })?;

        let encoding = encoding_from_whatwg_label(settings.encoding_label()).ok_or_else(|| {
            MappedJsonError::UnsupportedEncoding {
                label: settings.encoding_label().to_owned(),
            }
        })?;
        debug!(
            "resolved encoding label `{}` to `{}`",
            settings.encoding_label(),
            encoding.name()
        );

        Ok(MappedJsonDriver {
            serializer: Serializer::new(&settings),
            settings,
            encoding,
        })
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// The collection names from the settings, as a hint source for the XML bridge.
    pub fn collection_hints(&self) -> NamedCollections {
        NamedCollections::new(self.settings.collection_names().iter().cloned())
    }

    /// Starts a write session. Nothing reaches `target` before [`MappedJsonWriter::close`].
    pub fn create_writer<W: Write>(&self, target: W) -> MappedJsonWriter<'_, W> {
        let keep_hints = self.settings.should_use_array_hints();
        if !keep_hints {
            warn!("array hints are disabled; written documents cannot be read back losslessly");
        }
        MappedJsonWriter {
            driver: self,
            sink: TreeSink::new(),
            target,
            keep_hints,
        }
    }

    /// Reads the whole of `source` and parses it as a mapped JSON document.
    pub fn create_reader<R: Read>(&self, mut source: R) -> Result<MappedJsonReader> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(DeserializationError::from)?;
        let text = self.decode(&bytes)?;
        Ok(MappedJsonReader::from_document(self.parse_str(&text)?))
    }

    pub fn parse_str(&self, text: &str) -> DeserializationResult<Document> {
        crate::reader::parse_document(text, &self.settings)
    }

    /// Renders `document` to bytes in the configured encoding.
    pub fn render(&self, document: &Document) -> SerializationResult<Vec<u8>> {
        let utf8 = if self.settings.should_indent() {
            let value = self.serializer.serialize(document, ValueEmitter::new())?;
            serde_json::to_vec_pretty(&value)
                .map_err(|e| SerializationError::encoding(NodePath::root(), e.to_string()))?
        } else {
            self.serializer
                .serialize(document, JsonStreamEmitter::new(Vec::new()))?
        };
        self.encode(utf8)
    }

    fn is_utf8(&self) -> bool {
        self.encoding.name() == UTF_8
    }

    fn encode(&self, utf8: Vec<u8>) -> SerializationResult<Vec<u8>> {
        if self.is_utf8() {
            return Ok(utf8);
        }
        // Both emitters only ever produce valid UTF-8.
        let text = String::from_utf8(utf8)
            .map_err(|e| SerializationError::encoding(NodePath::root(), e.to_string()))?;
        self.encoding
            .encode(&text, EncoderTrap::Strict)
            .map_err(|cause| {
                SerializationError::encoding(
                    NodePath::root(),
                    format!("cannot encode as `{}`: {}", self.encoding.name(), cause),
                )
            })
    }

    fn decode(&self, bytes: &[u8]) -> DeserializationResult<String> {
        let decode_error = |message: String| DeserializationError::Decode {
            encoding: self.encoding.name().to_owned(),
            message,
        };
        if self.is_utf8() {
            return String::from_utf8(bytes.to_vec()).map_err(|e| decode_error(e.to_string()));
        }
        self.encoding
            .decode(bytes, DecoderTrap::Strict)
            .map_err(|cause| decode_error(cause.into_owned()))
    }
}

/// A write session created by [`MappedJsonDriver::create_writer`].
///
/// The document is buffered in memory and written with a single `write_all`
/// on [`close`](MappedJsonWriter::close). Dropping the writer abandons the
/// session without writing anything.
pub struct MappedJsonWriter<'d, W: Write> {
    driver: &'d MappedJsonDriver,
    sink: TreeSink,
    target: W,
    keep_hints: bool,
}

impl<W: Write> MappedJsonWriter<'_, W> {
    /// Finalizes, renders and writes the document, then hands back the target.
    pub fn close(self) -> SerializationResult<W> {
        let MappedJsonWriter {
            driver,
            sink,
            mut target,
            ..
        } = self;

        let document = sink.finish()?;
        let bytes = driver.render(&document)?;
        debug!(
            "writing {} node(s) as {} byte(s)",
            document.node_count(),
            bytes.len()
        );
        target.write_all(&bytes)?;
        target.flush()?;
        Ok(target)
    }

    /// Finalizes the document without writing it.
    pub fn into_document(self) -> SerializationResult<Document> {
        self.sink.finish()
    }

    pub fn current_path(&self) -> &NodePath {
        self.sink.current_path()
    }
}

impl<W: Write> HierarchicalStreamWriter for MappedJsonWriter<'_, W> {
    fn start_node(&mut self, name: &str, hint: ArrayHint) -> SerializationResult<()> {
        let hint = if self.keep_hints { hint } else { ArrayHint::None };
        self.sink.start_node(name, hint)
    }

    fn add_attribute(&mut self, name: &str, value: &str) -> SerializationResult<()> {
        self.sink.add_attribute(name, value)
    }

    fn set_value(&mut self, text: &str) -> SerializationResult<()> {
        self.sink.set_value(text)
    }

    fn set_typed_value(&mut self, value: NodeValue) -> SerializationResult<()> {
        self.sink.set_typed_value(value)
    }

    fn end_node(&mut self) -> SerializationResult<()> {
        self.sink.end_node()
    }
}
