use crate::emitter::JsonEmitter;
use crate::err::{SerializationError, SerializationResult};
use crate::model::NodePath;

use log::trace;
use std::io::{Result as IoResult, Write};

/// Minimal, allocation-avoiding JSON token writer.
///
/// Escapes and streams strings without building intermediates, and writes
/// numbers via itoa/ryu.
pub struct JsonWriter<W: Write> {
    pub(crate) writer: W,
}

impl<W: Write> JsonWriter<W> {
    #[inline]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.writer.write_all(bytes)
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) -> IoResult<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Writes a JSON-escaped string surrounded by quotes.
    pub fn write_quoted_str(&mut self, s: &str) -> IoResult<()> {
        let bytes = s.as_bytes();
        // Fast path: nothing to escape.
        if !bytes.iter().any(|&b| needs_escape(b)) {
            self.write_bytes(b"\"")?;
            self.write_bytes(bytes)?;
            return self.write_bytes(b"\"");
        }

        // Escape path: stream unescaped runs between escapes.
        self.write_bytes(b"\"")?;
        let hex = b"0123456789ABCDEF";
        let mut run_start = 0usize;
        for (i, &b) in bytes.iter().enumerate() {
            if !needs_escape(b) {
                continue;
            }
            if run_start < i {
                self.write_bytes(&bytes[run_start..i])?;
            }
            match b {
                b'"' => self.write_bytes(b"\\\"")?,
                b'\\' => self.write_bytes(b"\\\\")?,
                b'\n' => self.write_bytes(b"\\n")?,
                b'\r' => self.write_bytes(b"\\r")?,
                b'\t' => self.write_bytes(b"\\t")?,
                0x08 => self.write_bytes(b"\\b")?,
                0x0C => self.write_bytes(b"\\f")?,
                _ => {
                    let esc = [
                        b'\\',
                        b'u',
                        b'0',
                        b'0',
                        hex[(b >> 4) as usize],
                        hex[(b & 0x0F) as usize],
                    ];
                    self.write_bytes(&esc)?;
                }
            }
            run_start = i + 1;
        }
        if run_start < bytes.len() {
            self.write_bytes(&bytes[run_start..])?;
        }
        self.write_bytes(b"\"")
    }

    #[inline]
    pub fn write_i64(&mut self, n: i64) -> IoResult<()> {
        let mut buf = itoa::Buffer::new();
        self.write_str(buf.format(n))
    }

    /// Callers must reject non-finite values; ryu would print `NaN`/`inf`.
    #[inline]
    pub fn write_f64(&mut self, n: f64) -> IoResult<()> {
        let mut buf = ryu::Buffer::new();
        self.write_str(buf.format_finite(n))
    }

    #[inline]
    pub fn write_bool(&mut self, b: bool) -> IoResult<()> {
        if b {
            self.write_bytes(b"true")
        } else {
            self.write_bytes(b"false")
        }
    }

    #[inline]
    pub fn colon(&mut self) -> IoResult<()> {
        self.write_bytes(b":")
    }

    #[inline]
    pub fn comma(&mut self) -> IoResult<()> {
        self.write_bytes(b",")
    }
}

#[inline]
fn needs_escape(b: u8) -> bool {
    matches!(b, b'"' | b'\\') || b <= 0x1F
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Object,
    Array,
}

struct Container {
    kind: ContainerKind,
    // Whether this container has emitted at least one entry, for comma management.
    has_any: bool,
    // Objects only: a key was written and its value is outstanding.
    awaiting_value: bool,
}

/// Streaming [`JsonEmitter`]: writes compact JSON text as events arrive.
pub struct JsonStreamEmitter<W: Write> {
    writer: JsonWriter<W>,
    stack: Vec<Container>,
    wrote_root: bool,
}

impl<W: Write> JsonStreamEmitter<W> {
    pub fn new(writer: W) -> Self {
        JsonStreamEmitter {
            writer: JsonWriter::new(writer),
            stack: Vec::new(),
            wrote_root: false,
        }
    }

    fn misuse(message: impl Into<String>) -> SerializationError {
        SerializationError::invalid_state(NodePath::root(), message)
    }

    /// Positions the writer for a value: writes the array comma if needed and
    /// checks that object values follow a key.
    fn before_value(&mut self) -> SerializationResult<()> {
        match self.stack.last_mut() {
            Some(Container {
                kind: ContainerKind::Array,
                has_any,
                ..
            }) => {
                if *has_any {
                    self.writer.comma()?;
                }
                *has_any = true;
                Ok(())
            }
            Some(Container {
                kind: ContainerKind::Object,
                awaiting_value,
                ..
            }) => {
                if !*awaiting_value {
                    return Err(Self::misuse("object value emitted without a key"));
                }
                *awaiting_value = false;
                Ok(())
            }
            None if !self.wrote_root => {
                self.wrote_root = true;
                Ok(())
            }
            None => Err(Self::misuse("more than one top-level value emitted")),
        }
    }

    fn close(&mut self, kind: ContainerKind) -> SerializationResult<()> {
        match self.stack.pop() {
            Some(c) if c.kind == kind && !c.awaiting_value => Ok(()),
            Some(c) if c.kind == kind => {
                Err(Self::misuse("object closed before the last key's value"))
            }
            _ => Err(Self::misuse(format!("unbalanced close of {:?}", kind))),
        }
    }
}

impl<W: Write> JsonEmitter for JsonStreamEmitter<W> {
    type Output = W;

    fn begin_object(&mut self) -> SerializationResult<()> {
        trace!("begin_object");
        self.before_value()?;
        self.writer.write_bytes(b"{")?;
        self.stack.push(Container {
            kind: ContainerKind::Object,
            has_any: false,
            awaiting_value: false,
        });
        Ok(())
    }

    fn end_object(&mut self) -> SerializationResult<()> {
        trace!("end_object");
        self.close(ContainerKind::Object)?;
        self.writer.write_bytes(b"}")?;
        Ok(())
    }

    fn key(&mut self, key: &str) -> SerializationResult<()> {
        let needs_comma = match self.stack.last_mut() {
            Some(c) if c.kind == ContainerKind::Object && !c.awaiting_value => {
                let needs_comma = c.has_any;
                c.has_any = true;
                c.awaiting_value = true;
                needs_comma
            }
            _ => return Err(Self::misuse(format!("key `{}` emitted outside of an object", key))),
        };
        if needs_comma {
            self.writer.comma()?;
        }
        self.writer.write_quoted_str(key)?;
        self.writer.colon()?;
        Ok(())
    }

    fn begin_array(&mut self) -> SerializationResult<()> {
        trace!("begin_array");
        self.before_value()?;
        self.writer.write_bytes(b"[")?;
        self.stack.push(Container {
            kind: ContainerKind::Array,
            has_any: false,
            awaiting_value: false,
        });
        Ok(())
    }

    fn end_array(&mut self) -> SerializationResult<()> {
        trace!("end_array");
        self.close(ContainerKind::Array)?;
        self.writer.write_bytes(b"]")?;
        Ok(())
    }

    fn string(&mut self, value: &str) -> SerializationResult<()> {
        self.before_value()?;
        self.writer.write_quoted_str(value)?;
        Ok(())
    }

    fn integer(&mut self, value: i64) -> SerializationResult<()> {
        self.before_value()?;
        self.writer.write_i64(value)?;
        Ok(())
    }

    fn float(&mut self, value: f64) -> SerializationResult<()> {
        if !value.is_finite() {
            return Err(Self::misuse(format!("`{}` is not a finite number", value)));
        }
        self.before_value()?;
        self.writer.write_f64(value)?;
        Ok(())
    }

    fn boolean(&mut self, value: bool) -> SerializationResult<()> {
        self.before_value()?;
        self.writer.write_bool(value)?;
        Ok(())
    }

    fn finish(mut self) -> SerializationResult<W> {
        if !self.stack.is_empty() {
            return Err(Self::misuse(format!(
                "{} container(s) still open at the end of the document",
                self.stack.len()
            )));
        }
        if !self.wrote_root {
            return Err(Self::misuse("no value was emitted"));
        }
        self.writer.writer.flush()?;
        Ok(self.writer.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quoted(s: &str) -> String {
        let mut w = JsonWriter::new(Vec::new());
        w.write_quoted_str(s).unwrap();
        String::from_utf8(w.writer).unwrap()
    }

    #[test]
    fn test_escaping() {
        assert_eq!(quoted("plain"), r#""plain""#);
        assert_eq!(quoted("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(quoted("line\nbreak\ttab\r"), r#""line\nbreak\ttab\r""#);
        assert_eq!(quoted("\u{1}\u{1F}"), r#""\u0001\u001F""#);
        assert_eq!(quoted("\u{8}\u{c}"), r#""\b\f""#);
        assert_eq!(quoted("héllo ✓"), "\"héllo ✓\"");
    }

    #[test]
    fn test_escaped_output_parses_back() {
        let input = "quote \" slash \\ nul \u{0} bell \u{7} del \u{7f}";
        let parsed: String = serde_json::from_str(&quoted(input)).unwrap();
        assert_eq!(parsed, input);
    }

    #[test]
    fn test_stream_commas() {
        let mut e = JsonStreamEmitter::new(Vec::new());
        e.begin_object().unwrap();
        e.key("a").unwrap();
        e.begin_array().unwrap();
        e.string("x").unwrap();
        e.integer(-3).unwrap();
        e.begin_object().unwrap();
        e.end_object().unwrap();
        e.end_array().unwrap();
        e.key("b").unwrap();
        e.boolean(false).unwrap();
        e.key("c").unwrap();
        e.float(2.5).unwrap();
        e.end_object().unwrap();

        let out = String::from_utf8(e.finish().unwrap()).unwrap();
        assert_eq!(out, r#"{"a":["x",-3,{}],"b":false,"c":2.5}"#);
    }

    #[test]
    fn test_stream_rejects_misuse() {
        let mut e = JsonStreamEmitter::new(Vec::new());
        e.begin_object().unwrap();
        assert!(e.string("no key").is_err());

        let mut e = JsonStreamEmitter::new(Vec::new());
        assert!(e.float(f64::INFINITY).is_err());

        let mut e = JsonStreamEmitter::new(Vec::new());
        e.begin_array().unwrap();
        assert!(e.end_object().is_err());
    }
}
