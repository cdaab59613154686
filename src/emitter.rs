//! The JSON emitter capability the serializer renders through.
//!
//! Two variants exist: [`ValueEmitter`] builds an in-memory `serde_json::Value`
//! tree, and [`JsonStreamEmitter`](crate::JsonStreamEmitter) writes JSON text
//! straight into an `io::Write`.
use crate::err::{SerializationError, SerializationResult};
use crate::model::NodePath;

use log::trace;
use serde_json::{Map, Number, Value};

pub trait JsonEmitter {
    type Output;

    fn begin_object(&mut self) -> SerializationResult<()>;
    fn end_object(&mut self) -> SerializationResult<()>;
    /// Names the next value of the current object.
    fn key(&mut self, key: &str) -> SerializationResult<()>;
    fn begin_array(&mut self) -> SerializationResult<()>;
    fn end_array(&mut self) -> SerializationResult<()>;
    fn string(&mut self, value: &str) -> SerializationResult<()>;
    fn integer(&mut self, value: i64) -> SerializationResult<()>;
    /// Only finite values can be emitted.
    fn float(&mut self, value: f64) -> SerializationResult<()>;
    fn boolean(&mut self, value: bool) -> SerializationResult<()>;
    /// Consumes the emitter once exactly one top-level value has been written.
    fn finish(self) -> SerializationResult<Self::Output>;
}

enum Frame {
    Object {
        map: Map<String, Value>,
        pending_key: Option<String>,
    },
    Array(Vec<Value>),
}

/// Builds a `serde_json::Value`; object keys keep insertion order.
#[derive(Default)]
pub struct ValueEmitter {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl ValueEmitter {
    pub fn new() -> Self {
        ValueEmitter::default()
    }

    fn misuse(message: impl Into<String>) -> SerializationError {
        SerializationError::invalid_state(NodePath::root(), message)
    }

    /// Places a completed value in the enclosing container, or makes it the root.
    fn push_value(&mut self, value: Value) -> SerializationResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { map, pending_key }) => {
                let key = pending_key
                    .take()
                    .ok_or_else(|| Self::misuse("object value emitted without a key"))?;
                map.insert(key, value);
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(Self::misuse("more than one top-level value emitted")),
        }
    }
}

impl JsonEmitter for ValueEmitter {
    type Output = Value;

    fn begin_object(&mut self) -> SerializationResult<()> {
        trace!("begin_object");
        self.stack.push(Frame::Object {
            map: Map::new(),
            pending_key: None,
        });
        Ok(())
    }

    fn end_object(&mut self) -> SerializationResult<()> {
        trace!("end_object");
        match self.stack.pop() {
            Some(Frame::Object {
                map,
                pending_key: None,
            }) => self.push_value(Value::Object(map)),
            Some(Frame::Object {
                pending_key: Some(key),
                ..
            }) => Err(Self::misuse(format!("object closed before a value for `{}`", key))),
            _ => Err(Self::misuse("`end_object` without a matching `begin_object`")),
        }
    }

    fn key(&mut self, key: &str) -> SerializationResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { pending_key, .. }) if pending_key.is_none() => {
                *pending_key = Some(key.to_owned());
                Ok(())
            }
            _ => Err(Self::misuse(format!("key `{}` emitted outside of an object", key))),
        }
    }

    fn begin_array(&mut self) -> SerializationResult<()> {
        trace!("begin_array");
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> SerializationResult<()> {
        trace!("end_array");
        match self.stack.pop() {
            Some(Frame::Array(items)) => self.push_value(Value::Array(items)),
            _ => Err(Self::misuse("`end_array` without a matching `begin_array`")),
        }
    }

    fn string(&mut self, value: &str) -> SerializationResult<()> {
        self.push_value(Value::String(value.to_owned()))
    }

    fn integer(&mut self, value: i64) -> SerializationResult<()> {
        self.push_value(Value::Number(value.into()))
    }

    fn float(&mut self, value: f64) -> SerializationResult<()> {
        let number = Number::from_f64(value)
            .ok_or_else(|| Self::misuse(format!("`{}` is not a finite number", value)))?;
        self.push_value(Value::Number(number))
    }

    fn boolean(&mut self, value: bool) -> SerializationResult<()> {
        self.push_value(Value::Bool(value))
    }

    fn finish(self) -> SerializationResult<Value> {
        if !self.stack.is_empty() {
            return Err(Self::misuse(format!(
                "{} container(s) still open at the end of the document",
                self.stack.len()
            )));
        }
        self.root
            .ok_or_else(|| Self::misuse("no value was emitted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builds_nested_value() {
        let mut e = ValueEmitter::new();
        e.begin_object().unwrap();
        e.key("b").unwrap();
        e.begin_array().unwrap();
        e.string("x").unwrap();
        e.integer(2).unwrap();
        e.float(0.5).unwrap();
        e.boolean(true).unwrap();
        e.end_array().unwrap();
        e.key("a").unwrap();
        e.string("").unwrap();
        e.end_object().unwrap();

        let value = e.finish().unwrap();
        assert_eq!(value, json!({"b": ["x", 2, 0.5, true], "a": ""}));
        // preserve_order keeps `b` first.
        assert_eq!(value.to_string(), r#"{"b":["x",2,0.5,true],"a":""}"#);
    }

    #[test]
    fn test_rejects_non_finite_float() {
        let mut e = ValueEmitter::new();
        assert!(e.float(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_unbalanced_output() {
        let mut e = ValueEmitter::new();
        e.begin_object().unwrap();
        assert!(e.finish().is_err());

        let mut e = ValueEmitter::new();
        e.begin_object().unwrap();
        assert!(e.string("no key").is_err());
    }
}
