// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

// Derived from Rust JSON library
// https://github.com/rust-lang/rustc-serialize

use std::error::Error as StdError;
use std::fmt;

use indexmap::IndexMap;
use rustc_serialize::Encoder as SerializeEncoder;

use crate::xmlrpc::value::{integer_value, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum EncoderError {
    /// The encodable emitted nothing at all.
    NothingEmitted,
    /// Nested emit calls did not pair up.
    Unbalanced(&'static str),
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EncoderError::NothingEmitted => write!(f, "(nothing was encoded)"),
            EncoderError::Unbalanced(what) => write!(f, "(unbalanced {})", what),
        }
    }
}

impl StdError for EncoderError {}

pub type EncodeResult = Result<(), EncoderError>;

/// Aggregates under construction.
enum Frame {
    Seq(Vec<Value>),
    Record {
        fields: IndexMap<String, Value>,
        field: Option<String>,
    },
    Map {
        entries: Vec<(String, Value)>,
        key: Option<String>,
        reading_key: bool,
    },
    Variant {
        name: String,
        args: Vec<Value>,
    },
}

/// Map keys are written as member names.
fn key_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Int(n) => n.to_string(),
        Value::Double(x) => x.to_string(),
        Value::Boolean(b) => (b as u8).to_string(),
        Value::DateTime(date) => date.to_iso(),
        other => other.to_xml(),
    }
}

/// A `rustc_serialize` encoder that builds a `Value` tree instead of text.
///
/// Structs become `Struct`s, sequences and tuples become `Array`s and maps
/// go through `Value::from_pairs`, so a map keyed `0..n` in order is an
/// `Array`.
pub struct ValueEncoder {
    stack: Vec<Frame>,
    root: Option<Value>,
}

impl ValueEncoder {
    pub fn new() -> ValueEncoder {
        ValueEncoder { stack: Vec::new(), root: None }
    }

    pub fn into_value(self) -> Result<Value, EncoderError> {
        if !self.stack.is_empty() {
            return Err(EncoderError::Unbalanced("aggregate"));
        }
        self.root.ok_or(EncoderError::NothingEmitted)
    }

    fn emit_value(&mut self, value: Value) -> EncodeResult {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(&mut Frame::Seq(ref mut items)) => items.push(value),
            Some(&mut Frame::Record { ref mut fields, ref mut field }) => {
                let name = field.take().ok_or(EncoderError::Unbalanced("struct field"))?;
                fields.insert(name, value);
            }
            Some(&mut Frame::Map { ref mut entries, ref mut key, reading_key }) => {
                if reading_key {
                    *key = Some(key_text(value));
                } else {
                    let name = key.take().ok_or(EncoderError::Unbalanced("map entry"))?;
                    entries.push((name, value));
                }
            }
            Some(&mut Frame::Variant { ref mut args, .. }) => args.push(value),
        }
        Ok(())
    }

    fn nested<F>(&mut self, frame: Frame, f: F) -> Result<Frame, EncoderError>
    where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.stack.push(frame);
        f(self)?;
        self.stack.pop().ok_or(EncoderError::Unbalanced("aggregate"))
    }
}

impl Default for ValueEncoder {
    fn default() -> ValueEncoder {
        ValueEncoder::new()
    }
}

impl SerializeEncoder for ValueEncoder {
    type Error = EncoderError;

    fn emit_nil(&mut self) -> EncodeResult {
        self.emit_value(Value::String(String::new()))
    }

    fn emit_usize(&mut self, v: usize) -> EncodeResult { self.emit_value(integer_value(v)) }
    fn emit_u64(&mut self, v: u64) -> EncodeResult { self.emit_value(integer_value(v)) }
    fn emit_u32(&mut self, v: u32) -> EncodeResult { self.emit_value(integer_value(v)) }
    fn emit_u16(&mut self, v: u16) -> EncodeResult { self.emit_value(Value::Int(i32::from(v))) }
    fn emit_u8(&mut self, v: u8) -> EncodeResult { self.emit_value(Value::Int(i32::from(v))) }

    fn emit_isize(&mut self, v: isize) -> EncodeResult { self.emit_value(integer_value(v)) }
    fn emit_i64(&mut self, v: i64) -> EncodeResult { self.emit_value(integer_value(v)) }
    fn emit_i32(&mut self, v: i32) -> EncodeResult { self.emit_value(Value::Int(v)) }
    fn emit_i16(&mut self, v: i16) -> EncodeResult { self.emit_value(Value::Int(i32::from(v))) }
    fn emit_i8(&mut self, v: i8) -> EncodeResult { self.emit_value(Value::Int(i32::from(v))) }

    fn emit_bool(&mut self, v: bool) -> EncodeResult {
        self.emit_value(Value::Boolean(v))
    }

    fn emit_f64(&mut self, v: f64) -> EncodeResult {
        self.emit_value(Value::Double(v))
    }
    fn emit_f32(&mut self, v: f32) -> EncodeResult { self.emit_f64(f64::from(v)) }

    fn emit_char(&mut self, v: char) -> EncodeResult {
        self.emit_value(Value::String(v.to_string()))
    }
    fn emit_str(&mut self, v: &str) -> EncodeResult {
        self.emit_value(Value::String(v.to_string()))
    }

    fn emit_enum<F>(&mut self, _name: &str, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }

    // Unit variants are strings. Variants with fields become a one member
    // struct: Kangaroo(34, "William") =>
    //   <struct><member><name>Kangaroo</name><value><array><data>
    //     <value><int>34</int></value><value><string>William</string></value>
    //   </data></array></value></member></struct>
    fn emit_enum_variant<F>(&mut self,
                            name: &str,
                            _id: usize,
                            cnt: usize,
                            f: F)
                            -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        if cnt == 0 {
            return self.emit_str(name);
        }
        let frame = Frame::Variant { name: name.to_string(), args: Vec::new() };
        match self.nested(frame, f)? {
            Frame::Variant { name, args } => {
                let mut members = IndexMap::new();
                members.insert(name, Value::Array(args));
                self.emit_value(Value::Struct(members))
            }
            _ => Err(EncoderError::Unbalanced("enum variant")),
        }
    }

    fn emit_enum_variant_arg<F>(&mut self, _idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }

    fn emit_enum_struct_variant<F>(&mut self,
                                   name: &str,
                                   id: usize,
                                   cnt: usize,
                                   f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_enum_variant(name, id, cnt, f)
    }

    fn emit_enum_struct_variant_field<F>(&mut self,
                                         _: &str,
                                         idx: usize,
                                         f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_enum_variant_arg(idx, f)
    }

    fn emit_struct<F>(&mut self, _: &str, _: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        let frame = Frame::Record { fields: IndexMap::new(), field: None };
        match self.nested(frame, f)? {
            Frame::Record { fields, .. } => self.emit_value(Value::Struct(fields)),
            _ => Err(EncoderError::Unbalanced("struct")),
        }
    }

    fn emit_struct_field<F>(&mut self, name: &str, _idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        match self.stack.last_mut() {
            Some(&mut Frame::Record { ref mut field, .. }) => *field = Some(name.to_string()),
            _ => return Err(EncoderError::Unbalanced("struct field")),
        }
        f(self)
    }

    fn emit_tuple<F>(&mut self, len: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_seq(len, f)
    }
    fn emit_tuple_arg<F>(&mut self, idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_seq_elt(idx, f)
    }

    fn emit_tuple_struct<F>(&mut self, _name: &str, len: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_seq(len, f)
    }
    fn emit_tuple_struct_arg<F>(&mut self, idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.emit_seq_elt(idx, f)
    }

    fn emit_option<F>(&mut self, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }
    fn emit_option_none(&mut self) -> EncodeResult { self.emit_nil() }
    fn emit_option_some<F>(&mut self, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }

    fn emit_seq<F>(&mut self, len: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        match self.nested(Frame::Seq(Vec::with_capacity(len)), f)? {
            Frame::Seq(items) => self.emit_value(Value::Array(items)),
            _ => Err(EncoderError::Unbalanced("sequence")),
        }
    }

    fn emit_seq_elt<F>(&mut self, _idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }

    fn emit_map<F>(&mut self, len: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        let frame = Frame::Map { entries: Vec::with_capacity(len), key: None, reading_key: false };
        match self.nested(frame, f)? {
            Frame::Map { entries, .. } => self.emit_value(Value::from_pairs(entries)),
            _ => Err(EncoderError::Unbalanced("map")),
        }
    }

    fn emit_map_elt_key<F>(&mut self, _idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        self.set_reading_key(true)?;
        f(self)?;
        self.set_reading_key(false)
    }

    fn emit_map_elt_val<F>(&mut self, _idx: usize, f: F) -> EncodeResult where
        F: FnOnce(&mut ValueEncoder) -> EncodeResult,
    {
        f(self)
    }
}

impl ValueEncoder {
    fn set_reading_key(&mut self, reading: bool) -> EncodeResult {
        match self.stack.last_mut() {
            Some(&mut Frame::Map { ref mut reading_key, .. }) => {
                *reading_key = reading;
                Ok(())
            }
            _ => Err(EncoderError::Unbalanced("map key")),
        }
    }
}
