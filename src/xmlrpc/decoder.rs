// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use self::ErrorCode::*;
use self::ParseError::*;

use std::error::Error as StdError;
use std::io::{self, Read};
use std::sync::OnceLock;
use std::{fmt, mem};

use indexmap::IndexMap;
use regex::Regex;
use xml::reader::{ParserConfig, XmlEvent};

use crate::xmlrpc::base64::Binary;
use crate::xmlrpc::date::Date;
use crate::xmlrpc::fault::Fault;
use crate::xmlrpc::value::Value;

/// Documents are handed to the tokenizer at most this many bytes at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Only this many leading bytes are searched for an XML declaration.
const DECLARATION_WINDOW: usize = 100;

/// The errors that can arise while decoding a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    EmptyDocument,
    UnbalancedAggregate,
    InvalidFault,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let str1 = match *self {
            EmptyDocument => "empty document",
            UnbalancedAggregate => "unbalanced array or struct",
            InvalidFault => "fault without faultCode/faultString",
        };
        write!(f, "({})", str1)
    }
}

#[derive(Debug)]
pub enum ParseError {
    SyntaxError(ErrorCode, String),
    XmlError(xml::reader::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SyntaxError(code, ref detail) => write!(f, "syntax error {}: {}", code, detail),
            XmlError(ref err) => write!(f, "malformed xml: {}", err),
        }
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            XmlError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<xml::reader::Error> for ParseError {
    fn from(err: xml::reader::Error) -> ParseError {
        XmlError(err)
    }
}

/// Root element kind of a decoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Response,
    Fault,
}

/// A decoded XML-RPC document.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    message_type: Option<MessageType>,
    method_name: Option<String>,
    params: Vec<Value>,
    fault_code: i32,
    fault_string: String,
}

impl Message {
    pub fn parse(body: &str) -> Result<Message, ParseError> {
        Message::parse_with_chunk_size(body, DEFAULT_CHUNK_SIZE)
    }

    /// Decodes `body`, feeding the tokenizer at most `chunk_size` bytes per
    /// read.
    pub fn parse_with_chunk_size(body: &str, chunk_size: usize) -> Result<Message, ParseError> {
        let body = normalize(body);
        if body.trim().is_empty() {
            return Err(SyntaxError(EmptyDocument, "no content to parse".into()));
        }
        trace!("Decoding {} bytes in chunks of {}", body.len(), chunk_size);

        let config = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .ignore_comments(true);
        let reader = config.create_reader(ChunkedSource::new(body.as_bytes(), chunk_size));

        let mut builder = MessageBuilder::new();
        for event in reader {
            match event? {
                XmlEvent::StartElement { name, .. } => builder.open_tag(&name.local_name),
                XmlEvent::EndElement { name } => builder.close_tag(&name.local_name)?,
                XmlEvent::Characters(text) => builder.text(&text),
                _ => {}
            }
        }

        let message = builder.finish()?;
        debug!("Decoded {:?} message with {} param(s)", message.message_type, message.params.len());
        Ok(message)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.message_type
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_ref().map(|s| s.as_str())
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    pub fn is_fault(&self) -> bool {
        self.message_type == Some(MessageType::Fault)
    }

    pub fn fault_code(&self) -> i32 {
        self.fault_code
    }

    pub fn fault_string(&self) -> &str {
        &self.fault_string
    }

    /// The fault carried by a fault response.
    pub fn fault(&self) -> Option<Fault> {
        if self.is_fault() {
            Some(Fault::new(self.fault_code, &self.fault_string))
        } else {
            None
        }
    }
}

/// Strips the XML declaration and rewrites the named entities as character
/// references before the text reaches the tokenizer.
fn normalize(body: &str) -> String {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    let declaration = DECLARATION
        .get_or_init(|| Regex::new(r"<\?xml.*?\?>").expect("static declaration pattern"));

    let mut split = body.len().min(DECLARATION_WINDOW);
    while !body.is_char_boundary(split) {
        split -= 1;
    }
    let (head, rest) = body.split_at(split);

    let mut out = declaration.replacen(head, 1, "").into_owned();
    out.push_str(rest);

    out.replace("&lt;", "&#60;")
        .replace("&gt;", "&#62;")
        .replace("&amp;", "&#38;")
        .replace("&apos;", "&#39;")
        .replace("&quot;", "&#34;")
        .replace('\x0b', " ")
}

/// Hands the document to the tokenizer in bounded reads.
struct ChunkedSource<'a> {
    remaining: &'a [u8],
    chunk_size: usize,
}

impl<'a> ChunkedSource<'a> {
    fn new(bytes: &'a [u8], chunk_size: usize) -> ChunkedSource<'a> {
        ChunkedSource { remaining: bytes, chunk_size: chunk_size.max(1) }
    }
}

impl<'a> Read for ChunkedSource<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk_size).min(self.remaining.len());
        buf[..n].copy_from_slice(&self.remaining[..n]);
        self.remaining = &self.remaining[n..];
        Ok(n)
    }
}

enum Aggregate {
    Array(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

/// Event-driven state machine rebuilding a `Message` from open-tag,
/// close-tag and character-data events.
///
/// Any tokenizer can drive it; `Message::parse` feeds it from xml-rs.
pub struct MessageBuilder {
    message_type: Option<MessageType>,
    method_name: Option<String>,
    params: Vec<Value>,
    aggregates: Vec<Aggregate>,
    member_names: Vec<String>,
    current_text: String,
    last_seen: String,
}

impl MessageBuilder {
    pub fn new() -> MessageBuilder {
        MessageBuilder {
            message_type: None,
            method_name: None,
            params: Vec::new(),
            aggregates: Vec::new(),
            member_names: Vec::new(),
            current_text: String::new(),
            last_seen: String::new(),
        }
    }

    pub fn open_tag(&mut self, tag: &str) {
        self.current_text.clear();

        match tag {
            "methodCall" => self.message_type = Some(MessageType::Call),
            "methodResponse" => self.message_type = Some(MessageType::Response),
            "fault" => self.message_type = Some(MessageType::Fault),
            // <data>, not <array>, delimits the items
            "data" => self.aggregates.push(Aggregate::Array(Vec::new())),
            "struct" => self.aggregates.push(Aggregate::Struct(IndexMap::new())),
            _ => {}
        }
        self.see(tag);
    }

    pub fn text(&mut self, text: &str) {
        self.current_text.push_str(text);
    }

    pub fn close_tag(&mut self, tag: &str) -> Result<(), ParseError> {
        let completed = match tag {
            "int" | "i4" => Some(Value::Int(parse_int(self.current_text.trim()))),
            "double" => Some(Value::Double(parse_double(self.current_text.trim()))),
            "string" => Some(Value::String(mem::take(&mut self.current_text))),
            "dateTime.iso8601" => Some(Value::DateTime(Date::parse_iso(self.current_text.trim()))),
            // untyped values are strings
            "value" if self.last_seen == "value" => {
                Some(Value::String(mem::take(&mut self.current_text)))
            }
            "boolean" => {
                let text = self.current_text.trim();
                Some(Value::Boolean(!(text.is_empty() || text == "0")))
            }
            "base64" => Some(Value::Binary(Binary::decode_lenient(&self.current_text))),
            "data" | "struct" => match self.aggregates.pop() {
                Some(Aggregate::Array(items)) => Some(Value::Array(items)),
                Some(Aggregate::Struct(members)) => Some(Value::Struct(members)),
                None => return Err(SyntaxError(UnbalancedAggregate, format!("</{}> without opening", tag))),
            },
            "member" => {
                self.member_names.pop();
                None
            }
            "name" => {
                self.member_names.push(self.current_text.trim().to_string());
                None
            }
            "methodName" => {
                self.method_name = Some(self.current_text.trim().to_string());
                None
            }
            _ => None,
        };

        if let Some(value) = completed {
            self.attach(value);
        }
        self.current_text.clear();
        self.see(tag);
        Ok(())
    }

    fn see(&mut self, tag: &str) {
        self.last_seen.clear();
        self.last_seen.push_str(tag);
    }

    fn attach(&mut self, value: Value) {
        match self.aggregates.last_mut() {
            Some(&mut Aggregate::Array(ref mut items)) => items.push(value),
            Some(&mut Aggregate::Struct(ref mut members)) => {
                let name = self.member_names.last().cloned().unwrap_or_default();
                members.insert(name, value);
            }
            None => self.params.push(value),
        }
    }

    pub fn finish(self) -> Result<Message, ParseError> {
        if !self.aggregates.is_empty() {
            return Err(SyntaxError(UnbalancedAggregate, "document ended inside an aggregate".into()));
        }

        let mut message = Message {
            message_type: self.message_type,
            method_name: self.method_name,
            params: self.params,
            fault_code: 0,
            fault_string: String::new(),
        };

        if message.is_fault() {
            let (code, string) = extract_fault(message.params.first())?;
            message.fault_code = code;
            message.fault_string = string;
        }
        Ok(message)
    }
}

impl Default for MessageBuilder {
    fn default() -> MessageBuilder {
        MessageBuilder::new()
    }
}

fn extract_fault(payload: Option<&Value>) -> Result<(i32, String), ParseError> {
    let members = payload
        .and_then(Value::as_struct)
        .ok_or_else(|| SyntaxError(InvalidFault, "fault payload is not a struct".into()))?;

    let code = match members.get("faultCode") {
        Some(&Value::Int(n)) => n,
        Some(&Value::String(ref s)) => parse_int(s.trim()),
        _ => return Err(SyntaxError(InvalidFault, "missing faultCode".into())),
    };
    let string = match members.get("faultString") {
        Some(&Value::String(ref s)) => s.clone(),
        Some(&Value::Int(n)) => n.to_string(),
        _ => return Err(SyntaxError(InvalidFault, "missing faultString".into())),
    };
    Ok((code, string))
}

/// Leading integer of `text`, 0 when there is none, saturated to `i32`.
fn parse_int(text: &str) -> i32 {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| Regex::new(r"^[+-]?\d+").expect("static integer pattern"));

    let digits = match prefix.find(text) {
        Some(m) => m.as_str(),
        None => return 0,
    };
    match digits.parse::<i64>() {
        Ok(n) if n > i64::from(i32::MAX) => i32::MAX,
        Ok(n) if n < i64::from(i32::MIN) => i32::MIN,
        Ok(n) => n as i32,
        Err(_) if digits.starts_with('-') => i32::MIN,
        Err(_) => i32::MAX,
    }
}

/// Float value of `text`, falling back to its leading numeric prefix.
fn parse_double(text: &str) -> f64 {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    if let Ok(x) = text.parse::<f64>() {
        return x;
    }
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("static float pattern")
    });
    prefix
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
