// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::error::Error as StdError;
use std::fmt;

use indexmap::IndexMap;
use xml::escape::escape_str_pcdata;

use crate::xmlrpc::value::Value;

/// Request body is not well-formed XML.
pub const PARSE_ERROR: i32 = -32700;
/// Document is well-formed but not a `methodCall`.
pub const INVALID_REQUEST: i32 = -32600;
/// Method (or its target) cannot be resolved.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Argument count or kinds do not match the registered signature.
pub const INVALID_PARAMS: i32 = -32602;
/// Client side failure to exchange the request.
pub const TRANSPORT_ERROR: i32 = -32300;
/// `system.multicall` nested inside `system.multicall`.
pub const RECURSIVE_MULTICALL: i32 = -32800;
/// Target plugin is disabled or unavailable.
pub const PLUGIN_DISABLED: i32 = -99999;

/// An XML-RPC fault: a numeric code and a human readable message.
///
/// The message is entity-escaped once, when the fault is built, so it can be
/// written verbatim into the fault envelope.
#[derive(Clone, PartialEq, Debug)]
pub struct Fault {
    code: i32,
    message: String,
}

impl Fault {
    pub fn new<S: AsRef<str>>(code: i32, message: S) -> Fault {
        Fault {
            code: code,
            message: escape_str_pcdata(message.as_ref()).into_owned(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `{faultCode, faultString}` record used inside multicall results.
    pub fn to_value(&self) -> Value {
        let mut members = IndexMap::new();
        members.insert("faultCode".to_string(), Value::Int(self.code));
        members.insert("faultString".to_string(), Value::String(self.message.clone()));
        Value::Struct(members)
    }

    /// Full `<methodResponse><fault>` envelope.
    pub fn to_xml(&self) -> String {
        format!(
            "<methodResponse><fault><value><struct>\
             <member><name>faultCode</name><value><int>{}</int></value></member>\
             <member><name>faultString</name><value><string>{}</string></value></member>\
             </struct></value></fault></methodResponse>",
            self.code, self.message
        )
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fault {}: {}", self.code, self.message)
    }
}

impl StdError for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_escaped_once() {
        let fault = Fault::new(PARSE_ERROR, "bad <tag> & more");
        assert_eq!("bad &lt;tag&gt; &amp; more", fault.message());
        assert_eq!(-32700, fault.code());
    }

    #[test]
    fn test_fault_envelope() {
        let fault = Fault::new(METHOD_NOT_FOUND, "nope");
        let expected = "<methodResponse><fault><value><struct>\
                        <member><name>faultCode</name><value><int>-32601</int></value></member>\
                        <member><name>faultString</name><value><string>nope</string></value></member>\
                        </struct></value></fault></methodResponse>";
        assert_eq!(expected, fault.to_xml());
    }

    #[test]
    fn test_fault_record() {
        let record = Fault::new(RECURSIVE_MULTICALL, "forbidden").to_value();
        assert_eq!(Some(-32800), record.find("faultCode").and_then(|v| v.as_i32()));
        assert_eq!(Some("forbidden"), record.find("faultString").and_then(|v| v.as_str()));
    }
}
