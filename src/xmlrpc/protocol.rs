// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use xml::escape::escape_str_pcdata;

use crate::xmlrpc::fault::Fault;
use crate::xmlrpc::value::{ToValue, Value};

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>";

/// An outbound `methodCall`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    args: Vec<Value>,
}

/// Outcome of a call, ready to be written as a `methodResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Fault(Fault),
}

impl Request {
    pub fn new(method: &str) -> Request {
        Request {
            method: method.to_string(),
            args: Vec::new(),
        }
    }

    pub fn with_args(method: &str, args: Vec<Value>) -> Request {
        Request {
            method: method.to_string(),
            args: args,
        }
    }

    pub fn argument<T: ToValue + ?Sized>(mut self, object: &T) -> Request {
        self.args.push(object.to_value());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn to_xml(&self) -> String {
        let mut body = format!("{}<methodCall><methodName>{}</methodName><params>",
                               XML_DECLARATION,
                               escape_str_pcdata(&self.method));
        for arg in &self.args {
            body.push_str("<param><value>");
            body.push_str(&arg.to_xml());
            body.push_str("</value></param>");
        }
        body.push_str("</params></methodCall>");
        body
    }
}

impl Response {
    /// The bare envelope, without XML declaration.
    pub fn to_xml(&self) -> String {
        match *self {
            Response::Success(ref value) => format!(
                "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
                value.to_xml()
            ),
            Response::Fault(ref fault) => fault.to_xml(),
        }
    }

    /// The envelope as sent on the wire.
    pub fn to_document(&self) -> String {
        format!("{}\n{}", XML_DECLARATION, self.to_xml())
    }

    pub fn is_fault(&self) -> bool {
        match *self {
            Response::Fault(_) => true,
            Response::Success(_) => false,
        }
    }
}

impl From<Result<Value, Fault>> for Response {
    fn from(outcome: Result<Value, Fault>) -> Response {
        match outcome {
            Ok(value) => Response::Success(value),
            Err(fault) => Response::Fault(fault),
        }
    }
}
