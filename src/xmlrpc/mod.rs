// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![forbid(non_camel_case_types)]
#![allow(missing_docs)]

//! XML-RPC library: value model, message decoding, dispatch and remote
//! procedure calls.
//!
//! # What is XML-RPC?
//!
//! A remote procedure call protocol encoding calls, results and faults as
//! small XML documents, usually sent over HTTP POST.
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! # Serving
//!
//! ```
//! use xmlrpc_stack::xmlrpc::{Message, Server, Value};
//!
//! let mut server = Server::new();
//! server.add_function("echo", |args: &[Value]| Ok(Value::Array(args.to_vec())));
//!
//! let body = "<methodCall><methodName>echo</methodName><params>\
//!             <param><value><int>1</int></value></param></params></methodCall>";
//! let response = Message::parse(&server.serve(body)).unwrap();
//! assert_eq!(&[Value::Array(vec![Value::Int(1)])], response.params());
//! ```

pub use self::base64::Binary;
pub use self::client::{Client, HttpTransport, MulticallClient, Transport, TransportError, TransportResponse};
pub use self::date::Date;
pub use self::decoder::{Message, MessageBuilder, MessageType, ParseError};
pub use self::encoding::{EncoderError, ValueEncoder};
pub use self::fault::Fault;
pub use self::introspection::{Signature, TypeTag};
pub use self::protocol::{Request, Response};
pub use self::server::{Capability, MethodDescriptor, MethodTarget, PluginRegistry, Server};
pub use self::value::{ToValue, Value};

pub mod base64;
pub mod client;
pub mod date;
pub mod decoder;
pub mod encoding;
pub mod fault;
pub mod introspection;
pub mod protocol;
pub mod server;
pub mod value;
