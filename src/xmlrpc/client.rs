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
use std::io;

use hyper::header::{CONTENT_TYPE, USER_AGENT};
use hyper::{Body, Method};

use crate::xmlrpc::decoder::{Message, MessageType};
use crate::xmlrpc::fault::{Fault, PARSE_ERROR, TRANSPORT_ERROR};
use crate::xmlrpc::protocol::Request;
use crate::xmlrpc::value::Value;

const USER_AGENT_VALUE: &str = concat!("xmlrpc-stack/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub enum TransportError {
    Http(hyper::Error),
    Request(hyper::http::Error),
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::Http(ref err) => err.fmt(f),
            TransportError::Request(ref err) => err.fmt(f),
            TransportError::Io(ref err) => err.fmt(f),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            TransportError::Http(ref err) => Some(err),
            TransportError::Request(ref err) => Some(err),
            TransportError::Io(ref err) => Some(err),
        }
    }
}

impl From<hyper::Error> for TransportError {
    fn from(err: hyper::Error) -> TransportError {
        TransportError::Http(err)
    }
}

impl From<hyper::http::Error> for TransportError {
    fn from(err: hyper::http::Error) -> TransportError {
        TransportError::Request(err)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> TransportError {
        TransportError::Io(err)
    }
}

/// Raw HTTP outcome: status and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Delivers an encoded call and returns what came back.
pub trait Transport {
    fn send(&self, body: &[u8]) -> Result<TransportResponse, TransportError>;
}

/// Blocking HTTP POST over hyper, one short-lived runtime per call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
}

impl HttpTransport {
    pub fn new(url: &str) -> HttpTransport {
        HttpTransport { url: url.to_string() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(&self, body: &[u8]) -> Result<TransportResponse, TransportError> {
        let request = hyper::Request::builder()
            .method(Method::POST)
            .uri(self.url.as_str())
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Body::from(body.to_vec()))?;

        debug!("Send XMLRPC request to: {}", &self.url);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(post(request))
    }
}

async fn post(request: hyper::Request<Body>) -> Result<TransportResponse, TransportError> {
    let client = hyper::Client::new();
    let response = client.request(request).await?;
    let status = response.status().as_u16();
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    Ok(TransportResponse {
        status: status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// XML-RPC client. Every failure, local or remote, comes back as a `Fault`.
pub struct Client<T = HttpTransport> {
    transport: T,
}

impl Client<HttpTransport> {
    pub fn new(url: &str) -> Client {
        Client { transport: HttpTransport::new(url) }
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Client<T> {
        Client { transport: transport }
    }

    pub fn query(&self, method: &str, args: &[Value]) -> Result<Value, Fault> {
        self.remote_call(&Request::with_args(method, args.to_vec()))
    }

    pub fn remote_call(&self, request: &Request) -> Result<Value, Fault> {
        let body = request.to_xml();
        trace!("XMLRPC body: {}", &body);

        let response = self.transport
            .send(body.as_bytes())
            .map_err(|err| Fault::new(TRANSPORT_ERROR, format!("transport error - {}", err)))?;
        trace!("Response body: {}", &response.body);

        if !(200..=206).contains(&response.status) {
            return Err(Fault::new(TRANSPORT_ERROR,
                                  format!("transport error - HTTP status {}", response.status)));
        }

        let message = Message::parse(&response.body).map_err(|err| {
            debug!("Could not decode response to {}: {}", request.method(), err);
            Fault::new(PARSE_ERROR, "parse error. not well formed")
        })?;

        match message.message_type() {
            Some(MessageType::Fault) => Err(Fault::new(message.fault_code(), message.fault_string())),
            Some(MessageType::Response) => message
                .into_params()
                .into_iter()
                .next()
                .ok_or_else(|| Fault::new(PARSE_ERROR, "parse error. not well formed")),
            _ => Err(Fault::new(PARSE_ERROR, "parse error. not well formed")),
        }
    }
}

/// Collects calls and sends them as one `system.multicall`.
pub struct MulticallClient<T = HttpTransport> {
    client: Client<T>,
    calls: Vec<Value>,
}

impl<T: Transport> MulticallClient<T> {
    pub fn new(client: Client<T>) -> MulticallClient<T> {
        MulticallClient { client: client, calls: Vec::new() }
    }

    pub fn add_call(&mut self, method: &str, args: &[Value]) {
        self.calls.push(Value::Struct(
            vec![
                ("methodName".to_string(), Value::String(method.to_string())),
                ("params".to_string(), Value::Array(args.to_vec())),
            ]
            .into_iter()
            .collect(),
        ));
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Sends every collected call; the result holds one entry per call,
    /// either `[value]` or a fault struct.
    pub fn query(&self) -> Result<Value, Fault> {
        self.client.query("system.multicall", &[Value::Array(self.calls.clone())])
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::xmlrpc::server::Server;

    struct MockTransport {
        status: u16,
        body: String,
        sent: RefCell<Vec<String>>,
    }

    impl MockTransport {
        fn new(status: u16, body: &str) -> MockTransport {
            MockTransport { status: status, body: body.to_string(), sent: RefCell::new(Vec::new()) }
        }
    }

    impl Transport for MockTransport {
        fn send(&self, body: &[u8]) -> Result<TransportResponse, TransportError> {
            self.sent.borrow_mut().push(String::from_utf8_lossy(body).into_owned());
            Ok(TransportResponse { status: self.status, body: self.body.clone() })
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn send(&self, _body: &[u8]) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")))
        }
    }

    /// Loops requests through an in-process server.
    struct Loopback(Server);

    impl Transport for Loopback {
        fn send(&self, body: &[u8]) -> Result<TransportResponse, TransportError> {
            let request = String::from_utf8_lossy(body);
            Ok(TransportResponse { status: 200, body: self.0.serve(&request) })
        }
    }

    #[test]
    fn test_query_returns_first_param() {
        let transport = MockTransport::new(200, "<?xml version=\"1.0\"?>\n<methodResponse><params>\
            <param><value><string>pong</string></value></param></params></methodResponse>");
        let client = Client::with_transport(transport);

        assert_eq!(Ok(Value::String("pong".into())), client.query("ping", &[Value::Int(1)]));
        let sent = client.transport.sent.borrow();
        assert_eq!(1, sent.len());
        assert!(sent[0].contains("<methodName>ping</methodName>"));
        assert!(sent[0].contains("<int>1</int>"));
    }

    #[test]
    fn test_remote_fault() {
        let transport = MockTransport::new(200, &Fault::new(4, "Too many parameters").to_xml());
        let client = Client::with_transport(transport);

        let fault = client.query("ping", &[]).unwrap_err();
        assert_eq!(4, fault.code());
        assert_eq!("Too many parameters", fault.message());
    }

    #[test]
    fn test_http_status() {
        let client = Client::with_transport(MockTransport::new(500, ""));
        let fault = client.query("ping", &[]).unwrap_err();
        assert_eq!(-32300, fault.code());
        assert_eq!("transport error - HTTP status 500", fault.message());

        let client = Client::with_transport(MockTransport::new(206, "<methodResponse><params>\
            <param><value><int>1</int></value></param></params></methodResponse>"));
        assert_eq!(Ok(Value::Int(1)), client.query("ping", &[]));
    }

    #[test]
    fn test_transport_failure() {
        let client = Client::with_transport(Unreachable);
        let fault = client.query("ping", &[]).unwrap_err();
        assert_eq!(-32300, fault.code());
        assert_eq!("transport error - connection refused", fault.message());
    }

    #[test]
    fn test_unreadable_response() {
        let client = Client::with_transport(MockTransport::new(200, "<html>oops"));
        assert_eq!(-32700, client.query("ping", &[]).unwrap_err().code());

        let client = Client::with_transport(MockTransport::new(200, "<methodResponse><params></params></methodResponse>"));
        assert_eq!(-32700, client.query("ping", &[]).unwrap_err().code());
    }

    #[test]
    fn test_loopback() {
        let mut server = Server::new();
        server.add_function("echo", |args: &[Value]| Ok(Value::Array(args.to_vec())));
        let client = Client::with_transport(Loopback(server));

        let args = vec![Value::String("a < b".into()), Value::Double(0.5)];
        assert_eq!(Ok(Value::Array(args.clone())), client.query("echo", &args));
        assert_eq!(-32601, client.query("missing", &[]).unwrap_err().code());
    }

    #[test]
    fn test_multicall_client() {
        let mut server = Server::new();
        server.add_function("echo", |args: &[Value]| Ok(args.first().cloned().unwrap_or(Value::Boolean(false))));

        let mut multicall = MulticallClient::new(Client::with_transport(Loopback(server)));
        assert!(multicall.is_empty());
        multicall.add_call("echo", &[Value::Int(7)]);
        multicall.add_call("missing", &[]);
        assert_eq!(2, multicall.len());

        let results = multicall.query().unwrap();
        let results = results.as_array().unwrap();
        assert_eq!(Value::Array(vec![Value::Int(7)]), results[0]);
        assert_eq!(Some(&Value::Int(-32601)), results[1].find("faultCode"));
    }
}
