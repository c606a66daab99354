// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::xmlrpc::decoder::{Message, MessageType, DEFAULT_CHUNK_SIZE};
use crate::xmlrpc::fault::{Fault, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
                           PLUGIN_DISABLED, RECURSIVE_MULTICALL};
use crate::xmlrpc::introspection::Signature;
use crate::xmlrpc::protocol::Response;
use crate::xmlrpc::value::{ToValue, Value};

/// A free-standing callable registered with `Server::add_function`.
pub type Handler = Box<dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync>;

/// An operation of the server itself, reachable through `this:` targets.
pub type Operation = Box<dyn Fn(&Server, &[Value]) -> Result<Value, Fault> + Send + Sync>;

/// Where a registered method name is dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTarget {
    /// `this:NAME`, an operation of the server.
    Local(String),
    /// `plugin:PLUGIN:CALLBACK`, resolved through the plugin registry.
    Plugin { plugin: String, callback: String },
    /// Any other string, a function added with `Server::add_function`.
    External(String),
}

impl MethodTarget {
    pub fn parse(target: &str) -> MethodTarget {
        if let Some(name) = target.strip_prefix("this:") {
            return MethodTarget::Local(name.to_string());
        }
        if let Some(rest) = target.strip_prefix("plugin:") {
            let mut parts = rest.splitn(2, ':');
            let plugin = parts.next().unwrap_or_default().to_string();
            let callback = parts.next().unwrap_or_default().to_string();
            return MethodTarget::Plugin { plugin: plugin, callback: callback };
        }
        MethodTarget::External(target.to_string())
    }
}

impl<'a> From<&'a str> for MethodTarget {
    fn from(target: &'a str) -> MethodTarget {
        MethodTarget::parse(target)
    }
}

/// Registry entry for one method name.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub target: MethodTarget,
    pub signature: Option<Signature>,
    pub help: Option<String>,
}

impl MethodDescriptor {
    pub fn new(target: MethodTarget) -> MethodDescriptor {
        MethodDescriptor { target: target, signature: None, help: None }
    }
}

/// External plugin host resolving `plugin:` targets.
pub trait PluginRegistry: Send + Sync {
    fn is_disabled(&self, plugin: &str) -> bool;
    fn invoke(&self, plugin: &str, callback: &str, args: &[Value]) -> Result<Value, Fault>;
}

/// One entry of `system.getCapabilities`.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub spec_url: String,
    pub spec_version: i32,
}

impl Capability {
    pub fn new(spec_url: &str, spec_version: i32) -> Capability {
        Capability { spec_url: spec_url.to_string(), spec_version: spec_version }
    }

    fn to_value(&self) -> Value {
        let mut members = IndexMap::new();
        members.insert("specUrl".to_string(), Value::String(self.spec_url.clone()));
        members.insert("specVersion".to_string(), Value::Int(self.spec_version));
        Value::Struct(members)
    }
}

/// XML-RPC method dispatcher.
///
/// Built-in methods (`system.getCapabilities`, `system.listMethods`,
/// `system.multicall`) are registered on construction and may be
/// overridden by later registrations.
pub struct Server {
    methods: IndexMap<String, MethodDescriptor>,
    capabilities: IndexMap<String, Capability>,
    operations: HashMap<String, Operation>,
    functions: HashMap<String, Handler>,
    plugins: Option<Box<dyn PluginRegistry>>,
    chunk_size: usize,
    pub(crate) check_signatures: bool,
}

impl Server {
    pub fn new() -> Server {
        let mut server = Server {
            methods: IndexMap::new(),
            capabilities: IndexMap::new(),
            operations: HashMap::new(),
            functions: HashMap::new(),
            plugins: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            check_signatures: false,
        };

        server.set_capability("xmlrpc", Capability::new("http://www.xmlrpc.com/spec", 1));
        server.set_capability("faults_interop",
                              Capability::new("http://xmlrpc-epi.sourceforge.net/specs/rfc.fault_codes.php",
                                              20010516));
        server.set_capability("system.multicall",
                              Capability::new("http://www.xmlrpc.com/discuss/msgReader$1208", 1));

        server.add_operation("getCapabilities", get_capabilities);
        server.add_operation("listMethods", list_methods);
        server.add_operation("multiCall", multi_call);

        server.register("system.getCapabilities", "this:getCapabilities");
        server.register("system.listMethods", "this:listMethods");
        server.register("system.multicall", "this:multiCall");
        server
    }

    pub fn with_plugins(mut self, plugins: Box<dyn PluginRegistry>) -> Server {
        self.plugins = Some(plugins);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Server {
        self.chunk_size = chunk_size;
        self
    }

    /// Registers `name` with a target string (`this:`, `plugin:` or a
    /// function name).
    pub fn register(&mut self, name: &str, target: &str) {
        self.register_method(name, MethodDescriptor::new(MethodTarget::parse(target)));
    }

    pub fn register_method(&mut self, name: &str, descriptor: MethodDescriptor) {
        trace!("Registering {} -> {:?}", name, descriptor.target);
        self.methods.insert(name.to_string(), descriptor);
    }

    /// Adds a function and registers it under the same name.
    pub fn add_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
        self.register_method(name, MethodDescriptor::new(MethodTarget::External(name.to_string())));
    }

    /// Adds a server operation; it becomes callable once a method is
    /// registered with a `this:NAME` target.
    pub fn add_operation<F>(&mut self, name: &str, operation: F)
    where
        F: Fn(&Server, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.operations.insert(name.to_string(), Box::new(operation));
    }

    pub fn set_capability(&mut self, name: &str, capability: Capability) {
        self.capabilities.insert(name.to_string(), capability);
    }

    pub fn capabilities(&self) -> &IndexMap<String, Capability> {
        &self.capabilities
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    /// Registered names, most recent first, so user methods come before the
    /// built-ins.
    pub fn list_methods(&self) -> Vec<String> {
        self.methods.keys().rev().cloned().collect()
    }

    pub fn get_capabilities(&self) -> Value {
        Value::Struct(self.capabilities
            .iter()
            .map(|(name, capability)| (name.clone(), capability.to_value()))
            .collect())
    }

    /// Decodes a request body and returns the full response document.
    pub fn serve(&self, body: &str) -> String {
        let response = self.handle(body);
        let document = response.to_document();
        trace!("Response body: {}", document);
        document
    }

    pub fn handle(&self, body: &str) -> Response {
        let message = match Message::parse_with_chunk_size(body, self.chunk_size) {
            Ok(message) => message,
            Err(err) => {
                debug!("Rejecting request: {}", err);
                return Response::Fault(Fault::new(PARSE_ERROR, "parse error. not well formed"));
            }
        };

        if message.message_type() != Some(MessageType::Call) {
            return Response::Fault(Fault::new(INVALID_REQUEST,
                "server error. invalid xml-rpc. not conforming to spec. Request must be a methodCall"));
        }

        let method = message.method_name().unwrap_or_default().to_string();
        Response::from(self.call(&method, message.params()))
    }

    /// Dispatches one call. With introspection enabled, arguments are
    /// checked against the registered signature first.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Fault> {
        debug!("Dispatching {} with {} argument(s)", name, args.len());
        if self.check_signatures {
            self.check_signature(name, args)?;
        }
        self.invoke(name, args)
    }

    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, Fault> {
        let descriptor = match self.methods.get(name) {
            Some(descriptor) => descriptor,
            None => {
                return Err(Fault::new(METHOD_NOT_FOUND,
                    format!("server error. requested method {} does not exist.", name)));
            }
        };

        match descriptor.target {
            MethodTarget::Local(ref operation) => match self.operations.get(operation) {
                Some(operation) => operation(self, args),
                None => Err(Fault::new(METHOD_NOT_FOUND,
                    format!("server error. requested class method \"{}\" does not exist.", operation))),
            },
            MethodTarget::Plugin { ref plugin, ref callback } => match self.plugins {
                Some(ref registry) if !registry.is_disabled(plugin) => {
                    registry.invoke(plugin, callback, args)
                }
                _ => {
                    warn!("Plugin {} is disabled, refusing {}", plugin, name);
                    Err(Fault::new(PLUGIN_DISABLED, "server error"))
                }
            },
            MethodTarget::External(ref function) => match self.functions.get(function) {
                Some(handler) => handler(args),
                None => Err(Fault::new(METHOD_NOT_FOUND,
                    format!("server error. requested function \"{}\" does not exist.", function))),
            },
        }
    }

    /// Runs a batch of `{methodName, params}` structs. Each result is either
    /// `[value]` or a `{faultCode, faultString}` struct; a fault never stops
    /// the batch.
    pub fn multi_call(&self, calls: &[Value]) -> Value {
        let results = calls
            .iter()
            .map(|call| {
                let method = call.find("methodName").and_then(Value::as_str).unwrap_or_default();
                let outcome = if method == "system.multicall" {
                    Err(Fault::new(RECURSIVE_MULTICALL, "Recursive calls to system.multicall are forbidden"))
                } else {
                    let single;
                    let params: &[Value] = match call.find("params") {
                        Some(&Value::Array(ref params)) => params,
                        Some(other) => {
                            single = [other.clone()];
                            &single
                        }
                        None => &[],
                    };
                    self.call(method, params)
                };

                match outcome {
                    Ok(value) => Value::Array(vec![value]),
                    Err(fault) => fault.to_value(),
                }
            })
            .collect();
        Value::Array(results)
    }
}

impl Default for Server {
    fn default() -> Server {
        Server::new()
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server")
            .field("methods", &self.methods)
            .field("capabilities", &self.capabilities)
            .field("check_signatures", &self.check_signatures)
            .finish()
    }
}

fn get_capabilities(server: &Server, _args: &[Value]) -> Result<Value, Fault> {
    Ok(server.get_capabilities())
}

fn list_methods(server: &Server, _args: &[Value]) -> Result<Value, Fault> {
    Ok(server.list_methods().to_value())
}

fn multi_call(server: &Server, args: &[Value]) -> Result<Value, Fault> {
    match args.first().and_then(Value::as_array) {
        Some(calls) => Ok(server.multi_call(calls)),
        None => Err(Fault::new(INVALID_PARAMS, "server error. invalid method parameters")),
    }
}
