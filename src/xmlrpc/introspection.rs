// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::xmlrpc::base64::Binary;
use crate::xmlrpc::date::Date;
use crate::xmlrpc::fault::{Fault, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::xmlrpc::server::{Capability, MethodDescriptor, MethodTarget, Server};
use crate::xmlrpc::value::Value;

/// Parameter and return types a signature can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    String,
    Boolean,
    Double,
    DateTime,
    Base64,
    Array,
    Struct,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match *self {
            TypeTag::Int => "int",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Double => "double",
            TypeTag::DateTime => "dateTime.iso8601",
            TypeTag::Base64 => "base64",
            TypeTag::Array => "array",
            TypeTag::Struct => "struct",
        }
    }

    /// Whether an argument is of the declared kind. Text and binary payloads
    /// are interchangeable; every other kind must match exactly.
    pub fn accepts(&self, value: &Value) -> bool {
        match (*self, value) {
            (TypeTag::Int, &Value::Int(_)) => true,
            (TypeTag::String, &Value::String(_)) | (TypeTag::String, &Value::Binary(_)) => true,
            (TypeTag::Base64, &Value::String(_)) | (TypeTag::Base64, &Value::Binary(_)) => true,
            (TypeTag::Boolean, &Value::Boolean(_)) => true,
            (TypeTag::Double, &Value::Double(_)) => true,
            (TypeTag::DateTime, &Value::DateTime(_)) => true,
            (TypeTag::Array, &Value::Array(_)) => true,
            (TypeTag::Struct, &Value::Struct(_)) => true,
            _ => false,
        }
    }

    /// A representative value, used by `system.methodSignature`.
    pub fn sample(&self) -> Value {
        match *self {
            TypeTag::Int => Value::Int(42),
            TypeTag::String => Value::String("string".to_string()),
            TypeTag::Boolean => Value::Boolean(true),
            TypeTag::Double => Value::Double(3.1415),
            TypeTag::DateTime => Value::DateTime(Date::now()),
            TypeTag::Base64 => Value::Binary(Binary::new("base64")),
            TypeTag::Array => Value::Array(vec![Value::String("array".to_string())]),
            TypeTag::Struct => {
                let mut members = IndexMap::new();
                members.insert("struct".to_string(), Value::String("struct".to_string()));
                Value::Struct(members)
            }
        }
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(tag: &str) -> Result<TypeTag> {
        match tag {
            "int" | "i4" => Ok(TypeTag::Int),
            "string" => Ok(TypeTag::String),
            "boolean" => Ok(TypeTag::Boolean),
            "double" | "float" => Ok(TypeTag::Double),
            "date" | "dateTime.iso8601" => Ok(TypeTag::DateTime),
            "base64" => Ok(TypeTag::Base64),
            "array" => Ok(TypeTag::Array),
            "struct" => Ok(TypeTag::Struct),
            _ => Err(Error::UnknownType(tag.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Return type followed by required and optional trailing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    return_type: TypeTag,
    params: Vec<TypeTag>,
    optional: Vec<TypeTag>,
}

impl Signature {
    pub fn new(return_type: TypeTag, params: Vec<TypeTag>) -> Signature {
        Signature { return_type: return_type, params: params, optional: Vec::new() }
    }

    pub fn with_optional(mut self, optional: Vec<TypeTag>) -> Signature {
        self.optional = optional;
        self
    }

    /// Parses a list of tags, return type first. A trailing `?` marks an
    /// optional parameter (`["string", "int", "struct?"]`); optional
    /// parameters can only follow required ones.
    pub fn parse(tags: &[&str]) -> Result<Signature> {
        let (return_tag, param_tags) = match tags.split_first() {
            Some(split) => split,
            None => return Err(Error::InvalidSignature("missing return type".to_string())),
        };

        let mut signature = Signature::new(return_tag.parse()?, Vec::new());
        for tag in param_tags {
            match tag.strip_suffix('?') {
                Some(optional) => signature.optional.push(optional.parse()?),
                None if signature.optional.is_empty() => signature.params.push(tag.parse()?),
                None => {
                    return Err(Error::InvalidSignature(format!("required parameter {} after optional ones", tag)));
                }
            }
        }
        Ok(signature)
    }

    pub fn return_type(&self) -> TypeTag {
        self.return_type
    }

    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    pub fn optional(&self) -> &[TypeTag] {
        &self.optional
    }

    /// Checks positional arguments. Missing required arguments and
    /// mismatched kinds are faults; arguments beyond the declared ones are
    /// not checked.
    pub fn check(&self, args: &[Value]) -> std::result::Result<(), Fault> {
        if args.len() < self.params.len() {
            return Err(Fault::new(INVALID_PARAMS, "server error. wrong number of method parameters"));
        }

        let declared = self.params.iter().chain(self.optional.iter());
        for (tag, arg) in declared.zip(args) {
            if !tag.accepts(arg) {
                debug!("Argument of type {} does not match {}", arg.type_name(), tag);
                return Err(Fault::new(INVALID_PARAMS, "server error. invalid method parameters"));
            }
        }
        Ok(())
    }

    pub fn samples(&self) -> Vec<Value> {
        Some(&self.return_type)
            .into_iter()
            .chain(self.params.iter())
            .chain(self.optional.iter())
            .map(TypeTag::sample)
            .collect()
    }
}

impl Server {
    /// A server with signature-checked dispatch and the
    /// `system.methodSignature` / `system.methodHelp` built-ins.
    pub fn introspection() -> Server {
        let mut server = Server::new();
        server.check_signatures = true;
        server.set_capability("introspection",
                              Capability::new("http://xmlrpc.usefulinc.com/doc/reserved.html", 1));

        server.add_operation("methodSignature", method_signature);
        server.add_operation("methodHelp", method_help);

        server.register_method("system.methodSignature", builtin(
            "this:methodSignature",
            Signature::new(TypeTag::Array, vec![TypeTag::String]),
            "Returns an array describing the return type and required parameters of a method"));
        server.register_method("system.getCapabilities", builtin(
            "this:getCapabilities",
            Signature::new(TypeTag::Struct, vec![]),
            "Returns a struct describing the XML-RPC specifications supported by this server"));
        server.register_method("system.listMethods", builtin(
            "this:listMethods",
            Signature::new(TypeTag::Array, vec![]),
            "Returns an array of available methods on this server"));
        server.register_method("system.methodHelp", builtin(
            "this:methodHelp",
            Signature::new(TypeTag::String, vec![TypeTag::String]),
            "Returns a documentation string for the specified method"));
        server
    }

    /// Registers `name` with a signature (return type first) and help text.
    pub fn add_callback(&mut self, name: &str, target: &str, signature: &[&str], help: &str) -> Result<()> {
        let signature = Signature::parse(signature)?;
        self.register_method(name, MethodDescriptor {
            target: MethodTarget::parse(target),
            signature: Some(signature),
            help: Some(help.to_string()),
        });
        Ok(())
    }

    pub(crate) fn check_signature(&self, name: &str, args: &[Value]) -> std::result::Result<(), Fault> {
        match self.specified(name)?.signature {
            Some(ref signature) => signature.check(args),
            None => Ok(()),
        }
    }

    /// Sample values for the return type and every declared parameter; an
    /// empty list when the method carries no signature.
    pub fn method_signature(&self, name: &str) -> std::result::Result<Value, Fault> {
        let samples = match self.specified(name)?.signature {
            Some(ref signature) => signature.samples(),
            None => Vec::new(),
        };
        Ok(Value::Array(samples))
    }

    pub fn method_help(&self, name: &str) -> std::result::Result<Value, Fault> {
        let help = self.specified(name)?.help.clone().unwrap_or_default();
        Ok(Value::String(help))
    }

    fn specified(&self, name: &str) -> std::result::Result<&MethodDescriptor, Fault> {
        self.descriptor(name).ok_or_else(|| {
            Fault::new(METHOD_NOT_FOUND, format!("server error. requested method \"{}\" not specified.", name))
        })
    }
}

fn builtin(target: &str, signature: Signature, help: &str) -> MethodDescriptor {
    MethodDescriptor {
        target: MethodTarget::parse(target),
        signature: Some(signature),
        help: Some(help.to_string()),
    }
}

fn method_name(args: &[Value]) -> std::result::Result<&str, Fault> {
    args.first()
        .and_then(Value::as_str)
        .ok_or_else(|| Fault::new(INVALID_PARAMS, "server error. invalid method parameters"))
}

fn method_signature(server: &Server, args: &[Value]) -> std::result::Result<Value, Fault> {
    server.method_signature(method_name(args)?)
}

fn method_help(server: &Server, args: &[Value]) -> std::result::Result<Value, Fault> {
    server.method_help(method_name(args)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::decoder::Message;

    fn add(args: &[Value]) -> std::result::Result<Value, Fault> {
        Ok(Value::Int(args.iter().filter_map(Value::as_i32).sum()))
    }

    fn demo() -> Server {
        let mut server = Server::introspection();
        server.add_function("add", add);
        server.add_callback("demo.add", "add", &["int", "int", "int"], "Adds two integers").unwrap();
        server
    }

    #[test]
    fn test_type_aliases() {
        assert_eq!(TypeTag::Int, "i4".parse::<TypeTag>().unwrap());
        assert_eq!(TypeTag::Double, "float".parse::<TypeTag>().unwrap());
        assert_eq!(TypeTag::DateTime, "date".parse::<TypeTag>().unwrap());
        assert!("nil".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_parse_signature() {
        let signature = Signature::parse(&["struct", "string", "int?"]).unwrap();
        assert_eq!(TypeTag::Struct, signature.return_type());
        assert_eq!(&[TypeTag::String], signature.params());
        assert_eq!(&[TypeTag::Int], signature.optional());

        assert!(Signature::parse(&[]).is_err());
        assert!(Signature::parse(&["int", "int?", "int"]).is_err());
    }

    #[test]
    fn test_unknown_tag_rejected_at_registration() {
        let mut server = Server::introspection();
        assert!(server.add_callback("bad", "add", &["int", "integer"], "").is_err());
        assert!(!server.has_method("bad"));
    }

    #[test]
    fn test_checked_dispatch() {
        let server = demo();
        assert_eq!(Ok(Value::Int(5)), server.call("demo.add", &[Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn test_wrong_kind_of_argument() {
        let server = demo();
        let fault = server.call("demo.add", &[Value::String("a".into()), Value::Int(1)]).unwrap_err();
        assert_eq!(-32602, fault.code());
        assert_eq!("server error. invalid method parameters", fault.message());
    }

    #[test]
    fn test_missing_argument() {
        let server = demo();
        let fault = server.call("demo.add", &[Value::Int(1)]).unwrap_err();
        assert_eq!(-32602, fault.code());
        assert_eq!("server error. wrong number of method parameters", fault.message());
    }

    #[test]
    fn test_extra_arguments_are_unchecked() {
        let server = demo();
        let args = [Value::Int(1), Value::Int(2), Value::String("extra".into())];
        assert_eq!(Ok(Value::Int(3)), server.call("demo.add", &args));
    }

    #[test]
    fn test_optional_arguments_are_checked_when_present() {
        let mut server = demo();
        server.add_callback("demo.sum", "add", &["int", "int", "int?"], "").unwrap();

        assert_eq!(Ok(Value::Int(1)), server.call("demo.sum", &[Value::Int(1)]));
        assert_eq!(Ok(Value::Int(3)), server.call("demo.sum", &[Value::Int(1), Value::Int(2)]));
        let fault = server.call("demo.sum", &[Value::Int(1), Value::Boolean(true)]).unwrap_err();
        assert_eq!(-32602, fault.code());
    }

    #[test]
    fn test_text_and_binary_are_interchangeable() {
        assert!(TypeTag::String.accepts(&Value::Binary(Binary::new("x"))));
        assert!(TypeTag::Base64.accepts(&Value::String("x".into())));
        assert!(!TypeTag::Double.accepts(&Value::Int(1)));
        assert!(!TypeTag::Int.accepts(&Value::Double(1.0)));
        assert!(!TypeTag::Struct.accepts(&Value::Array(vec![])));
    }

    #[test]
    fn test_int_is_not_a_double() {
        let mut server = demo();
        server.add_function("echo", |args: &[Value]| Ok(Value::Array(args.to_vec())));
        server.add_callback("demo.scale", "echo", &["int", "double"], "").unwrap();

        let fault = server.call("demo.scale", &[Value::Int(3)]).unwrap_err();
        assert_eq!(-32602, fault.code());
        assert_eq!("server error. invalid method parameters", fault.message());
        assert_eq!(Ok(Value::Array(vec![Value::Double(3.0)])), server.call("demo.scale", &[Value::Double(3.0)]));
    }

    #[test]
    fn test_unspecified_method() {
        let server = demo();
        let fault = server.call("nope", &[]).unwrap_err();
        assert_eq!(-32601, fault.code());
        assert_eq!("server error. requested method \"nope\" not specified.", fault.message());
    }

    #[test]
    fn test_unsigned_methods_are_not_checked() {
        let server = demo();
        assert_eq!(Ok(Value::Int(0)), server.call("add", &[Value::String("x".into())]));
    }

    #[test]
    fn test_method_signature() {
        let server = demo();
        let samples = server.call("system.methodSignature", &[Value::String("demo.add".into())]).unwrap();
        assert_eq!(Value::Array(vec![Value::Int(42), Value::Int(42), Value::Int(42)]), samples);

        let samples = server.method_signature("system.methodSignature").unwrap();
        assert_eq!(Value::Array(vec![Value::Array(vec![Value::String("array".into())]),
                                     Value::String("string".into())]),
                   samples);

        assert_eq!(Ok(Value::Array(vec![])), server.method_signature("add"));
    }

    #[test]
    fn test_method_signature_requires_a_name() {
        let server = demo();
        let fault = server.call("system.methodSignature", &[]).unwrap_err();
        assert_eq!(-32602, fault.code());
        assert_eq!("server error. wrong number of method parameters", fault.message());
    }

    #[test]
    fn test_method_help() {
        let server = demo();
        assert_eq!(Ok(Value::String("Adds two integers".into())),
                   server.call("system.methodHelp", &[Value::String("demo.add".into())]));
        assert_eq!(Ok(Value::String("".into())), server.method_help("add"));
    }

    #[test]
    fn test_capabilities_include_introspection() {
        let server = demo();
        let capabilities = server.call("system.getCapabilities", &[]).unwrap();
        assert_eq!(Some("http://xmlrpc.usefulinc.com/doc/reserved.html"),
                   capabilities.find_path(&["introspection", "specUrl"]).and_then(|v| v.as_str()));
        assert_eq!(Some(&Value::Int(1)), capabilities.find_path(&["introspection", "specVersion"]));
    }

    #[test]
    fn test_list_methods() {
        let server = demo();
        assert_eq!(vec!["demo.add", "add", "system.methodHelp", "system.methodSignature",
                        "system.multicall", "system.listMethods", "system.getCapabilities"],
                   server.list_methods());
    }

    #[test]
    fn test_multi_call_checks_signatures() {
        let server = demo();
        let body = "<methodCall><methodName>system.multicall</methodName><params><param><value><array><data>\
                    <value><struct><member><name>methodName</name><value>demo.add</value></member>\
                    <member><name>params</name><value><array><data><value><int>4</int></value>\
                    <value><string>4</string></value></data></array></value></member></struct></value>\
                    </data></array></value></param></params></methodCall>";

        let response = Message::parse(&server.serve(body)).unwrap();
        let results = response.params()[0].as_array().unwrap();
        assert_eq!(Some(&Value::Int(-32602)), results[0].find("faultCode"));
    }
}
