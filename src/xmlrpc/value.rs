// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;

use indexmap::IndexMap;
use num::ToPrimitive;
use rustc_serialize::Encodable;
use xml::escape::escape_str_pcdata;

use crate::xmlrpc::base64::Binary;
use crate::xmlrpc::date::Date;
use crate::xmlrpc::encoding::{EncoderError, ValueEncoder};

/// Represents an XML-RPC data value
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Boolean(bool),
    Int(i32),
    Double(f64),
    String(String),
    DateTime(Date),
    Binary(Binary),
    Array(self::Array),
    Struct(self::Struct),
}

pub type Array = Vec<Value>;
pub type Struct = IndexMap<String, Value>;

impl Value {
    /// Infers the wire type of a native value.
    pub fn from_native<T: ToValue + ?Sized>(data: &T) -> Value {
        data.to_value()
    }

    /// Converts a record-like value (anything `Encodable`) into a `Struct`,
    /// wrapping each field recursively.
    pub fn from_record<T: Encodable + ?Sized>(record: &T) -> Result<Value, EncoderError> {
        let mut encoder = ValueEncoder::new();
        record.encode(&mut encoder)?;
        encoder.into_value()
    }

    /// Builds an `Array` when the keys are exactly `"0"`, `"1"`, ... in order,
    /// and a `Struct` keyed by the given names otherwise.
    pub fn from_pairs<K, I>(pairs: I) -> Value
    where
        K: ToString,
        I: IntoIterator<Item = (K, Value)>,
    {
        let pairs: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        let positional = pairs
            .iter()
            .enumerate()
            .all(|(expected, &(ref key, _))| *key == expected.to_string());

        if positional {
            Value::Array(pairs.into_iter().map(|(_, value)| value).collect())
        } else {
            Value::Struct(pairs.into_iter().collect())
        }
    }

    /// Wire tag name of this value.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Binary(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    /// Serializes the value as the content of a `<value>` element.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        match *self {
            Value::Boolean(b) => {
                let _ = write!(out, "<boolean>{}</boolean>", if b { 1 } else { 0 });
            }
            Value::Int(n) => {
                let _ = write!(out, "<int>{}</int>", n);
            }
            Value::Double(x) => {
                let _ = write!(out, "<double>{}</double>", x);
            }
            Value::String(ref s) => {
                out.push_str("<string>");
                out.push_str(&escape_str_pcdata(s));
                out.push_str("</string>");
            }
            Value::DateTime(ref date) => out.push_str(&date.to_xml()),
            Value::Binary(ref binary) => out.push_str(&binary.to_xml()),
            Value::Array(ref items) => {
                out.push_str("<array><data>");
                for item in items {
                    out.push_str("<value>");
                    item.write_xml(out);
                    out.push_str("</value>");
                }
                out.push_str("</data></array>");
            }
            Value::Struct(ref members) => {
                out.push_str("<struct>");
                for (name, member) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape_str_pcdata(name));
                    out.push_str("</name><value>");
                    member.write_xml(out);
                    out.push_str("</value></member>");
                }
                out.push_str("</struct>");
            }
        }
    }

    /// If the value is a Struct, returns the member with the given name.
    pub fn find<'a>(&'a self, key: &str) -> Option<&'a Value> {
        match *self {
            Value::Struct(ref members) => members.get(key),
            _ => None,
        }
    }

    /// Follows nested Struct members, one key per level.
    pub fn find_path<'a>(&'a self, keys: &[&str]) -> Option<&'a Value> {
        let mut target = self;
        for key in keys {
            target = target.find(key)?;
        }
        Some(target)
    }

    /// Depth-first search through nested Structs for the first member with
    /// the given name.
    pub fn search<'a>(&'a self, key: &str) -> Option<&'a Value> {
        match *self {
            Value::Struct(ref members) => match members.get(key) {
                Some(found) => Some(found),
                None => members.values().filter_map(|v| v.search(key)).next(),
            },
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Doubles as is, ints widened.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(n) => num::cast(n),
            Value::Double(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&Date> {
        match *self {
            Value::DateTime(ref date) => Some(date),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match *self {
            Value::Binary(ref binary) => Some(binary),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Value::Array(ref items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match *self {
            Value::Struct(ref members) => Some(members),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.as_array().is_some()
    }

    pub fn is_struct(&self) -> bool {
        self.as_struct().is_some()
    }
}

impl fmt::Display for Value {
    /// Encodes the value as an XML fragment
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

/// A trait for converting native values to XML-RPC values
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Integers that do not fit the 4-byte XML-RPC int become doubles.
pub(crate) fn integer_value<N: ToPrimitive>(n: N) -> Value {
    match n.to_i32() {
        Some(small) => Value::Int(small),
        None => Value::Double(n.to_f64().unwrap_or(0.0)),
    }
}

macro_rules! to_value_impl_int {
    ($($t:ty), +) => (
        $(impl ToValue for $t {
            fn to_value(&self) -> Value { integer_value(*self) }
        })+
    )
}

to_value_impl_int! { isize, i8, i16, i32, i64 }
to_value_impl_int! { usize, u8, u16, u32, u64 }

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Double(f64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl ToValue for Date {
    fn to_value(&self) -> Value {
        Value::DateTime(self.clone())
    }
}

impl ToValue for Binary {
    fn to_value(&self) -> Value {
        Value::Binary(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl<'a, T: ToValue + ?Sized> ToValue for &'a T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

/// `None` stringifies to the empty string; XML-RPC has no nil.
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match *self {
            None => Value::String(String::new()),
            Some(ref value) => value.to_value(),
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(|elt| elt.to_value()).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<K: ToString, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::from_pairs(self.iter().map(|(k, v)| (k.to_string(), v.to_value())))
    }
}

impl<K: ToString, V: ToValue> ToValue for IndexMap<K, V> {
    fn to_value(&self) -> Value {
        Value::from_pairs(self.iter().map(|(k, v)| (k.to_string(), v.to_value())))
    }
}

macro_rules! tuple_impl {
    ($($tyvar:ident),* ) => {
        impl<$( $tyvar : ToValue ),*> ToValue for ( $( $tyvar ),* , ) {
            #[allow(non_snake_case)]
            fn to_value(&self) -> Value {
                let ($(ref $tyvar),*,) = *self;
                Value::Array(vec![$($tyvar.to_value()),*])
            }
        }
    }
}

tuple_impl!{A}
tuple_impl!{A, B}
tuple_impl!{A, B, C}
tuple_impl!{A, B, C, D}
tuple_impl!{A, B, C, D, E}
tuple_impl!{A, B, C, D, E, F}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use indexmap::IndexMap;

    use super::Value;
    use crate::xmlrpc::base64::Binary;
    use crate::xmlrpc::date::Date;

    #[test]
    fn test_classify_scalars() {
        assert_eq!(Value::Boolean(true), Value::from_native(&true));
        assert_eq!(Value::Int(42), Value::from_native(&42u8));
        assert_eq!(Value::Double(4.5), Value::from_native(&4.5f32));
        assert_eq!(Value::String("abc".into()), Value::from_native("abc"));
        assert_eq!(Value::String(String::new()), Value::from_native(&None::<i32>));
        assert_eq!(Value::Double(5_000_000_000.0), Value::from_native(&5_000_000_000i64));

        let date = Date::parse_iso("20240101T00:00:00");
        assert_eq!(Value::DateTime(date.clone()), Value::from_native(&date));
        let binary = Binary::new(vec![0u8, 1, 2]);
        assert_eq!(Value::Binary(binary.clone()), Value::from_native(&binary));
    }

    #[test]
    fn test_positional_keys_make_an_array() {
        let value = Value::from_pairs(vec![
            ("0", Value::Int(10)),
            ("1", Value::Int(11)),
            ("2", Value::Int(12)),
        ]);
        assert_eq!("<array><data><value><int>10</int></value><value><int>11</int></value>\
                    <value><int>12</int></value></data></array>",
                   value.to_xml());
    }

    #[test]
    fn test_reordered_keys_make_a_struct() {
        let value = Value::from_pairs(vec![
            ("1", Value::Int(11)),
            ("0", Value::Int(10)),
            ("2", Value::Int(12)),
        ]);
        assert!(value.is_struct());
        let names: Vec<&String> = value.as_struct().unwrap().keys().collect();
        assert_eq!(vec!["1", "0", "2"], names);
    }

    #[test]
    fn test_non_numeric_or_sparse_keys_make_a_struct() {
        let named = Value::from_pairs(vec![("0", Value::Int(1)), ("one", Value::Int(2))]);
        assert!(named.is_struct());

        let mut sparse = BTreeMap::new();
        sparse.insert(0, "a");
        sparse.insert(2, "c");
        assert!(Value::from_native(&sparse).is_struct());

        let mut dense = BTreeMap::new();
        dense.insert(0, "a");
        dense.insert(1, "b");
        assert!(Value::from_native(&dense).is_array());
    }

    #[test]
    fn test_empty_sequence_is_an_array() {
        let empty: Vec<(String, Value)> = Vec::new();
        assert_eq!(Value::Array(vec![]), Value::from_pairs(empty));
    }

    #[test]
    fn test_struct_keeps_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        assert_eq!("<struct><member><name>zeta</name><value><int>1</int></value></member>\
                    <member><name>alpha</name><value><int>2</int></value></member></struct>",
                   Value::from_native(&map).to_xml());
    }

    #[test]
    fn test_scalar_xml() {
        assert_eq!("<boolean>0</boolean>", Value::Boolean(false).to_xml());
        assert_eq!("<int>-7</int>", Value::Int(-7).to_xml());
        assert_eq!("<double>4.2</double>", Value::Double(4.2).to_xml());
        assert_eq!("<string>a &lt; b &amp;&amp; c</string>", Value::from_native("a < b && c").to_xml());
    }

    #[test]
    fn test_tuple_and_vec_are_arrays() {
        let value = Value::from_native(&(1, "two", 3.0));
        assert_eq!(Some(3), value.as_array().map(|a| a.len()));
        assert_eq!(Value::Array(vec![Value::Int(1), Value::Int(2)]), Value::from_native(&vec![1, 2]));
    }

    #[test]
    fn test_accessors() {
        let mut inner = IndexMap::new();
        inner.insert("leaf".to_string(), Value::Int(3));
        let mut outer = IndexMap::new();
        outer.insert("name".to_string(), Value::String("n".into()));
        outer.insert("inner".to_string(), Value::Struct(inner));
        let value = Value::Struct(outer);

        assert_eq!(Some(&Value::Int(3)), value.find_path(&["inner", "leaf"]));
        assert_eq!(Some(&Value::Int(3)), value.search("leaf"));
        assert_eq!(None, value.search("missing"));
        assert_eq!(Some(3.0), Value::Int(3).as_f64());
        assert_eq!("struct", value.type_name());
    }
}
