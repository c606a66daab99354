// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::ops::Deref;

use rustc_serialize::base64::{FromBase64, FromBase64Error, ToBase64, STANDARD};

/// Opaque bytes carried as `<base64>` on the wire.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Binary(Vec<u8>);

impl Binary {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Binary {
        Binary(bytes.into())
    }

    /// Decodes wire text. Characters outside the base64 alphabet (line
    /// breaks, indentation) are skipped before decoding.
    pub fn from_base64(text: &str) -> Result<Binary, FromBase64Error> {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/' || *c == '=')
            .collect();
        cleaned.from_base64().map(Binary)
    }

    /// Decodes whatever can be decoded: text after the first `=` and a
    /// dangling final character are dropped, and anything undecodable gives
    /// an empty payload.
    pub fn decode_lenient(text: &str) -> Binary {
        let mut cleaned: String = text
            .chars()
            .take_while(|c| *c != '=')
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
            .collect();
        if cleaned.len() % 4 == 1 {
            cleaned.pop();
        }
        while cleaned.len() % 4 != 0 {
            cleaned.push('=');
        }
        Binary(cleaned.from_base64().unwrap_or_default())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64(STANDARD)
    }

    pub fn to_xml(&self) -> String {
        format!("<base64>{}</base64>", self.to_base64())
    }
}

impl Deref for Binary {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Binary {
        Binary(bytes)
    }
}

impl<'a> From<&'a [u8]> for Binary {
    fn from(bytes: &'a [u8]) -> Binary {
        Binary(bytes.to_vec())
    }
}
