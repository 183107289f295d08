/*-
 * ========================LICENSE_START=================================
 * waypost
 * %%
 * Copyright (C) 2024 the waypost authors
 * %%
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
 * THE SOFTWARE.
 * =========================LICENSE_END==================================
 */

//! Middleware kinds: a name plus an opaque [`serde_value::Value`]
//! parameter bag, since each kind's parameter shape is heterogeneous
//! (scalar|list|map) and schema-checked per kind rather than statically
//! typed per kind.

use crate::model::Id;
use serde_value::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MiddlewareKind {
    BasicAuth,
    RateLimit,
    IpAllowlist,
    Compress,
    Headers,
    RedirectScheme,
    RedirectRegex,
    StripPrefix,
    AddPrefix,
    ReplacePath,
    Retry,
    Buffering,
    InFlightReq,
    ForwardAuth,
    CircuitBreaker,
    Chain,
}

impl MiddlewareKind {
    pub fn as_key(&self) -> &'static str {
        match self {
            MiddlewareKind::BasicAuth => "basicAuth",
            MiddlewareKind::RateLimit => "rateLimit",
            MiddlewareKind::IpAllowlist => "ipAllowList",
            MiddlewareKind::Compress => "compress",
            MiddlewareKind::Headers => "headers",
            MiddlewareKind::RedirectScheme => "redirectScheme",
            MiddlewareKind::RedirectRegex => "redirectRegex",
            MiddlewareKind::StripPrefix => "stripPrefix",
            MiddlewareKind::AddPrefix => "addPrefix",
            MiddlewareKind::ReplacePath => "replacePath",
            MiddlewareKind::Retry => "retry",
            MiddlewareKind::Buffering => "buffering",
            MiddlewareKind::InFlightReq => "inFlightReq",
            MiddlewareKind::ForwardAuth => "forwardAuth",
            MiddlewareKind::CircuitBreaker => "circuitBreaker",
            MiddlewareKind::Chain => "chain",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let all = [
            MiddlewareKind::BasicAuth,
            MiddlewareKind::RateLimit,
            MiddlewareKind::IpAllowlist,
            MiddlewareKind::Compress,
            MiddlewareKind::Headers,
            MiddlewareKind::RedirectScheme,
            MiddlewareKind::RedirectRegex,
            MiddlewareKind::StripPrefix,
            MiddlewareKind::AddPrefix,
            MiddlewareKind::ReplacePath,
            MiddlewareKind::Retry,
            MiddlewareKind::Buffering,
            MiddlewareKind::InFlightReq,
            MiddlewareKind::ForwardAuth,
            MiddlewareKind::CircuitBreaker,
            MiddlewareKind::Chain,
        ];
        all.into_iter().find(|k| k.as_key().eq_ignore_ascii_case(key))
    }

    /// Required parameter keys for this kind, used by the validator to
    /// flag malformed middleware definitions.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            MiddlewareKind::BasicAuth => &["users"],
            MiddlewareKind::RateLimit => &["average"],
            MiddlewareKind::IpAllowlist => &["sourceRange"],
            MiddlewareKind::StripPrefix => &["prefixes"],
            MiddlewareKind::AddPrefix => &["prefix"],
            MiddlewareKind::ReplacePath => &["path"],
            MiddlewareKind::RedirectScheme => &["scheme"],
            MiddlewareKind::RedirectRegex => &["regex", "replacement"],
            MiddlewareKind::ForwardAuth => &["address"],
            MiddlewareKind::Chain => &["middlewares"],
            _ => &[],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Middleware {
    pub id: Id,
    pub kind: MiddlewareKind,
    pub params: BTreeMap<String, Value>,
}

impl Middleware {
    pub fn new(id: impl Into<Id>, kind: MiddlewareKind) -> Self {
        Middleware {
            id: id.into(),
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::U8(n) => Some(n.to_string()),
            Value::U16(n) => Some(n.to_string()),
            Value::U32(n) => Some(n.to_string()),
            Value::U64(n) => Some(n.to_string()),
            Value::I8(n) => Some(n.to_string()),
            Value::I16(n) => Some(n.to_string()),
            Value::I32(n) => Some(n.to_string()),
            Value::I64(n) => Some(n.to_string()),
            Value::F32(n) => Some(n.to_string()),
            Value::F64(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn param_list(&self, key: &str) -> Vec<String> {
        match self.params.get(key) {
            Some(Value::Seq(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}
