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

use crate::model::{Id, TlsSpec};
use crate::rule::{Protocol, RuleExpr};

/// A routing rule bound to a target service.
///
/// UDP routers never carry a rule (Traefik routes UDP by entrypoint
/// only); TCP routers restrict themselves to the TCP-compatible matcher
/// subset (enforced by the validator, not this type).
#[derive(Clone, Debug)]
pub struct Router {
    pub id: Id,
    pub protocol: Protocol,
    pub rule: Option<RuleExpr>,
    pub priority: Option<i64>,
    pub entrypoints: Vec<String>,
    pub service_ref: Id,
    pub middleware_refs: Vec<Id>,
    pub tls: Option<TlsSpec>,
}

impl Router {
    pub fn new(id: impl Into<Id>, protocol: Protocol, service_ref: impl Into<Id>) -> Self {
        Router {
            id: id.into(),
            protocol,
            rule: None,
            priority: None,
            entrypoints: Vec::new(),
            service_ref: service_ref.into(),
            middleware_refs: Vec::new(),
            tls: None,
        }
    }

    pub fn with_rule(mut self, rule: RuleExpr) -> Self {
        self.rule = Some(rule);
        self
    }
}
