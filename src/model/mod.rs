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

//! The format-neutral unified routing model. Ingestors build a
//! [`Config`]; the validator annotates it; emitters only read it.

pub mod diagnostic;
pub mod middleware;
pub mod router;
pub mod service;
pub mod tls;

pub use diagnostic::{Diagnostic, Severity};
pub use middleware::{Middleware, MiddlewareKind};
pub use router::Router;
pub use service::{HealthCheck, LoadBalancer, LoadBalancerPolicy, Server, Service};
pub use tls::{TlsOptions, TlsSpec};

use crate::rule::Protocol;
use std::collections::BTreeMap;

pub type Id = String;

#[derive(Clone, Debug, Default)]
pub struct Entrypoint {
    pub address: String,
    pub protocol: Protocol,
}

/// The top-level unified model entity. Owns every router, service,
/// middleware and TLS option; ingestors construct fresh instances,
/// emitters only read, the validator is the only component allowed to
/// mutate one after construction (annotating diagnostics, normalizing
/// defaults).
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub routers: BTreeMap<Id, Router>,
    pub services: BTreeMap<Id, Service>,
    pub middlewares: BTreeMap<Id, Middleware>,
    pub tls_options: BTreeMap<Id, TlsOptions>,
    pub entrypoints: BTreeMap<String, Entrypoint>,
    pub diagnostics: Vec<Diagnostic>,
    /// Fields recognized by an ingestor but not representable in the
    /// unified model, preserved so a later emission pass (to the same
    /// or a compatible format) can restore them losslessly. Keyed by a
    /// dotted path.
    pub raw_extras: BTreeMap<String, serde_value::Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}
