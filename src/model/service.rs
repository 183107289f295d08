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

use crate::model::Id;
use crate::rule::Protocol;
use std::time::Duration;

/// A backend pool plus its policy and health check.
#[derive(Clone, Debug)]
pub struct Service {
    pub id: Id,
    pub protocol: Protocol,
    pub pool: LoadBalancer,
    pub health: Option<HealthCheck>,
}

impl Service {
    pub fn new(id: impl Into<Id>, protocol: Protocol, pool: LoadBalancer) -> Self {
        Service {
            id: id.into(),
            protocol,
            pool,
            health: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LoadBalancerPolicy {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    LeastConn,
    WeightedLeastConn,
    Random,
    WeightedRandom,
}

impl LoadBalancerPolicy {
    pub fn is_weighted(&self) -> bool {
        matches!(
            self,
            LoadBalancerPolicy::WeightedRoundRobin
                | LoadBalancerPolicy::WeightedLeastConn
                | LoadBalancerPolicy::WeightedRandom
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerPolicy::RoundRobin => "round_robin",
            LoadBalancerPolicy::WeightedRoundRobin => "weighted_rr",
            LoadBalancerPolicy::LeastConn => "least_conn",
            LoadBalancerPolicy::WeightedLeastConn => "weighted_least_conn",
            LoadBalancerPolicy::Random => "random",
            LoadBalancerPolicy::WeightedRandom => "weighted_random",
        }
    }
}

/// One backend endpoint. `url` is used for HTTP services (scheme, host,
/// port, optional path); `address` (host:port, no scheme) is used for
/// TCP/UDP services.
#[derive(Clone, Debug)]
pub struct Server {
    pub url: Option<url::Url>,
    pub address: Option<String>,
    pub weight: Option<u32>,
}

impl Server {
    pub fn http(url: url::Url) -> Self {
        Server {
            url: Some(url),
            address: None,
            weight: None,
        }
    }

    pub fn address(address: impl Into<String>) -> Self {
        Server {
            url: None,
            address: Some(address.into()),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Rendered endpoint regardless of HTTP/TCP shape, for emitters that
    /// just need `host:port` (e.g. an nginx `upstream` entry).
    pub fn host_port(&self) -> Option<String> {
        if let Some(url) = &self.url {
            let host = url.host_str()?;
            let port = url
                .port_or_known_default()
                .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });
            Some(format!("{host}:{port}"))
        } else {
            self.address.clone()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadBalancer {
    pub servers: Vec<Server>,
    pub policy: LoadBalancerPolicy,
}

impl LoadBalancer {
    pub fn new(servers: Vec<Server>, policy: LoadBalancerPolicy) -> Self {
        LoadBalancer { servers, policy }
    }
}

#[derive(Clone, Debug)]
pub struct HealthCheck {
    pub path: String,
    pub interval: Duration,
    pub timeout: Duration,
}
