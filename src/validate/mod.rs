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

//! The validator: invariant and best-practice checks over a [`Config`],
//! each producing a [`Diagnostic`] rather than failing. This is the only
//! part of the pipeline other than an ingestor allowed to push onto
//! `Config::diagnostics` — emitters stay read-only and hand their
//! downgrade notes back to the orchestrator, which folds them into the
//! same diagnostics list after the first emission pass.

use crate::model::{Config, Diagnostic};
use crate::rule::{Dialect, Protocol};
use std::collections::BTreeMap;

pub fn validate(config: &mut Config) {
    check_referential_integrity(config);
    check_matcher_protocol_compatibility(config);
    check_udp_routers(config);
    check_pools(config);
    check_tls(config);
    check_port_specification(config);
    check_priority_conflicts(config);
    check_priority_hints(config);
}

fn check_referential_integrity(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for router in config.routers.values() {
        if !config.services.contains_key(&router.service_ref) {
            diagnostics.push(Diagnostic::error(
                "DanglingReference",
                format!(
                    "router `{}` references undefined service `{}`",
                    router.id, router.service_ref
                ),
            ));
        }
        for mw_ref in &router.middleware_refs {
            if !config.middlewares.contains_key(mw_ref) {
                diagnostics.push(Diagnostic::error(
                    "DanglingReference",
                    format!("router `{}` references undefined middleware `{mw_ref}`", router.id),
                ));
            }
        }
        if let Some(options_ref) = router.tls.as_ref().and_then(|t| t.options_ref.as_ref()) {
            if !config.tls_options.contains_key(options_ref) {
                diagnostics.push(Diagnostic::error(
                    "DanglingReference",
                    format!(
                        "router `{}` references undefined tls option set `{options_ref}`",
                        router.id
                    ),
                ));
            }
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_matcher_protocol_compatibility(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for router in config.routers.values() {
        let Some(rule) = &router.rule else { continue };
        for (name, _) in rule.matchers() {
            if !name.supports_protocol(router.protocol) {
                diagnostics.push(Diagnostic::error(
                    "MatcherProtocolMismatch",
                    format!(
                        "router `{}` ({}): matcher `{name}` is not valid for protocol `{}`",
                        router.id, router.protocol, router.protocol
                    ),
                ));
            }
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_udp_routers(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for router in config.routers.values() {
        if router.protocol != Protocol::Udp {
            continue;
        }
        if router.rule.is_some() {
            diagnostics.push(Diagnostic::error(
                "InvalidUdpRouter",
                format!("UDP router `{}` must not carry a rule", router.id),
            ));
        }
        if router.tls.is_some() {
            diagnostics.push(Diagnostic::error(
                "InvalidUdpRouter",
                format!("UDP router `{}` must not carry a TLS spec", router.id),
            ));
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_pools(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for service in config.services.values() {
        if service.pool.servers.is_empty() {
            diagnostics.push(Diagnostic::error(
                "EmptyPool",
                format!("service `{}` has no backend servers", service.id),
            ));
            continue;
        }
        if service.pool.policy.is_weighted() && service.pool.servers.iter().any(|s| s.weight.is_none()) {
            diagnostics.push(Diagnostic::error(
                "MissingWeight",
                format!(
                    "service `{}` uses a weighted policy but not every server has a weight",
                    service.id
                ),
            ));
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_tls(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for router in config.routers.values() {
        let Some(tls) = &router.tls else { continue };
        if tls.cert_files.is_empty() && tls.cert_resolver.is_none() {
            diagnostics.push(Diagnostic::warning(
                "ImplicitTls",
                format!(
                    "router `{}`: no cert_files and no cert_resolver; plain HTTP (no TLS termination) is assumed",
                    router.id
                ),
            ));
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_port_specification(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for service in config.services.values() {
        for server in &service.pool.servers {
            let has_port = match (&server.url, &server.address) {
                (Some(url), _) => url.port().is_some(),
                (None, Some(address)) => address.rsplit_once(':').is_some(),
                (None, None) => true,
            };
            if !has_port {
                diagnostics.push(Diagnostic::warning(
                    "ImplicitPort",
                    format!(
                        "service `{}`: a backend server has no explicit port; the protocol default is assumed",
                        service.id
                    ),
                ));
            }
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

fn check_priority_conflicts(config: &mut Config) {
    let mut groups: BTreeMap<(String, Option<i64>), Vec<&str>> = BTreeMap::new();
    for router in config.routers.values() {
        let Some(rule) = &router.rule else { continue };
        let key = (rule.print(Dialect::V3), router.priority);
        groups.entry(key).or_default().push(router.id.as_str());
    }

    let mut diagnostics = Vec::new();
    for ((rule_text, priority), ids) in groups {
        if ids.len() > 1 {
            diagnostics.push(Diagnostic::warning(
                "PriorityConflict",
                format!(
                    "routers {:?} share the rule `{rule_text}` and priority {priority:?}; routing order between them is undefined",
                    ids
                ),
            ));
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

/// A rule is "specific" enough to deserve an explicit priority once it
/// combines more than one matcher — Traefik breaks same-length ties by
/// declaration order, which is rarely what the author intended.
const SPECIFICITY_THRESHOLD: usize = 2;

fn check_priority_hints(config: &mut Config) {
    let mut diagnostics = Vec::new();
    for router in config.routers.values() {
        let Some(rule) = &router.rule else { continue };
        if router.priority.is_some() {
            continue;
        }
        if rule.matchers().len() >= SPECIFICITY_THRESHOLD {
            diagnostics.push(
                Diagnostic::info(
                    "PriorityHint",
                    format!(
                        "router `{}`: rule `{}` combines multiple matchers but has no explicit priority",
                        router.id,
                        rule.print(Dialect::V3)
                    ),
                )
                .with_fix("set an explicit `priority` so match order does not depend on declaration order"),
            );
        }
    }
    diagnostics.into_iter().for_each(|d| config.push_diagnostic(d));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{LoadBalancer, LoadBalancerPolicy, Router, Server, Service, TlsSpec};
    use crate::rule::{self, Protocol};

    #[test]
    fn dangling_service_reference_is_an_error() {
        let mut config = Config::new();
        config.routers.insert(
            "r".to_string(),
            Router::new("r", Protocol::Http, "missing"),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "DanglingReference"));
    }

    #[test]
    fn udp_router_with_rule_is_rejected() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Udp, "s");
        router.rule = Some(rule::parse("ClientIP(`10.0.0.0/8`)", Dialect::V3).unwrap());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Udp, LoadBalancer::new(vec![Server::address("a:1")], LoadBalancerPolicy::RoundRobin)),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "InvalidUdpRouter"));
    }

    #[test]
    fn weighted_policy_without_weights_is_an_error() {
        let mut config = Config::new();
        config.services.insert(
            "s".to_string(),
            Service::new(
                "s",
                Protocol::Http,
                LoadBalancer::new(
                    vec![Server::http(url::Url::parse("http://a:80").unwrap())],
                    LoadBalancerPolicy::WeightedRoundRobin,
                ),
            ),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "MissingWeight"));
    }

    #[test]
    fn tls_without_cert_files_or_resolver_warns() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        router.tls = Some(TlsSpec::default());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(vec![Server::http(url::Url::parse("http://a:80").unwrap())], LoadBalancerPolicy::RoundRobin)),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "ImplicitTls"));
    }

    #[test]
    fn identical_rule_and_priority_is_a_conflict() {
        let mut config = Config::new();
        let mut r1 = Router::new("r1", Protocol::Http, "s");
        r1.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        let mut r2 = Router::new("r2", Protocol::Http, "s");
        r2.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        config.routers.insert(r1.id.clone(), r1);
        config.routers.insert(r2.id.clone(), r2);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(vec![Server::http(url::Url::parse("http://a:80").unwrap())], LoadBalancerPolicy::RoundRobin)),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "PriorityConflict"));
    }

    #[test]
    fn specific_rule_without_priority_gets_a_hint() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`) && PathPrefix(`/a`)", Dialect::V3).unwrap());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(vec![Server::http(url::Url::parse("http://a:80").unwrap())], LoadBalancerPolicy::RoundRobin)),
        );

        validate(&mut config);
        assert!(config.diagnostics.iter().any(|d| d.code == "PriorityHint"));
    }
}
