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

//! docker-compose ingestor.

use crate::ingest::labels::{fold, LabelTree};
use crate::model::{Config, Diagnostic, LoadBalancer, LoadBalancerPolicy, Router, Server, Service};
use crate::rule::{self, Dialect, Protocol};
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

pub fn ingest(input: &str, dialect: Dialect) -> Result<Config, serde_yaml::Error> {
    let doc: YamlValue = serde_yaml::from_str(input)?;
    let mut config = Config::new();

    let Some(services) = doc.get("services").and_then(YamlValue::as_mapping) else {
        return Ok(config);
    };

    for (name_value, service_value) in services {
        let Some(service_name) = name_value.as_str() else {
            continue;
        };
        let labels = extract_labels(service_value);
        let tree = match fold(&labels, "traefik") {
            Ok(tree) => tree,
            Err(conflict) => {
                config.push_diagnostic(Diagnostic::error(
                    "LabelConflict",
                    format!("service `{service_name}`: {conflict}"),
                ));
                continue;
            }
        };

        let Some(root) = tree.as_map() else { continue };
        let enabled = root
            .get("enable")
            .and_then(LabelTree::as_scalar)
            .map(|v| v == "true")
            .unwrap_or(false);
        if !enabled {
            continue;
        }

        let first_port = first_port(service_value);

        for protocol in [Protocol::Http, Protocol::Tcp, Protocol::Udp] {
            let Some(namespace) = root.get(protocol_key(protocol)) else {
                continue;
            };
            ingest_namespace(&mut config, namespace, protocol, service_name, first_port, dialect);
        }
    }

    Ok(config)
}

fn protocol_key(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Http => "http",
        Protocol::Tcp => "tcp",
        Protocol::Udp => "udp",
    }
}

fn ingest_namespace(
    config: &mut Config,
    namespace: &LabelTree,
    protocol: Protocol,
    service_name: &str,
    first_port: Option<u16>,
    dialect: Dialect,
) {
    if let Some(routers) = namespace.get("routers").and_then(LabelTree::as_map) {
        for (router_id, router_tree) in routers {
            ingest_router(config, router_id, router_tree, protocol, service_name, dialect);
        }
    }
    if let Some(services) = namespace.get("services").and_then(LabelTree::as_map) {
        for (service_id, service_tree) in services {
            ingest_service(config, service_id, service_tree, protocol, service_name, first_port);
        }
    }
    if let Some(middlewares) = namespace.get("middlewares").and_then(LabelTree::as_map) {
        for (mw_id, mw_tree) in middlewares {
            if let Some(middleware) = super::traefik_dynamic::middleware_from_tree_like(mw_id, mw_tree_as_map(mw_tree))
            {
                config.middlewares.insert(middleware.id.clone(), middleware);
            }
        }
    }
}

/// Adapts a label [`LabelTree`] into the `BTreeMap<String, serde_value::Value>`
/// shape the traefik-dynamic ingestor's middleware builder expects, so both
/// ingestors share the one piece of kind-dispatch logic.
fn mw_tree_as_map(tree: &LabelTree) -> BTreeMap<String, serde_value::Value> {
    fn convert(tree: &LabelTree) -> serde_value::Value {
        match tree {
            LabelTree::Scalar(s) => serde_value::Value::String(s.clone()),
            LabelTree::Map(m) => {
                serde_value::Value::Map(
                    m.iter()
                        .map(|(k, v)| (serde_value::Value::String(k.clone()), convert(v)))
                        .collect(),
                )
            }
        }
    }
    match tree {
        LabelTree::Map(m) => m.iter().map(|(k, v)| (k.clone(), convert(v))).collect(),
        LabelTree::Scalar(_) => BTreeMap::new(),
    }
}

fn ingest_router(
    config: &mut Config,
    router_id: &str,
    tree: &LabelTree,
    protocol: Protocol,
    service_name: &str,
    dialect: Dialect,
) {
    let service_ref = tree
        .get("service")
        .and_then(LabelTree::as_scalar)
        .unwrap_or(router_id)
        .to_string();

    let mut router = Router::new(router_id, protocol, service_ref);

    if protocol != Protocol::Udp {
        if let Some(rule_str) = tree.get("rule").and_then(LabelTree::as_scalar) {
            match rule::parse(rule_str, dialect) {
                Ok(expr) => router.rule = Some(expr),
                Err(e) => {
                    config.push_diagnostic(Diagnostic::error(
                        "RuleParseError",
                        format!("router `{router_id}` on service `{service_name}`: {e}"),
                    ));
                    return;
                }
            }
        }
    }

    if let Some(priority) = tree.get("priority").and_then(LabelTree::as_scalar) {
        router.priority = priority.parse().ok();
    }

    if let Some(entrypoints) = tree.get("entrypoints").and_then(LabelTree::as_scalar) {
        router.entrypoints = entrypoints.split(',').map(str::trim).map(String::from).collect();
    }

    if let Some(middlewares) = tree.get("middlewares").and_then(LabelTree::as_scalar) {
        router.middleware_refs = middlewares.split(',').map(str::trim).map(String::from).collect();
    }

    if tree.get("tls").is_some() {
        router.tls = Some(Default::default());
    }

    config.routers.insert(router.id.clone(), router);
}

fn ingest_service(
    config: &mut Config,
    service_id: &str,
    tree: &LabelTree,
    protocol: Protocol,
    compose_service_name: &str,
    first_port: Option<u16>,
) {
    let port = tree
        .get("loadbalancer")
        .and_then(|lb| lb.get("server"))
        .and_then(|srv| srv.get("port"))
        .and_then(LabelTree::as_scalar)
        .and_then(|p| p.parse::<u16>().ok())
        .or(first_port)
        .unwrap_or(80);

    let server = if protocol == Protocol::Http {
        let url = url::Url::parse(&format!("http://{compose_service_name}:{port}")).ok();
        url.map(Server::http)
    } else {
        Some(Server::address(format!("{compose_service_name}:{port}")))
    };

    let servers = server.into_iter().collect::<Vec<_>>();
    let service = Service::new(
        service_id,
        protocol,
        LoadBalancer::new(servers, LoadBalancerPolicy::RoundRobin),
    );
    config.services.insert(service.id.clone(), service);
}

fn extract_labels(service: &YamlValue) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match service.get("labels") {
        Some(YamlValue::Mapping(map)) => {
            for (k, v) in map {
                if let (Some(k), Some(v)) = (k.as_str(), scalar_to_string(v)) {
                    out.insert(k.to_string(), v);
                }
            }
        }
        Some(YamlValue::Sequence(items)) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    if let Some((k, v)) = s.split_once('=') {
                        out.insert(k.to_string(), v.to_string());
                    }
                }
            }
        }
        _ => {}
    }
    out
}

fn scalar_to_string(v: &YamlValue) -> Option<String> {
    match v {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The compose service's `ports`/`expose` first entry, used to default a
/// service's port when no `loadbalancer.server.port` label is present.
fn first_port(service: &YamlValue) -> Option<u16> {
    let from_list = |key: &str| -> Option<u16> {
        service
            .get(key)?
            .as_sequence()?
            .first()
            .and_then(|v| v.as_str().or_else(|| None).map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string())))
            .and_then(|s| {
                let container_part = s.split(':').last().unwrap_or(&s);
                container_part.parse::<u16>().ok()
            })
    };
    from_list("ports").or_else(|| from_list("expose"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s2_compose_labels_produce_router_and_service() {
        let input = r#"
services:
  web:
    image: nginx
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=s"
      - "traefik.http.services.s.loadbalancer.server.port=8080"
"#;
        let config = ingest(input, Dialect::V3).unwrap();
        let router = config.routers.get("r").expect("router r");
        assert_eq!(router.service_ref, "s");
        assert_eq!(
            router.rule.as_ref().unwrap().print(Dialect::V3),
            "Host(`x`)"
        );

        let service = config.services.get("s").expect("service s");
        assert_eq!(service.pool.policy, LoadBalancerPolicy::RoundRobin);
        assert_eq!(service.pool.servers.len(), 1);
        assert_eq!(
            service.pool.servers[0].url.as_ref().unwrap().as_str(),
            "http://web:8080/"
        );
    }

    #[test]
    fn disabled_service_is_skipped() {
        let input = r#"
services:
  web:
    labels:
      - "traefik.http.routers.r.rule=Host(`x`)"
"#;
        let config = ingest(input, Dialect::V3).unwrap();
        assert!(config.routers.is_empty());
    }

    #[test]
    fn port_falls_back_to_compose_ports_list() {
        let input = r#"
services:
  web:
    ports:
      - "8080:80"
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=s"
"#;
        let config = ingest(input, Dialect::V3).unwrap();
        let service = config.services.get("s").expect("service s");
        assert_eq!(
            service.pool.servers[0].url.as_ref().unwrap().as_str(),
            "http://web:80/"
        );
    }
}
