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

//! docker-compose emitter. Each [`Service`] becomes a stub
//! compose service (an image placeholder, since the unified model has no
//! notion of a container image); its routers, in turn, become
//! `traefik.*`-namespaced labels on that stub. Unlike the label *ingestor*,
//! which folds dotted keys into a [`crate::ingest::labels::LabelTree`] to
//! walk them, there's nothing to walk here — labels are written directly,
//! one dotted key per field.

use crate::model::{Config, Router};
use crate::rule::{Dialect, Protocol};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub fn emit(config: &Config, dialect: Dialect) -> Value {
    let mut services = Mapping::new();

    for (service_id, service) in &config.services {
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        let routers: Vec<&Router> = config
            .routers
            .values()
            .filter(|r| &r.service_ref == service_id)
            .collect();

        if !routers.is_empty() {
            labels.insert("traefik.enable".to_string(), "true".to_string());
        }

        for router in &routers {
            let ns = protocol_key(router.protocol);
            let prefix = format!("traefik.{ns}.routers.{}", router.id);
            if let Some(rule) = &router.rule {
                labels.insert(format!("{prefix}.rule"), rule.print(dialect));
            }
            labels.insert(format!("{prefix}.service"), router.service_ref.clone());
            if let Some(priority) = router.priority {
                labels.insert(format!("{prefix}.priority"), priority.to_string());
            }
            if !router.entrypoints.is_empty() {
                labels.insert(format!("{prefix}.entrypoints"), router.entrypoints.join(","));
            }
            if !router.middleware_refs.is_empty() {
                labels.insert(format!("{prefix}.middlewares"), router.middleware_refs.join(","));
            }
            if router.tls.is_some() {
                labels.insert(format!("{prefix}.tls"), "true".to_string());
            }

            for mw_id in &router.middleware_refs {
                let Some(mw) = config.middlewares.get(mw_id) else { continue };
                let mw_prefix = format!("traefik.{ns}.middlewares.{}.{}", mw.id, mw.kind.as_key());
                for (key, value) in &mw.params {
                    if let Some(rendered) = value_to_label(value) {
                        labels.insert(format!("{mw_prefix}.{key}"), rendered);
                    }
                }
            }
        }

        let ns = protocol_key(service.protocol);
        if let Some(server) = service.pool.servers.first() {
            if let Some(port) = server_port(server) {
                labels.insert(
                    format!("traefik.{ns}.services.{service_id}.loadbalancer.server.port"),
                    port.to_string(),
                );
            }
        }

        let mut entry = Mapping::new();
        entry.insert(
            Value::String("image".to_string()),
            Value::String(format!("{service_id}:latest")),
        );
        if service.pool.servers.len() > 1 {
            let mut deploy = Mapping::new();
            deploy.insert(
                Value::String("replicas".to_string()),
                Value::Number(service.pool.servers.len().into()),
            );
            entry.insert(Value::String("deploy".to_string()), Value::Mapping(deploy));
        }
        if !labels.is_empty() {
            let mut labels_map = Mapping::new();
            for (k, v) in labels {
                labels_map.insert(Value::String(k), Value::String(v));
            }
            entry.insert(Value::String("labels".to_string()), Value::Mapping(labels_map));
        }

        services.insert(Value::String(service_id.clone()), Value::Mapping(entry));
    }

    let mut root = Mapping::new();
    root.insert(Value::String("services".to_string()), Value::Mapping(services));
    Value::Mapping(root)
}

fn protocol_key(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Http => "http",
        Protocol::Tcp => "tcp",
        Protocol::Udp => "udp",
    }
}

fn server_port(server: &crate::model::Server) -> Option<u16> {
    if let Some(url) = &server.url {
        url.port_or_known_default()
    } else {
        server.address.as_ref()?.rsplit_once(':')?.1.parse().ok()
    }
}

fn value_to_label(value: &serde_value::Value) -> Option<String> {
    use serde_value::Value as SValue;
    match value {
        SValue::String(s) => Some(s.clone()),
        SValue::Bool(b) => Some(b.to_string()),
        SValue::I64(n) => Some(n.to_string()),
        SValue::U64(n) => Some(n.to_string()),
        SValue::U32(n) => Some(n.to_string()),
        SValue::F64(n) => Some(n.to_string()),
        SValue::Seq(items) => {
            let rendered: Vec<String> = items.iter().filter_map(value_to_label).collect();
            Some(rendered.join(","))
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{LoadBalancer, LoadBalancerPolicy, Server, Service};
    use crate::rule;

    #[test]
    fn service_with_router_becomes_labeled_stub() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new(
                "s",
                Protocol::Http,
                LoadBalancer::new(
                    vec![Server::http(url::Url::parse("http://s:8080").unwrap())],
                    LoadBalancerPolicy::RoundRobin,
                ),
            ),
        );

        let value = emit(&config, Dialect::V3);
        let yaml = serde_yaml::to_string(&value).unwrap();
        assert!(yaml.contains("traefik.enable: \"true\""));
        assert!(yaml.contains("traefik.http.routers.r.rule: Host(`x`)"));
        assert!(yaml.contains("traefik.http.services.s.loadbalancer.server.port: \"8080\""));
    }

    #[test]
    fn multi_server_pool_gets_replica_count() {
        let mut config = Config::new();
        config.services.insert(
            "s".to_string(),
            Service::new(
                "s",
                Protocol::Http,
                LoadBalancer::new(
                    vec![
                        Server::http(url::Url::parse("http://a:80").unwrap()),
                        Server::http(url::Url::parse("http://b:80").unwrap()),
                    ],
                    LoadBalancerPolicy::RoundRobin,
                ),
            ),
        );

        let value = emit(&config, Dialect::V3);
        let yaml = serde_yaml::to_string(&value).unwrap();
        assert!(yaml.contains("replicas: 2"));
    }
}
