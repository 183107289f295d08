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

//! traefik-dynamic emitter: the inverse of
//! [`crate::ingest::traefik_dynamic`]. Builds a [`serde_yaml::Value`]
//! tree, which both the YAML and JSON emitters below serialize directly
//! since `serde_yaml::Value` implements `Serialize` and is therefore
//! consumable by `serde_json` too — one tree, two wire encodings.

use crate::model::{Config, Middleware, Router, Service, TlsOptions};
use crate::rule::{Dialect, Protocol};
use serde_yaml::{Mapping, Value};

pub fn to_value(config: &Config, dialect: Dialect) -> Value {
    let mut root = Mapping::new();

    for protocol in [Protocol::Http, Protocol::Tcp, Protocol::Udp] {
        let routers: Vec<_> = config.routers.values().filter(|r| r.protocol == protocol).collect();
        let services: Vec<_> = config.services.values().filter(|s| s.protocol == protocol).collect();
        let middlewares: Vec<_> = if protocol == Protocol::Udp {
            Vec::new()
        } else {
            config
                .routers
                .values()
                .filter(|r| r.protocol == protocol)
                .flat_map(|r| r.middleware_refs.iter())
                .filter_map(|id| config.middlewares.get(id))
                .collect()
        };

        if routers.is_empty() && services.is_empty() {
            continue;
        }

        let mut section = Mapping::new();
        if !routers.is_empty() {
            let mut routers_map = Mapping::new();
            for router in routers {
                routers_map.insert(Value::String(router.id.clone()), router_to_value(router, dialect));
            }
            section.insert(Value::String("routers".to_string()), Value::Mapping(routers_map));
        }
        if !services.is_empty() {
            let mut services_map = Mapping::new();
            for service in services {
                services_map.insert(Value::String(service.id.clone()), service_to_value(service));
            }
            section.insert(Value::String("services".to_string()), Value::Mapping(services_map));
        }
        if !middlewares.is_empty() {
            let mut mw_map = Mapping::new();
            for mw in middlewares {
                mw_map.insert(Value::String(mw.id.clone()), middleware_to_value(mw));
            }
            section.insert(Value::String("middlewares".to_string()), Value::Mapping(mw_map));
        }

        root.insert(Value::String(protocol.to_string()), Value::Mapping(section));
    }

    if !config.tls_options.is_empty() {
        let mut options = Mapping::new();
        for opts in config.tls_options.values() {
            options.insert(Value::String(opts.id.clone()), tls_options_to_value(opts));
        }
        let mut tls = Mapping::new();
        tls.insert(Value::String("options".to_string()), Value::Mapping(options));
        root.insert(Value::String("tls".to_string()), Value::Mapping(tls));
    }

    Value::Mapping(root)
}

fn router_to_value(router: &Router, dialect: Dialect) -> Value {
    let mut m = Mapping::new();
    if let Some(rule) = &router.rule {
        m.insert(Value::String("rule".to_string()), Value::String(rule.print(dialect)));
    }
    m.insert(Value::String("service".to_string()), Value::String(router.service_ref.clone()));
    if let Some(priority) = router.priority {
        m.insert(Value::String("priority".to_string()), Value::Number(priority.into()));
    }
    if !router.entrypoints.is_empty() {
        m.insert(
            Value::String("entryPoints".to_string()),
            Value::Sequence(router.entrypoints.iter().cloned().map(Value::String).collect()),
        );
    }
    if !router.middleware_refs.is_empty() {
        m.insert(
            Value::String("middlewares".to_string()),
            Value::Sequence(router.middleware_refs.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(tls) = &router.tls {
        let mut tls_map = Mapping::new();
        if let Some(resolver) = &tls.cert_resolver {
            tls_map.insert(Value::String("certResolver".to_string()), Value::String(resolver.clone()));
        }
        if let Some(options) = &tls.options_ref {
            tls_map.insert(Value::String("options".to_string()), Value::String(options.clone()));
        }
        m.insert(Value::String("tls".to_string()), Value::Mapping(tls_map));
    }
    Value::Mapping(m)
}

fn service_to_value(service: &Service) -> Value {
    let mut lb = Mapping::new();
    let servers: Vec<Value> = service
        .pool
        .servers
        .iter()
        .map(|server| {
            let mut s = Mapping::new();
            if let Some(url) = &server.url {
                s.insert(Value::String("url".to_string()), Value::String(url.to_string()));
            } else if let Some(address) = &server.address {
                s.insert(Value::String("address".to_string()), Value::String(address.clone()));
            }
            if let Some(weight) = server.weight {
                s.insert(Value::String("weight".to_string()), Value::Number(weight.into()));
            }
            Value::Mapping(s)
        })
        .collect();
    lb.insert(Value::String("servers".to_string()), Value::Sequence(servers));

    if let Some(health) = &service.health {
        let mut h = Mapping::new();
        h.insert(Value::String("path".to_string()), Value::String(health.path.clone()));
        h.insert(
            Value::String("interval".to_string()),
            Value::String(format!("{}s", health.interval.as_secs())),
        );
        h.insert(
            Value::String("timeout".to_string()),
            Value::String(format!("{}s", health.timeout.as_secs())),
        );
        lb.insert(Value::String("healthCheck".to_string()), Value::Mapping(h));
    }

    let mut m = Mapping::new();
    m.insert(Value::String("loadBalancer".to_string()), Value::Mapping(lb));
    Value::Mapping(m)
}

fn middleware_to_value(mw: &Middleware) -> Value {
    let mut params = Mapping::new();
    for (key, value) in &mw.params {
        params.insert(Value::String(key.clone()), value_from_serde_value(value));
    }
    let mut m = Mapping::new();
    m.insert(Value::String(mw.kind.as_key().to_string()), Value::Mapping(params));
    Value::Mapping(m)
}

fn tls_options_to_value(opts: &TlsOptions) -> Value {
    let mut m = Mapping::new();
    if let Some(min_version) = &opts.min_version {
        m.insert(Value::String("minVersion".to_string()), Value::String(min_version.clone()));
    }
    if !opts.cipher_suites.is_empty() {
        m.insert(
            Value::String("cipherSuites".to_string()),
            Value::Sequence(opts.cipher_suites.iter().cloned().map(Value::String).collect()),
        );
    }
    m.insert(Value::String("sniStrict".to_string()), Value::Bool(opts.sni_strict));
    Value::Mapping(m)
}

fn value_from_serde_value(v: &serde_value::Value) -> Value {
    use serde_value::Value as SValue;
    match v {
        SValue::Bool(b) => Value::Bool(*b),
        SValue::String(s) => Value::String(s.clone()),
        SValue::U8(n) => Value::Number((*n).into()),
        SValue::U16(n) => Value::Number((*n).into()),
        SValue::U32(n) => Value::Number((*n).into()),
        SValue::U64(n) => Value::Number((*n).into()),
        SValue::I8(n) => Value::Number((*n).into()),
        SValue::I16(n) => Value::Number((*n).into()),
        SValue::I32(n) => Value::Number((*n).into()),
        SValue::I64(n) => Value::Number((*n).into()),
        SValue::F32(n) => Value::Number((*n as f64).into()),
        SValue::F64(n) => Value::Number((*n).into()),
        SValue::Char(c) => Value::String(c.to_string()),
        SValue::Unit => Value::Null,
        SValue::Option(inner) => inner.as_ref().map(|v| value_from_serde_value(v)).unwrap_or(Value::Null),
        SValue::Newtype(inner) => value_from_serde_value(inner),
        SValue::Seq(items) => Value::Sequence(items.iter().map(value_from_serde_value).collect()),
        SValue::Map(map) => {
            let mut m = Mapping::new();
            for (k, v) in map {
                if let SValue::String(key) = k {
                    m.insert(Value::String(key.clone()), value_from_serde_value(v));
                }
            }
            Value::Mapping(m)
        }
        SValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{LoadBalancer, LoadBalancerPolicy, Server};
    use crate::rule;

    #[test]
    fn round_trips_a_simple_router_and_service() {
        let mut config = Config::new();
        let mut router = Router::new("web", Protocol::Http, "svc");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "svc".to_string(),
            Service::new(
                "svc",
                Protocol::Http,
                LoadBalancer::new(
                    vec![Server::http(url::Url::parse("http://web:8080").unwrap())],
                    LoadBalancerPolicy::RoundRobin,
                ),
            ),
        );

        let value = to_value(&config, Dialect::V3);
        let yaml = serde_yaml::to_string(&value).unwrap();
        assert!(yaml.contains("rule: Host(`x`)"));
        assert!(yaml.contains("service: svc"));
        assert!(yaml.contains("url: http://web:8080/"));
    }
}
