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

//! Traefik dynamic configuration ingestor. Walks the file as a generic
//! [`serde_yaml::Value`] tree rather than a strongly typed struct:
//! router/service/middleware shapes are too heterogeneous
//! across kinds to make one schema pay for itself.
//!
//! JSON is a YAML subset, so this same entry point handles both
//! `Format::TraefikDynamic` wire representations.

use crate::model::{
    Config, Diagnostic, HealthCheck, LoadBalancer, LoadBalancerPolicy, Middleware, MiddlewareKind,
    Router, Server, Service, TlsOptions, TlsSpec,
};
use crate::rule::{self, Dialect, Protocol};
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::time::Duration;

pub fn ingest(input: &str, dialect: Dialect) -> Result<Config, serde_yaml::Error> {
    let doc: YamlValue = serde_yaml::from_str(input)?;
    let mut config = Config::new();

    for (protocol, section_key) in [
        (Protocol::Http, "http"),
        (Protocol::Tcp, "tcp"),
        (Protocol::Udp, "udp"),
    ] {
        let Some(section) = doc.get(section_key) else {
            continue;
        };
        ingest_section(&mut config, section, protocol, dialect);
    }

    if let Some(options) = doc.get("tls").and_then(|t| t.get("options")).and_then(YamlValue::as_mapping) {
        for (id, spec) in options {
            let Some(id) = id.as_str() else { continue };
            config.tls_options.insert(id.to_string(), parse_tls_options(id, spec));
        }
    }

    Ok(config)
}

fn ingest_section(config: &mut Config, section: &YamlValue, protocol: Protocol, dialect: Dialect) {
    if let Some(routers) = section.get("routers").and_then(YamlValue::as_mapping) {
        for (id, spec) in routers {
            let Some(id) = id.as_str() else { continue };
            match parse_router(id, spec, protocol, dialect) {
                Ok(router) => {
                    config.routers.insert(router.id.clone(), router);
                }
                Err(e) => config.push_diagnostic(Diagnostic::error(
                    "RuleParseError",
                    format!("router `{id}`: {e}"),
                )),
            }
        }
    }

    if let Some(services) = section.get("services").and_then(YamlValue::as_mapping) {
        for (id, spec) in services {
            let Some(id) = id.as_str() else { continue };
            config
                .services
                .insert(id.to_string(), parse_service(id, spec, protocol));
        }
    }

    if protocol != Protocol::Udp {
        if let Some(middlewares) = section.get("middlewares").and_then(YamlValue::as_mapping) {
            for (id, spec) in middlewares {
                let Some(id) = id.as_str() else { continue };
                let fields = yaml_mapping_to_value_map(spec);
                if let Some(middleware) = middleware_from_tree_like(id, fields) {
                    config.middlewares.insert(middleware.id.clone(), middleware);
                }
            }
        }
    }
}

fn parse_router(
    id: &str,
    spec: &YamlValue,
    protocol: Protocol,
    dialect: Dialect,
) -> Result<Router, rule::RuleParseError> {
    let service_ref = spec
        .get("service")
        .and_then(YamlValue::as_str)
        .unwrap_or(id)
        .to_string();

    let mut router = Router::new(id, protocol, service_ref);

    if protocol != Protocol::Udp {
        if let Some(rule_str) = spec.get("rule").and_then(YamlValue::as_str) {
            router.rule = Some(rule::parse(rule_str, dialect)?);
        }
    }

    router.priority = spec.get("priority").and_then(YamlValue::as_i64);

    if let Some(entrypoints) = spec.get("entryPoints").and_then(YamlValue::as_sequence) {
        router.entrypoints = entrypoints
            .iter()
            .filter_map(YamlValue::as_str)
            .map(String::from)
            .collect();
    }

    if let Some(middlewares) = spec.get("middlewares").and_then(YamlValue::as_sequence) {
        router.middleware_refs = middlewares
            .iter()
            .filter_map(YamlValue::as_str)
            .map(String::from)
            .collect();
    }

    if let Some(tls) = spec.get("tls") {
        router.tls = Some(TlsSpec {
            cert_resolver: tls.get("certResolver").and_then(YamlValue::as_str).map(String::from),
            options_ref: tls.get("options").and_then(YamlValue::as_str).map(String::from),
            sni_strict: None,
            cert_files: Vec::new(),
        });
    }

    Ok(router)
}

fn parse_service(id: &str, spec: &YamlValue, protocol: Protocol) -> Service {
    let lb = spec.get("loadBalancer");
    let servers = lb
        .and_then(|lb| lb.get("servers"))
        .and_then(YamlValue::as_sequence)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|s| parse_server(s, protocol))
                .collect()
        })
        .unwrap_or_default();

    let mut service = Service::new(id, protocol, LoadBalancer::new(servers, LoadBalancerPolicy::RoundRobin));

    if let Some(health) = lb.and_then(|lb| lb.get("healthCheck")) {
        let path = health.get("path").and_then(YamlValue::as_str).unwrap_or("/").to_string();
        let interval = health
            .get("interval")
            .and_then(YamlValue::as_str)
            .and_then(parse_go_duration)
            .unwrap_or(Duration::from_secs(30));
        let timeout = health
            .get("timeout")
            .and_then(YamlValue::as_str)
            .and_then(parse_go_duration)
            .unwrap_or(Duration::from_secs(5));
        service.health = Some(HealthCheck { path, interval, timeout });
    }

    service
}

fn parse_server(spec: &YamlValue, protocol: Protocol) -> Option<Server> {
    if protocol == Protocol::Http {
        let url = spec.get("url").and_then(YamlValue::as_str)?;
        url::Url::parse(url).ok().map(Server::http)
    } else {
        let address = spec.get("address").and_then(YamlValue::as_str)?;
        Some(Server::address(address))
    }
}

fn parse_tls_options(id: &str, spec: &YamlValue) -> TlsOptions {
    TlsOptions {
        id: id.to_string(),
        min_version: spec.get("minVersion").and_then(YamlValue::as_str).map(String::from),
        cipher_suites: spec
            .get("cipherSuites")
            .and_then(YamlValue::as_sequence)
            .map(|seq| seq.iter().filter_map(YamlValue::as_str).map(String::from).collect())
            .unwrap_or_default(),
        sni_strict: spec.get("sniStrict").and_then(YamlValue::as_bool).unwrap_or(false),
    }
}

/// Go's `time.ParseDuration` subset actually seen in Traefik dynamic
/// config (`"10s"`, `"500ms"`, `"1m30s"`). Treats a bare numeric string
/// as seconds to stay lenient with hand-written configs.
fn parse_go_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let mut total = Duration::ZERO;
    let mut num = String::new();
    let mut chars = s.chars().peekable();
    let mut matched_any = false;
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
            continue;
        }
        let mut unit = c.to_string();
        if c == 'm' && chars.peek() == Some(&'s') {
            unit.push(chars.next().unwrap());
        }
        let value: f64 = num.parse().ok()?;
        num.clear();
        let unit_secs = match unit.as_str() {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
        total += Duration::from_secs_f64(unit_secs);
        matched_any = true;
    }
    matched_any.then_some(total)
}

fn yaml_mapping_to_value_map(spec: &YamlValue) -> BTreeMap<String, serde_value::Value> {
    match spec.as_mapping() {
        Some(map) => map
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), yaml_to_value(v))))
            .collect(),
        None => BTreeMap::new(),
    }
}

fn yaml_to_value(v: &YamlValue) -> serde_value::Value {
    match v {
        YamlValue::Null => serde_value::Value::Option(None),
        YamlValue::Bool(b) => serde_value::Value::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_value::Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                serde_value::Value::U64(u)
            } else {
                serde_value::Value::F64(n.as_f64().unwrap_or_default())
            }
        }
        YamlValue::String(s) => serde_value::Value::String(s.clone()),
        YamlValue::Sequence(seq) => serde_value::Value::Seq(seq.iter().map(yaml_to_value).collect()),
        YamlValue::Mapping(map) => serde_value::Value::Map(
            map.iter()
                .filter_map(|(k, v)| {
                    k.as_str()
                        .map(|k| (serde_value::Value::String(k.to_string()), yaml_to_value(v)))
                })
                .collect(),
        ),
        YamlValue::Tagged(t) => yaml_to_value(&t.value),
    }
}

/// Picks the single kind key out of a middleware spec map (Traefik only
/// ever sets one kind per middleware id) and builds a [`Middleware`].
/// Shared with the docker-compose ingestor, which folds labels into the
/// same `{kind: {param: value}}` shape before calling this.
pub(crate) fn middleware_from_tree_like(
    id: &str,
    fields: BTreeMap<String, serde_value::Value>,
) -> Option<Middleware> {
    let (kind_key, kind_value) = fields.into_iter().next()?;
    let kind = MiddlewareKind::from_key(&kind_key)?;
    let params = match kind_value {
        serde_value::Value::Map(m) => m
            .into_iter()
            .filter_map(|(k, v)| match k {
                serde_value::Value::String(s) => Some((s, v)),
                _ => None,
            })
            .collect(),
        other => {
            let mut params = BTreeMap::new();
            params.insert("value".to_string(), other);
            params
        }
    };
    Some(Middleware {
        id: id.to_string(),
        kind,
        params,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_http_router_service_and_middleware() {
        let input = r#"
http:
  routers:
    web:
      rule: "Host(`example.com`) && PathPrefix(`/api`)"
      service: api-svc
      entryPoints: ["websecure"]
      middlewares: ["strip-api"]
      tls:
        certResolver: letsencrypt
  services:
    api-svc:
      loadBalancer:
        servers:
          - url: "http://10.0.0.1:8080"
          - url: "http://10.0.0.2:8080"
  middlewares:
    strip-api:
      stripPrefix:
        prefixes: ["/api"]
"#;
        let config = ingest(input, Dialect::V3).unwrap();
        let router = config.routers.get("web").unwrap();
        assert_eq!(router.service_ref, "api-svc");
        assert_eq!(router.entrypoints, vec!["websecure".to_string()]);
        assert_eq!(router.tls.as_ref().unwrap().cert_resolver.as_deref(), Some("letsencrypt"));

        let service = config.services.get("api-svc").unwrap();
        assert_eq!(service.pool.servers.len(), 2);

        let mw = config.middlewares.get("strip-api").unwrap();
        assert_eq!(mw.kind, MiddlewareKind::StripPrefix);
        assert_eq!(mw.param_list("prefixes"), vec!["/api".to_string()]);
    }

    #[test]
    fn parses_tcp_router_with_sni_matcher() {
        let input = r#"
tcp:
  routers:
    db:
      rule: "HostSNI(`db.internal`)"
      service: db-svc
  services:
    db-svc:
      loadBalancer:
        servers:
          - address: "10.0.0.5:5432"
"#;
        let config = ingest(input, Dialect::V3).unwrap();
        let router = config.routers.get("db").unwrap();
        assert!(router.rule.as_ref().unwrap().print(Dialect::V3).contains("HostSNI"));
        let service = config.services.get("db-svc").unwrap();
        assert_eq!(service.pool.servers[0].address.as_deref(), Some("10.0.0.5:5432"));
    }

    #[test]
    fn go_duration_parses_compound_units() {
        assert_eq!(parse_go_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_go_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_go_duration("10"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn v2_host_regexp_template_lowers_to_v3_on_print() {
        let input = r#"
http:
  routers:
    web:
      rule: "HostRegexp(`{sub:[a-z]+}.example.com`)"
      service: api-svc
"#;
        let config = ingest(input, Dialect::V2).unwrap();
        let router = config.routers.get("web").unwrap();
        assert_eq!(
            router.rule.as_ref().unwrap().print(Dialect::V3),
            r"HostRegexp(`(?P<sub>[a-z]+)\.example\.com`)"
        );
        assert_eq!(
            router.rule.as_ref().unwrap().print(Dialect::V2),
            "HostRegexp(`{sub:[a-z]+}.example.com`)"
        );
    }
}
