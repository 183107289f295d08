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

//! nginx-conf emitter. Lowers the unified model directly to
//! nginx text, grouping HTTP routers by host and TLS profile, and parking
//! TCP/UDP routers under a `stream{}` block. Unlike the YAML-shaped
//! emitters this one builds text by hand, the way [`crate::ingest::nginx`]
//! parses it by hand — there's no tree-shaped intermediate worth building
//! for a format this irregular.

use crate::model::{Config, Diagnostic, LoadBalancerPolicy, Middleware, MiddlewareKind, Router, Service};
use crate::rule::{MatcherName, Protocol};
use std::collections::BTreeMap;

pub fn emit(config: &Config) -> (String, Vec<Diagnostic>) {
    let mut out = String::new();
    let mut diagnostics = Vec::new();

    emit_http(config, &mut out, &mut diagnostics);

    let stream_routers: Vec<&Router> = config
        .routers
        .values()
        .filter(|r| r.protocol != Protocol::Http)
        .collect();
    if !stream_routers.is_empty() {
        emit_stream(config, &stream_routers, &mut out, &mut diagnostics);
    }

    (out, diagnostics)
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
enum TlsProfile {
    Plain,
    Redirected,
    Ssl,
}

fn tls_profile(config: &Config, router: &Router) -> TlsProfile {
    if router.tls.is_some() {
        return TlsProfile::Ssl;
    }
    let redirected = router.middleware_refs.iter().any(|id| {
        config
            .middlewares
            .get(id)
            .is_some_and(|mw| mw.kind == MiddlewareKind::RedirectScheme)
    });
    if redirected {
        TlsProfile::Redirected
    } else {
        TlsProfile::Plain
    }
}

fn host_of(router: &Router) -> Option<String> {
    router.rule.as_ref()?.matchers().into_iter().find_map(|(name, args)| {
        if *name == MatcherName::Host {
            args.first().and_then(|a| a.as_plain_str()).map(str::to_string)
        } else {
            None
        }
    })
}

enum LocationModifier {
    Exact,
    Prefix,
    Regex,
}

fn path_of(router: &Router) -> Option<(LocationModifier, String)> {
    router.rule.as_ref()?.matchers().into_iter().find_map(|(name, args)| {
        let path = args.first().and_then(|a| a.as_plain_str())?.to_string();
        match name {
            MatcherName::Path => Some((LocationModifier::Exact, path)),
            MatcherName::PathPrefix => Some((LocationModifier::Prefix, path)),
            MatcherName::PathRegexp => Some((LocationModifier::Regex, path)),
            _ => None,
        }
    })
}

fn emit_http(config: &Config, out: &mut String, diagnostics: &mut Vec<Diagnostic>) {
    let http_services: BTreeMap<&String, &Service> = config
        .services
        .iter()
        .filter(|(_, s)| s.protocol == Protocol::Http)
        .collect();

    for (id, service) in &http_services {
        emit_upstream(id, service, out, diagnostics);
    }

    let mut groups: BTreeMap<(String, u8), Vec<&Router>> = BTreeMap::new();
    for router in config.routers.values().filter(|r| r.protocol == Protocol::Http) {
        let host = host_of(router).unwrap_or_else(|| "_".to_string());
        let profile = tls_profile(config, router) as u8;
        groups.entry((host, profile)).or_default().push(router);
    }

    for ((host, profile), routers) in &groups {
        let profile = match profile {
            0 => TlsProfile::Plain,
            1 => TlsProfile::Redirected,
            _ => TlsProfile::Ssl,
        };
        emit_server_block(config, host, profile, routers, out, diagnostics);
    }
}

fn emit_upstream(id: &str, service: &Service, out: &mut String, diagnostics: &mut Vec<Diagnostic>) {
    out.push_str(&format!("upstream {id} {{\n"));
    match service.pool.policy {
        LoadBalancerPolicy::LeastConn => out.push_str("    least_conn;\n"),
        LoadBalancerPolicy::Random | LoadBalancerPolicy::WeightedRandom => out.push_str("    random;\n"),
        LoadBalancerPolicy::WeightedLeastConn => {
            diagnostics.push(Diagnostic::warning(
                "UnsupportedFeature",
                format!("service `{id}`: nginx has no weighted least_conn; falling back to plain least_conn"),
            ));
            out.push_str("    least_conn;\n");
        }
        LoadBalancerPolicy::RoundRobin | LoadBalancerPolicy::WeightedRoundRobin => {}
    }
    for server in &service.pool.servers {
        let Some(addr) = server.host_port() else { continue };
        if service.pool.policy.is_weighted() {
            let weight = server.weight.unwrap_or(1);
            out.push_str(&format!("    server {addr} weight={weight};\n"));
        } else {
            out.push_str(&format!("    server {addr};\n"));
        }
    }
    out.push_str("}\n\n");
}

fn emit_server_block(
    config: &Config,
    host: &str,
    profile: TlsProfile,
    routers: &[&Router],
    out: &mut String,
    diagnostics: &mut Vec<Diagnostic>,
) {
    out.push_str("server {\n");
    match profile {
        TlsProfile::Ssl => {
            out.push_str("    listen 443 ssl;\n");
            if let Some(cert_files) = routers.iter().find_map(|r| r.tls.as_ref()).map(|t| &t.cert_files) {
                if let Some(files) = cert_files.first() {
                    out.push_str(&format!("    ssl_certificate {};\n", files.cert.display()));
                    out.push_str(&format!("    ssl_certificate_key {};\n", files.key.display()));
                }
            }
        }
        TlsProfile::Plain | TlsProfile::Redirected => out.push_str("    listen 80;\n"),
    }
    out.push_str(&format!("    server_name {host};\n"));

    for router in routers {
        emit_location(config, router, out, diagnostics);
    }

    out.push_str("}\n\n");
}

fn emit_location(config: &Config, router: &Router, out: &mut String, diagnostics: &mut Vec<Diagnostic>) {
    let (modifier, path) = path_of(router).unwrap_or((LocationModifier::Prefix, "/".to_string()));
    let prefix = match modifier {
        LocationModifier::Exact => "= ",
        LocationModifier::Prefix => "",
        LocationModifier::Regex => "~ ",
    };
    out.push_str(&format!("    location {prefix}{path} {{\n"));

    for matcher in router.rule.as_ref().map(|r| r.matchers()).unwrap_or_default() {
        match matcher.0 {
            MatcherName::Method => {
                if let Some(method) = matcher.1.first().and_then(|a| a.as_plain_str()) {
                    out.push_str(&format!(
                        "        if ($request_method != {method}) {{ return 405; }}\n"
                    ));
                }
            }
            MatcherName::ClientIP => {
                for arg in matcher.1 {
                    if let Some(ip) = arg.as_plain_str() {
                        out.push_str(&format!("        allow {ip};\n"));
                    }
                }
                out.push_str("        deny all;\n");
            }
            _ => {}
        }
    }

    for mw_id in &router.middleware_refs {
        let Some(mw) = config.middlewares.get(mw_id) else { continue };
        emit_middleware(mw, router, out, diagnostics);
    }

    out.push_str(&format!("        proxy_pass http://{};\n", router.service_ref));
    out.push_str("    }\n");
}

fn emit_middleware(mw: &Middleware, router: &Router, out: &mut String, diagnostics: &mut Vec<Diagnostic>) {
    match mw.kind {
        MiddlewareKind::BasicAuth => {
            out.push_str("        auth_basic \"restricted\";\n");
            out.push_str("        auth_basic_user_file /etc/nginx/.htpasswd;\n");
            diagnostics.push(Diagnostic::warning(
                "UnsupportedFeature",
                format!("router `{}`: basic-auth users are not written to an htpasswd file; create /etc/nginx/.htpasswd manually", router.id),
            ));
        }
        MiddlewareKind::RateLimit => {
            let rate = mw.param_str("average").unwrap_or_else(|| "10".to_string());
            let burst = mw.param_str("burst");
            let zone = format!("{}_zone", mw.id);
            out.push_str(&format!(
                "        # limit_req_zone zone={zone}:10m rate={rate}r/s; (declare in the surrounding http{{}} block)\n"
            ));
            match burst {
                Some(burst) => out.push_str(&format!("        limit_req zone={zone} burst={burst};\n")),
                None => out.push_str(&format!("        limit_req zone={zone};\n")),
            }
        }
        MiddlewareKind::IpAllowlist => {
            for ip in mw.param_list("sourceRange") {
                out.push_str(&format!("        allow {ip};\n"));
            }
            out.push_str("        deny all;\n");
        }
        MiddlewareKind::Compress => out.push_str("        gzip on;\n"),
        MiddlewareKind::Headers => {
            for entry in mw.param_list("customRequestHeaders") {
                if let Some((name, value)) = entry.split_once(':') {
                    out.push_str(&format!(
                        "        proxy_set_header {} {};\n",
                        name.trim(),
                        value.trim()
                    ));
                }
            }
        }
        MiddlewareKind::RedirectScheme => {
            let scheme = mw.param_str("scheme").unwrap_or_else(|| "https".to_string());
            let code = match mw.params.get("permanent") {
                Some(serde_value::Value::Bool(false)) => 302,
                _ => 301,
            };
            out.push_str(&format!("        return {code} {scheme}://$host$request_uri;\n"));
        }
        MiddlewareKind::RedirectRegex => {
            let regex = mw.param_str("regex").unwrap_or_default();
            let replacement = mw.param_str("replacement").unwrap_or_default();
            out.push_str(&format!("        rewrite {regex} {replacement} break;\n"));
        }
        MiddlewareKind::StripPrefix => {
            if let Some(prefix) = mw.param_list("prefixes").first() {
                out.push_str(&format!("        rewrite ^{prefix}(.*) /$1 break;\n"));
            }
        }
        _ => {
            out.push_str(&format!(
                "        # middleware `{}` ({}) has no nginx equivalent; skipped\n",
                mw.id,
                mw.kind.as_key()
            ));
            diagnostics.push(Diagnostic::warning(
                "UnsupportedFeature",
                format!("router `{}`: middleware `{}` ({}) has no nginx equivalent", router.id, mw.id, mw.kind.as_key()),
            ));
        }
    }
}

fn emit_stream(config: &Config, routers: &[&Router], out: &mut String, diagnostics: &mut Vec<Diagnostic>) {
    out.push_str("stream {\n");

    let referenced: BTreeMap<&String, &Service> = routers
        .iter()
        .filter_map(|r| config.services.get(&r.service_ref).map(|s| (&r.service_ref, s)))
        .collect();
    for (id, service) in &referenced {
        out.push_str(&format!("    upstream {id} {{\n"));
        for server in &service.pool.servers {
            if let Some(addr) = server.host_port() {
                out.push_str(&format!("        server {addr};\n"));
            }
        }
        out.push_str("    }\n\n");
    }

    for router in routers {
        let listen = router
            .entrypoints
            .first()
            .and_then(|ep| config.entrypoints.get(ep))
            .map(|ep| ep.address.clone())
            .unwrap_or_else(|| {
                diagnostics.push(Diagnostic::warning(
                    "UnsupportedFeature",
                    format!("router `{}`: no entrypoint resolved; listen address is a placeholder", router.id),
                ));
                "0.0.0.0:0".to_string()
            });

        out.push_str("    server {\n");
        if router.protocol == Protocol::Udp {
            out.push_str(&format!("        listen {listen} udp;\n"));
        } else if router.tls.is_some() {
            out.push_str(&format!("        listen {listen} ssl;\n"));
            if let Some(files) = router.tls.as_ref().and_then(|t| t.cert_files.first()) {
                out.push_str(&format!("        ssl_certificate {};\n", files.cert.display()));
                out.push_str(&format!("        ssl_certificate_key {};\n", files.key.display()));
            }
        } else {
            out.push_str(&format!("        listen {listen};\n"));
        }
        out.push_str(&format!("        proxy_pass {};\n", router.service_ref));
        out.push_str("    }\n\n");
    }

    out.push_str("}\n");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{LoadBalancer, Server};
    use crate::rule::{self, Dialect};

    #[test]
    fn s3_emits_upstream_and_server_for_simple_router() {
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
                    vec![Server::http(url::Url::parse("http://web:8080").unwrap())],
                    LoadBalancerPolicy::RoundRobin,
                ),
            ),
        );

        let (text, diagnostics) = emit(&config);
        assert!(diagnostics.is_empty());
        assert!(text.contains("upstream s {\n    server web:8080;\n}"));
        assert!(text.contains("server_name x;"));
        assert!(text.contains("location / {"));
        assert!(text.contains("proxy_pass http://s;"));
    }

    #[test]
    fn s4_rate_limit_middleware_becomes_limit_req() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        let mut mw = Middleware::new("rl", MiddlewareKind::RateLimit);
        mw.params.insert("average".to_string(), serde_value::Value::U32(5));
        mw.params.insert("burst".to_string(), serde_value::Value::U32(10));
        router.middleware_refs.push(mw.id.clone());
        config.middlewares.insert(mw.id.clone(), mw);
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(Vec::new(), LoadBalancerPolicy::RoundRobin)),
        );

        let (text, _) = emit(&config);
        assert!(text.contains("limit_req zone=rl_zone burst=10;"));
    }

    #[test]
    fn unsupported_middleware_kind_emits_comment_and_warning() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        let mw = Middleware::new("retry", MiddlewareKind::Retry);
        router.middleware_refs.push(mw.id.clone());
        config.middlewares.insert(mw.id.clone(), mw);
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(Vec::new(), LoadBalancerPolicy::RoundRobin)),
        );

        let (text, diagnostics) = emit(&config);
        assert!(text.contains("has no nginx equivalent"));
        assert!(diagnostics.iter().any(|d| d.code == "UnsupportedFeature"));
    }
}
