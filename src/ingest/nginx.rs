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

//! A minimal nginx config parser and ingestor. The block/directive
//! tokenizer below is hand-rolled rather than pest-driven, the way
//! [`crate::rule::parser`] hand-rolls its precedence fold on top of a
//! grammar: nginx's grammar is just nested
//! `name args* { ... }` / `name args*;` blocks, too irregular (bare
//! tokens, `$variables`, embedded quotes) to be worth a second `.pest`
//! grammar alongside the rule one.

use crate::model::{
    CertFiles, Config, Diagnostic, LoadBalancer, LoadBalancerPolicy, Middleware, MiddlewareKind,
    Router, Server, Service, TlsSpec,
};
use crate::rule::{Arg, MatcherName, Protocol, QuoteStyle, RuleExpr};
use serde_value::Value as SValue;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NginxParseErrorKind {
    #[error("unterminated block")]
    UnterminatedBlock,
    #[error("directive missing terminating `;`")]
    UnterminatedDirective,
    #[error("unexpected `{found}`")]
    UnexpectedToken { found: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} (at offset {offset})")]
pub struct NginxParseError {
    pub kind: NginxParseErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone)]
enum Item {
    Directive { name: String, args: Vec<String> },
    Block { name: String, args: Vec<String>, children: Vec<Item> },
}

fn skip_ws_and_comments(bytes: &[u8], pos: &mut usize) {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
}

fn next_token(input: &str, pos: &mut usize) -> Option<String> {
    let bytes = input.as_bytes();
    skip_ws_and_comments(bytes, pos);
    if *pos >= bytes.len() {
        return None;
    }
    match bytes[*pos] {
        b'{' | b'}' | b';' => None,
        b'"' | b'\'' => {
            let quote = bytes[*pos];
            *pos += 1;
            let start = *pos;
            while *pos < bytes.len() && bytes[*pos] != quote {
                *pos += 1;
            }
            let token = input[start..*pos].to_string();
            if *pos < bytes.len() {
                *pos += 1;
            }
            Some(token)
        }
        _ => {
            let start = *pos;
            while *pos < bytes.len()
                && !matches!(bytes[*pos], b' ' | b'\t' | b'\n' | b'\r' | b'{' | b'}' | b';' | b'#')
            {
                *pos += 1;
            }
            Some(input[start..*pos].to_string())
        }
    }
}

fn parse_items(input: &str, pos: &mut usize) -> Result<Vec<Item>, NginxParseError> {
    let bytes = input.as_bytes();
    let mut items = Vec::new();
    loop {
        skip_ws_and_comments(bytes, pos);
        if *pos >= bytes.len() || bytes[*pos] == b'}' {
            break;
        }

        let directive_start = *pos;
        let mut tokens = Vec::new();
        let terminator;
        loop {
            skip_ws_and_comments(bytes, pos);
            if *pos >= bytes.len() {
                return Err(NginxParseError {
                    kind: NginxParseErrorKind::UnterminatedDirective,
                    offset: directive_start,
                });
            }
            match bytes[*pos] {
                b';' => {
                    *pos += 1;
                    terminator = b';';
                    break;
                }
                b'{' => {
                    *pos += 1;
                    terminator = b'{';
                    break;
                }
                b'}' => {
                    return Err(NginxParseError {
                        kind: NginxParseErrorKind::UnexpectedToken { found: "}".to_string() },
                        offset: *pos,
                    })
                }
                _ => {
                    let tok = next_token(input, pos).ok_or(NginxParseError {
                        kind: NginxParseErrorKind::UnterminatedDirective,
                        offset: directive_start,
                    })?;
                    tokens.push(tok);
                }
            }
        }

        if tokens.is_empty() {
            return Err(NginxParseError {
                kind: NginxParseErrorKind::UnexpectedToken {
                    found: (terminator as char).to_string(),
                },
                offset: directive_start,
            });
        }

        let name = tokens.remove(0);
        if terminator == b';' {
            items.push(Item::Directive { name, args: tokens });
        } else {
            let children = parse_items(input, pos)?;
            skip_ws_and_comments(bytes, pos);
            if *pos >= bytes.len() || bytes[*pos] != b'}' {
                return Err(NginxParseError {
                    kind: NginxParseErrorKind::UnterminatedBlock,
                    offset: directive_start,
                });
            }
            *pos += 1;
            items.push(Item::Block { name, args: tokens, children });
        }
    }
    Ok(items)
}

fn parse(input: &str) -> Result<Vec<Item>, NginxParseError> {
    let mut pos = 0;
    let items = parse_items(input, &mut pos)?;
    skip_ws_and_comments(input.as_bytes(), &mut pos);
    if pos < input.len() {
        return Err(NginxParseError {
            kind: NginxParseErrorKind::UnexpectedToken { found: "}".to_string() },
            offset: pos,
        });
    }
    Ok(items)
}

fn directive<'a>(items: &'a [Item], name: &str) -> Option<&'a [String]> {
    items.iter().find_map(|i| match i {
        Item::Directive { name: n, args } if n == name => Some(args.as_slice()),
        _ => None,
    })
}

fn directives<'a>(items: &'a [Item], name: &str) -> Vec<&'a [String]> {
    items
        .iter()
        .filter_map(|i| match i {
            Item::Directive { name: n, args } if n == name => Some(args.as_slice()),
            _ => None,
        })
        .collect()
}

fn blocks<'a>(items: &'a [Item], name: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|i| matches!(i, Item::Block { name: n, .. } if n == name))
        .collect()
}

/// `http {}` is transparent: its children are treated as top-level, the
/// way nginx itself resolves `server`/`upstream` blocks regardless of
/// whether a config writer wrapped them. Flattens any nested `http`
/// blocks one level; nested `events`/`mail` blocks are left alone (and
/// so never contribute servers or upstreams).
fn flatten_http<'a>(items: &'a [Item]) -> Vec<&'a Item> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Item::Block { name, children, .. } if name == "http" => {
                out.extend(flatten_http(children));
            }
            other => out.push(other),
        }
    }
    out
}

pub fn ingest(input: &str) -> Result<Config, NginxParseError> {
    let top = parse(input)?;
    let flat = flatten_http(&top);
    let flat_items: Vec<Item> = flat.into_iter().cloned().collect();

    let mut config = Config::new();

    let limit_req_zones = limit_req_zone_rates(&flat_items);

    for upstream in blocks(&flat_items, "upstream") {
        let Item::Block { args, children, .. } = upstream else { continue };
        let Some(id) = args.first() else { continue };
        let servers = directives(children, "server")
            .iter()
            .filter_map(|args| args.first().map(|addr| Server::address(addr.clone())))
            .collect();
        config.services.insert(
            id.clone(),
            Service::new(id.clone(), Protocol::Http, LoadBalancer::new(servers, LoadBalancerPolicy::RoundRobin)),
        );
    }

    for (server_idx, server) in blocks(&flat_items, "server").into_iter().enumerate() {
        let Item::Block { children, .. } = server else { continue };
        ingest_server(&mut config, children, server_idx, &limit_req_zones);
    }

    Ok(config)
}

fn limit_req_zone_rates(items: &[Item]) -> Vec<(String, u32)> {
    directives(items, "limit_req_zone")
        .into_iter()
        .filter_map(|args| {
            let zone_arg = args.iter().find(|a| a.starts_with("zone="))?;
            let zone_name = zone_arg.trim_start_matches("zone=").split(':').next()?.to_string();
            let rate_arg = args.iter().find(|a| a.starts_with("rate="))?;
            let rate: u32 = rate_arg.trim_start_matches("rate=").trim_end_matches("r/s").parse().ok()?;
            Some((zone_name, rate))
        })
        .collect()
}

fn ingest_server(config: &mut Config, server_children: &[Item], server_idx: usize, limit_req_zones: &[(String, u32)]) {
    let server_name = directive(server_children, "server_name")
        .and_then(|args| args.first())
        .cloned()
        .unwrap_or_else(|| format!("_server{server_idx}"));

    let listens = directives(server_children, "listen");
    let has_tls = listens.iter().any(|args| args.iter().any(|a| a == "ssl"));

    let tls = if has_tls {
        let cert = directive(server_children, "ssl_certificate").and_then(|a| a.first()).cloned();
        let key = directive(server_children, "ssl_certificate_key").and_then(|a| a.first()).cloned();
        let cert_files = match (cert, key) {
            (Some(cert), Some(key)) => vec![CertFiles {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
                ca: None,
                dhparam: None,
            }],
            _ => Vec::new(),
        };
        Some(TlsSpec {
            cert_resolver: None,
            options_ref: None,
            sni_strict: None,
            cert_files,
        })
    } else {
        None
    };

    let host_matcher = RuleExpr::Matcher {
        name: MatcherName::Host,
        args: vec![Arg::plain(server_name.clone(), QuoteStyle::Backtick)],
    };

    for (loc_idx, location) in blocks(server_children, "location").into_iter().enumerate() {
        let Item::Block { args: loc_args, children: loc_children, .. } = location else { continue };
        let Some((path_matcher_name, path)) = location_path_matcher(loc_args) else { continue };

        let Some(proxy_pass_args) = directive(loc_children, "proxy_pass") else {
            config.push_diagnostic(Diagnostic::info(
                "UnsupportedFeature",
                format!("server `{server_name}` location `{path}` has no proxy_pass; redirect-only locations are not translated into a router"),
            ));
            continue;
        };
        let Some(target) = proxy_pass_args.first() else { continue };

        let router_id = format!("{}-loc{loc_idx}", sanitize_id(&server_name));
        let service_ref = resolve_proxy_target(config, &router_id, target);

        let mut router = Router::new(router_id.as_str(), Protocol::Http, service_ref);
        router.rule = Some(RuleExpr::and(
            host_matcher.clone(),
            RuleExpr::Matcher {
                name: path_matcher_name,
                args: vec![Arg::plain(path, QuoteStyle::Backtick)],
            },
        ));
        router.tls = tls.clone();

        ingest_location_middlewares(config, &router_id, loc_children, limit_req_zones)
            .into_iter()
            .for_each(|id| router.middleware_refs.push(id));

        config.routers.insert(router.id.clone(), router);
    }

    for item in server_children {
        if let Item::Directive { name, args } = item {
            if !KNOWN_SERVER_DIRECTIVES.contains(&name.as_str()) {
                config.raw_extras.insert(
                    format!("nginx.server.{server_idx}.{name}"),
                    SValue::String(args.join(" ")),
                );
            }
        }
    }
}

const KNOWN_SERVER_DIRECTIVES: &[&str] = &["listen", "server_name", "ssl_certificate", "ssl_certificate_key"];

fn location_path_matcher(loc_args: &[String]) -> Option<(MatcherName, String)> {
    match loc_args {
        [modifier, path] if modifier == "=" => Some((MatcherName::Path, path.clone())),
        [modifier, path] if modifier == "~" || modifier == "~*" => Some((MatcherName::PathRegexp, path.clone())),
        [path] => Some((MatcherName::PathPrefix, path.clone())),
        _ => None,
    }
}

fn sanitize_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn resolve_proxy_target(config: &mut Config, router_id: &str, target: &str) -> String {
    if let Ok(url) = url::Url::parse(target) {
        if let Some(host) = url.host_str() {
            if url.port().is_none() && config.services.contains_key(host) {
                return host.to_string();
            }
            let service_id = format!("{router_id}-upstream");
            config.services.insert(
                service_id.clone(),
                Service::new(
                    service_id.clone(),
                    Protocol::Http,
                    LoadBalancer::new(vec![Server::http(url)], LoadBalancerPolicy::RoundRobin),
                ),
            );
            return service_id;
        }
    }
    let service_id = format!("{router_id}-upstream");
    config.services.insert(
        service_id.clone(),
        Service::new(
            service_id.clone(),
            Protocol::Http,
            LoadBalancer::new(vec![Server::address(target)], LoadBalancerPolicy::RoundRobin),
        ),
    );
    service_id
}

fn ingest_location_middlewares(
    config: &mut Config,
    router_id: &str,
    loc_children: &[Item],
    limit_req_zones: &[(String, u32)],
) -> Vec<String> {
    let mut ids = Vec::new();

    let headers = directives(loc_children, "proxy_set_header");
    if !headers.is_empty() {
        let id = format!("{router_id}-headers");
        let mut mw = Middleware::new(id.clone(), MiddlewareKind::Headers);
        let list: Vec<SValue> = headers
            .iter()
            .filter_map(|args| {
                let name = args.first()?;
                let value = args.get(1).cloned().unwrap_or_default();
                Some(SValue::String(format!("{name}: {value}")))
            })
            .collect();
        mw.params.insert("customRequestHeaders".to_string(), SValue::Seq(list));
        config.middlewares.insert(mw.id.clone(), mw);
        ids.push(id);
    }

    if let Some(args) = directive(loc_children, "auth_basic") {
        if args.first().map(|s| s.as_str()) != Some("off") {
            let id = format!("{router_id}-auth");
            let mw = Middleware::new(id.clone(), MiddlewareKind::BasicAuth);
            config.middlewares.insert(mw.id.clone(), mw);
            ids.push(id);
            config.push_diagnostic(Diagnostic::warning(
                "UnsupportedFeature",
                format!("router `{router_id}`: auth_basic credentials are not extracted from htpasswd; `users` must be filled in manually"),
            ));
        }
    }

    let allow = directives(loc_children, "allow");
    if !allow.is_empty() {
        let id = format!("{router_id}-allowlist");
        let mut mw = Middleware::new(id.clone(), MiddlewareKind::IpAllowlist);
        let ranges: Vec<SValue> = allow
            .iter()
            .filter_map(|args| args.first().cloned())
            .map(SValue::String)
            .collect();
        mw.params.insert("sourceRange".to_string(), SValue::Seq(ranges));
        config.middlewares.insert(mw.id.clone(), mw);
        ids.push(id);

        for deny_args in directives(loc_children, "deny") {
            if deny_args.first().map(|s| s.as_str()) != Some("all") {
                config.push_diagnostic(Diagnostic::warning(
                    "UnsupportedFeature",
                    format!("router `{router_id}`: only a trailing `deny all;` is understood; `deny {}` was dropped", deny_args.join(" ")),
                ));
            }
        }
    }

    if let Some(args) = directive(loc_children, "limit_req") {
        let zone = args.iter().find_map(|a| a.strip_prefix("zone="));
        if let Some(rate) = zone.and_then(|z| limit_req_zones.iter().find(|(name, _)| name == z)).map(|(_, r)| *r) {
            let burst: u32 = args
                .iter()
                .find_map(|a| a.strip_prefix("burst="))
                .and_then(|b| b.parse().ok())
                .unwrap_or(0);
            let id = format!("{router_id}-ratelimit");
            let mut mw = Middleware::new(id.clone(), MiddlewareKind::RateLimit);
            mw.params.insert("average".to_string(), SValue::U32(rate));
            mw.params.insert("burst".to_string(), SValue::U32(burst));
            config.middlewares.insert(mw.id.clone(), mw);
            ids.push(id);
        }
    }

    if let Some(args) = directive(loc_children, "return") {
        if let [code, location] = args {
            if code.starts_with('3') {
                let id = format!("{router_id}-redirect");
                let mut mw = Middleware::new(id.clone(), MiddlewareKind::RedirectScheme);
                let scheme = location.split("://").next().unwrap_or("https").to_string();
                mw.params.insert("scheme".to_string(), SValue::String(scheme));
                mw.params.insert("permanent".to_string(), SValue::Bool(code == "301"));
                config.middlewares.insert(mw.id.clone(), mw);
                ids.push(id);
            }
        }
    }

    if let Some(args) = directive(loc_children, "rewrite") {
        if args.len() >= 2 {
            let id = format!("{router_id}-rewrite");
            let mut mw = Middleware::new(id.clone(), MiddlewareKind::RedirectRegex);
            mw.params.insert("regex".to_string(), SValue::String(args[0].clone()));
            mw.params.insert("replacement".to_string(), SValue::String(args[1].clone()));
            config.middlewares.insert(mw.id.clone(), mw);
            ids.push(id);
        }
    }

    if !blocks(loc_children, "if").is_empty() {
        config.push_diagnostic(Diagnostic::warning(
            "UnsupportedFeature",
            format!("router `{router_id}`: nginx `if` inside `location` is not translated; review the block manually"),
        ));
    }

    let known: &[&str] = &[
        "proxy_pass",
        "proxy_set_header",
        "auth_basic",
        "allow",
        "deny",
        "limit_req",
        "limit_conn",
        "return",
        "rewrite",
    ];
    for item in loc_children {
        if let Item::Directive { name, args } = item {
            if !known.contains(&name.as_str()) {
                config.raw_extras.insert(
                    format!("nginx.location.{router_id}.{name}"),
                    SValue::String(args.join(" ")),
                );
            }
        }
    }

    ids
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s5_tls_server_with_two_upstream_servers() {
        let input = "server { listen 443 ssl; server_name z; ssl_certificate z.crt; ssl_certificate_key z.key; location /api { proxy_pass http://u; } } upstream u { server a:1; server b:1; }";
        let config = ingest(input).unwrap();

        let router = config
            .routers
            .values()
            .next()
            .expect("one router for the /api location");
        assert_eq!(router.rule.as_ref().unwrap().print(crate::rule::Dialect::V3), "Host(`z`) && PathPrefix(`/api`)");
        assert_eq!(router.service_ref, "u");
        assert!(router.tls.is_some());
        let cert_files = &router.tls.as_ref().unwrap().cert_files;
        assert_eq!(cert_files[0].cert, PathBuf::from("z.crt"));
        assert_eq!(cert_files[0].key, PathBuf::from("z.key"));

        let service = config.services.get("u").unwrap();
        assert_eq!(service.pool.servers.len(), 2);
    }

    #[test]
    fn redirect_only_location_is_skipped() {
        let input = "server { server_name x; location / { return 301 https://x/; } }";
        let config = ingest(input).unwrap();
        assert!(config.routers.is_empty());
        assert!(config.diagnostics.iter().any(|d| d.code == "UnsupportedFeature"));
    }

    #[test]
    fn unknown_directive_is_preserved_in_raw_extras() {
        let input = "server { server_name x; location / { proxy_pass http://b:80; proxy_buffering off; } }";
        let config = ingest(input).unwrap();
        assert!(config.raw_extras.keys().any(|k| k.contains("proxy_buffering")));
    }

    #[test]
    fn unterminated_block_reports_offset() {
        let input = "server { listen 80;";
        let err = ingest(input).unwrap_err();
        assert_eq!(err.kind, NginxParseErrorKind::UnterminatedBlock);
    }
}
