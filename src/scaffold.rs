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

//! The `scaffold` subcommand: batch-emits a config artifact, a compose
//! stub, and a Markdown summary from one ingested input. The docs
//! artifact is rendered with `handlebars`.

use crate::emit;
use crate::error::Result;
use crate::format::{self, Format};
use crate::ingest;
use crate::model::Config;
use crate::rule::Dialect;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ProxyType {
    Traefik,
    Nginx,
}

impl std::fmt::Display for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProxyType::Traefik => "traefik",
            ProxyType::Nginx => "nginx",
        };
        write!(f, "{s}")
    }
}

pub struct ScaffoldRequest<'a> {
    pub input: &'a [u8],
    pub filename: Option<&'a str>,
    pub input_format: Option<Format>,
    pub proxy_type: ProxyType,
    pub dialect: Dialect,
    pub include_compose: bool,
    pub include_config: bool,
    pub include_docs: bool,
}

pub struct ScaffoldOutput {
    pub config: Config,
    /// `(filename, content)` pairs, in emission order.
    pub artifacts: Vec<(String, Vec<u8>)>,
}

const DOCS_TEMPLATE: &str = "\
# Routing summary

- Routers: {{routers}}
- Services: {{services}}
- Middlewares: {{middlewares}}
- Diagnostics: {{errors}} error(s), {{warnings}} warning(s), {{infos}} info(s)

## Routers
{{#each router_ids}}
- `{{this}}`
{{/each}}
";

#[derive(Serialize)]
struct DocsContext {
    routers: usize,
    services: usize,
    middlewares: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    router_ids: Vec<String>,
}

pub fn scaffold(request: ScaffoldRequest<'_>) -> Result<ScaffoldOutput> {
    let input_text = String::from_utf8_lossy(request.input);

    let detected_format = match request.input_format {
        Some(format) => format,
        None => format::detect(request.filename, request.input).map_err(|_| {
            crate::error::Error::AmbiguousFormat {
                path: PathBuf::from(request.filename.unwrap_or("<stdin>")),
            }
        })?,
    };

    let mut config = ingest::ingest(detected_format, &input_text, request.dialect)?;
    crate::validate::validate(&mut config);

    let mut artifacts = Vec::new();

    if request.include_config {
        let output_format = match request.proxy_type {
            ProxyType::Traefik => Format::TraefikDynamic,
            ProxyType::Nginx => Format::NginxConf,
        };
        let (text, downgrades) = emit::emit(output_format, &config, request.dialect)?;
        config.diagnostics.extend(downgrades);
        let filename = match request.proxy_type {
            ProxyType::Traefik => "traefik-dynamic.yaml",
            ProxyType::Nginx => "nginx.conf",
        };
        artifacts.push((filename.to_string(), text.into_bytes()));
    }

    if request.include_compose {
        let (text, downgrades) = emit::emit(Format::DockerCompose, &config, request.dialect)?;
        config.diagnostics.extend(downgrades);
        artifacts.push(("docker-compose.yml".to_string(), text.into_bytes()));
    }

    if request.include_docs {
        let context = DocsContext {
            routers: config.routers.len(),
            services: config.services.len(),
            middlewares: config.middlewares.len(),
            errors: config.error_count(),
            warnings: config.warning_count(),
            infos: config
                .diagnostics
                .iter()
                .filter(|d| d.severity == crate::model::Severity::Info)
                .count(),
            router_ids: config.routers.keys().cloned().collect(),
        };
        let mut registry = Handlebars::new();
        registry.register_template_string("docs", DOCS_TEMPLATE)?;
        let rendered = registry.render("docs", &context)?;
        artifacts.push(("README.md".to_string(), rendered.into_bytes()));
    }

    Ok(ScaffoldOutput { config, artifacts })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scaffold_emits_requested_artifacts() {
        let input = br#"
services:
  web:
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=s"
      - "traefik.http.services.s.loadbalancer.server.port=8080"
"#;
        let request = ScaffoldRequest {
            input,
            filename: Some("docker-compose.yml"),
            input_format: Some(Format::DockerCompose),
            proxy_type: ProxyType::Traefik,
            dialect: Dialect::V3,
            include_compose: false,
            include_config: true,
            include_docs: true,
        };

        let output = scaffold(request).unwrap();
        let names: Vec<&str> = output.artifacts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["traefik-dynamic.yaml", "README.md"]);

        let docs = String::from_utf8(output.artifacts[1].1.clone()).unwrap();
        assert!(docs.contains("Routers: 1"));
        assert!(docs.contains("- `r`"));
    }
}
