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

//! Format detector: a pure function of a filename plus a byte prefix.
//! Never reads the whole file twice, never guesses silently on
//! ambiguity.

use clap::ValueEnum;
use std::fmt;
use std::path::Path;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Format {
    DockerCompose,
    TraefikDynamic,
    NginxConf,
    Json,
    Yaml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::DockerCompose => "docker-compose",
            Format::TraefikDynamic => "traefik-dynamic",
            Format::NginxConf => "nginx-conf",
            Format::Json => "json",
            Format::Yaml => "yaml",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum DetectError {
    /// More than one format is plausible and no hint was given.
    Ambiguous(Vec<Format>),
    /// The byte prefix and filename give no signal at all.
    Unknown,
}

/// Detect the format of `bytes` (only the first few KiB are consulted),
/// optionally aided by a `filename`'s suffix.
pub fn detect(filename: Option<&str>, bytes: &[u8]) -> Result<Format, DetectError> {
    let prefix_len = bytes.len().min(4096);
    let prefix = String::from_utf8_lossy(&bytes[..prefix_len]);

    let suffix = filename
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if suffix.as_deref() == Some("conf") {
        return Ok(Format::NginxConf);
    }

    let looks_like_compose = prefix.contains("services:") && prefix.contains("labels:");
    let looks_like_traefik = ["http:", "tcp:", "udp:"]
        .iter()
        .any(|needle| prefix.contains(needle));

    match suffix.as_deref() {
        Some("yml") | Some("yaml") => {
            if looks_like_compose && looks_like_traefik {
                Err(DetectError::Ambiguous(vec![
                    Format::DockerCompose,
                    Format::TraefikDynamic,
                ]))
            } else if looks_like_compose {
                Ok(Format::DockerCompose)
            } else if looks_like_traefik {
                Ok(Format::TraefikDynamic)
            } else {
                Ok(Format::Yaml)
            }
        }
        Some("json") => {
            if looks_like_compose && looks_like_traefik {
                Err(DetectError::Ambiguous(vec![
                    Format::DockerCompose,
                    Format::TraefikDynamic,
                ]))
            } else if looks_like_compose {
                Ok(Format::DockerCompose)
            } else if looks_like_traefik {
                Ok(Format::TraefikDynamic)
            } else {
                Ok(Format::Json)
            }
        }
        _ => {
            // No suffix signal: fall back purely on content heuristics.
            if prefix.contains("server {") || prefix.contains("http {") || prefix.contains("upstream ") {
                Ok(Format::NginxConf)
            } else if looks_like_compose {
                Ok(Format::DockerCompose)
            } else if looks_like_traefik {
                Ok(Format::TraefikDynamic)
            } else {
                Err(DetectError::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detects_nginx_by_suffix() {
        assert_eq!(
            detect(Some("site.conf"), b"server { listen 80; }"),
            Ok(Format::NginxConf)
        );
    }

    #[test]
    fn detects_compose_by_suffix_and_content() {
        let bytes = b"services:\n  web:\n    labels:\n      - traefik.enable=true\n";
        assert_eq!(
            detect(Some("docker-compose.yml"), bytes),
            Ok(Format::DockerCompose)
        );
    }

    #[test]
    fn detects_traefik_dynamic_by_suffix_and_content() {
        let bytes = b"http:\n  routers:\n    web:\n      rule: Host(`a`)\n";
        assert_eq!(
            detect(Some("dynamic.yaml"), bytes),
            Ok(Format::TraefikDynamic)
        );
    }

    #[test]
    fn ambiguous_without_hint_is_reported() {
        let bytes = b"services:\n  web:\n    labels: {}\nhttp:\n  routers: {}\n";
        assert_eq!(
            detect(Some("mixed.yaml"), bytes),
            Err(DetectError::Ambiguous(vec![
                Format::DockerCompose,
                Format::TraefikDynamic
            ]))
        );
    }
}
