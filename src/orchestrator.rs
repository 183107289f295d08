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

//! The orchestrator: wires detect → ingest → validate →
//! emit. It never touches the filesystem — it consumes bytes and a few
//! knobs and produces bytes plus diagnostics, so the CLI shell stays the
//! only thing that knows about paths.

use crate::emit;
use crate::error::{Error, Result};
use crate::format::{self, Format};
use crate::ingest;
use crate::model::{Config, Diagnostic};
use crate::rule::Dialect;
use std::path::PathBuf;

pub struct ConversionRequest<'a> {
    pub input: &'a [u8],
    pub filename: Option<&'a str>,
    pub input_format: Option<Format>,
    pub output_format: Format,
    pub dialect: Dialect,
    /// Run the validator before emission. Errors found this way block
    /// emission unless `lenient` is set.
    pub validate: bool,
    /// Ingest and validate only; skip emission and return no bytes.
    pub dry_run: bool,
    /// Emit even if the diagnostics list contains errors.
    pub lenient: bool,
}

pub struct ConversionOutput {
    pub config: Config,
    pub bytes: Option<Vec<u8>>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn convert(request: ConversionRequest<'_>) -> Result<ConversionOutput> {
    let input_text = String::from_utf8_lossy(request.input);

    let detected_format = match request.input_format {
        Some(format) => format,
        None => format::detect(request.filename, request.input).map_err(|_| Error::AmbiguousFormat {
            path: PathBuf::from(request.filename.unwrap_or("<stdin>")),
        })?,
    };

    let mut config = ingest::ingest(detected_format, &input_text, request.dialect)?;

    if request.validate {
        crate::validate::validate(&mut config);
    }

    if config.has_errors() && !request.lenient {
        return Err(Error::ValidationFailed {
            error_count: config.error_count(),
        });
    }

    if request.dry_run {
        return Ok(ConversionOutput {
            diagnostics: config.diagnostics.clone(),
            config,
            bytes: None,
        });
    }

    let (text, emission_diagnostics) = emit::emit(request.output_format, &config, request.dialect)?;
    config.diagnostics.extend(emission_diagnostics);

    if config.has_errors() && !request.lenient {
        return Err(Error::ValidationFailed {
            error_count: config.error_count(),
        });
    }

    Ok(ConversionOutput {
        diagnostics: config.diagnostics.clone(),
        config,
        bytes: Some(text.into_bytes()),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn converts_compose_labels_to_traefik_dynamic() {
        let input = br#"
services:
  web:
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=s"
      - "traefik.http.services.s.loadbalancer.server.port=8080"
"#;
        let request = ConversionRequest {
            input,
            filename: Some("docker-compose.yml"),
            input_format: None,
            output_format: Format::TraefikDynamic,
            dialect: Dialect::V3,
            validate: true,
            dry_run: false,
            lenient: false,
        };

        let output = convert(request).unwrap();
        let text = String::from_utf8(output.bytes.unwrap()).unwrap();
        assert!(text.contains("rule: Host(`x`)"));
    }

    #[test]
    fn dry_run_skips_emission() {
        let input = br#"
services:
  web:
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=s"
"#;
        let request = ConversionRequest {
            input,
            filename: Some("docker-compose.yml"),
            input_format: Some(Format::DockerCompose),
            output_format: Format::TraefikDynamic,
            dialect: Dialect::V3,
            validate: true,
            dry_run: true,
            lenient: true,
        };

        let output = convert(request).unwrap();
        assert!(output.bytes.is_none());
    }

    #[test]
    fn dangling_reference_blocks_emission_unless_lenient() {
        let input = br#"
services:
  web:
    labels:
      - "traefik.enable=true"
      - "traefik.http.routers.r.rule=Host(`x`)"
      - "traefik.http.routers.r.service=nonexistent"
"#;
        let request = ConversionRequest {
            input,
            filename: Some("docker-compose.yml"),
            input_format: Some(Format::DockerCompose),
            output_format: Format::TraefikDynamic,
            dialect: Dialect::V3,
            validate: true,
            dry_run: false,
            lenient: false,
        };

        let err = convert(request).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed { .. }));
    }
}
