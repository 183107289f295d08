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

//! Ingestors: one per input format, each producing a format-neutral
//! [`crate::model::Config`] plus accumulated diagnostics.

pub mod docker_compose;
pub mod json_yaml;
pub mod labels;
pub mod nginx;
pub mod traefik_dynamic;

use crate::error::Result;
use crate::format::Format;
use crate::model::Config;
use crate::rule::Dialect;

/// Dispatches to the ingestor matching `format`. Parse errors propagate
/// through `?`; model-level problems accumulate as diagnostics on the
/// returned [`Config`] rather than failing this call: parsing is an
/// early-exit result, validation and lowering accumulate.
///
/// `dialect` picks how embedded rule strings are parsed (a v2 config's
/// `HostRegexp` brace templates read differently from a v3 bare regex);
/// it has no effect on the nginx ingestor, which never embeds a Traefik
/// rule string.
pub fn ingest(format: Format, input: &str, dialect: Dialect) -> Result<Config> {
    match format {
        Format::DockerCompose => Ok(docker_compose::ingest(input, dialect)?),
        Format::TraefikDynamic => Ok(traefik_dynamic::ingest(input, dialect)?),
        Format::NginxConf => Ok(nginx::ingest(input)?),
        Format::Json | Format::Yaml => Ok(json_yaml::ingest(input, dialect)?),
    }
}
