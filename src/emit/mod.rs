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

//! Emitters: one per output format, each a pure read of
//! a [`crate::model::Config`]. Emitters never mutate the Config they are
//! given; downgrade warnings are returned alongside the rendered text
//! instead, for the orchestrator to fold back in.

pub mod docker_compose;
pub mod json_yaml;
pub mod nginx;
pub mod traefik_dynamic;

use crate::error::Result;
use crate::format::Format;
use crate::model::{Config, Diagnostic};
use crate::rule::Dialect;

/// Dispatches to the emitter matching `format`, returning the rendered
/// text plus any downgrade diagnostics produced along the way.
pub fn emit(format: Format, config: &Config, dialect: Dialect) -> Result<(String, Vec<Diagnostic>)> {
    match format {
        Format::TraefikDynamic | Format::Yaml => {
            Ok((json_yaml::to_yaml_string(config, dialect)?, Vec::new()))
        }
        Format::Json => Ok((json_yaml::to_json_string(config, dialect)?, Vec::new())),
        Format::NginxConf => Ok(nginx::emit(config)),
        Format::DockerCompose => {
            let value = docker_compose::emit(config, dialect);
            Ok((serde_yaml::to_string(&value)?, Vec::new()))
        }
    }
}
