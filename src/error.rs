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

//! Fail-fast error aggregate for the conversion core.
//!
//! Parse errors (rule grammar, nginx grammar, structured data) use this
//! type and propagate with `?`. Model errors and lowering warnings do not
//! go through here: they accumulate in [`crate::model::Diagnostic`] lists
//! on a [`crate::model::Config`] and are reported, not raised.

use crate::ingest::nginx::NginxParseError;
use crate::rule::parser::RuleParseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse Traefik rule: {0}")]
    Rule(#[from] RuleParseError),

    #[error("failed to parse nginx configuration: {0}")]
    Nginx(#[from] NginxParseError),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to compile scaffold template: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("failed to render scaffold template: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine input format for {path}; pass --input-format")]
    AmbiguousFormat { path: PathBuf },

    #[error("unsupported conversion: {input_format} -> {output_format}")]
    UnsupportedConversion {
        input_format: String,
        output_format: String,
    },

    #[error("validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
