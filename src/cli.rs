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

//! The CLI surface: parse flags, build a request for the library layer,
//! print what comes back. No routing logic lives here.

use crate::format::Format;
use crate::model::{Diagnostic, Severity};
use crate::rule::Dialect;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "waypost", version, about = "Convert reverse-proxy routing configuration between formats")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a config from one format to another.
    Convert(ConvertArgs),
    /// Ingest and validate a config without converting it.
    Analyze(AnalyzeArgs),
    /// Emit a starter set of artifacts (config, compose stub, docs) from an input.
    Scaffold(ScaffoldArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,

    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<Format>,

    #[arg(long = "output-format", value_enum)]
    pub output_format: Format,

    #[arg(long, value_enum, default_value_t = Dialect::V3)]
    pub dialect: Dialect,

    /// Skip the validator pass entirely.
    #[arg(long = "no-validate")]
    pub no_validate: bool,

    /// Ingest and validate only; do not write an output file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Emit even if validation reported errors.
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    pub input: PathBuf,

    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<Format>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,
}

#[derive(Args)]
pub struct ScaffoldArgs {
    pub input: PathBuf,

    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<Format>,

    #[arg(long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long = "proxy-type", value_enum, default_value_t = crate::scaffold::ProxyType::Traefik)]
    pub proxy_type: crate::scaffold::ProxyType,

    #[arg(long, value_enum, default_value_t = Dialect::V3)]
    pub dialect: Dialect,

    #[arg(long = "include-compose")]
    pub include_compose: bool,

    #[arg(long = "include-config")]
    pub include_config: bool,

    #[arg(long = "include-docs")]
    pub include_docs: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ReportFormat {
    Table,
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportFormat::Table => "table",
            ReportFormat::Json => "json",
        };
        write!(f, "{s}")
    }
}

/// The `analyze` subcommand's report: a count-level view of a config
/// plus its diagnostics, printed as a table by default or as JSON with
/// `--format json`.
#[derive(Serialize)]
pub struct AnalysisSummary {
    pub routers: usize,
    pub services: usize,
    pub middlewares: usize,
    pub tls_options: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub diagnostics: Vec<DiagnosticSummary>,
}

#[derive(Serialize)]
pub struct DiagnosticSummary {
    pub severity: String,
    pub code: String,
    pub message: String,
}

impl AnalysisSummary {
    pub fn from_config(config: &crate::model::Config) -> Self {
        let diagnostics = config
            .diagnostics
            .iter()
            .map(DiagnosticSummary::from)
            .collect();

        AnalysisSummary {
            routers: config.routers.len(),
            services: config.services.len(),
            middlewares: config.middlewares.len(),
            tls_options: config.tls_options.len(),
            errors: config.error_count(),
            warnings: config.warning_count(),
            infos: config
                .diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Info)
                .count(),
            diagnostics,
        }
    }

    pub fn print_table(&self) {
        println!("routers:      {}", self.routers);
        println!("services:     {}", self.services);
        println!("middlewares:  {}", self.middlewares);
        println!("tls options:  {}", self.tls_options);
        println!(
            "diagnostics:  {} error(s), {} warning(s), {} info(s)",
            self.errors, self.warnings, self.infos
        );
        for diagnostic in &self.diagnostics {
            println!("  [{}] {}: {}", diagnostic.severity, diagnostic.code, diagnostic.message);
        }
    }
}

impl From<&Diagnostic> for DiagnosticSummary {
    fn from(diagnostic: &Diagnostic) -> Self {
        DiagnosticSummary {
            severity: diagnostic.severity.to_string(),
            code: diagnostic.code.clone(),
            message: diagnostic.message.clone(),
        }
    }
}
