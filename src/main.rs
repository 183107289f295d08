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

use clap::Parser;
use log::error;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use waypost::cli::{AnalysisSummary, Cli, Command, ReportFormat};
use waypost::orchestrator::{self, ConversionRequest};
use waypost::scaffold::{self, ScaffoldRequest};
use waypost::Error;

/// Exit codes: 0 success, 1 validation errors, 2 parse error,
/// 3 I/O error, 4 unsupported conversion.
const EXIT_OK: u8 = 0;
const EXIT_VALIDATION: u8 = 1;
const EXIT_PARSE: u8 = 2;
const EXIT_IO: u8 = 3;
const EXIT_UNSUPPORTED: u8 = 4;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Scaffold(args) => run_scaffold(args),
    };
    ExitCode::from(code)
}

fn read_input(path: &Path) -> Result<Vec<u8>, u8> {
    fs::read(path).map_err(|source| {
        error!("failed to read {}: {source}", path.display());
        EXIT_IO
    })
}

fn exit_code_for_error(err: &Error) -> u8 {
    match err {
        Error::ValidationFailed { .. } => EXIT_VALIDATION,
        Error::Rule(_) | Error::Nginx(_) | Error::Yaml(_) | Error::Json(_) => EXIT_PARSE,
        Error::AmbiguousFormat { .. } => EXIT_PARSE,
        Error::UnsupportedConversion { .. } => EXIT_UNSUPPORTED,
        Error::Io { .. } => EXIT_IO,
        Error::Template(_) | Error::Render(_) => EXIT_IO,
    }
}

fn run_convert(args: waypost::cli::ConvertArgs) -> u8 {
    let input = match read_input(&args.input) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };

    let request = ConversionRequest {
        input: &input,
        filename: args.input.to_str(),
        input_format: args.input_format,
        output_format: args.output_format,
        dialect: args.dialect,
        validate: !args.no_validate,
        dry_run: args.dry_run,
        lenient: args.lenient,
    };

    let output = match orchestrator::convert(request) {
        Ok(output) => output,
        Err(err) => {
            error!("{err}");
            return exit_code_for_error(&err);
        }
    };

    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }

    if let Some(bytes) = output.bytes {
        if let Err(source) = fs::write(&args.output, bytes) {
            error!("failed to write {}: {source}", args.output.display());
            return EXIT_IO;
        }
    }

    EXIT_OK
}

fn run_analyze(args: waypost::cli::AnalyzeArgs) -> u8 {
    let input = match read_input(&args.input) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };

    let request = ConversionRequest {
        input: &input,
        filename: args.input.to_str(),
        input_format: args.input_format,
        output_format: waypost::format::Format::TraefikDynamic,
        dialect: waypost::rule::Dialect::V3,
        validate: true,
        dry_run: true,
        lenient: true,
    };

    let output = match orchestrator::convert(request) {
        Ok(output) => output,
        Err(err) => {
            error!("{err}");
            return exit_code_for_error(&err);
        }
    };

    let summary = AnalysisSummary::from_config(&output.config);
    match args.format {
        ReportFormat::Table => summary.print_table(),
        ReportFormat::Json => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(source) => {
                error!("failed to serialize analysis summary: {source}");
                return EXIT_IO;
            }
        },
    }

    if output.config.has_errors() {
        EXIT_VALIDATION
    } else {
        EXIT_OK
    }
}

fn run_scaffold(args: waypost::cli::ScaffoldArgs) -> u8 {
    let input = match read_input(&args.input) {
        Ok(bytes) => bytes,
        Err(code) => return code,
    };

    let request = ScaffoldRequest {
        input: &input,
        filename: args.input.to_str(),
        input_format: args.input_format,
        proxy_type: args.proxy_type,
        dialect: args.dialect,
        include_compose: args.include_compose,
        include_config: args.include_config,
        include_docs: args.include_docs,
    };

    let output = match scaffold::scaffold(request) {
        Ok(output) => output,
        Err(err) => {
            error!("{err}");
            return exit_code_for_error(&err);
        }
    };

    if let Err(source) = fs::create_dir_all(&args.output_dir) {
        error!("failed to create {}: {source}", args.output_dir.display());
        return EXIT_IO;
    }

    for (filename, content) in &output.artifacts {
        let path = args.output_dir.join(filename);
        if let Err(source) = fs::write(&path, content) {
            error!("failed to write {}: {source}", path.display());
            return EXIT_IO;
        }
    }

    if output.config.has_errors() {
        EXIT_VALIDATION
    } else {
        EXIT_OK
    }
}
