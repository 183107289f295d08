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

//! waypost converts reverse-proxy routing configuration between nginx,
//! Traefik's dynamic configuration and Docker Compose's label namespace.
//!
//! The core (this crate) is a pure, synchronous library: [`format`]
//! detects an input's shape, [`ingest`] lowers it into the unified
//! [`model::Config`], [`validate`] checks it, and [`emit`] lowers it back
//! out into a target format. [`orchestrator`] wires the four together;
//! [`cli`] is the thinnest possible shell around that.

pub mod cli;
pub mod emit;
pub mod error;
pub mod format;
pub mod ingest;
pub mod model;
pub mod orchestrator;
pub mod rule;
pub mod scaffold;
pub mod validate;

pub use error::{Error, Result};
