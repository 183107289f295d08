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

//! Generic JSON/YAML ingestor: treated as a traefik-dynamic document
//! operating on pre-parsed data. JSON is a YAML subset, so
//! [`serde_yaml`] parses both wire representations through the one
//! [`crate::ingest::traefik_dynamic`] tree walk.

use crate::model::Config;
use crate::rule::Dialect;

pub fn ingest(input: &str, dialect: Dialect) -> Result<Config, serde_yaml::Error> {
    super::traefik_dynamic::ingest(input, dialect)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_json_text() {
        let input = r#"{"http": {"routers": {"web": {"rule": "Host(`x`)", "service": "s"}}}}"#;
        let config = ingest(input, Dialect::V3).unwrap();
        assert!(config.routers.contains_key("web"));
    }
}
