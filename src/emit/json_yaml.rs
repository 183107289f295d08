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

//! Generic JSON/YAML emitter: the same tree as the traefik-dynamic
//! emitter, serialized either way, since plain JSON/YAML is treated as
//! a traefik-dynamic document operating on pre-parsed data.

use crate::error::Result;
use crate::model::Config;
use crate::rule::Dialect;

pub fn to_yaml_string(config: &Config, dialect: Dialect) -> Result<String> {
    let value = super::traefik_dynamic::to_value(config, dialect);
    Ok(serde_yaml::to_string(&value)?)
}

pub fn to_json_string(config: &Config, dialect: Dialect) -> Result<String> {
    let value = super::traefik_dynamic::to_value(config, dialect);
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{LoadBalancer, LoadBalancerPolicy, Router, Service};
    use crate::rule::{self, Protocol};

    #[test]
    fn yaml_and_json_agree_on_shape() {
        let mut config = Config::new();
        let mut router = Router::new("r", Protocol::Http, "s");
        router.rule = Some(rule::parse("Host(`x`)", Dialect::V3).unwrap());
        config.routers.insert(router.id.clone(), router);
        config.services.insert(
            "s".to_string(),
            Service::new("s", Protocol::Http, LoadBalancer::new(Vec::new(), LoadBalancerPolicy::RoundRobin)),
        );

        let yaml = to_yaml_string(&config, Dialect::V3).unwrap();
        let json = to_json_string(&config, Dialect::V3).unwrap();
        assert!(yaml.contains("rule: Host(`x`)"));
        assert!(json.contains("\"rule\": \"Host(`x`)\""));
    }
}
