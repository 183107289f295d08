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

//! The matcher schema as data, not code: adding or changing a matcher
//! means editing the table below, not writing new match arms.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Protocol {
    #[default]
    Http,
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Http => "http",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MatcherName {
    Host,
    HostRegexp,
    Path,
    PathPrefix,
    PathRegexp,
    Method,
    Header,
    HeaderRegexp,
    Query,
    QueryRegexp,
    ClientIP,
    HostSNI,
    HostSNIRegexp,
    ALPN,
}

/// Inclusive arity bound. `max: None` means unbounded ("1..n").
#[derive(Clone, Copy, Debug)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    const fn exact(n: usize) -> Self {
        Arity {
            min: n,
            max: Some(n),
        }
    }
    const fn at_least(n: usize) -> Self {
        Arity { min: n, max: None }
    }
    const fn range(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map(|max| n <= max).unwrap_or(true)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..n", self.min),
        }
    }
}

pub struct MatcherSchema {
    pub name: MatcherName,
    pub arity: Arity,
    pub protocols: &'static [Protocol],
}

const SCHEMA: &[MatcherSchema] = &[
    MatcherSchema {
        name: MatcherName::Host,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::HostRegexp,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::Path,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::PathPrefix,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::PathRegexp,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::Method,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::Header,
        arity: Arity::exact(2),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::HeaderRegexp,
        arity: Arity::exact(2),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::Query,
        arity: Arity::range(1, 2),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::QueryRegexp,
        arity: Arity::exact(2),
        protocols: &[Protocol::Http],
    },
    MatcherSchema {
        name: MatcherName::ClientIP,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Http, Protocol::Tcp, Protocol::Udp],
    },
    MatcherSchema {
        name: MatcherName::HostSNI,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Tcp],
    },
    MatcherSchema {
        name: MatcherName::HostSNIRegexp,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Tcp],
    },
    MatcherSchema {
        name: MatcherName::ALPN,
        arity: Arity::at_least(1),
        protocols: &[Protocol::Tcp],
    },
];

impl MatcherName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherName::Host => "Host",
            MatcherName::HostRegexp => "HostRegexp",
            MatcherName::Path => "Path",
            MatcherName::PathPrefix => "PathPrefix",
            MatcherName::PathRegexp => "PathRegexp",
            MatcherName::Method => "Method",
            MatcherName::Header => "Header",
            MatcherName::HeaderRegexp => "HeaderRegexp",
            MatcherName::Query => "Query",
            MatcherName::QueryRegexp => "QueryRegexp",
            MatcherName::ClientIP => "ClientIP",
            MatcherName::HostSNI => "HostSNI",
            MatcherName::HostSNIRegexp => "HostSNIRegexp",
            MatcherName::ALPN => "ALPN",
        }
    }

    pub fn from_ident(ident: &str) -> Option<Self> {
        SCHEMA
            .iter()
            .find(|s| s.name.as_str() == ident)
            .map(|s| s.name)
    }

    pub fn schema(&self) -> &'static MatcherSchema {
        SCHEMA.iter().find(|s| s.name == *self).expect("exhaustive")
    }

    pub fn arity(&self) -> Arity {
        self.schema().arity
    }

    pub fn protocols(&self) -> &'static [Protocol] {
        self.schema().protocols
    }

    pub fn supports_protocol(&self, protocol: Protocol) -> bool {
        self.protocols().contains(&protocol)
    }
}

impl fmt::Display for MatcherName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
