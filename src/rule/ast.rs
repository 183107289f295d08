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

use crate::rule::schema::MatcherName;
use crate::rule::template::TemplateSegment;
use std::fmt;

/// Traefik rule dialect. The grammar is identical at the operator level;
/// dialects differ only in the legal shape of literal arguments (see
/// [`crate::rule::template`]).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum Dialect {
    V2,
    V3,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::V2 => "v2",
            Dialect::V3 => "v3",
        };
        write!(f, "{s}")
    }
}

/// The original quoting character used around a string literal, preserved
/// so a round trip through the same dialect reproduces it verbatim.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QuoteStyle {
    Backtick,
    Single,
    Double,
}

impl QuoteStyle {
    pub fn ch(self) -> char {
        match self {
            QuoteStyle::Backtick => '`',
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// One matcher call argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A plain string literal, used by every matcher except a v2
    /// `HostRegexp` template.
    Plain { value: String, quote: QuoteStyle },
    /// A v2 `HostRegexp` `{name:regex}` template, mixed with literal runs.
    /// Only ever produced for `HostRegexp` in [`Dialect::V2`].
    HostTemplate {
        segments: Vec<TemplateSegment>,
        quote: QuoteStyle,
    },
}

impl Arg {
    pub fn plain(value: impl Into<String>, quote: QuoteStyle) -> Self {
        Arg::Plain {
            value: value.into(),
            quote,
        }
    }

    pub fn as_plain_str(&self) -> Option<&str> {
        match self {
            Arg::Plain { value, .. } => Some(value),
            Arg::HostTemplate { .. } => None,
        }
    }

    fn print(&self, dialect: Dialect) -> String {
        match self {
            Arg::Plain { value, quote } => format!("{q}{value}{q}", q = quote.ch()),
            Arg::HostTemplate { segments, quote } => {
                let body = match dialect {
                    Dialect::V2 => crate::rule::template::render_template(segments),
                    Dialect::V3 => crate::rule::template::render_regex(segments),
                };
                format!("{q}{body}{q}", q = quote.ch())
            }
        }
    }
}

/// A node in the rule expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleExpr {
    Matcher { name: MatcherName, args: Vec<Arg> },
    And(Box<RuleExpr>, Box<RuleExpr>),
    Or(Box<RuleExpr>, Box<RuleExpr>),
    Not(Box<RuleExpr>),
    /// Explicit parenthesization, preserved so round-trips keep author
    /// intent even where the parens are semantically redundant.
    Group(Box<RuleExpr>),
}

impl RuleExpr {
    pub fn and(left: RuleExpr, right: RuleExpr) -> Self {
        RuleExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: RuleExpr, right: RuleExpr) -> Self {
        RuleExpr::Or(Box::new(left), Box::new(right))
    }

    pub fn not(operand: RuleExpr) -> Self {
        RuleExpr::Not(Box::new(operand))
    }

    pub fn group(inner: RuleExpr) -> Self {
        RuleExpr::Group(Box::new(inner))
    }

    /// All matchers appearing anywhere in the tree, depth-first.
    pub fn matchers(&self) -> Vec<(&MatcherName, &[Arg])> {
        let mut out = Vec::new();
        self.collect_matchers(&mut out);
        out
    }

    fn collect_matchers<'a>(&'a self, out: &mut Vec<(&'a MatcherName, &'a [Arg])>) {
        match self {
            RuleExpr::Matcher { name, args } => out.push((name, args)),
            RuleExpr::And(l, r) | RuleExpr::Or(l, r) => {
                l.collect_matchers(out);
                r.collect_matchers(out);
            }
            RuleExpr::Not(inner) | RuleExpr::Group(inner) => inner.collect_matchers(out),
        }
    }

    /// True if the top level of the tree is a conjunction (possibly nested
    /// through `Group`) containing at least one `Host`/`HostRegexp`
    /// matcher. Used by the nginx emitter to decide whether a router can
    /// be grouped under a `server_name` block.
    pub fn is_host_compatible(&self) -> bool {
        self.matchers()
            .iter()
            .any(|(name, _)| matches!(name, MatcherName::Host | MatcherName::HostRegexp))
    }

    fn precedence(&self) -> u8 {
        match self {
            RuleExpr::Or(..) => 0,
            RuleExpr::And(..) => 1,
            RuleExpr::Not(..) => 2,
            RuleExpr::Matcher { .. } | RuleExpr::Group(..) => 3,
        }
    }

    /// Pretty-print in the given dialect. `Not` binds tightest, then
    /// `And`, then `Or`. `Group` nodes print their own parens
    /// unconditionally (author intent); synthesized trees without a
    /// `Group` only get parens where precedence demands it.
    pub fn print(&self, dialect: Dialect) -> String {
        self.print_inner(dialect, 0)
    }

    fn print_inner(&self, dialect: Dialect, min_prec: u8) -> String {
        let own_prec = self.precedence();
        let body = match self {
            RuleExpr::Matcher { name, args } => {
                let args_str = args
                    .iter()
                    .map(|a| a.print(dialect))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", name.as_str(), args_str)
            }
            RuleExpr::Not(inner) => format!("!{}", inner.print_inner(dialect, own_prec)),
            RuleExpr::And(l, r) => format!(
                "{} && {}",
                l.print_inner(dialect, own_prec),
                r.print_inner(dialect, own_prec + 1)
            ),
            RuleExpr::Or(l, r) => format!(
                "{} || {}",
                l.print_inner(dialect, own_prec),
                r.print_inner(dialect, own_prec + 1)
            ),
            RuleExpr::Group(inner) => format!("({})", inner.print_inner(dialect, 0)),
        };

        if matches!(self, RuleExpr::Group(..)) {
            // Group already carries its own parens.
            body
        } else if own_prec < min_prec {
            format!("({body})")
        } else {
            body
        }
    }
}

impl fmt::Display for RuleExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.print(Dialect::V3))
    }
}
