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

//! Precedence-climbing parser over the pest tokenization of the rule
//! grammar. pest handles tokenization only (`matcher`, `group`,
//! `not_expr`, `expr`); the resulting flat `term (op term)*` chain is
//! folded by hand: `||` splits first (lowest precedence), `&&` folds
//! within each split, `!` binds tightest.

use crate::rule::ast::{Arg, Dialect, QuoteStyle, RuleExpr};
use crate::rule::schema::MatcherName;
use crate::rule::template;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use thiserror::Error;

#[derive(PestParser)]
#[grammar = "rule/rule.pest"]
struct RuleGrammar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseErrorKind {
    #[error("unknown matcher `{name}`")]
    UnknownMatcher { name: String },
    #[error("matcher `{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("unexpected token near `{found}`")]
    UnexpectedToken { found: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("trailing garbage after expression")]
    TrailingGarbage,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} (at offset {offset})")]
pub struct RuleParseError {
    pub kind: RuleParseErrorKind,
    pub offset: usize,
}

/// Parse a rule string in the given dialect. Total: always returns
/// either a tree or exactly one [`RuleParseError`] with a valid offset
/// into `[0, input.len()]`.
pub fn parse(input: &str, dialect: Dialect) -> Result<RuleExpr, RuleParseError> {
    let mut pairs = RuleGrammar::parse(Rule::program, input).map_err(|e| translate_pest_err(e, input))?;
    let program = pairs.next().expect("program rule always present");
    let mut inner = program.into_inner();
    let expr_pair = inner.next().expect("expr always present in program");
    build_expr(expr_pair, dialect)
}

fn translate_pest_err(e: pest::error::Error<Rule>, input: &str) -> RuleParseError {
    use pest::error::{ErrorVariant, InputLocation};

    let offset = match e.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _end)) => start,
    };

    let kind = match &e.variant {
        ErrorVariant::ParsingError { positives, .. } => {
            let at_eof = offset >= input.len();
            let expects_string_close = positives.iter().any(|r| {
                matches!(
                    r,
                    Rule::string_backtick | Rule::string_single | Rule::string_double | Rule::string
                )
            });
            let expects_eoi = positives.iter().any(|r| *r == Rule::EOI);
            if at_eof && expects_string_close {
                RuleParseErrorKind::UnterminatedString
            } else if expects_eoi {
                RuleParseErrorKind::TrailingGarbage
            } else {
                let found = input
                    .get(offset..)
                    .and_then(|s| s.chars().next())
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| String::from("<eof>"));
                RuleParseErrorKind::UnexpectedToken { found }
            }
        }
        ErrorVariant::CustomError { message } => RuleParseErrorKind::UnexpectedToken {
            found: message.clone(),
        },
    };

    RuleParseError {
        kind,
        offset: offset.min(input.len()),
    }
}

fn build_expr(pair: Pair<Rule>, dialect: Dialect) -> Result<RuleExpr, RuleParseError> {
    let terms: Vec<_> = pair.into_inner().collect();
    // terms interleaves term, op, term, op, term, ...
    let mut iter = terms.into_iter();
    let first = iter.next().expect("expr always has at least one term");
    let first_expr = build_term(first, dialect)?;

    let mut chain: Vec<(Rule, RuleExpr)> = Vec::new();
    loop {
        let Some(op_pair) = iter.next() else { break };
        let op_rule = op_pair.as_rule();
        let term_pair = iter.next().expect("binary op always followed by a term");
        chain.push((op_rule, build_term(term_pair, dialect)?));
    }

    if chain.is_empty() {
        return Ok(first_expr);
    }

    // Precedence climb by hand over the flat (term, op, term, ...) chain:
    // first split on `||` (lowest precedence), then `&&` within each side.
    Ok(fold_or(first_expr, chain))
}

fn fold_or(first: RuleExpr, chain: Vec<(Rule, RuleExpr)>) -> RuleExpr {
    // Group consecutive `&&` runs, then fold the resulting `||` list left-to-right.
    let mut or_terms: Vec<RuleExpr> = Vec::new();
    let mut current = first;
    for (op, expr) in chain {
        match op {
            Rule::and_op => current = RuleExpr::and(current, expr),
            Rule::or_op => {
                or_terms.push(current);
                current = expr;
            }
            _ => unreachable!("only and_op/or_op appear in an expr chain"),
        }
    }
    or_terms.push(current);

    let mut iter = or_terms.into_iter();
    let mut acc = iter.next().expect("at least one && - group present");
    for term in iter {
        acc = RuleExpr::or(acc, term);
    }
    acc
}

fn build_term(pair: Pair<Rule>, dialect: Dialect) -> Result<RuleExpr, RuleParseError> {
    match pair.as_rule() {
        Rule::not_expr => {
            let offset = pair.as_span().start();
            let mut inner = pair.into_inner();
            let operand = inner.next().ok_or(RuleParseError {
                kind: RuleParseErrorKind::UnexpectedToken {
                    found: String::from("!"),
                },
                offset,
            })?;
            Ok(RuleExpr::not(build_term(operand, dialect)?))
        }
        Rule::matcher => build_matcher(pair, dialect),
        Rule::group => {
            let inner_expr = pair.into_inner().next().expect("group always wraps an expr");
            Ok(RuleExpr::group(build_expr(inner_expr, dialect)?))
        }
        other => unreachable!("unexpected term rule: {other:?}"),
    }
}

fn build_matcher(pair: Pair<Rule>, dialect: Dialect) -> Result<RuleExpr, RuleParseError> {
    let offset = pair.as_span().start();
    let mut inner = pair.into_inner();
    let ident = inner.next().expect("matcher always has an ident");
    let ident_str = ident.as_str();

    let Some(name) = MatcherName::from_ident(ident_str) else {
        return Err(RuleParseError {
            kind: RuleParseErrorKind::UnknownMatcher {
                name: ident_str.to_string(),
            },
            offset,
        });
    };

    let args: Vec<Arg> = match inner.next() {
        Some(arglist) => arglist
            .into_inner()
            .map(|string_pair| build_arg(string_pair, name, dialect))
            .collect(),
        None => Vec::new(),
    };

    let arity = name.arity();
    if !arity.contains(args.len()) {
        return Err(RuleParseError {
            kind: RuleParseErrorKind::ArityMismatch {
                name: name.as_str().to_string(),
                expected: arity.to_string(),
                got: args.len(),
            },
            offset,
        });
    }

    Ok(RuleExpr::Matcher { name, args })
}

fn build_arg(string_pair: Pair<Rule>, matcher: MatcherName, dialect: Dialect) -> Arg {
    let quoted = string_pair.into_inner().next().expect("string always wraps one quote form");
    let quote = match quoted.as_rule() {
        Rule::string_backtick => QuoteStyle::Backtick,
        Rule::string_single => QuoteStyle::Single,
        Rule::string_double => QuoteStyle::Double,
        other => unreachable!("unexpected string rule: {other:?}"),
    };
    let value = quoted
        .into_inner()
        .next()
        .map(|inner| inner.as_str().to_string())
        .unwrap_or_default();

    if matcher == MatcherName::HostRegexp && dialect == Dialect::V2 && template::looks_like_template(&value) {
        Arg::HostTemplate {
            segments: template::parse_template(&value),
            quote,
        }
    } else {
        Arg::plain(value, quote)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::ast::{Arg, RuleExpr};
    use crate::rule::schema::MatcherName;

    fn host(domain: &str) -> RuleExpr {
        RuleExpr::Matcher {
            name: MatcherName::Host,
            args: vec![Arg::plain(domain, QuoteStyle::Backtick)],
        }
    }

    fn path_prefix(path: &str) -> RuleExpr {
        RuleExpr::Matcher {
            name: MatcherName::PathPrefix,
            args: vec![Arg::plain(path, QuoteStyle::Backtick)],
        }
    }

    #[test]
    fn s1_parses_and_reprints_verbatim() {
        let input = "Host(`a.com`) && (PathPrefix(`/x`) || PathPrefix(`/y`))";
        let ast = parse(input, Dialect::V3).unwrap();
        let expected = RuleExpr::and(
            host("a.com"),
            RuleExpr::group(RuleExpr::or(path_prefix("/x"), path_prefix("/y"))),
        );
        assert_eq!(ast, expected);
        assert_eq!(ast.print(Dialect::V3), input);
    }

    #[test]
    fn s6_arity_mismatch_reports_offset_of_matcher_name() {
        let input = "Method()";
        let err = parse(input, Dialect::V3).unwrap_err();
        assert_eq!(
            err.kind,
            RuleParseErrorKind::ArityMismatch {
                name: "Method".to_string(),
                expected: "1..n".to_string(),
                got: 0,
            }
        );
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn method_with_two_args_parses() {
        let ast = parse("Method(`GET`, `POST`)", Dialect::V3).unwrap();
        assert_eq!(
            ast,
            RuleExpr::Matcher {
                name: MatcherName::Method,
                args: vec![
                    Arg::plain("GET", QuoteStyle::Backtick),
                    Arg::plain("POST", QuoteStyle::Backtick)
                ],
            }
        );
    }

    #[test]
    fn unknown_matcher_is_reported() {
        let err = parse("Bogus(`x`)", Dialect::V3).unwrap_err();
        assert_eq!(
            err.kind,
            RuleParseErrorKind::UnknownMatcher {
                name: "Bogus".to_string()
            }
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let err = parse("Host(`example.com)", Dialect::V3).unwrap_err();
        assert_eq!(err.kind, RuleParseErrorKind::UnterminatedString);
    }

    #[test]
    fn trailing_garbage_is_reported() {
        let err = parse("Host(`a.com`) extra", Dialect::V3).unwrap_err();
        assert_eq!(err.kind, RuleParseErrorKind::TrailingGarbage);
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let ast = parse("!Host(`a.com`) && Host(`b.com`)", Dialect::V3).unwrap();
        assert_eq!(ast, RuleExpr::and(RuleExpr::not(host("a.com")), host("b.com")));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let ast = parse(
            "Host(`a.com`) && Host(`b.com`) || Host(`c.com`)",
            Dialect::V3,
        )
        .unwrap();
        assert_eq!(
            ast,
            RuleExpr::or(RuleExpr::and(host("a.com"), host("b.com")), host("c.com"))
        );
    }

    #[test]
    fn v2_host_regexp_template_lowers_to_v3_regex() {
        let ast = parse("HostRegexp(`{sub:[a-z]+}.x`)", Dialect::V2).unwrap();
        assert_eq!(ast.print(Dialect::V3), r"HostRegexp(`(?P<sub>[a-z]+)\.x`)");
    }
}
