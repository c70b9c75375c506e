//! Inline predicate expressions.
//!
//! A small boolean language over message fields, compiled once when a subscription is
//! registered:
//!
//! ```text
//! ${header.region} == 'emea' && (${body} contains 'gold' || ${header.amount} >= 1000)
//! ```
//!
//! Operands are `${body}`, `${channel}`, `${id}`, `${header.NAME}` (or `${headers.NAME}`),
//! quoted strings, numbers, `true`, `false` and `null`. Comparisons are numeric when both
//! sides parse as numbers and textual otherwise. A missing header resolves to `null`.

use crate::error::{PredicateError, PredicateResolutionError};
use crate::message::Message;
use crate::routing::predicate::Predicate;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

/// Longest accepted expression source, in bytes.
const MAX_EXPRESSION_LEN: usize = 4096;
/// Deepest accepted nesting of parentheses and negations.
const MAX_NESTING_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Body,
    Channel,
    Id,
    Header(String),
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    In,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Op(Operator),
    Operand(Operand),
}

// Connective chains are flat so `a && b && ...` never deepens the tree.
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Not(Box<Node>),
    Compare {
        left: Operand,
        op: Operator,
        right: Operand,
    },
    NotContains {
        left: Operand,
        right: Operand,
    },
    Matches {
        operand: Operand,
        regex: Regex,
    },
    In {
        operand: Operand,
        values: Vec<String>,
    },
    Truthy(Operand),
}

/// A compiled inline expression. Immutable after [`Expression::compile`].
pub struct Expression {
    source: String,
    root: Node,
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Expression {
    pub fn compile(text: &str) -> Result<Self, PredicateResolutionError> {
        let parse_error = |reason: String| PredicateResolutionError::Parse {
            expression: text.to_string(),
            reason,
        };

        if text.len() > MAX_EXPRESSION_LEN {
            return Err(parse_error(format!(
                "expression is longer than {MAX_EXPRESSION_LEN} bytes"
            )));
        }

        let tokens = tokenize(text).map_err(parse_error)?;
        if tokens.is_empty() {
            return Err(parse_error("expression is empty".to_string()));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or().map_err(parse_error)?;
        if let Some(token) = parser.peek() {
            return Err(parse_error(format!("unexpected trailing token {token:?}")));
        }

        Ok(Self {
            source: text.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, message: &Message) -> bool {
        eval(&self.root, message)
    }
}

impl Predicate for Expression {
    fn evaluate(&self, message: &Message) -> Result<bool, PredicateError> {
        Ok(self.matches(message))
    }
}

fn keyword(word: &str) -> Result<Token, String> {
    let token = match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" => Token::Operand(Operand::Bool(true)),
        "false" => Token::Operand(Operand::Bool(false)),
        "null" => Token::Operand(Operand::Null),
        "contains" => Token::Op(Operator::Contains),
        "startsWith" => Token::Op(Operator::StartsWith),
        "endsWith" => Token::Op(Operator::EndsWith),
        "regex" => Token::Op(Operator::Regex),
        "in" => Token::Op(Operator::In),
        other => return Err(format!("unknown keyword '{other}'")),
    };
    Ok(token)
}

fn variable(name: &str) -> Result<Operand, String> {
    let name = name.trim();
    match name {
        "body" => return Ok(Operand::Body),
        "channel" => return Ok(Operand::Channel),
        "id" => return Ok(Operand::Id),
        _ => {}
    }

    let header = name
        .strip_prefix("header.")
        .or_else(|| name.strip_prefix("headers."));
    match header {
        Some(header) if !header.is_empty() => Ok(Operand::Header(header.to_string())),
        _ => Err(format!("unknown variable '${{{name}}}'")),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '$' => {
                if next != Some('{') {
                    return Err(format!("expected '{{' after '$' at position {i}"));
                }
                let start = i + 2;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '}')
                    .map(|offset| start + offset)
                    .ok_or_else(|| format!("unterminated variable at position {i}"))?;
                let name: String = chars[start..end].iter().collect();
                tokens.push(Token::Operand(variable(&name)?));
                i = end + 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut literal = String::new();
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None => return Err(format!("unterminated string at position {i}")),
                        Some('\\') if chars.get(j + 1) == Some(&quote) => {
                            literal.push(quote);
                            j += 2;
                        }
                        Some(ch) if *ch == quote => break,
                        Some(ch) => {
                            literal.push(*ch);
                            j += 1;
                        }
                    }
                }
                tokens.push(Token::Operand(Operand::Text(literal)));
                i = j + 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op(Operator::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op(Operator::Eq));
                i += 2;
            }
            '>' | '<' => {
                let inclusive = next == Some('=');
                let op = match (c, inclusive) {
                    ('>', true) => Operator::Ge,
                    ('>', false) => Operator::Gt,
                    (_, true) => Operator::Le,
                    (_, false) => Operator::Lt,
                };
                tokens.push(Token::Op(op));
                i += if inclusive { 2 } else { 1 };
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Operand(Operand::Number(number)));
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(keyword(&word)?);
            }
            other => return Err(format!("unexpected character '{other}' at position {i}")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(format!("nesting deeper than {MAX_NESTING_DEPTH} levels"));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Node, String> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Node::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Node, String> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Node::And(terms)
        })
    }

    fn parse_unary(&mut self) -> Result<Node, String> {
        if self.eat(&Token::Not) {
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, String> {
        if self.eat(&Token::LParen) {
            self.enter()?;
            let inner = self.parse_or()?;
            if !self.eat(&Token::RParen) {
                return Err("expected ')'".to_string());
            }
            self.depth -= 1;
            return Ok(inner);
        }

        let left = self.next_operand()?;
        match self.peek().cloned() {
            Some(Token::Op(op)) => {
                self.pos += 1;
                let right = self.next_operand()?;
                Self::comparison(left, op, right)
            }
            Some(Token::Not) if self.peek_at(1) == Some(&Token::Op(Operator::Contains)) => {
                self.pos += 2;
                let right = self.next_operand()?;
                Ok(Node::NotContains { left, right })
            }
            _ => Ok(Node::Truthy(left)),
        }
    }

    fn next_operand(&mut self) -> Result<Operand, String> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Operand(operand)) => {
                self.pos += 1;
                Ok(operand)
            }
            Some(token) => Err(format!("expected an operand, found {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn comparison(left: Operand, op: Operator, right: Operand) -> Result<Node, String> {
        match op {
            Operator::Regex => {
                let Operand::Text(pattern) = right else {
                    return Err("regex requires a quoted pattern".to_string());
                };
                let regex = Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|err| format!("invalid regex '{pattern}': {err}"))?;
                Ok(Node::Matches {
                    operand: left,
                    regex,
                })
            }
            Operator::In => {
                let Operand::Text(list) = right else {
                    return Err("in requires a quoted, comma-separated list".to_string());
                };
                let values = list.split(',').map(|item| item.trim().to_string()).collect();
                Ok(Node::In {
                    operand: left,
                    values,
                })
            }
            _ => Ok(Node::Compare { left, op, right }),
        }
    }
}

#[derive(Debug)]
enum Value<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Text(Cow<'a, str>),
}

impl Value<'_> {
    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Bool(flag) => Some(Cow::Owned(flag.to_string())),
            Value::Number(number) => Some(Cow::Owned(number.to_string())),
            Value::Text(text) => Some(Cow::Borrowed(text.as_ref())),
        }
    }
}

fn resolve<'a>(operand: &'a Operand, message: &'a Message) -> Value<'a> {
    match operand {
        Operand::Body => Value::Text(Cow::Borrowed(message.body())),
        Operand::Channel => Value::Text(Cow::Borrowed(message.channel())),
        Operand::Id => Value::Text(Cow::Owned(message.id().hyphenated().to_string())),
        Operand::Header(name) => message
            .header(name)
            .map(|value| Value::Text(Cow::Borrowed(value)))
            .unwrap_or(Value::Null),
        Operand::Text(text) => Value::Text(Cow::Borrowed(text.as_str())),
        Operand::Number(number) => Value::Number(*number),
        Operand::Bool(flag) => Value::Bool(*flag),
        Operand::Null => Value::Null,
    }
}

fn equals(left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => other
            .as_text()
            .is_some_and(|text| text.eq_ignore_ascii_case(&flag.to_string())),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => left.as_text() == right.as_text(),
        },
    }
}

fn ordering(left: &Value<'_>, right: &Value<'_>) -> Option<Ordering> {
    if matches!(left, Value::Null) || matches!(right, Value::Null) {
        return None;
    }
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.as_text()?.as_ref().cmp(right.as_text()?.as_ref())),
    }
}

fn text_test(left: &Value<'_>, right: &Value<'_>, test: fn(&str, &str) -> bool) -> bool {
    match (left.as_text(), right.as_text()) {
        (Some(l), Some(r)) => test(&l, &r),
        _ => false,
    }
}

fn eval(node: &Node, message: &Message) -> bool {
    match node {
        Node::Or(terms) => terms.iter().any(|term| eval(term, message)),
        Node::And(terms) => terms.iter().all(|term| eval(term, message)),
        Node::Not(inner) => !eval(inner, message),
        Node::Compare { left, op, right } => {
            let l = resolve(left, message);
            let r = resolve(right, message);
            match op {
                Operator::Eq => equals(&l, &r),
                Operator::Ne => !equals(&l, &r),
                Operator::Gt => ordering(&l, &r) == Some(Ordering::Greater),
                Operator::Ge => matches!(
                    ordering(&l, &r),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                Operator::Lt => ordering(&l, &r) == Some(Ordering::Less),
                Operator::Le => {
                    matches!(ordering(&l, &r), Some(Ordering::Less | Ordering::Equal))
                }
                Operator::Contains => text_test(&l, &r, |a, b| a.contains(b)),
                Operator::StartsWith => text_test(&l, &r, |a, b| a.starts_with(b)),
                Operator::EndsWith => text_test(&l, &r, |a, b| a.ends_with(b)),
                // Regex and In are lowered into dedicated nodes by the parser.
                Operator::Regex | Operator::In => false,
            }
        }
        Node::NotContains { left, right } => {
            let l = resolve(left, message);
            let r = resolve(right, message);
            !text_test(&l, &r, |a, b| a.contains(b))
        }
        Node::Matches { operand, regex } => resolve(operand, message)
            .as_text()
            .is_some_and(|text| regex.is_match(&text)),
        Node::In { operand, values } => resolve(operand, message)
            .as_text()
            .is_some_and(|text| values.iter().any(|value| value == text.trim())),
        Node::Truthy(operand) => match resolve(operand, message) {
            Value::Bool(flag) => flag,
            Value::Text(text) => text.trim().eq_ignore_ascii_case("true"),
            Value::Number(_) | Value::Null => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{Expression, MAX_EXPRESSION_LEN, MAX_NESTING_DEPTH};
    use crate::error::PredicateResolutionError;
    use crate::message::Message;

    fn order() -> Message {
        Message::new("orders", "customer=gold;items=3")
            .with_header("region", "emea")
            .with_header("amount", "1500")
            .with_header("express", "TRUE")
    }

    fn check(expression: &str) -> bool {
        Expression::compile(expression)
            .unwrap_or_else(|err| panic!("'{expression}' should compile: {err}"))
            .matches(&order())
    }

    #[test]
    fn header_equality_and_inequality() {
        assert!(check("${header.region} == 'emea'"));
        assert!(check("${headers.region} != \"apac\""));
        assert!(!check("${header.region} == 'apac'"));
    }

    #[test]
    fn numeric_comparison_when_both_sides_are_numbers() {
        assert!(check("${header.amount} > 999"));
        assert!(check("${header.amount} >= 1500"));
        assert!(check("${header.amount} == 1500.0"));
        assert!(!check("${header.amount} < 10"));
    }

    #[test]
    fn text_operators_on_body() {
        assert!(check("${body} contains 'gold'"));
        assert!(check("${body} not contains 'silver'"));
        assert!(check("${body} startsWith 'customer'"));
        assert!(check("${body} endsWith 'items=3'"));
        assert!(check("${body} regex 'customer=\\w+;items=\\d+'"));
        assert!(!check("${body} regex 'gold'"));
    }

    #[test]
    fn in_operator_checks_list_membership() {
        assert!(check("${header.region} in 'apac, emea,amer'"));
        assert!(!check("${header.region} in 'apac,amer'"));
    }

    #[test]
    fn boolean_connectives_and_grouping() {
        assert!(check(
            "${header.region} == 'emea' && (${header.amount} < 10 || ${body} contains 'gold')"
        ));
        assert!(check("not ${header.region} == 'apac' and ${channel} == 'orders'"));
        assert!(!check("!(${header.region} == 'emea')"));
    }

    #[test]
    fn missing_header_resolves_to_null() {
        assert!(check("${header.missing} == null"));
        assert!(!check("${header.missing} == 'x'"));
        assert!(!check("${header.missing} > 1"));
        assert!(!check("${header.missing} contains 'x'"));
    }

    #[test]
    fn bare_operand_is_truthy_only_for_true() {
        assert!(check("${header.express}"));
        assert!(check("${header.express} == true"));
        assert!(!check("${header.region}"));
        assert!(!check("${header.missing}"));
    }

    #[test]
    fn compile_errors_are_reported_as_parse_failures() {
        let oversized_parens = format!("{}true{}", "(".repeat(20_000), ")".repeat(20_000));
        let oversized_negation = format!("{}true", "!".repeat(20_000));
        let too_deep = format!(
            "{}true{}",
            "(".repeat(MAX_NESTING_DEPTH + 1),
            ")".repeat(MAX_NESTING_DEPTH + 1)
        );
        let too_deep_negation = format!("{}true", "!".repeat(MAX_NESTING_DEPTH + 1));
        let oversized_chain = vec!["true"; MAX_EXPRESSION_LEN].join(" && ");

        for broken in [
            "",
            "${header.region} ==",
            "${nope} == 1",
            "${header.region} == 'unterminated",
            "(${body} contains 'x'",
            "${body} regex '('",
            "${body} contains 'x' 'y'",
            "${body} like 'x'",
            oversized_parens.as_str(),
            oversized_negation.as_str(),
            too_deep.as_str(),
            too_deep_negation.as_str(),
            oversized_chain.as_str(),
        ] {
            match Expression::compile(broken) {
                Err(PredicateResolutionError::Parse { expression, .. }) => {
                    assert_eq!(expression, broken)
                }
                other => panic!("'{broken}' should fail to compile, got {other:?}"),
            }
        }
    }

    #[test]
    fn nesting_and_chains_within_limits_compile() {
        assert!(check(&format!(
            "{}${{header.region}} == 'emea'{}",
            "(".repeat(MAX_NESTING_DEPTH),
            ")".repeat(MAX_NESTING_DEPTH)
        )));
        assert!(check(&format!("{}true", "!".repeat(MAX_NESTING_DEPTH))));

        let chain = vec!["${header.region} == 'emea'"; 100].join(" && ");
        assert!(chain.len() <= MAX_EXPRESSION_LEN);
        assert!(check(&chain));
        assert!(!check(&format!("{chain} && false")));
    }
}
