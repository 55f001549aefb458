//! Environment markers
//!
//! Parses the condition after `;` in a requirement string (for example
//! `python_version < "3.11" and sys_platform == "win32"`) into a small AST and
//! evaluates it against the marker environment reported by the target
//! interpreter.

use super::version::Version;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    #[error("Unexpected end of marker, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("Unexpected token '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        position: usize,
        expected: &'static str,
    },

    #[error("Unknown marker variable '{0}'")]
    UnknownVariable(String),

    #[error("Unterminated string at position {0}")]
    UnterminatedString(usize),

    #[error("Comparison between two literals or two variables: '{0}'")]
    InvalidComparison(String),
}

/// Marker variables defined by PEP 508
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVariable {
    ImplementationName,
    ImplementationVersion,
    OsName,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PythonFullVersion,
    PythonVersion,
    SysPlatform,
    Extra,
}

impl MarkerVariable {
    fn from_name(name: &str) -> Option<Self> {
        let variable = match name {
            "implementation_name" => Self::ImplementationName,
            "implementation_version" => Self::ImplementationVersion,
            "os_name" | "os.name" => Self::OsName,
            "platform_machine" | "platform.machine" => Self::PlatformMachine,
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => Self::PlatformPythonImplementation,
            "platform_release" => Self::PlatformRelease,
            "platform_system" => Self::PlatformSystem,
            "platform_version" | "platform.version" => Self::PlatformVersion,
            "python_full_version" => Self::PythonFullVersion,
            "python_version" => Self::PythonVersion,
            "sys_platform" | "sys.platform" => Self::SysPlatform,
            "extra" => Self::Extra,
            _ => return None,
        };
        Some(variable)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ImplementationName => "implementation_name",
            Self::ImplementationVersion => "implementation_version",
            Self::OsName => "os_name",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::PlatformRelease => "platform_release",
            Self::PlatformSystem => "platform_system",
            Self::PlatformVersion => "platform_version",
            Self::PythonFullVersion => "python_full_version",
            Self::PythonVersion => "python_version",
            Self::SysPlatform => "sys_platform",
            Self::Extra => "extra",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Compatible,
    ArbitraryEqual,
    In,
    NotIn,
}

impl MarkerOperator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::Compatible => "~=",
            Self::ArbitraryEqual => "===",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Parsed marker expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTree {
    Expression {
        lhs: MarkerValue,
        op: MarkerOperator,
        rhs: MarkerValue,
    },
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(var) => write!(f, "{}", var.as_str()),
            MarkerValue::Literal(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::Expression { lhs, op, rhs } => {
                write!(f, "{} {} {}", lhs, op.as_str(), rhs)
            }
            MarkerTree::And(children) => write_joined(f, children, " and "),
            MarkerTree::Or(children) => write_joined(f, children, " or "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[MarkerTree], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match child {
            MarkerTree::Expression { .. } => write!(f, "{}", child)?,
            _ => write!(f, "({})", child)?,
        }
    }
    Ok(())
}

/// Decides whether a marker holds in some environment.
///
/// Graph construction only depends on this boolean answer, not on how the
/// environment was obtained.
pub trait MarkerEvaluator {
    fn evaluate(&self, marker: &MarkerTree) -> bool;
}

/// Marker variable values for one interpreter.
///
/// Deserialized from the interpreter probe; field names match PEP 508.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MarkerEnvironment {
    #[serde(default)]
    pub implementation_name: String,
    #[serde(default)]
    pub implementation_version: String,
    #[serde(default)]
    pub os_name: String,
    #[serde(default)]
    pub platform_machine: String,
    #[serde(default)]
    pub platform_python_implementation: String,
    #[serde(default)]
    pub platform_release: String,
    #[serde(default)]
    pub platform_system: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub python_full_version: String,
    #[serde(default)]
    pub python_version: String,
    #[serde(default)]
    pub sys_platform: String,
}

impl MarkerEnvironment {
    fn get(&self, variable: MarkerVariable) -> &str {
        match variable {
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::SysPlatform => &self.sys_platform,
            // Installed environments are evaluated with no extras requested
            MarkerVariable::Extra => "",
        }
    }

    fn resolve<'a>(&'a self, value: &'a MarkerValue) -> &'a str {
        match value {
            MarkerValue::Variable(var) => self.get(*var),
            MarkerValue::Literal(s) => s,
        }
    }
}

impl MarkerEvaluator for MarkerEnvironment {
    fn evaluate(&self, marker: &MarkerTree) -> bool {
        match marker {
            MarkerTree::Expression { lhs, op, rhs } => {
                compare(self.resolve(lhs), *op, self.resolve(rhs))
            }
            MarkerTree::And(children) => children.iter().all(|c| self.evaluate(c)),
            MarkerTree::Or(children) => children.iter().any(|c| self.evaluate(c)),
        }
    }
}

/// Apply a marker operator, preferring version semantics when both sides parse
fn compare(lhs: &str, op: MarkerOperator, rhs: &str) -> bool {
    match op {
        MarkerOperator::In => return rhs.contains(lhs),
        MarkerOperator::NotIn => return !rhs.contains(lhs),
        MarkerOperator::ArbitraryEqual => return lhs == rhs,
        _ => {}
    }

    if let Some(result) = compare_versions(lhs, op, rhs) {
        return result;
    }

    let ordering = lhs.cmp(rhs);
    match op {
        MarkerOperator::Equal => ordering == Ordering::Equal,
        MarkerOperator::NotEqual => ordering != Ordering::Equal,
        MarkerOperator::LessThan => ordering == Ordering::Less,
        MarkerOperator::LessEqual => ordering != Ordering::Greater,
        MarkerOperator::GreaterThan => ordering == Ordering::Greater,
        MarkerOperator::GreaterEqual => ordering != Ordering::Less,
        // `~=` has no meaning outside versions
        MarkerOperator::Compatible => false,
        MarkerOperator::ArbitraryEqual | MarkerOperator::In | MarkerOperator::NotIn => false,
    }
}

/// Version comparison; `None` when either side is not a version
fn compare_versions(lhs: &str, op: MarkerOperator, rhs: &str) -> Option<bool> {
    let candidate: Version = lhs.parse().ok()?;

    if let Some(prefix) = rhs.strip_suffix(".*") {
        let prefix: Version = prefix.parse().ok()?;
        let matches = candidate
            .release()
            .iter()
            .chain(std::iter::repeat(&0))
            .zip(prefix.release())
            .all(|(a, b)| a == b);
        return match op {
            MarkerOperator::Equal => Some(matches),
            MarkerOperator::NotEqual => Some(!matches),
            _ => None,
        };
    }

    let spec: Version = rhs.parse().ok()?;
    let ordering = candidate.cmp_public(&spec);
    let result = match op {
        MarkerOperator::Equal => {
            // A local label on the right must match exactly
            ordering == Ordering::Equal && (!spec.has_local() || candidate == spec)
        }
        MarkerOperator::NotEqual => {
            !(ordering == Ordering::Equal && (!spec.has_local() || candidate == spec))
        }
        MarkerOperator::LessThan => ordering == Ordering::Less,
        MarkerOperator::LessEqual => ordering != Ordering::Greater,
        MarkerOperator::GreaterThan => ordering == Ordering::Greater,
        MarkerOperator::GreaterEqual => ordering != Ordering::Less,
        MarkerOperator::Compatible => {
            let release = spec.release();
            if release.len() < 2 {
                return None;
            }
            let prefix = &release[..release.len() - 1];
            let prefix_matches = candidate
                .release()
                .iter()
                .chain(std::iter::repeat(&0))
                .zip(prefix)
                .all(|(a, b)| a == b);
            ordering != Ordering::Less && prefix_matches
        }
        MarkerOperator::ArbitraryEqual | MarkerOperator::In | MarkerOperator::NotIn => {
            return None;
        }
    };
    Some(result)
}

/// Parse a marker expression
pub fn parse_marker(input: &str) -> Result<MarkerTree, MarkerError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let tree = parser.parse_or()?;
    match parser.peek() {
        None => Ok(tree),
        Some((token, position)) => Err(MarkerError::UnexpectedToken {
            found: token.to_string(),
            position,
            expected: "end of marker",
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Op(s) => write!(f, "{}", s),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

const COMPARISON_OPS: [&str; 8] = ["===", "==", "!=", "<=", ">=", "~=", "<", ">"];

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, MarkerError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let c = bytes[i] as char;
        match c {
            '(' => {
                tokens.push((Token::LParen, i));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, i));
                i += 1;
            }
            '\'' | '"' => {
                let start = i;
                let rest = &input[i + 1..];
                let end = rest.find(c).ok_or(MarkerError::UnterminatedString(start))?;
                tokens.push((Token::Str(rest[..end].to_string()), start));
                i += end + 2;
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                tokens.push((Token::Ident(input[start..i].to_string()), start));
            }
            _ => {
                let rest = &input[i..];
                let op = COMPARISON_OPS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| MarkerError::UnexpectedToken {
                        found: rest.chars().next().map(String::from).unwrap_or_default(),
                        position: i,
                        expected: "marker token",
                    })?;
                tokens.push((Token::Op(op), i));
                i += op.len();
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, p)| (t, *p))
    }

    fn next(&mut self, expected: &'static str) -> Result<(Token, usize), MarkerError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(MarkerError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some((Token::Ident(s), _)) if s == keyword)
    }

    fn parse_or(&mut self) -> Result<MarkerTree, MarkerError> {
        let mut children = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.pos += 1;
            children.push(self.parse_and()?);
        }
        Ok(flatten(children, MarkerTree::Or))
    }

    fn parse_and(&mut self) -> Result<MarkerTree, MarkerError> {
        let mut children = vec![self.parse_atom()?];
        while self.peek_keyword("and") {
            self.pos += 1;
            children.push(self.parse_atom()?);
        }
        Ok(flatten(children, MarkerTree::And))
    }

    fn parse_atom(&mut self) -> Result<MarkerTree, MarkerError> {
        if let Some((Token::LParen, _)) = self.peek() {
            self.pos += 1;
            let inner = self.parse_or()?;
            match self.next("')'")? {
                (Token::RParen, _) => return Ok(inner),
                (token, position) => {
                    return Err(MarkerError::UnexpectedToken {
                        found: token.to_string(),
                        position,
                        expected: "')'",
                    });
                }
            }
        }

        let lhs = self.parse_value()?;
        let op = self.parse_operator()?;
        let rhs = self.parse_value()?;

        let both_literals = matches!(
            (&lhs, &rhs),
            (MarkerValue::Literal(_), MarkerValue::Literal(_))
        );
        let both_variables = matches!(
            (&lhs, &rhs),
            (MarkerValue::Variable(_), MarkerValue::Variable(_))
        );
        if both_literals || both_variables {
            return Err(MarkerError::InvalidComparison(format!(
                "{} {} {}",
                lhs,
                op.as_str(),
                rhs
            )));
        }

        Ok(MarkerTree::Expression { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, MarkerError> {
        match self.next("marker variable or string")? {
            (Token::Str(s), _) => Ok(MarkerValue::Literal(s)),
            (Token::Ident(name), _) => MarkerVariable::from_name(&name)
                .map(MarkerValue::Variable)
                .ok_or(MarkerError::UnknownVariable(name)),
            (token, position) => Err(MarkerError::UnexpectedToken {
                found: token.to_string(),
                position,
                expected: "marker variable or string",
            }),
        }
    }

    fn parse_operator(&mut self) -> Result<MarkerOperator, MarkerError> {
        let expected = "marker operator";
        let (token, position) = self.next(expected)?;
        let op = match &token {
            Token::Op(op) => match *op {
                "===" => MarkerOperator::ArbitraryEqual,
                "==" => MarkerOperator::Equal,
                "!=" => MarkerOperator::NotEqual,
                "<=" => MarkerOperator::LessEqual,
                ">=" => MarkerOperator::GreaterEqual,
                "~=" => MarkerOperator::Compatible,
                "<" => MarkerOperator::LessThan,
                _ => MarkerOperator::GreaterThan,
            },
            Token::Ident(s) if s == "in" => MarkerOperator::In,
            Token::Ident(s) if s == "not" => match self.next("'in'")? {
                (Token::Ident(s), _) if s == "in" => MarkerOperator::NotIn,
                (token, position) => {
                    return Err(MarkerError::UnexpectedToken {
                        found: token.to_string(),
                        position,
                        expected: "'in'",
                    });
                }
            },
            _ => {
                return Err(MarkerError::UnexpectedToken {
                    found: token.to_string(),
                    position,
                    expected,
                });
            }
        };
        Ok(op)
    }
}

fn flatten(mut children: Vec<MarkerTree>, wrap: fn(Vec<MarkerTree>) -> MarkerTree) -> MarkerTree {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}
