//! Arithmetic and logical expressions over the variables bound in a
//! generation context.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! ternary    := or ( "?" ternary ":" ternary )?
//! or         := and ( ("||" | "or") and )*
//! and        := equality ( ("&&" | "and") equality )*
//! equality   := compare ( ("==" | "!=" | "eq" | "ne") compare )*
//! compare    := additive ( ("<" | "<=" | ">" | ">=") additive )*
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/" | "%") unary )*
//! unary      := ("!" | "not" | "-") unary | postfix
//! postfix    := primary ( "." ident )*
//! primary    := number | string | "true" | "false" | "null" | ident | "(" ternary ")"
//! ```
//!
//! Integer arithmetic stays integral while exact and widens to floating point
//! on overflow or inexact division. `+` concatenates when either side is text.

use thiserror::Error;

use crate::value::{GeneratedValue, Record};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },
    #[error("expression nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot apply '{op}' to {operand}")]
    InvalidOperand { op: &'static str, operand: &'static str },
    #[error("division by zero")]
    DivisionByZero,
}

type Result<T> = std::result::Result<T, ExpressionError>;

/// A parsed expression, ready to evaluate against any set of bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            position: 0,
            depth: 0,
        };
        let root = parser.ternary()?;
        parser.expect_end()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, vars: &Record) -> Result<GeneratedValue> {
        eval(&self.root, vars)
    }
}

/// Parses and evaluates `source` in one step.
pub fn evaluate(source: &str, vars: &Record) -> Result<GeneratedValue> {
    Expression::parse(source)?.evaluate(vars)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(GeneratedValue),
    Str(String),
    Ident(String),
    Symbol(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => format!("number {}", value.render()),
            Token::Str(text) => format!("string '{text}'"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Symbol(symbol) => format!("'{symbol}'"),
        }
    }
}

const SYMBOLS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "(", ")", "?", ":", ".", "!",
    "<", ">",
];

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        let Some(current) = rest.chars().next() else {
            break;
        };

        if current.is_whitespace() {
            offset += current.len_utf8();
            continue;
        }

        if current.is_ascii_digit() {
            let (token, length) = number(rest, offset)?;
            tokens.push((token, offset));
            offset += length;
            continue;
        }

        if current == '\'' || current == '"' {
            let start = offset;
            let mut text = String::new();
            let mut chars = rest.char_indices().skip(1);
            let mut closed = None;
            while let Some((index, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                        }
                    }
                    ch if ch == current => {
                        closed = Some(index + ch.len_utf8());
                        break;
                    }
                    ch => text.push(ch),
                }
            }
            let Some(length) = closed else {
                return Err(ExpressionError::UnterminatedString { offset: start });
            };
            tokens.push((Token::Str(text), start));
            offset += length;
            continue;
        }

        if current.is_alphabetic() || current == '_' || current == '$' {
            let length = rest
                .char_indices()
                .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '$'))
                .map(|(index, _)| index)
                .unwrap_or(rest.len());
            tokens.push((Token::Ident(rest[..length].to_string()), offset));
            offset += length;
            continue;
        }

        match SYMBOLS.iter().find(|symbol| rest.starts_with(**symbol)) {
            Some(symbol) => {
                tokens.push((Token::Symbol(*symbol), offset));
                offset += symbol.len();
            }
            None => {
                return Err(ExpressionError::UnexpectedChar {
                    found: current,
                    offset,
                });
            }
        }
    }

    Ok(tokens)
}

fn number(rest: &str, offset: usize) -> Result<(Token, usize)> {
    let bytes = rest.as_bytes();
    let mut length = 0;
    let mut fractional = false;
    while length < bytes.len() && bytes[length].is_ascii_digit() {
        length += 1;
    }
    if length + 1 < bytes.len() && bytes[length] == b'.' && bytes[length + 1].is_ascii_digit() {
        fractional = true;
        length += 1;
        while length < bytes.len() && bytes[length].is_ascii_digit() {
            length += 1;
        }
    }
    if length < bytes.len() && matches!(bytes[length], b'e' | b'E') {
        let mut exponent = length + 1;
        if exponent < bytes.len() && matches!(bytes[exponent], b'+' | b'-') {
            exponent += 1;
        }
        if exponent < bytes.len() && bytes[exponent].is_ascii_digit() {
            fractional = true;
            length = exponent;
            while length < bytes.len() && bytes[length].is_ascii_digit() {
                length += 1;
            }
        }
    }

    let text = &rest[..length];
    let invalid = || ExpressionError::InvalidNumber {
        text: text.to_string(),
        offset,
    };
    let value = if fractional {
        GeneratedValue::Float(text.parse().map_err(|_| invalid())?)
    } else {
        match text.parse::<i64>() {
            Ok(value) => GeneratedValue::Int(value),
            Err(_) => GeneratedValue::Float(text.parse().map_err(|_| invalid())?),
        }
    };
    Ok((Token::Number(value), length))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(GeneratedValue),
    Var(String),
    Field(Box<Expr>, String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|(_, offset)| *offset)
            .unwrap_or(0)
    }

    fn unexpected(&self, expected: &'static str) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            found: self
                .peek()
                .map(Token::describe)
                .unwrap_or_else(|| "end of input".to_string()),
            expected,
            offset: self.offset(),
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of input")),
        }
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(found)) if *found == symbol) {
            self.position += 1;
            return true;
        }
        false
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(found)) if found == word) {
            self.position += 1;
            return true;
        }
        false
    }

    /// Consumes the first operator of `table` present at the cursor.
    fn operator(&mut self, table: &[(&str, Option<&str>, BinaryOp)]) -> Option<BinaryOp> {
        table.iter().find_map(|(symbol, word, op)| {
            if self.eat_symbol(symbol) || word.is_some_and(|word| self.eat_word(word)) {
                Some(*op)
            } else {
                None
            }
        })
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn ternary(&mut self) -> Result<Expr> {
        self.nested(|parser| {
            let condition = parser.binary(0)?;
            if !parser.eat_symbol("?") {
                return Ok(condition);
            }
            let when_true = parser.ternary()?;
            if !parser.eat_symbol(":") {
                return Err(parser.unexpected("':'"));
            }
            let when_false = parser.ternary()?;
            Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(when_true),
                Box::new(when_false),
            ))
        })
    }

    fn binary(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[(&str, Option<&str>, BinaryOp)]] = &[
            &[("||", Some("or"), BinaryOp::Or)],
            &[("&&", Some("and"), BinaryOp::And)],
            &[
                ("==", Some("eq"), BinaryOp::Eq),
                ("!=", Some("ne"), BinaryOp::Ne),
            ],
            &[
                ("<=", None, BinaryOp::Le),
                (">=", None, BinaryOp::Ge),
                ("<", None, BinaryOp::Lt),
                (">", None, BinaryOp::Gt),
            ],
            &[("+", None, BinaryOp::Add), ("-", None, BinaryOp::Sub)],
            &[
                ("*", None, BinaryOp::Mul),
                ("/", None, BinaryOp::Div),
                ("%", None, BinaryOp::Rem),
            ],
        ];

        let Some(table) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.operator(table) {
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_symbol("!") || self.eat_word("not") {
            return self.nested(|parser| Ok(Expr::Not(Box::new(parser.unary()?))));
        }
        if self.eat_symbol("-") {
            return self.nested(|parser| Ok(Expr::Neg(Box::new(parser.unary()?))));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while self.eat_symbol(".") {
            match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.position += 1;
                    expr = Expr::Field(Box::new(expr), name);
                }
                _ => return Err(self.unexpected("field name")),
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("a value"));
        };
        match token {
            Token::Number(value) => {
                self.position += 1;
                Ok(Expr::Literal(value))
            }
            Token::Str(text) => {
                self.position += 1;
                Ok(Expr::Literal(GeneratedValue::Text(text)))
            }
            Token::Ident(name) => {
                self.position += 1;
                Ok(match name.as_str() {
                    "true" => Expr::Literal(GeneratedValue::Bool(true)),
                    "false" => Expr::Literal(GeneratedValue::Bool(false)),
                    "null" => Expr::Literal(GeneratedValue::Null),
                    _ => Expr::Var(name),
                })
            }
            Token::Symbol("(") => {
                self.position += 1;
                let inner = self.ternary()?;
                if !self.eat_symbol(")") {
                    return Err(self.unexpected("')'"));
                }
                Ok(inner)
            }
            Token::Symbol(_) => Err(self.unexpected("a value")),
        }
    }
}

fn eval(expr: &Expr, vars: &Record) -> Result<GeneratedValue> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownVariable(name.clone())),
        Expr::Field(target, name) => match eval(target, vars)? {
            GeneratedValue::Record(fields) => {
                Ok(fields.get(name).cloned().unwrap_or(GeneratedValue::Null))
            }
            GeneratedValue::Null => Ok(GeneratedValue::Null),
            other => Err(ExpressionError::InvalidOperand {
                op: ".",
                operand: kind(&other),
            }),
        },
        Expr::Not(inner) => Ok(GeneratedValue::Bool(!truthy(&eval(inner, vars)?))),
        Expr::Neg(inner) => match eval(inner, vars)? {
            GeneratedValue::Int(value) => Ok(value
                .checked_neg()
                .map(GeneratedValue::Int)
                .unwrap_or(GeneratedValue::Float(-(value as f64)))),
            GeneratedValue::Float(value) => Ok(GeneratedValue::Float(-value)),
            other => Err(ExpressionError::InvalidOperand {
                op: "-",
                operand: kind(&other),
            }),
        },
        Expr::Ternary(condition, when_true, when_false) => {
            if truthy(&eval(condition, vars)?) {
                eval(when_true, vars)
            } else {
                eval(when_false, vars)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => Ok(GeneratedValue::Bool(
            truthy(&eval(left, vars)?) || truthy(&eval(right, vars)?),
        )),
        Expr::Binary(BinaryOp::And, left, right) => Ok(GeneratedValue::Bool(
            truthy(&eval(left, vars)?) && truthy(&eval(right, vars)?),
        )),
        Expr::Binary(op, left, right) => {
            let left = eval(left, vars)?;
            let right = eval(right, vars)?;
            apply(*op, left, right)
        }
    }
}

fn apply(op: BinaryOp, left: GeneratedValue, right: GeneratedValue) -> Result<GeneratedValue> {
    use GeneratedValue::{Bool, Int, Text};

    match op {
        BinaryOp::Eq => return Ok(Bool(equals(&left, &right))),
        BinaryOp::Ne => return Ok(Bool(!equals(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(op, &left, &right))?;
            return Ok(Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }));
        }
        BinaryOp::Add if is_textual(&left) || is_textual(&right) => {
            return Ok(Text(format!("{}{}", left.render(), right.render())));
        }
        _ => {}
    }

    match (&left, &right) {
        (Int(a), Int(b)) => {
            let (a, b) = (*a, *b);
            let exact = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div if b == 0 => return Err(ExpressionError::DivisionByZero),
                BinaryOp::Div if a.checked_rem(b) == Some(0) => a.checked_div(b),
                BinaryOp::Div => None,
                BinaryOp::Rem if b == 0 => return Err(ExpressionError::DivisionByZero),
                BinaryOp::Rem => a.checked_rem(b),
                _ => None,
            };
            match exact {
                Some(value) => Ok(Int(value)),
                None => float_op(op, a as f64, b as f64),
            }
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_op(op, a, b),
            _ => Err(mismatch(op, &left, &right)),
        },
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<GeneratedValue> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Err(ExpressionError::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => {
            return Err(ExpressionError::TypeMismatch {
                op: op.symbol(),
                left: "number",
                right: "number",
            });
        }
    };
    Ok(GeneratedValue::Float(value))
}

fn mismatch(op: BinaryOp, left: &GeneratedValue, right: &GeneratedValue) -> ExpressionError {
    ExpressionError::TypeMismatch {
        op: op.symbol(),
        left: kind(left),
        right: kind(right),
    }
}

fn is_textual(value: &GeneratedValue) -> bool {
    matches!(
        value,
        GeneratedValue::Text(_) | GeneratedValue::Uuid(_) | GeneratedValue::Timestamp(_)
    )
}

fn equals(left: &GeneratedValue, right: &GeneratedValue) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ if is_textual(left) && is_textual(right) => left.render() == right.render(),
        _ => left == right,
    }
}

fn compare(left: &GeneratedValue, right: &GeneratedValue) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (GeneratedValue::Int(a), GeneratedValue::Int(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ if is_textual(left) && is_textual(right) => Some(left.render().cmp(&right.render())),
            _ => None,
        },
    }
}

fn truthy(value: &GeneratedValue) -> bool {
    match value {
        GeneratedValue::Null => false,
        GeneratedValue::Bool(value) => *value,
        GeneratedValue::Int(value) => *value != 0,
        GeneratedValue::Float(value) => *value != 0.0,
        GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => !value.is_empty(),
        GeneratedValue::Timestamp(_) => true,
        GeneratedValue::List(items) => !items.is_empty(),
        GeneratedValue::Record(fields) => !fields.is_empty(),
    }
}

fn kind(value: &GeneratedValue) -> &'static str {
    match value {
        GeneratedValue::Null => "null",
        GeneratedValue::Bool(_) => "boolean",
        GeneratedValue::Int(_) | GeneratedValue::Float(_) => "number",
        GeneratedValue::Text(_) | GeneratedValue::Uuid(_) | GeneratedValue::Timestamp(_) => "string",
        GeneratedValue::List(_) => "array",
        GeneratedValue::Record(_) => "object",
    }
}
