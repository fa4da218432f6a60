//! Small expression language used for clip geometry in scene descriptions.
//!
//! Integer and float arithmetic, comparisons, boolean logic, a conditional operator and a handful
//! of rounding functions, evaluated against named integer parameters:
//!
//! ```
//! use pixmines_stage::{Params, eval_int};
//!
//! let params = Params::new().with("w", 8).with("i", 10);
//! assert_eq!(eval_int("55+floor(i/w)*16", &params), Ok(71));
//! ```

use std::cmp::Ordering;
use std::fmt;

use hashbrown::HashMap;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {at}")]
    UnexpectedChar { ch: char, at: usize },
    #[error("unexpected '{token}' at offset {at}")]
    UnexpectedToken { token: String, at: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{name}() expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("'{op}' cannot be applied to {found}")]
    TypeMismatch { op: String, found: &'static str },
    #[error("{0} is not an integer")]
    NotAnInteger(String),
    #[error("{0} is out of range")]
    OutOfRange(i64),
}

type Result<T> = std::result::Result<T, ExprError>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    fn type_name(self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
        }
    }

    fn mismatch(self, op: &str) -> ExprError {
        ExprError::TypeMismatch {
            op: op.to_owned(),
            found: self.type_name(),
        }
    }

    fn as_bool(self, op: &str) -> Result<bool> {
        match self {
            Self::Bool(value) => Ok(value),
            other => Err(other.mismatch(op)),
        }
    }

    fn as_f64(self, op: &str) -> Result<f64> {
        match self {
            Self::Int(value) => Ok(value as f64),
            Self::Float(value) => Ok(value),
            other => Err(other.mismatch(op)),
        }
    }

    /// `None` when either side is NaN.
    fn ordering(self, rhs: Value, op: &str) -> Result<Option<Ordering>> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Some(a.cmp(&b))),
            _ => Ok(self.as_f64(op)?.partial_cmp(&rhs.as_f64(op)?)),
        }
    }

    fn equals(self, rhs: Value, op: &str) -> Result<bool> {
        match (self, rhs) {
            (Self::Bool(a), Self::Bool(b)) => Ok(a == b),
            (Self::Bool(_), _) | (_, Self::Bool(_)) => Err(self.mismatch(op)),
            _ => Ok(self.ordering(rhs, op)? == Some(Ordering::Equal)),
        }
    }

    /// Integers pass through; floats only when they have no fractional part.
    pub fn to_int(self) -> Result<i64> {
        match self {
            Self::Int(value) => Ok(value),
            Self::Float(value)
                if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
            {
                Ok(value as i64)
            }
            other => Err(ExprError::NotAnInteger(other.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// Named integer parameters visible to expressions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, i64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: i64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: i64) {
        self.0.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    fn apply(self, value: Value) -> Result<Value> {
        match (self, value) {
            (Self::Neg, Value::Int(a)) => a.checked_neg().map(Value::Int).ok_or(ExprError::Overflow),
            (Self::Neg, Value::Float(a)) => Ok(Value::Float(-a)),
            (Self::Neg, other) => Err(other.mismatch("-")),
            (Self::Not, other) => Ok(Value::Bool(!other.as_bool("!")?)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
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

/// Binary operators grouped by precedence, loosest first.
const LEVELS: [&[(&str, BinaryOp)]; 6] = [
    &[("||", BinaryOp::Or)],
    &[("&&", BinaryOp::And)],
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    &[
        ("<", BinaryOp::Lt),
        ("<=", BinaryOp::Le),
        (">", BinaryOp::Gt),
        (">=", BinaryOp::Ge),
    ],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[
        ("*", BinaryOp::Mul),
        ("/", BinaryOp::Div),
        ("%", BinaryOp::Rem),
    ],
];

impl BinaryOp {
    fn symbol(self) -> &'static str {
        LEVELS
            .iter()
            .flat_map(|level| level.iter())
            .find(|(_, op)| *op == self)
            .map_or("?", |&(symbol, _)| symbol)
    }

    fn apply(self, lhs: Value, rhs: Value) -> Result<Value> {
        let op = self.symbol();
        let value = match self {
            Self::Or => Value::Bool(lhs.as_bool(op)? || rhs.as_bool(op)?),
            Self::And => Value::Bool(lhs.as_bool(op)? && rhs.as_bool(op)?),
            Self::Eq => Value::Bool(lhs.equals(rhs, op)?),
            Self::Ne => Value::Bool(!lhs.equals(rhs, op)?),
            Self::Lt => Value::Bool(lhs.ordering(rhs, op)?.is_some_and(Ordering::is_lt)),
            Self::Le => Value::Bool(lhs.ordering(rhs, op)?.is_some_and(Ordering::is_le)),
            Self::Gt => Value::Bool(lhs.ordering(rhs, op)?.is_some_and(Ordering::is_gt)),
            Self::Ge => Value::Bool(lhs.ordering(rhs, op)?.is_some_and(Ordering::is_ge)),
            Self::Add => numeric(op, lhs, rhs, i64::checked_add, |a, b| a + b)?,
            Self::Sub => numeric(op, lhs, rhs, i64::checked_sub, |a, b| a - b)?,
            Self::Mul => numeric(op, lhs, rhs, i64::checked_mul, |a, b| a * b)?,
            Self::Div => {
                let (n, d) = (lhs.as_f64(op)?, rhs.as_f64(op)?);
                if d == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                Value::Float(n / d)
            }
            Self::Rem => match (lhs, rhs) {
                (Value::Int(_), Value::Int(0)) => return Err(ExprError::DivisionByZero),
                (Value::Int(a), Value::Int(b)) => {
                    Value::Int(a.checked_rem(b).ok_or(ExprError::Overflow)?)
                }
                (Value::Int(_), other) | (other, _) => return Err(other.mismatch(op)),
            },
        };
        Ok(value)
    }
}

fn numeric(
    op: &str,
    lhs: Value,
    rhs: Value,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int(a, b).map(Value::Int).ok_or(ExprError::Overflow),
        _ => Ok(Value::Float(float(lhs.as_f64(op)?, rhs.as_f64(op)?))),
    }
}

fn call(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "floor" | "ceil" | "round" | "abs" => {
            let &[arg] = args else {
                return Err(ExprError::Arity {
                    name: name.to_owned(),
                    expected: "1",
                    found: args.len(),
                });
            };
            let value = match (name, arg) {
                ("abs", Value::Int(a)) => Value::Int(a.checked_abs().ok_or(ExprError::Overflow)?),
                (_, Value::Int(a)) => Value::Int(a),
                ("floor", _) => Value::Float(arg.as_f64(name)?.floor()),
                ("ceil", _) => Value::Float(arg.as_f64(name)?.ceil()),
                ("round", _) => Value::Float(arg.as_f64(name)?.round()),
                _ => Value::Float(arg.as_f64(name)?.abs()),
            };
            Ok(value)
        }
        "min" | "max" => {
            let Some((&first, rest)) = args.split_first() else {
                return Err(ExprError::Arity {
                    name: name.to_owned(),
                    expected: "at least 1",
                    found: 0,
                });
            };
            let pick_lhs = |ordering: Ordering| match name {
                "min" => ordering.is_le(),
                _ => ordering.is_ge(),
            };
            let mut best = first;
            best.as_f64(name)?;
            for &arg in rest {
                let keep = best.ordering(arg, name)?.is_none_or(pick_lhs);
                if !keep {
                    best = arg;
                }
            }
            Ok(best)
        }
        _ => Err(ExprError::UnknownFunction(name.to_owned())),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(Value),
    Ident(String),
    Punct(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => value.fmt(f),
            Self::Ident(name) => f.write_str(name),
            Self::Punct(punct) => f.write_str(punct),
        }
    }
}

/// Two-character operators come first so they win over their one-character prefixes.
const PUNCTS: [&str; 19] = [
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "(", ")", ",",
    "?", ":",
];

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(at, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_ascii_digit() || ch == '.' {
            let mut end = at;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_ascii_digit() || c == '.') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let literal = &text[at..end];
            let value = if literal.contains('.') {
                literal.parse().ok().map(Value::Float)
            } else {
                literal.parse().ok().map(Value::Int)
            };
            let value = value.ok_or_else(|| ExprError::InvalidNumber(literal.to_owned()))?;
            tokens.push((Token::Literal(value), at));
        } else if ch.is_alphabetic() || ch == '_' {
            let mut end = at;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_alphanumeric() || c == '_') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let token = match &text[at..end] {
                "true" => Token::Literal(Value::Bool(true)),
                "false" => Token::Literal(Value::Bool(false)),
                name => Token::Ident(name.to_owned()),
            };
            tokens.push((token, at));
        } else {
            let rest = &text[at..];
            let punct = PUNCTS
                .into_iter()
                .find(|punct| rest.starts_with(*punct))
                .ok_or(ExprError::UnexpectedChar { ch, at })?;
            for _ in 0..punct.len() {
                chars.next();
            }
            tokens.push((Token::Punct(punct), at));
        }
    }

    Ok(tokens)
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser {
            tokens: tokenize(text)?,
            pos: 0,
        };
        let expr = parser.conditional()?;
        match parser.next() {
            None => Ok(expr),
            Some((token, at)) => Err(ExprError::UnexpectedToken {
                token: token.to_string(),
                at,
            }),
        }
    }

    /// Evaluates the tree. `&&`, `||` and `?:` only evaluate the operands they need.
    pub fn eval(&self, params: &Params) -> Result<Value> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Var(name) => params
                .get(name)
                .map(Value::Int)
                .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
            Self::Unary(op, operand) => op.apply(operand.eval(params)?),
            Self::Binary(BinaryOp::And, lhs, rhs) => Ok(Value::Bool(
                lhs.eval(params)?.as_bool("&&")? && rhs.eval(params)?.as_bool("&&")?,
            )),
            Self::Binary(BinaryOp::Or, lhs, rhs) => Ok(Value::Bool(
                lhs.eval(params)?.as_bool("||")? || rhs.eval(params)?.as_bool("||")?,
            )),
            Self::Binary(op, lhs, rhs) => op.apply(lhs.eval(params)?, rhs.eval(params)?),
            Self::Cond(cond, then, otherwise) => {
                if cond.eval(params)?.as_bool("?:")? {
                    then.eval(params)
                } else {
                    otherwise.eval(params)
                }
            }
            Self::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(params))
                    .collect::<Result<Vec<_>>>()?;
                call(name, &args)
            }
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some((Token::Punct(p), _)) if *p == punct => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        match self.next() {
            Some((Token::Punct(p), _)) if p == punct => Ok(()),
            Some((token, at)) => Err(ExprError::UnexpectedToken {
                token: token.to_string(),
                at,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn conditional(&mut self) -> Result<Expr> {
        let cond = self.binary(0)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.conditional()?;
        self.expect(":")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Cond(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary(&mut self, level: usize) -> Result<Expr> {
        let Some(ops) = LEVELS.get(level).copied() else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(op) = self.peek_op(ops) {
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn peek_op(&self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let Some((Token::Punct(punct), _)) = self.tokens.get(self.pos) else {
            return None;
        };
        ops.iter()
            .find(|(symbol, _)| symbol == punct)
            .map(|&(_, op)| op)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat("-") {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        if self.eat("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let (token, at) = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match token {
            Token::Literal(value) => Ok(Expr::Literal(value)),
            Token::Ident(name) if self.eat("(") => {
                let mut args = Vec::new();
                if !self.eat(")") {
                    loop {
                        args.push(self.conditional()?);
                        if self.eat(")") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                Ok(Expr::Call(name, args))
            }
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::Punct("(") => {
                let inner = self.conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct(punct) => Err(ExprError::UnexpectedToken {
                token: punct.to_owned(),
                at,
            }),
        }
    }
}

/// Evaluates `text` to an integer. Blank text evaluates to 0.
pub fn eval_int(text: &str, params: &Params) -> Result<i64> {
    if text.trim().is_empty() {
        return Ok(0);
    }
    Expr::parse(text)?.eval(params)?.to_int()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<Value> {
        let params = Params::new().with("w", 8).with("h", 8);
        Expr::parse(text)?.eval(&params)
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("1+2*3"), Ok(Value::Int(7)));
        assert_eq!(eval("(1+2)*3"), Ok(Value::Int(9)));
        assert_eq!(eval("10-4-3"), Ok(Value::Int(3)));
        assert_eq!(eval("-7%3"), Ok(Value::Int(-1)));
        assert_eq!(eval("2*-w"), Ok(Value::Int(-16)));
    }

    #[test]
    fn division_is_float_and_must_end_integral() {
        let params = Params::new();
        assert_eq!(eval("10/4"), Ok(Value::Float(2.5)));
        assert_eq!(eval_int("10/5", &params), Ok(2));
        assert_eq!(
            eval_int("10/4", &params),
            Err(ExprError::NotAnInteger("2.5".to_owned()))
        );
        assert_eq!(eval_int("1 < 2", &params), Err(ExprError::NotAnInteger("true".to_owned())));
    }

    #[test]
    fn grid_placement_formula() {
        let mut params = Params::new().with("w", 8).with("h", 8);
        for i in 0..64 {
            params.set("i", i);
            assert_eq!(eval_int("12+(i%w)*16", &params), Ok(12 + (i % 8) * 16));
            assert_eq!(eval_int("55+floor(i/w)*16", &params), Ok(55 + (i / 8) * 16));
        }
    }

    #[test]
    fn logic_and_conditionals() {
        assert_eq!(eval("w > 4 && h >= 8 ? 1 : 2"), Ok(Value::Int(1)));
        assert_eq!(eval("w == 8.0"), Ok(Value::Bool(true)));
        assert_eq!(eval("false || !true"), Ok(Value::Bool(false)));
        assert_eq!(eval("true ? false ? 1 : 2 : 3"), Ok(Value::Int(2)));
        // right side never runs
        assert_eq!(eval("false && 1/0 > 0"), Ok(Value::Bool(false)));
        assert_eq!(eval("w < 0 ? 1/0 : 5"), Ok(Value::Int(5)));
    }

    #[test]
    fn functions() {
        assert_eq!(eval("floor(7/2)"), Ok(Value::Float(3.0)));
        assert_eq!(eval("ceil(7/2)"), Ok(Value::Float(4.0)));
        assert_eq!(eval("round(2.5)"), Ok(Value::Float(3.0)));
        assert_eq!(eval("abs(-w)"), Ok(Value::Int(8)));
        assert_eq!(eval("max(3, w, 2)"), Ok(Value::Int(8)));
        assert_eq!(eval("min(1, 0.5)"), Ok(Value::Float(0.5)));
        assert_eq!(eval("floor(w)"), Ok(Value::Int(8)));
    }

    #[test]
    fn blank_text_is_zero() {
        assert_eq!(eval_int("", &Params::new()), Ok(0));
        assert_eq!(eval_int("   ", &Params::new()), Ok(0));
    }

    #[test]
    fn parse_errors_carry_offsets() {
        assert_eq!(eval("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(eval("(1"), Err(ExprError::UnexpectedEnd));
        assert_eq!(eval("1 $ 2"), Err(ExprError::UnexpectedChar { ch: '$', at: 2 }));
        assert_eq!(
            eval("1 2"),
            Err(ExprError::UnexpectedToken {
                token: "2".to_owned(),
                at: 2
            })
        );
        assert_eq!(eval("1.2.3"), Err(ExprError::InvalidNumber("1.2.3".to_owned())));
    }

    #[test]
    fn evaluation_errors() {
        assert_eq!(eval("x"), Err(ExprError::UnknownVariable("x".to_owned())));
        assert_eq!(eval("sqrt(4)"), Err(ExprError::UnknownFunction("sqrt".to_owned())));
        assert_eq!(eval("1/0"), Err(ExprError::DivisionByZero));
        assert_eq!(eval("w%0"), Err(ExprError::DivisionByZero));
        assert!(matches!(eval("5 % 2.0"), Err(ExprError::TypeMismatch { found: "float", .. })));
        assert!(matches!(eval("!1"), Err(ExprError::TypeMismatch { found: "int", .. })));
        assert!(matches!(eval("floor(1, 2)"), Err(ExprError::Arity { found: 2, .. })));
        assert_eq!(eval("9223372036854775807 + 1"), Err(ExprError::Overflow));
    }
}
