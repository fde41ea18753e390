//! The arithmetic formula language of template properties.
//!
//! Formulas are small expressions over numbers, references and a fixed set of
//! functions, e.g. `contours[0].nodes[1].x + thickness / 2` or
//! `Math.max(capDelta, ascender)`. References are dotted cursors; bracket
//! indexing is normalized to dotted form so `nodes[1]` and `nodes.1` are the
//! same reference.

use std::f64::consts::PI;

use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(SmolStr),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Atan2,
    Pow,
    Floor,
    Ceil,
    Round,
    Hypot,
    Rad,
    Deg,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {position}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        ParseError {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown reference '{0}'")]
    UnknownReference(SmolStr),
}

impl Function {
    fn from_name(name: &str) -> Option<Function> {
        let name = name.strip_prefix("Math.").unwrap_or(name);
        let function = match name {
            "min" => Function::Min,
            "max" => Function::Max,
            "abs" => Function::Abs,
            "sqrt" => Function::Sqrt,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "atan2" => Function::Atan2,
            "pow" => Function::Pow,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "round" => Function::Round,
            "hypot" => Function::Hypot,
            "rad" => Function::Rad,
            "deg" => Function::Deg,
            _ => return None,
        };
        Some(function)
    }

    /// Minimum and, unless variadic, maximum argument count
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Min | Function::Max | Function::Hypot => (1, None),
            Function::Atan2 | Function::Pow => (2, Some(2)),
            _ => (1, Some(1)),
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Hypot => args.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Function::Abs => args[0].abs(),
            Function::Sqrt => args[0].sqrt(),
            Function::Sin => args[0].sin(),
            Function::Cos => args[0].cos(),
            Function::Tan => args[0].tan(),
            Function::Atan2 => args[0].atan2(args[1]),
            Function::Pow => args[0].powf(args[1]),
            Function::Floor => args[0].floor(),
            Function::Ceil => args[0].ceil(),
            Function::Round => args[0].round(),
            Function::Rad => args[0].to_radians(),
            Function::Deg => args[0].to_degrees(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(start, format!("bad number '{text}'")))?;
            tokens.push((start, Token::Number(value)));
            continue;
        }
        if is_ident_start(c) {
            let mut ident = String::new();
            loop {
                while i < chars.len() && is_ident_char(chars[i]) {
                    ident.push(chars[i]);
                    i += 1;
                }
                if i + 1 < chars.len() && chars[i] == '.' && is_ident_char(chars[i + 1]) {
                    ident.push('.');
                    i += 1;
                } else if i < chars.len() && chars[i] == '[' {
                    let open = i;
                    i += 1;
                    let index_start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i == index_start || i >= chars.len() || chars[i] != ']' {
                        return Err(ParseError::new(open, "expected numeric index"));
                    }
                    ident.push('.');
                    ident.extend(&chars[index_start..i]);
                    i += 1;
                    // a dot may follow the closing bracket; the loop picks up the next segment
                    if i + 1 < chars.len() && chars[i] == '.' && is_ident_char(chars[i + 1]) {
                        ident.push('.');
                        i += 1;
                    }
                } else {
                    break;
                }
            }
            tokens.push((start, Token::Ident(ident)));
            continue;
        }
        let token = match c {
            '+' | '-' | '*' | '/' | '%' | '^' => Token::Op(c),
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            _ => return Err(ParseError::new(start, format!("unexpected '{c}'"))),
        };
        tokens.push((start, token));
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            let op = match op {
                '*' => BinOp::Mul,
                '/' => BinOp::Div,
                _ => BinOp::Rem,
            };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.eat_op(&['-', '+']) {
            Some('-') => Ok(Expr::Neg(Box::new(self.unary()?))),
            Some(_) => self.unary(),
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if self.eat_op(&['^']).is_some() {
            // right associative
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.additive()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ParseError::new(self.offset(), "expected ')'")),
                }
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.call(offset, &name);
                }
                match name.as_str() {
                    "PI" | "Math.PI" => Ok(Expr::Number(PI)),
                    _ => Ok(Expr::Ref(name.into())),
                }
            }
            Some(token) => Err(ParseError::new(offset, format!("unexpected {token:?}"))),
            None => Err(ParseError::new(offset, "unexpected end of formula")),
        }
    }

    fn call(&mut self, offset: usize, name: &str) -> Result<Expr, ParseError> {
        let function = Function::from_name(name)
            .ok_or_else(|| ParseError::new(offset, format!("unknown function '{name}'")))?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.additive()?);
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    _ => return Err(ParseError::new(self.offset(), "expected ',' or ')'")),
                }
            }
        }
        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(ParseError::new(
                offset,
                format!("{name} does not take {} argument(s)", args.len()),
            ));
        }
        Ok(Expr::Call(function, args))
    }
}

/// Parse a formula into an expression tree.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.additive()?;
    if parser.pos < parser.tokens.len() {
        return Err(ParseError::new(parser.offset(), "trailing input"));
    }
    Ok(expr)
}

impl Expr {
    /// Every reference in the expression, in source order, duplicates included.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => (),
            Expr::Ref(name) => refs.push(name.as_str()),
            Expr::Neg(inner) => inner.collect_references(refs),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_references(refs);
                rhs.collect_references(refs);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_references(refs)),
        }
    }

    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64, EvalError> {
        let value = match self {
            Expr::Number(value) => *value,
            Expr::Ref(name) => {
                lookup(name.as_str()).ok_or_else(|| EvalError::UnknownReference(name.clone()))?
            }
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.eval(lookup)?;
                let rhs = rhs.eval(lookup)?;
                match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                    BinOp::Div => lhs / rhs,
                    BinOp::Rem => lhs % rhs,
                    BinOp::Pow => lhs.powf(rhs),
                }
            }
            Expr::Call(function, args) => {
                let args = args
                    .iter()
                    .map(|a| a.eval(lookup))
                    .collect::<Result<Vec<_>, _>>()?;
                function.apply(&args)
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn eval_with(src: &str, vars: &[(&str, f64)]) -> Result<f64, EvalError> {
        let vars: HashMap<&str, f64> = vars.iter().copied().collect();
        parse(src).unwrap().eval(&|name| vars.get(name).copied())
    }

    #[test]
    fn precedence() {
        assert_eq!(7.0, eval_with("1 + 2 * 3", &[]).unwrap());
        assert_eq!(9.0, eval_with("(1 + 2) * 3", &[]).unwrap());
        assert_eq!(-4.0, eval_with("-2 ^ 2", &[]).unwrap());
        assert_eq!(512.0, eval_with("2 ^ 3 ^ 2", &[]).unwrap());
        assert_eq!(1.0, eval_with("7 % 3", &[]).unwrap());
    }

    #[test]
    fn global_height() {
        let value = eval_with(
            "xHeight + Math.max(capDelta, ascender) - descender",
            &[
                ("xHeight", 10.0),
                ("capDelta", 2.0),
                ("ascender", 14.0),
                ("descender", -3.0),
            ],
        )
        .unwrap();
        assert_eq!(27.0, value);
    }

    #[test]
    fn bracket_and_dot_paths_match() {
        let bracket = parse("contours[0].nodes[12].expandedTo[1].x").unwrap();
        let dotted = parse("contours.0.nodes.12.expandedTo.1.x").unwrap();
        assert_eq!(bracket, dotted);
        assert_eq!(vec!["contours.0.nodes.12.expandedTo.1.x"], dotted.references());
    }

    #[test]
    fn numbers_with_fraction_and_exponent() {
        assert_eq!(0.5, eval_with(".5", &[]).unwrap());
        assert_eq!(1500.0, eval_with("1.5e3", &[]).unwrap());
    }

    #[rstest]
    #[case::min("min(5, 3, 4)", 3.0)]
    #[case::max("Math.max(2, 14)", 14.0)]
    #[case::hypot("hypot(3, 4)", 5.0)]
    #[case::cos("cos(rad(60))", 0.5)]
    #[case::atan2("deg(atan2(1, 1))", 45.0)]
    #[case::pi("PI", PI)]
    #[case::round("round(2.5) + floor(-0.5) + ceil(0.2)", 3.0)]
    fn functions(#[case] src: &str, #[case] expected: f64) {
        let value = eval_with(src, &[]).unwrap();
        assert!((value - expected).abs() < 1e-9, "{src} = {value}");
    }

    #[test]
    fn unknown_reference() {
        assert_eq!(
            Err(EvalError::UnknownReference("width".into())),
            eval_with("width * 2", &[])
        );
    }

    #[test]
    fn parse_errors() {
        assert!(parse("1 +").is_err());
        assert!(parse("frobnicate(1)").is_err());
        assert!(parse("pow(1)").is_err());
        assert!(parse("nodes[x]").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("a # b").is_err());
    }
}
