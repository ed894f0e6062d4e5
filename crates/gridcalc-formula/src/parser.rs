//! Formula parser
//!
//! Formula text is split into tokens first, then parsed by recursive descent.
//! Precedence, loosest first: comparison, concatenation, additive,
//! multiplicative, exponent, unary sign, percent, range, primary.

use crate::ast::{BinaryOp, CellRef, Expr, RangeRef, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use gridcalc_core::{ErrorKind, Position, Rect};

/// Parse formula text, with or without the leading `=`
pub fn parse_formula(text: &str) -> FormulaResult<Expr> {
    let body = text.trim();
    let body = body.strip_prefix('=').unwrap_or(body);
    if body.trim().is_empty() {
        return Err(FormulaError::parse("empty formula"));
    }

    let mut parser = Parser {
        tokens: tokenize(body)?,
        pos: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        Token::End => Ok(expr),
        other => Err(FormulaError::parse(format!(
            "unexpected {} after expression",
            other.describe()
        ))),
    }
}

// === Tokens ===

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Error(ErrorKind),
    Ident(String),
    /// Sheet qualifier, `Data!` or `'My Data'!`
    Sheet(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Amp,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Colon,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    End,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string \"{}\"", s),
            Token::Error(e) => format!("error {}", e),
            Token::Ident(s) => format!("'{}'", s),
            Token::Sheet(s) => format!("sheet '{}'", s),
            Token::End => "end of formula".to_string(),
            other => format!("{:?}", other),
        }
    }
}

fn tokenize(src: &str) -> FormulaResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '&' => Some(Token::Amp),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Eq),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        match c {
            '<' => {
                let (token, width) = match next {
                    Some('=') => (Token::Le, 2),
                    Some('>') => (Token::Ne, 2),
                    _ => (Token::Lt, 1),
                };
                tokens.push(token);
                i += width;
            }
            '>' => {
                let (token, width) = match next {
                    Some('=') => (Token::Ge, 2),
                    _ => (Token::Gt, 1),
                };
                tokens.push(token);
                i += width;
            }
            '"' => {
                let (text, end) = scan_quoted(&chars, i, '"')?;
                tokens.push(Token::Text(text));
                i = end;
            }
            '\'' => {
                let (name, end) = scan_quoted(&chars, i, '\'')?;
                if chars.get(end) != Some(&'!') {
                    return Err(FormulaError::parse(format!(
                        "expected '!' after sheet name '{}'",
                        name
                    )));
                }
                tokens.push(Token::Sheet(name));
                i = end + 1;
            }
            '#' => {
                let start = i;
                i += 1;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || ch == '/' {
                        i += 1;
                    } else if ch == '!' || ch == '?' {
                        i += 1;
                        break;
                    } else {
                        break;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let kind = ErrorKind::parse(&literal).ok_or_else(|| {
                    FormulaError::parse(format!("unknown error literal {}", literal))
                })?;
                tokens.push(Token::Error(kind));
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let (number, end) = scan_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = end;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '$'))
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'!') {
                    tokens.push(Token::Sheet(ident));
                    i += 1;
                } else {
                    tokens.push(Token::Ident(ident));
                }
            }
            other => {
                return Err(FormulaError::parse(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    tokens.push(Token::End);
    Ok(tokens)
}

/// Scan a quoted run starting at `start`; a doubled quote is an escaped quote.
/// Returns the unquoted text and the index after the closing quote.
fn scan_quoted(chars: &[char], start: usize, quote: char) -> FormulaResult<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err(FormulaError::parse("unterminated quoted text")),
            Some(&ch) if ch == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    text.push(quote);
                    i += 2;
                } else {
                    return Ok((text, i + 1));
                }
            }
            Some(&ch) => {
                text.push(ch);
                i += 1;
            }
        }
    }
}

fn scan_number(chars: &[char], start: usize) -> FormulaResult<(f64, usize)> {
    let mut i = start;
    let digits = |i: &mut usize| {
        while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
            *i += 1;
        }
    };

    digits(&mut i);
    if chars.get(i) == Some(&'.') {
        i += 1;
        digits(&mut i);
    }
    if matches!(chars.get(i), Some('e') | Some('E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+') | Some('-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
            i = j;
            digits(&mut i);
        }
    }

    let text: String = chars[start..i].iter().collect();
    text.parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| FormulaError::parse(format!("invalid number '{}'", text)))
}

/// Position of an identifier that spells a cell address
fn cell_position(ident: &str) -> Option<Position> {
    if !ident.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Position::parse(ident).ok()
}

// === Parser ===

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // the token list always ends with End and `pos` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::End {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn left_assoc(
        &mut self,
        operand: fn(&mut Self) -> FormulaResult<Expr>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> FormulaResult<Expr> {
        let mut lhs = operand(self)?;
        while let Some(op) = operator(self.peek()) {
            self.advance();
            let rhs = operand(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> FormulaResult<Expr> {
        self.left_assoc(Self::concat, |token| match token {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn concat(&mut self) -> FormulaResult<Expr> {
        self.left_assoc(Self::additive, |token| match token {
            Token::Amp => Some(BinaryOp::Concat),
            _ => None,
        })
    }

    fn additive(&mut self) -> FormulaResult<Expr> {
        self.left_assoc(Self::multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> FormulaResult<Expr> {
        self.left_assoc(Self::exponent, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn exponent(&mut self) -> FormulaResult<Expr> {
        self.left_assoc(Self::unary, |token| match token {
            Token::Caret => Some(BinaryOp::Pow),
            _ => None,
        })
    }

    fn unary(&mut self) -> FormulaResult<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Negate,
            Token::Plus => UnaryOp::Plus,
            _ => return self.percent(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn percent(&mut self) -> FormulaResult<Expr> {
        let mut expr = self.range()?;
        while self.eat(&Token::Percent) {
            expr = Expr::Unary {
                op: UnaryOp::Percent,
                operand: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn range(&mut self) -> FormulaResult<Expr> {
        let start = self.primary()?;
        if !self.eat(&Token::Colon) {
            return Ok(start);
        }
        let end = self.primary()?;

        match (start, end) {
            (Expr::Cell(a), Expr::Cell(b)) => {
                let sheet = match (a.sheet, b.sheet) {
                    (Some(x), Some(y)) if !x.eq_ignore_ascii_case(&y) => {
                        return Err(FormulaError::parse(format!(
                            "range spans two sheets ({} and {})",
                            x, y
                        )))
                    }
                    (x, y) => x.or(y),
                };
                Ok(Expr::Range(RangeRef {
                    sheet,
                    rect: Rect::from_corners(a.pos, b.pos),
                }))
            }
            _ => Err(FormulaError::parse(
                "range bounds must be cell references",
            )),
        }
    }

    fn primary(&mut self) -> FormulaResult<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Text(s) => Ok(Expr::Text(s)),
            Token::Error(e) => Ok(Expr::Error(e)),
            Token::LParen => {
                let inner = self.comparison()?;
                if !self.eat(&Token::RParen) {
                    return Err(FormulaError::parse("expected ')'"));
                }
                Ok(inner)
            }
            Token::LBrace => self.array(),
            Token::Sheet(sheet) => match self.advance() {
                Token::Ident(ident) => cell_position(&ident)
                    .map(|pos| {
                        Expr::Cell(CellRef {
                            sheet: Some(sheet.clone()),
                            pos,
                        })
                    })
                    .ok_or_else(|| {
                        FormulaError::InvalidReference(format!("{}!{}", sheet, ident))
                    }),
                other => Err(FormulaError::parse(format!(
                    "expected a cell after sheet '{}', found {}",
                    sheet,
                    other.describe()
                ))),
            },
            Token::Ident(ident) => {
                if self.eat(&Token::LParen) {
                    return self.call(ident);
                }
                if ident.eq_ignore_ascii_case("TRUE") {
                    return Ok(Expr::Boolean(true));
                }
                if ident.eq_ignore_ascii_case("FALSE") {
                    return Ok(Expr::Boolean(false));
                }
                Ok(match cell_position(&ident) {
                    Some(pos) => Expr::Cell(CellRef { sheet: None, pos }),
                    None => Expr::Name(ident),
                })
            }
            other => Err(FormulaError::parse(format!(
                "unexpected {}",
                other.describe()
            ))),
        }
    }

    fn call(&mut self, name: String) -> FormulaResult<Expr> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.comparison()?);
                match self.advance() {
                    Token::Comma | Token::Semicolon => {}
                    Token::RParen => break,
                    other => {
                        return Err(FormulaError::parse(format!(
                            "expected ',' or ')' in call to {}, found {}",
                            name,
                            other.describe()
                        )))
                    }
                }
            }
        }
        Ok(Expr::Call {
            name: name.to_ascii_uppercase(),
            args,
        })
    }

    fn array(&mut self) -> FormulaResult<Expr> {
        let mut rows: Vec<Vec<Expr>> = vec![Vec::new()];
        loop {
            let item = self.unary()?;
            if let Some(row) = rows.last_mut() {
                row.push(item);
            }
            match self.advance() {
                Token::Comma => {}
                Token::Semicolon => rows.push(Vec::new()),
                Token::RBrace => break,
                other => {
                    return Err(FormulaError::parse(format!(
                        "expected ',', ';' or '}}' in array, found {}",
                        other.describe()
                    )))
                }
            }
        }

        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(FormulaError::parse("array rows differ in length"));
        }
        Ok(Expr::Array(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(col: u32, row: u32) -> Expr {
        Expr::Cell(CellRef {
            sheet: None,
            pos: Position::new(col, row),
        })
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse_formula("=1.5e2").unwrap(), Expr::Number(150.0));
        assert_eq!(parse_formula("=.5").unwrap(), Expr::Number(0.5));
        assert_eq!(
            parse_formula("=\"say \"\"hi\"\"\"").unwrap(),
            Expr::Text("say \"hi\"".into())
        );
        assert_eq!(parse_formula("=true").unwrap(), Expr::Boolean(true));
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            Expr::Error(ErrorKind::Div0)
        );
        assert_eq!(parse_formula("=#N/A").unwrap(), Expr::Error(ErrorKind::Na));
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_formula("=A1+A1*2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(cell(1, 1)),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(cell(1, 1)),
                    rhs: Box::new(Expr::Number(2.0)),
                }),
            }
        );

        // unary minus binds tighter than ^
        let expr = parse_formula("=-2^2").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Pow, .. }));

        let expr = parse_formula("=1&2=\"12\"").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(parse_formula("=$B$3").unwrap(), cell(2, 3));
        assert_eq!(
            parse_formula("=Data!A1:B2").unwrap(),
            Expr::Range(RangeRef {
                sheet: Some("Data".into()),
                rect: Rect::new(1, 1, 2, 2),
            })
        );
        assert_eq!(
            parse_formula("='My Sheet'!C4").unwrap(),
            Expr::Cell(CellRef {
                sheet: Some("My Sheet".into()),
                pos: Position::new(3, 4),
            })
        );
        assert_eq!(
            parse_formula("=C3:A1").unwrap(),
            Expr::Range(RangeRef {
                sheet: None,
                rect: Rect::new(1, 1, 3, 3),
            })
        );
        assert_eq!(parse_formula("=TaxRate").unwrap(), Expr::Name("TaxRate".into()));
    }

    #[test]
    fn test_parse_calls_and_arrays() {
        let expr = parse_formula("=sum(A1:A3, 4)").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
        assert_eq!(
            parse_formula("=PI()").unwrap(),
            Expr::Call {
                name: "PI".into(),
                args: vec![],
            }
        );

        let expr = parse_formula("={1,2;3,-4}").unwrap();
        match expr {
            Expr::Array(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].len(), 2);
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=SUM(1 2)").is_err());
        assert!(parse_formula("={1,2;3}").is_err());
        assert!(parse_formula("=A1 ~ 2").is_err());
        assert!(parse_formula("=Data!A1:Other!B2").is_err());
        assert!(parse_formula("=\"open").is_err());
    }
}
