//! Formula syntax tree

use gridcalc_core::{ErrorKind, Position, Rect};
use std::fmt;

/// A parsed formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorKind),
    /// Single cell reference (`A1`, `$B$2`, `Data!C3`)
    Cell(CellRef),
    /// Rectangular reference (`A1:C3`, `Data!A1:B2`)
    Range(RangeRef),
    /// Named area or constant
    Name(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Function call; the name is stored uppercase
    Call { name: String, args: Vec<Expr> },
    /// Array literal, row by row (`{1,2;3,4}`)
    Array(Vec<Vec<Expr>>),
}

/// A cell reference with an optional sheet qualifier
#[derive(Debug, Clone, PartialEq)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub pos: Position,
}

/// A range reference with an optional sheet qualifier
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `+x`
    Plus,
    /// `x%`
    Percent,
}

impl Expr {
    /// Visit this expression and every sub-expression, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Array(rows) => {
                for item in rows.iter().flatten() {
                    item.walk(visit);
                }
            }
            _ => {}
        }
    }
}

// Binding strength used when printing; higher binds tighter
const PREC_UNARY: u8 = 6;
const PREC_PERCENT: u8 = 7;
const PREC_PRIMARY: u8 = 8;

impl BinaryOp {
    fn precedence(&self) -> u8 {
        match self {
            op if op.is_comparison() => 1,
            BinaryOp::Concat => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div => 4,
            _ => 5,
        }
    }
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary {
                op: UnaryOp::Percent,
                ..
            } => PREC_PERCENT,
            Expr::Unary { .. } => PREC_UNARY,
            Expr::Number(n) if n.is_sign_negative() => PREC_UNARY,
            _ => PREC_PRIMARY,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn fmt_sheet(f: &mut fmt::Formatter<'_>, sheet: &Option<String>) -> fmt::Result {
    let Some(name) = sheet else {
        return Ok(());
    };
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.'));
    if plain {
        write!(f, "{}!", name)
    } else {
        write!(f, "'{}'!", name.replace('\'', "''"))
    }
}

/// Formula text without the leading `=`
///
/// Absolute anchors (`$`) are not kept by the parser and are not printed.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Text(text) => write!(f, "\"{}\"", text.replace('"', "\"\"")),
            Expr::Boolean(true) => f.write_str("TRUE"),
            Expr::Boolean(false) => f.write_str("FALSE"),
            Expr::Error(kind) => f.write_str(kind.as_str()),
            Expr::Cell(cell) => {
                fmt_sheet(f, &cell.sheet)?;
                write!(f, "{}", cell.pos)
            }
            Expr::Range(range) => {
                fmt_sheet(f, &range.sheet)?;
                write!(f, "{}", range.rect)
            }
            Expr::Name(name) => f.write_str(name),
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                lhs.fmt_operand(f, lhs.precedence() < prec)?;
                f.write_str(op.symbol())?;
                rhs.fmt_operand(f, rhs.precedence() <= prec)
            }
            Expr::Unary {
                op: UnaryOp::Percent,
                operand,
            } => {
                operand.fmt_operand(f, operand.precedence() < PREC_PERCENT)?;
                f.write_str("%")
            }
            Expr::Unary { op, operand } => {
                f.write_str(if *op == UnaryOp::Negate { "-" } else { "+" })?;
                operand.fmt_operand(f, operand.precedence() < PREC_UNARY)
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Array(rows) => {
                f.write_str("{")?;
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        f.write_str(";")?;
                    }
                    for (c, item) in row.iter().enumerate() {
                        if c > 0 {
                            f.write_str(",")?;
                        }
                        item.fmt_operand(f, item.precedence() < PREC_UNARY)?;
                    }
                }
                f.write_str("}")
            }
        }
    }
}
