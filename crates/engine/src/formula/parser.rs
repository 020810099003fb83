// Formula parser - converts expression text into an AST
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), unary sign, parens
// The input is the expression without the leading '='. The Display impl is
// the inverse: it emits the canonical text with minimal parentheses.

use crate::position::Position;

/// Expression AST for cell formulas.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference. References that decode outside the grid (e.g. `AAAA1`)
    /// carry `Position::NONE` and only fail at evaluation time.
    CellRef(Position),
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Parse expression text (without the leading `=`) into an AST.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            'A'..='Z' | 'a'..='z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match try_parse_cell_ref(&ident) {
                    Some(token) => tokens.push(token),
                    None => return Err(format!("unexpected identifier: {}", ident)),
                }
            }
            _ => return Err(format!("unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Recognize an `[A-Z]+[0-9]+` identifier as a cell reference.
///
/// The shape check is separate from range validation: a reference with too
/// many letters or an overflowing row still lexes, but decodes to
/// `Position::NONE` so that evaluating it produces a reference error.
fn try_parse_cell_ref(s: &str) -> Option<Token> {
    let split = s.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(Token::CellRef(Position::parse_a1(s).unwrap_or(Position::NONE)))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let op = match tokens.get(pos) {
        Some(Token::Plus) => UnaryOp::Plus,
        Some(Token::Minus) => UnaryOp::Minus,
        _ => return parse_primary(tokens, pos),
    };
    let (operand, new_pos) = parse_unary(tokens, pos + 1)?;
    Ok((
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        },
        new_pos,
    ))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    match tokens.get(pos) {
        None => Err("unexpected end of expression".to_string()),
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::CellRef(cell)) => Ok((Expr::CellRef(*cell), pos + 1)),
        Some(Token::LParen) => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1)?;
            match tokens.get(new_pos) {
                Some(Token::RParen) => Ok((expr, new_pos + 1)),
                _ => Err("expected closing parenthesis".to_string()),
            }
        }
        Some(_) => Err("unexpected token in expression".to_string()),
    }
}

impl Expr {
    /// Binding strength, used by the printer to decide parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::CellRef(_) => 4,
            Expr::UnaryOp { .. } => 3,
            Expr::BinaryOp { op: Op::Mul | Op::Div, .. } => 2,
            Expr::BinaryOp { op: Op::Add | Op::Sub, .. } => 1,
        }
    }

    /// Append every referenced position in source order, duplicates included.
    pub fn collect_cells(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef(cell) => out.push(*cell),
            Expr::UnaryOp { operand, .. } => operand.collect_cells(out),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_cells(out);
                right.collect_cells(out);
            }
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::CellRef(cell) => {
                if cell.is_valid() {
                    write!(f, "{}", cell)
                } else {
                    f.write_str("#REF!")
                }
            }
            Expr::UnaryOp { op, operand } => {
                let sign = match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                };
                write!(f, "{}", sign)?;
                write_operand(f, operand, self.precedence(), false)
            }
            Expr::BinaryOp { op, left, right } => {
                let sign = match op {
                    Op::Add => '+',
                    Op::Sub => '-',
                    Op::Mul => '*',
                    Op::Div => '/',
                };
                write_operand(f, left, self.precedence(), false)?;
                write!(f, "{}", sign)?;
                // Subtraction and division are left-associative: an
                // equal-precedence right operand keeps its parentheses.
                write_operand(f, right, self.precedence(), matches!(op, Op::Sub | Op::Div))
            }
        }
    }
}

fn write_operand(
    f: &mut std::fmt::Formatter<'_>,
    expr: &Expr,
    parent_precedence: u8,
    parenthesize_equal: bool,
) -> std::fmt::Result {
    let precedence = expr.precedence();
    if precedence < parent_precedence || (parenthesize_equal && precedence == parent_precedence) {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}
