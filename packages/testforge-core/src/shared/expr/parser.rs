//! Recursive-descent parser for C expressions
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, `|`, `^`, `&`, equality,
//! relational, shift, additive, multiplicative, unary/cast, postfix.
//! All binary levels are left-associative.

use super::ast::{BinaryOp, Effect, Expr, UnaryOp};
use super::lexer::{tokenize, Token};
use super::ExprError;

const TYPE_WORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "bool", "const", "volatile", "struct", "union", "enum",
];

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
];

/// Parse a complete expression.
pub fn parse_expr(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser::new(&tokens);
    let expr = parser.ternary()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a statement expression for its effect on local state.
///
/// Comma-separated statements (`i = 0, j = n`) yield one effect each.
pub fn parse_effects(text: &str) -> Result<Vec<Effect>, ExprError> {
    let tokens = tokenize(text)?;
    split_top_level(&tokens, ",")
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(effect_of)
        .collect()
}

fn effect_of(tokens: &[Token]) -> Result<Effect, ExprError> {
    // v++ / v-- / ++v / --v
    if let Some(Token::Punct(op @ ("++" | "--"))) = tokens.last() {
        let target = lvalue_name(&tokens[..tokens.len() - 1])?;
        return Ok(Effect::increment(target, *op == "++"));
    }
    if let Some(Token::Punct(op @ ("++" | "--"))) = tokens.first() {
        let target = lvalue_name(&tokens[1..])?;
        return Ok(Effect::increment(target, *op == "++"));
    }

    let mut depth = 0i32;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::Punct("(") | Token::Punct("[") => depth += 1,
            Token::Punct(")") | Token::Punct("]") => depth -= 1,
            Token::Punct(op) if depth == 0 && ASSIGN_OPS.contains(op) => {
                let target = lvalue_name(&tokens[..i])?;
                let rhs_tokens = &tokens[i + 1..];
                if rhs_tokens.iter().any(|t| matches!(t, Token::Punct(p) if ASSIGN_OPS.contains(p))) {
                    // chained assignment: the target ends up unknown
                    return Ok(Effect::Havoc { target });
                }
                let rhs = match parse_tokens(rhs_tokens) {
                    Ok(e) => e,
                    Err(_) => return Ok(Effect::Havoc { target }),
                };
                let value = match compound_op(op) {
                    Some(bin) => Expr::binary(bin, Expr::Var(target.clone()), rhs),
                    None => rhs,
                };
                return Ok(Effect::Assign { target, value });
            }
            _ => {}
        }
    }

    // Plain expression statement (call, comparison): no local effect
    Ok(Effect::None)
}

fn compound_op(op: &str) -> Option<BinaryOp> {
    Some(match op {
        "+=" => BinaryOp::Add,
        "-=" => BinaryOp::Sub,
        "*=" => BinaryOp::Mul,
        "/=" => BinaryOp::Div,
        "%=" => BinaryOp::Rem,
        "&=" => BinaryOp::BitAnd,
        "|=" => BinaryOp::BitOr,
        "^=" => BinaryOp::BitXor,
        "<<=" => BinaryOp::Shl,
        ">>=" => BinaryOp::Shr,
        _ => return None,
    })
}

fn lvalue_name(tokens: &[Token]) -> Result<String, ExprError> {
    match parse_tokens(tokens)? {
        Expr::Var(name) => Ok(name),
        other => Err(ExprError::NotAnLvalue(other.to_string())),
    }
}

fn parse_tokens(tokens: &[Token]) -> Result<Expr, ExprError> {
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.ternary()?;
    parser.expect_end()?;
    Ok(expr)
}

fn split_top_level<'a>(tokens: &'a [Token], sep: &str) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::Punct("(") | Token::Punct("[") => depth += 1,
            Token::Punct(")") | Token::Punct("]") => depth -= 1,
            Token::Punct(p) if depth == 0 && *p == sep => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &'static str) -> Result<(), ExprError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(ExprError::Expected {
                expected: punct,
                found: self.describe_current(),
            })
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(ExprError::TrailingInput(self.describe_current())),
        }
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(Token::Int(v)) => v.to_string(),
            Some(Token::Real(v)) => v.to_string(),
            Some(Token::Ident(s)) => s.clone(),
            Some(Token::Punct(p)) => (*p).to_string(),
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.binary_level(0)?;
        if self.eat("?") {
            let then_expr = self.ternary()?;
            self.expect(":")?;
            let else_expr = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then_expr),
                Box::new(else_expr),
            ));
        }
        Ok(cond)
    }

    /// Precedence climbing over the binary levels, loosest first
    fn binary_level(&mut self, level: usize) -> Result<Expr, ExprError> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("||", BinaryOp::Or)],
            &[("&&", BinaryOp::And)],
            &[("|", BinaryOp::BitOr)],
            &[("^", BinaryOp::BitXor)],
            &[("&", BinaryOp::BitAnd)],
            &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            &[("<<", BinaryOp::Shl), (">>", BinaryOp::Shr)],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };

        let mut lhs = self.binary_level(level + 1)?;
        'outer: loop {
            for &(sym, op) in ops.iter() {
                if self.eat(sym) {
                    let rhs = self.binary_level(level + 1)?;
                    lhs = Expr::binary(op, lhs, rhs);
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Punct("!")) => Some(UnaryOp::Not),
            Some(Token::Punct("-")) => Some(UnaryOp::Neg),
            Some(Token::Punct("+")) => Some(UnaryOp::Plus),
            Some(Token::Punct("~")) => Some(UnaryOp::BitNot),
            Some(Token::Punct("&")) => Some(UnaryOp::AddrOf),
            Some(Token::Punct("*")) => Some(UnaryOp::Deref),
            Some(Token::Punct("++")) | Some(Token::Punct("--")) => {
                return Err(ExprError::Unsupported("increment inside expression".into()))
            }
            _ => None,
        };

        if let Some(op) = op {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(match (op, operand) {
                // Fold literal negation so `-5` stays a literal
                (UnaryOp::Neg, Expr::Int(v)) => Expr::Int(-v),
                (UnaryOp::Neg, Expr::Real(v)) => Expr::Real(-v),
                (UnaryOp::Plus, e) => e,
                // `*p` reads through a pointer: model it as its own variable
                (UnaryOp::Deref, Expr::Var(name)) => Expr::Var(format!("*{name}")),
                (op, e) => Expr::Unary(op, Box::new(e)),
            });
        }

        if self.looks_like_cast() {
            self.pos += 1;
            let mut type_words = Vec::new();
            while let Some(tok) = self.peek() {
                match tok {
                    Token::Ident(w) => type_words.push(w.clone()),
                    Token::Punct("*") => type_words.push("*".to_string()),
                    Token::Punct(")") => break,
                    _ => return Err(ExprError::Unsupported("cast".into())),
                }
                self.pos += 1;
            }
            self.expect(")")?;
            let operand = self.unary()?;
            return Ok(Expr::Cast(type_words.join(" "), Box::new(operand)));
        }

        self.postfix()
    }

    fn looks_like_cast(&self) -> bool {
        if !matches!(self.peek(), Some(Token::Punct("("))) {
            return false;
        }
        let Some(Token::Ident(first)) = self.peek_at(1) else {
            return false;
        };
        if !(TYPE_WORDS.contains(&first.as_str()) || first.ends_with("_t")) {
            return false;
        }
        let mut offset = 2;
        loop {
            match self.peek_at(offset) {
                Some(Token::Ident(_)) | Some(Token::Punct("*")) => offset += 1,
                Some(Token::Punct(")")) => return true,
                _ => return false,
            }
        }
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat("(") {
                let name = match &expr {
                    Expr::Var(n) => n.clone(),
                    _ => return Err(ExprError::Unsupported("indirect call".into())),
                };
                let mut args = Vec::new();
                if !self.eat(")") {
                    loop {
                        args.push(self.ternary()?);
                        if self.eat(")") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                expr = Expr::Call(name, args);
            } else if self.eat("[") {
                let index = self.ternary()?;
                self.expect("]")?;
                expr = match (&expr, &index) {
                    (Expr::Var(base), Expr::Int(i)) => Expr::Var(format!("{base}[{i}]")),
                    _ => Expr::Index(Box::new(expr), Box::new(index)),
                };
            } else if self.eat("->") || self.eat(".") {
                let sep = match self.tokens.get(self.pos - 1) {
                    Some(Token::Punct("->")) => "->",
                    _ => ".",
                };
                let field = match self.peek() {
                    Some(Token::Ident(f)) => f.clone(),
                    _ => {
                        return Err(ExprError::Expected {
                            expected: "field name",
                            found: self.describe_current(),
                        })
                    }
                };
                self.pos += 1;
                expr = match expr {
                    Expr::Var(base) => Expr::Var(format!("{base}{sep}{field}")),
                    _ => return Err(ExprError::Unsupported("member of non-variable".into())),
                };
            } else if matches!(self.peek(), Some(Token::Punct("++")) | Some(Token::Punct("--"))) {
                return Err(ExprError::Unsupported("increment inside expression".into()));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let tok = self.peek().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match tok {
            Token::Int(v) => Ok(Expr::Int(*v)),
            Token::Real(v) => Ok(Expr::Real(*v)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "defined" => {
                    let parens = self.eat("(");
                    let macro_name = match self.peek() {
                        Some(Token::Ident(m)) => m.clone(),
                        _ => {
                            return Err(ExprError::Expected {
                                expected: "macro name",
                                found: self.describe_current(),
                            })
                        }
                    };
                    self.pos += 1;
                    if parens {
                        self.expect(")")?;
                    }
                    Ok(Expr::Defined(macro_name))
                }
                "sizeof" => Err(ExprError::Unsupported("sizeof".into())),
                _ => Ok(Expr::Var(name.clone())),
            },
            Token::Punct("(") => {
                let inner = self.ternary()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct(p) => Err(ExprError::Expected {
                expected: "operand",
                found: (*p).to_string(),
            }),
        }
    }
}
