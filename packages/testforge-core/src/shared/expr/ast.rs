//! Expression tree

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    AddrOf,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// `a op b` ⇔ `b op' a`
    pub fn mirrored(self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Ge => BinaryOp::Le,
            other => other,
        }
    }
}

/// Parsed C expression.
///
/// Access paths (`p->len`, `s.f`, `buf[2]`, `*p`) are folded into
/// [`Expr::Var`] with their source spelling as the name.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i128),
    Real(f64),
    Bool(bool),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Cast(String, Box<Expr>),
    /// Array access with a non-literal index
    Index(Box<Expr>, Box<Expr>),
    /// Preprocessor `defined(NAME)`
    Defined(String),
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn not(e: Expr) -> Expr {
        Expr::Unary(UnaryOp::Not, Box::new(e))
    }

    /// Variable names referenced (access paths count as one name)
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(n) => {
                out.insert(n.clone());
            }
            Expr::Unary(_, e) | Expr::Cast(_, e) => e.collect_vars(out),
            Expr::Binary(_, a, b) | Expr::Index(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::Ternary(c, a, b) => {
                c.collect_vars(out);
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_vars(out)),
            Expr::Int(_) | Expr::Real(_) | Expr::Bool(_) | Expr::Defined(_) => {}
        }
    }

    /// Names of functions called anywhere in the expression
    pub fn callees(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Call(name, _) = e {
                out.push(name.clone());
            }
        });
        out
    }

    /// Pre-order visit
    pub fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Unary(_, e) | Expr::Cast(_, e) => e.visit(f),
            Expr::Binary(_, a, b) | Expr::Index(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            Expr::Ternary(c, a, b) => {
                c.visit(f);
                a.visit(f);
                b.visit(f);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.visit(f)),
            _ => {}
        }
    }

    /// Replace variables through `subst`, leaving unmatched names alone
    pub fn substitute(&self, subst: &dyn Fn(&str) -> Option<Expr>) -> Expr {
        match self {
            Expr::Var(n) => subst(n).unwrap_or_else(|| self.clone()),
            Expr::Unary(op, e) => Expr::Unary(*op, Box::new(e.substitute(subst))),
            Expr::Cast(t, e) => Expr::Cast(t.clone(), Box::new(e.substitute(subst))),
            Expr::Binary(op, a, b) => Expr::binary(*op, a.substitute(subst), b.substitute(subst)),
            Expr::Index(a, b) => {
                Expr::Index(Box::new(a.substitute(subst)), Box::new(b.substitute(subst)))
            }
            Expr::Ternary(c, a, b) => Expr::Ternary(
                Box::new(c.substitute(subst)),
                Box::new(a.substitute(subst)),
                Box::new(b.substitute(subst)),
            ),
            Expr::Call(n, args) => Expr::Call(n.clone(), args.iter().map(|a| a.substitute(subst)).collect()),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Real(v) => write!(f, "{v:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Var(n) => f.write_str(n),
            Expr::Unary(op, e) => {
                let sym = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::BitNot => "~",
                    UnaryOp::AddrOf => "&",
                    UnaryOp::Deref => "*",
                };
                match e.as_ref() {
                    Expr::Binary(..) | Expr::Ternary(..) => write!(f, "{sym}{e}"),
                    Expr::Unary(..) | Expr::Cast(..) => write!(f, "{sym}({e})"),
                    _ => write!(f, "{sym}{e}"),
                }
            }
            Expr::Binary(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            Expr::Ternary(c, a, b) => write!(f, "({c} ? {a} : {b})"),
            Expr::Call(n, args) => {
                write!(f, "{n}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Cast(t, e) => write!(f, "({t}){e}"),
            Expr::Index(a, b) => write!(f, "{a}[{b}]"),
            Expr::Defined(n) => write!(f, "defined({n})"),
        }
    }
}

/// Effect of a statement on local state along a path
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Assign { target: String, value: Expr },
    /// Target changes in a way that cannot be expressed
    Havoc { target: String },
    None,
}

impl Effect {
    pub fn increment(target: String, up: bool) -> Effect {
        let op = if up { BinaryOp::Add } else { BinaryOp::Sub };
        Effect::Assign {
            value: Expr::binary(op, Expr::Var(target.clone()), Expr::Int(1)),
            target,
        }
    }
}
