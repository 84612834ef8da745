//! Tokenizer for C expression text

use super::ExprError;
use crate::shared::models::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i128),
    Real(f64),
    Ident(String),
    /// Punctuator or operator, longest match first
    Punct(&'static str),
}

const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "(", ")", "[", "]", ".", "!", "~", "+", "-", "*", "/",
    "%", "<", ">", "&", "|", "^", "?", ":", ",", "=",
];

pub fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())) {
            let start = i;
            let is_hex = c == '0' && matches!(bytes.get(i + 1), Some(b'x') | Some(b'X'));
            if is_hex {
                i += 2;
            }
            while i < bytes.len() {
                let b = bytes[i] as char;
                let exponent_sign = !is_hex
                    && (b == '+' || b == '-')
                    && matches!(bytes[i - 1], b'e' | b'E');
                if b.is_ascii_alphanumeric() || b == '.' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            let literal = &text[start..i];
            let token = match ScalarValue::parse_c_literal(literal) {
                Some(ScalarValue::Int(v)) => Token::Int(v),
                Some(ScalarValue::Real(v)) => Token::Real(v),
                _ => return Err(ExprError::BadLiteral(literal.to_string())),
            };
            tokens.push(token);
            continue;
        }

        if c == '\'' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'\'' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            let literal = text.get(start..i.min(text.len())).unwrap_or_default();
            match ScalarValue::parse_c_literal(literal) {
                Some(ScalarValue::Int(v)) => tokens.push(Token::Int(v)),
                _ => return Err(ExprError::BadLiteral(literal.to_string())),
            }
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token::Ident(text[start..i].to_string()));
            continue;
        }

        if c == '"' {
            return Err(ExprError::Unsupported("string literal".into()));
        }

        let rest = &text[i..];
        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                tokens.push(Token::Punct(*p));
                i += p.len();
            }
            None => return Err(ExprError::UnexpectedChar(c)),
        }
    }

    Ok(tokens)
}
