//! Tokenizer for the expression language, built on logos.

use super::error::{Result, ScriptError};
use logos::{Logos, Span};
use std::fmt;
use thiserror::Error;

/// A token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Default)]
pub enum LexError {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("invalid number literal")]
    InvalidNumber,
}

/// Tokens of the expression language.
///
/// Keywords are `#[token]`s so they win over the identifier regex on an
/// exact match; longer identifiers (`android`) still lex as identifiers.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\f]+|#[^\n]*|\\\r?\n")]
pub enum Token {
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("lambda")]
    Lambda,
    #[token("def")]
    Def,
    #[token("return")]
    Return,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    #[token("**")]
    DoubleStar,
    #[token("//")]
    DoubleSlash,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("\n")]
    Newline,

    #[regex(r"[0-9]+", lex_int)]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", lex_float)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", lex_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_float)]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", lex_string)]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Whether this token opens a bracketed group.
    fn opens(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    fn closes(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::Not => write!(f, "'not'"),
            Token::In => write!(f, "'in'"),
            Token::Is => write!(f, "'is'"),
            Token::If => write!(f, "'if'"),
            Token::Else => write!(f, "'else'"),
            Token::Lambda => write!(f, "'lambda'"),
            Token::Def => write!(f, "'def'"),
            Token::Return => write!(f, "'return'"),
            Token::Import => write!(f, "'import'"),
            Token::From => write!(f, "'from'"),
            Token::True => write!(f, "'True'"),
            Token::False => write!(f, "'False'"),
            Token::None => write!(f, "'None'"),
            Token::DoubleStar => write!(f, "'**'"),
            Token::DoubleSlash => write!(f, "'//'"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::Le => write!(f, "'<='"),
            Token::Ge => write!(f, "'>='"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Assign => write!(f, "'='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Dot => write!(f, "'.'"),
            Token::Newline => write!(f, "newline"),
            Token::Int(n) => write!(f, "integer {}", n),
            Token::Float(x) => write!(f, "float {}", x),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Ident(name) => write!(f, "name '{}'", name),
        }
    }
}

fn lex_int(lex: &mut logos::Lexer<Token>) -> std::result::Result<i64, LexError> {
    lex.slice().parse().map_err(|_| LexError::InvalidNumber)
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> std::result::Result<f64, LexError> {
    lex.slice().parse().map_err(|_| LexError::InvalidNumber)
}

/// Strip the quotes and process backslash escapes. Unknown escapes keep
/// the backslash.
fn lex_string(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Tokenize source text.
///
/// Newlines inside brackets are dropped so expressions can span lines.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>> {
    let mut tokens = Vec::new();
    let mut depth: usize = 0;

    for (result, span) in Token::lexer(source).spanned() {
        let token = result.map_err(|e| ScriptError::Lex {
            pos: span.start,
            message: format!("{} {:?}", e, &source[span.clone()]),
        })?;
        if token.opens() {
            depth += 1;
        } else if token.closes() {
            depth = depth.saturating_sub(1);
        } else if token == Token::Newline && depth > 0 {
            continue;
        }
        tokens.push(Spanned::new(token, span));
    }

    Ok(tokens)
}
