//! Recursive descent parser for expressions and startup statements.
//!
//! Precedence, lowest first:
//! `lambda`, `x if c else y`, `or`, `and`, `not`, comparisons,
//! `+ -`, `* / // %`, unary `- +`, `**`, calls/subscripts, atoms.

use super::ast::{BinOp, CmpOp, Expr, Stmt, UnaryOp};
use super::error::{Result, ScriptError};
use super::lexer::{tokenize, Spanned, Token};
use super::value::ScriptValue;
use std::rc::Rc;

/// Maximum nesting of brackets and unary operators.
pub const MAX_NESTING: usize = 128;

/// Parse a single expression (the body of a script node).
pub fn parse_expression(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens);
    parser.skip_newlines();
    let expr = parser.parse_expr()?;
    parser.skip_newlines();
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a startup script: statements separated by newlines or `;`.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens);
    let mut stmts = Vec::new();

    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.parse_stmt()?);
        if !parser.at_end() && !parser.at_separator() {
            return Err(parser.unexpected("end of statement"));
        }
    }

    Ok(stmts)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_separator(&self) -> bool {
        matches!(self.peek(), Some(Token::Newline | Token::Semicolon))
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Byte offset of the current token (source length at the end).
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.span.start)
            .unwrap_or(self.source.len())
    }

    fn unexpected(&self, wanted: &str) -> ScriptError {
        match self.peek() {
            Some(token) => ScriptError::parse(
                self.offset(),
                format!("expected {}, found {}", wanted, token),
            ),
            None => ScriptError::parse(
                self.offset(),
                format!("expected {}, found end of input", wanted),
            ),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn skip_separators(&mut self) {
        while self.at_separator() {
            self.pos += 1;
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.claim_level()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn claim_level(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::parse(
                self.offset(),
                format!("nesting depth exceeded (max {})", MAX_NESTING),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Parse a left-associative chain. Every operator folded in by `f`
    /// claims a nesting level, so the tree depth stays under `MAX_NESTING`.
    fn chain<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let base = self.depth;
        let result = f(self);
        self.depth = base;
        result
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Token::Def) => self.parse_def(),
            Some(Token::Import | Token::From) => Ok(self.parse_import()),
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Assign) => {
                let name = self.expect_ident()?;
                self.expect(&Token::Assign)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { name, value })
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    /// `def name(a, b): return expr`
    fn parse_def(&mut self) -> Result<Stmt> {
        self.expect(&Token::Def)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_params(&Token::RParen)?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::Colon)?;
        self.skip_newlines();
        self.expect(&Token::Return)?;
        let body = self.parse_expr()?;
        Ok(Stmt::Def {
            name,
            params,
            body: Rc::new(body),
        })
    }

    fn parse_import(&mut self) -> Stmt {
        let start = self.offset();
        while !self.at_end() && !self.at_separator() {
            self.pos += 1;
        }
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|last| self.tokens.get(last))
            .map(|s| s.span.end)
            .unwrap_or(start)
            .max(start);
        Stmt::Import(self.source[start..end].to_string())
    }

    fn parse_params(&mut self, terminator: &Token) -> Result<Vec<String>> {
        let mut params = Vec::new();
        while !self.check(terminator) {
            let name = self.expect_ident()?;
            if params.contains(&name) {
                return Err(ScriptError::parse(
                    self.offset(),
                    format!("duplicate parameter '{}'", name),
                ));
            }
            params.push(name);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr> {
        self.nested(|p| {
            if p.eat(&Token::Lambda) {
                let params = p.parse_params(&Token::Colon)?;
                p.expect(&Token::Colon)?;
                let body = p.parse_expr()?;
                return Ok(Expr::Lambda {
                    params,
                    body: Rc::new(body),
                });
            }
            p.parse_conditional()
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let then = self.parse_or()?;
        if !self.eat(&Token::If) {
            return Ok(then);
        }
        let cond = self.parse_or()?;
        self.expect(&Token::Else)?;
        let otherwise = self.parse_expr()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.chain(|p| {
            let mut left = p.parse_and()?;
            while p.eat(&Token::Or) {
                p.claim_level()?;
                let right = p.parse_and()?;
                left = Expr::Or(Box::new(left), Box::new(right));
            }
            Ok(left)
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.chain(|p| {
            let mut left = p.parse_not()?;
            while p.eat(&Token::And) {
                p.claim_level()?;
                let right = p.parse_not()?;
                left = Expr::And(Box::new(left), Box::new(right));
            }
            Ok(left)
        })
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            let operand = self.nested(|p| p.parse_not())?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.parse_cmp_op() {
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::In => CmpOp::In,
            Token::Not if self.peek_at(1) == Some(&Token::In) => {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            Token::Is if self.peek_at(1) == Some(&Token::Not) => {
                self.pos += 2;
                return Some(CmpOp::IsNot);
            }
            Token::Is => CmpOp::Is,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_sum(&mut self) -> Result<Expr> {
        self.chain(|p| {
            let mut left = p.parse_term()?;
            loop {
                let op = match p.peek() {
                    Some(Token::Plus) => BinOp::Add,
                    Some(Token::Minus) => BinOp::Sub,
                    _ => break,
                };
                p.claim_level()?;
                p.pos += 1;
                let right = p.parse_term()?;
                left = binary(op, left, right);
            }
            Ok(left)
        })
    }

    fn parse_term(&mut self) -> Result<Expr> {
        self.chain(|p| {
            let mut left = p.parse_unary()?;
            loop {
                let op = match p.peek() {
                    Some(Token::Star) => BinOp::Mul,
                    Some(Token::Slash) => BinOp::Div,
                    Some(Token::DoubleSlash) => BinOp::FloorDiv,
                    Some(Token::Percent) => BinOp::Mod,
                    _ => break,
                };
                p.claim_level()?;
                p.pos += 1;
                let right = p.parse_unary()?;
                left = binary(op, left, right);
            }
            Ok(left)
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// `**` binds tighter than unary minus on its left, looser on its right.
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.nested(|p| p.parse_unary())?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        self.chain(|p| {
            let mut expr = p.parse_atom()?;
            loop {
                if p.eat(&Token::LParen) {
                    p.claim_level()?;
                    let args = p.parse_sequence(&Token::RParen)?;
                    p.expect(&Token::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                } else if p.eat(&Token::LBracket) {
                    p.claim_level()?;
                    expr = p.parse_subscript(expr)?;
                    p.expect(&Token::RBracket)?;
                } else {
                    break;
                }
            }
            Ok(expr)
        })
    }

    fn parse_subscript(&mut self, target: Expr) -> Result<Expr> {
        let start = if self.check(&Token::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if !self.eat(&Token::Colon) {
            let index = start.ok_or_else(|| self.unexpected("an index"))?;
            return Ok(Expr::Index {
                target: Box::new(target),
                index,
            });
        }
        let stop = if self.check(&Token::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        Ok(Expr::Slice {
            target: Box::new(target),
            start,
            stop,
        })
    }

    /// Comma-separated expressions up to (not including) `terminator`.
    /// A trailing comma is allowed.
    fn parse_sequence(&mut self, terminator: &Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(terminator) {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let offset = self.offset();
        let token = self.advance().ok_or_else(|| {
            ScriptError::parse(offset, "expected an expression, found end of input")
        })?;
        match token {
            Token::Int(n) => Ok(Expr::Const(ScriptValue::Int(n))),
            Token::Float(x) => Ok(Expr::Const(ScriptValue::Float(x))),
            Token::Str(s) => {
                let mut text = s;
                // Adjacent string literals concatenate.
                while let Some(Token::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Const(ScriptValue::Str(text)))
            }
            Token::True => Ok(Expr::Const(ScriptValue::Bool(true))),
            Token::False => Ok(Expr::Const(ScriptValue::Bool(false))),
            Token::None => Ok(Expr::Const(ScriptValue::None)),
            Token::Ident(name) => Ok(Expr::Name(name)),
            Token::LParen => self.nested(|p| p.parse_parenthesized()),
            Token::LBracket => self.nested(|p| {
                let items = p.parse_sequence(&Token::RBracket)?;
                p.expect(&Token::RBracket)?;
                Ok(Expr::List(items))
            }),
            Token::LBrace => self.nested(|p| p.parse_dict()),
            other => Err(ScriptError::parse(
                offset,
                format!("expected an expression, found {}", other),
            )),
        }
    }

    /// `()` and `(a, b)` are lists; `(a)` is just `a`.
    fn parse_parenthesized(&mut self) -> Result<Expr> {
        if self.eat(&Token::RParen) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.eat(&Token::RParen) {
            return Ok(first);
        }
        self.expect(&Token::Comma)?;
        let mut items = vec![first];
        items.extend(self.parse_sequence(&Token::RParen)?);
        self.expect(&Token::RParen)?;
        Ok(Expr::List(items))
    }

    fn parse_dict(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        while !self.check(&Token::RBrace) {
            let key = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr::Dict(entries))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
