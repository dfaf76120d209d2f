//! Recursive-descent parser over the token stream, per spec.md §4.2.
//!
//! No error recovery: the first malformed construct aborts parsing with a
//! [`ParseError`] naming the line and what was expected, which becomes
//! `Error{kind: syntax}` at the Core API boundary.

use std::rc::Rc;

use crate::{
    ast::*,
    lexer::{Lexer, Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {} (line {})", self.message, self.line)
    }
}

impl std::error::Error for ParseError {}

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses a complete module from source text.
pub fn parse(source: &str) -> PResult<Module> {
    let tokens = Lexer::lex(source).map_err(|e| ParseError { message: e.message, line: e.line })?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

/// Parses a single expression from source text (used for f-string
/// sub-expressions, which are lexed independently of their enclosing
/// string literal).
fn parse_expr_source(source: &str, line: Line) -> PResult<Expr> {
    let tokens = Lexer::lex(source).map_err(|e| ParseError { message: e.message, line })?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_tuple_or_expr()?;
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn line(&self) -> Line {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), line: self.line() }
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.err(format!("expected '{op}'")))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.err(format!("expected '{kw}'")))
        }
    }

    fn expect_name(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.err("expected a name")),
        }
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    // --- Module & suites -----------------------------------------------

    fn parse_module(&mut self) -> PResult<Module> {
        let mut body = Vec::new();
        self.skip_blank_lines();
        while !matches!(self.peek(), TokenKind::Eof) {
            body.push(self.parse_statement()?);
            self.skip_blank_lines();
        }
        Ok(Module { body })
    }

    /// Parses an indented block, or an inline single-line suite after `:`
    /// (`if x: y = 1`).
    fn parse_suite(&mut self) -> PResult<Vec<Stmt>> {
        if matches!(self.peek(), TokenKind::Newline) {
            self.advance();
            if !matches!(self.peek(), TokenKind::Indent) {
                return Err(self.err("expected an indented block"));
            }
            self.advance();
            let mut body = Vec::new();
            self.skip_blank_lines();
            while !matches!(self.peek(), TokenKind::Dedent) {
                body.push(self.parse_statement()?);
                self.skip_blank_lines();
            }
            self.advance();
            Ok(body)
        } else {
            let mut body = vec![self.parse_simple_statement()?];
            while self.eat_op(";") {
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    break;
                }
                body.push(self.parse_simple_statement()?);
            }
            if matches!(self.peek(), TokenKind::Newline) {
                self.advance();
            }
            Ok(body)
        }
    }

    // --- Statements -------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<Stmt> {
        if self.is_op("@") {
            return self.parse_decorated();
        }
        match self.peek().clone() {
            TokenKind::Keyword("if") => self.parse_if(),
            TokenKind::Keyword("while") => self.parse_while(),
            TokenKind::Keyword("for") => self.parse_for(),
            TokenKind::Keyword("try") => self.parse_try(),
            TokenKind::Keyword("def") => self.parse_def(Vec::new()),
            TokenKind::Keyword("async") => {
                self.advance();
                self.expect_kw("def")?;
                self.parse_def(Vec::new())
            }
            TokenKind::Keyword("class") => self.parse_class(Vec::new()),
            TokenKind::Keyword("with") => self.parse_with(),
            TokenKind::Keyword("match") => self.parse_match(),
            _ => {
                let stmt = self.parse_simple_statement()?;
                if matches!(self.peek(), TokenKind::Newline) {
                    self.advance();
                } else if !matches!(self.peek(), TokenKind::Eof | TokenKind::Dedent) {
                    return Err(self.err("expected end of statement"));
                }
                Ok(stmt)
            }
        }
    }

    fn parse_decorated(&mut self) -> PResult<Stmt> {
        let mut decorators = Vec::new();
        while self.eat_op("@") {
            decorators.push(self.parse_tuple_or_expr()?);
            if matches!(self.peek(), TokenKind::Newline) {
                self.advance();
            }
            self.skip_blank_lines();
        }
        if self.is_kw("async") {
            self.advance();
        }
        if self.is_kw("def") {
            self.advance();
            self.parse_def(decorators)
        } else if self.is_kw("class") {
            self.advance();
            self.parse_class(decorators)
        } else {
            Err(self.err("expected 'def' or 'class' after decorator"))
        }
    }

    fn parse_simple_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Keyword("pass") => {
                self.advance();
                Ok(Stmt::Pass)
            }
            TokenKind::Keyword("break") => {
                self.advance();
                Ok(Stmt::Break)
            }
            TokenKind::Keyword("continue") => {
                self.advance();
                Ok(Stmt::Continue)
            }
            TokenKind::Keyword("return") => {
                self.advance();
                let value = if self.at_statement_end() { None } else { Some(self.parse_tuple_or_expr()?) };
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Keyword("yield") => {
                self.advance();
                if self.eat_kw("from") {
                    let value = self.parse_expr()?;
                    Ok(Stmt::YieldFrom { value, line })
                } else {
                    let value = if self.at_statement_end() { None } else { Some(self.parse_tuple_or_expr()?) };
                    Ok(Stmt::Yield { value, line })
                }
            }
            TokenKind::Keyword("raise") => {
                self.advance();
                if self.at_statement_end() {
                    return Ok(Stmt::Raise { exc: None, cause: None, line });
                }
                let exc = Some(self.parse_expr()?);
                let cause = if self.eat_kw("from") { Some(self.parse_expr()?) } else { None };
                Ok(Stmt::Raise { exc, cause, line })
            }
            TokenKind::Keyword("global") => {
                self.advance();
                let names = self.parse_name_list()?;
                Ok(Stmt::Global { names, line })
            }
            TokenKind::Keyword("nonlocal") => {
                self.advance();
                let names = self.parse_name_list()?;
                Ok(Stmt::Nonlocal { names, line })
            }
            TokenKind::Keyword("del") => {
                self.advance();
                let mut targets = vec![self.parse_expr()?];
                while self.eat_op(",") {
                    targets.push(self.parse_expr()?);
                }
                Ok(Stmt::Del { targets, line })
            }
            TokenKind::Keyword("assert") => {
                self.advance();
                let test = self.parse_expr()?;
                let msg = if self.eat_op(",") { Some(self.parse_expr()?) } else { None };
                Ok(Stmt::Assert { test, msg, line })
            }
            TokenKind::Keyword("import") => self.parse_import(line),
            TokenKind::Keyword("from") => self.parse_from_import(line),
            _ => self.parse_assignment_or_expr(line),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent) || self.is_op(";")
    }

    fn parse_name_list(&mut self) -> PResult<Vec<String>> {
        let mut names = vec![self.expect_name()?];
        while self.eat_op(",") {
            names.push(self.expect_name()?);
        }
        Ok(names)
    }

    fn parse_import(&mut self, line: Line) -> PResult<Stmt> {
        self.advance();
        let mut modules = Vec::new();
        loop {
            let mut name = self.expect_name()?;
            while self.eat_op(".") {
                name.push('.');
                name.push_str(&self.expect_name()?);
            }
            let alias = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
            modules.push((name, alias));
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(Stmt::Import { modules, line })
    }

    fn parse_from_import(&mut self, line: Line) -> PResult<Stmt> {
        self.advance();
        let mut module = self.expect_name()?;
        while self.eat_op(".") {
            module.push('.');
            module.push_str(&self.expect_name()?);
        }
        self.expect_kw("import")?;
        let mut names = Vec::new();
        if self.eat_op("*") {
            names.push(("*".to_owned(), None));
        } else {
            let parens = self.eat_op("(");
            loop {
                let name = self.expect_name()?;
                let alias = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
                names.push((name, alias));
                if !self.eat_op(",") {
                    break;
                }
            }
            if parens {
                self.expect_op(")")?;
            }
        }
        Ok(Stmt::FromImport { module, names, line })
    }

    /// Handles plain expression statements, simple/augmented/chained/
    /// annotated assignment — all of which start by parsing an expression
    /// and only then looking at what follows it.
    fn parse_assignment_or_expr(&mut self, line: Line) -> PResult<Stmt> {
        let first = self.parse_tuple_or_expr()?;

        if self.eat_op(":") {
            let annotation = self.parse_expr()?;
            let value = if self.eat_op("=") { Some(self.parse_tuple_or_expr()?) } else { None };
            let target = expr_to_target(first, self.line())?;
            return Ok(Stmt::AnnotatedAssign { target, annotation, value, line });
        }

        if let Some(op) = self.augmented_op() {
            self.advance();
            let value = self.parse_tuple_or_expr()?;
            let target = expr_to_target(first, line)?;
            return Ok(Stmt::AugAssign { target, op, value, line });
        }

        if self.is_op("=") {
            let mut targets = vec![first];
            let mut value = None;
            while self.eat_op("=") {
                let next = self.parse_tuple_or_expr()?;
                if self.is_op("=") {
                    targets.push(next);
                } else {
                    value = Some(next);
                }
            }
            let value = value.ok_or_else(|| self.err("expected a value after '='"))?;
            if targets.len() == 1 {
                let target = expr_to_target(targets.pop().unwrap(), line)?;
                return Ok(Stmt::Assign { target, value, line });
            }
            let targets = targets.into_iter().map(|e| expr_to_target(e, line)).collect::<PResult<Vec<_>>>()?;
            return Ok(Stmt::ChainedAssign { targets, value, line });
        }

        Ok(Stmt::Expr { value: first, line })
    }

    fn augmented_op(&self) -> Option<BinOp> {
        match self.peek() {
            TokenKind::Op("+=") => Some(BinOp::Add),
            TokenKind::Op("-=") => Some(BinOp::Sub),
            TokenKind::Op("*=") => Some(BinOp::Mul),
            TokenKind::Op("/=") => Some(BinOp::Div),
            TokenKind::Op("//=") => Some(BinOp::FloorDiv),
            TokenKind::Op("%=") => Some(BinOp::Mod),
            TokenKind::Op("**=") => Some(BinOp::Pow),
            TokenKind::Op("&=") => Some(BinOp::BitAnd),
            TokenKind::Op("|=") => Some(BinOp::BitOr),
            TokenKind::Op("^=") => Some(BinOp::BitXor),
            TokenKind::Op("<<=") => Some(BinOp::LShift),
            TokenKind::Op(">>=") => Some(BinOp::RShift),
            _ => None,
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let mut clauses = Vec::new();
        let test = self.parse_named_expr()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        clauses.push(IfClause { test, body });
        loop {
            self.skip_blank_lines();
            if self.eat_kw("elif") {
                let test = self.parse_named_expr()?;
                self.expect_op(":")?;
                let body = self.parse_suite()?;
                clauses.push(IfClause { test, body });
            } else {
                break;
            }
        }
        let orelse = if self.peek_is_else() {
            self.eat_kw("else");
            self.expect_op(":")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If { clauses, orelse, line })
    }

    fn peek_is_else(&mut self) -> bool {
        let save = self.pos;
        self.skip_blank_lines();
        let is_else = self.is_kw("else");
        if !is_else {
            self.pos = save;
        }
        is_else
    }

    fn peek_is_kw_after_blank(&mut self, kw: &str) -> bool {
        let save = self.pos;
        self.skip_blank_lines();
        let found = self.is_kw(kw);
        if !found {
            self.pos = save;
        }
        found
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let test = self.parse_named_expr()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let orelse = if self.peek_is_else() {
            self.eat_kw("else");
            self.expect_op(":")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::While { test, body, orelse, line })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let target = self.parse_target_list()?;
        self.expect_kw("in")?;
        let iter = self.parse_tuple_or_expr()?;
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let orelse = if self.peek_is_else() {
            self.eat_kw("else");
            self.expect_op(":")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::For { target, iter, body, orelse, line })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.peek_is_kw_after_blank("except") {
            self.eat_kw("except");
            let handler_line = self.line();
            let exc_type = if self.is_op(":") { None } else { Some(self.parse_exception_type_expr()?) };
            let name = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
            self.expect_op(":")?;
            let handler_body = self.parse_suite()?;
            handlers.push(ExceptHandler { exc_type, name, body: handler_body, line: handler_line });
        }
        let orelse = if self.peek_is_else() {
            self.eat_kw("else");
            self.expect_op(":")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        let finalbody = if self.peek_is_kw_after_blank("finally") {
            self.eat_kw("finally");
            self.expect_op(":")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::Try { body, handlers, orelse, finalbody, line })
    }

    /// `except (TypeError, ValueError):` collapses to a single `|`-joined
    /// prefix name, matching `Exception::matches`'s flat string comparison.
    fn parse_exception_type_expr(&mut self) -> PResult<String> {
        if self.eat_op("(") {
            let mut names = vec![self.expect_name()?];
            while self.eat_op(",") {
                names.push(self.expect_name()?);
            }
            self.expect_op(")")?;
            Ok(names.join("|"))
        } else {
            self.expect_name()
        }
    }

    fn parse_with(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let mut items = Vec::new();
        loop {
            let ctx_expr = self.parse_expr()?;
            let target = if self.eat_kw("as") { Some(self.parse_single_target()?) } else { None };
            items.push(WithItem { ctx_expr, target });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        Ok(Stmt::With { items, body, line })
    }

    fn parse_def(&mut self, decorators: Vec<Expr>) -> PResult<Stmt> {
        let line = self.line();
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let params = self.parse_params()?;
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.parse_expr()?;
        }
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        let is_generator = body_contains_yield(&body);
        Ok(Stmt::Def { name, params, body, decorators, is_generator, line })
    }

    fn parse_params(&mut self) -> PResult<Params> {
        let mut positional = Vec::new();
        let mut kwonly = Vec::new();
        let mut star_args = None;
        let mut star_kwargs = None;
        let mut seen_star = false;
        while !self.is_op(")") {
            if self.eat_op("**") {
                star_kwargs = Some(self.expect_name()?);
                break;
            }
            if self.eat_op("*") {
                if matches!(self.peek(), TokenKind::Name(_)) {
                    star_args = Some(self.expect_name()?);
                }
                seen_star = true;
                if !self.eat_op(",") {
                    break;
                }
                continue;
            }
            let name = self.expect_name()?;
            let annotation = if self.eat_op(":") { Some(self.parse_expr()?) } else { None };
            let default = if self.eat_op("=") { Some(self.parse_expr()?) } else { None };
            let param = Param { name, default, annotation };
            if seen_star {
                kwonly.push(param);
            } else {
                positional.push(param);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(Params { positional, star_args, kwonly, star_kwargs })
    }

    fn parse_class(&mut self, decorators: Vec<Expr>) -> PResult<Stmt> {
        let line = self.line();
        let name = self.expect_name()?;
        let mut bases = Vec::new();
        if self.eat_op("(") {
            while !self.is_op(")") {
                if matches!(self.peek(), TokenKind::Name(_)) {
                    let save = self.pos;
                    let n = self.expect_name()?;
                    if self.eat_op("=") {
                        // keyword base argument (e.g. metaclass=...): parse and discard.
                        self.parse_expr()?;
                    } else {
                        self.pos = save;
                        bases.push(self.parse_expr()?);
                    }
                    let _ = n;
                } else {
                    bases.push(self.parse_expr()?);
                }
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
        }
        self.expect_op(":")?;
        let body = self.parse_suite()?;
        Ok(Stmt::Class { name, bases, body, decorators, line })
    }

    fn parse_match(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let subject = self.parse_tuple_or_expr()?;
        self.expect_op(":")?;
        self.skip_newline_indent()?;
        let mut cases = Vec::new();
        while self.is_kw("case") {
            self.advance();
            let pattern = self.parse_pattern()?;
            let guard = if self.eat_kw("if") { Some(self.parse_expr()?) } else { None };
            self.expect_op(":")?;
            let body = self.parse_suite()?;
            cases.push(MatchCase { pattern, guard, body });
            self.skip_blank_lines();
        }
        self.expect_dedent()?;
        Ok(Stmt::Match { subject, cases, line })
    }

    fn skip_newline_indent(&mut self) -> PResult<()> {
        if !matches!(self.peek(), TokenKind::Newline) {
            return Err(self.err("expected newline"));
        }
        self.advance();
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.err("expected an indented block"));
        }
        self.advance();
        self.skip_blank_lines();
        Ok(())
    }

    fn expect_dedent(&mut self) -> PResult<()> {
        if matches!(self.peek(), TokenKind::Dedent) {
            self.advance();
            Ok(())
        } else {
            Err(self.err("expected dedent"))
        }
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let first = self.parse_or_pattern()?;
        Ok(first)
    }

    fn parse_or_pattern(&mut self) -> PResult<Pattern> {
        let mut alts = vec![self.parse_atom_pattern()?];
        while self.eat_op("|") {
            alts.push(self.parse_atom_pattern()?);
        }
        if alts.len() == 1 {
            Ok(alts.pop().unwrap())
        } else {
            Ok(Pattern::Or(alts))
        }
    }

    fn parse_atom_pattern(&mut self) -> PResult<Pattern> {
        match self.peek().clone() {
            TokenKind::Name(name) if name == "_" => {
                self.advance();
                Ok(Pattern::Wildcard)
            }
            TokenKind::Name(name) => {
                self.advance();
                if self.eat_op("(") {
                    let mut positional = Vec::new();
                    let mut keyword = Vec::new();
                    while !self.is_op(")") {
                        if matches!(self.peek(), TokenKind::Name(_)) {
                            let save = self.pos;
                            let kw_name = self.expect_name()?;
                            if self.eat_op("=") {
                                keyword.push((kw_name, self.parse_pattern()?));
                                if !self.eat_op(",") {
                                    break;
                                }
                                continue;
                            }
                            self.pos = save;
                        }
                        positional.push(self.parse_pattern()?);
                        if !self.eat_op(",") {
                            break;
                        }
                    }
                    self.expect_op(")")?;
                    Ok(Pattern::Class { name, positional, keyword })
                } else {
                    Ok(Pattern::Capture(name))
                }
            }
            TokenKind::Op("[") | TokenKind::Op("(") => {
                let closer = if self.is_op("[") { "]" } else { ")" };
                self.advance();
                let mut elements = Vec::new();
                let mut star_at = None;
                while !self.is_op(closer) {
                    if self.eat_op("*") {
                        star_at = Some(elements.len());
                        elements.push(Pattern::Capture(self.expect_name()?));
                    } else {
                        elements.push(self.parse_pattern()?);
                    }
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(closer)?;
                Ok(Pattern::Sequence { elements, star_at })
            }
            TokenKind::Op("{") => {
                self.advance();
                let mut keys = Vec::new();
                let mut patterns = Vec::new();
                while !self.is_op("}") {
                    keys.push(self.parse_literal()?);
                    self.expect_op(":")?;
                    patterns.push(self.parse_pattern()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("}")?;
                Ok(Pattern::Mapping { keys, patterns })
            }
            _ => Ok(Pattern::Literal(self.parse_literal()?)),
        }
    }

    fn parse_literal(&mut self) -> PResult<Literal> {
        let neg = self.eat_op("-");
        match self.advance().kind {
            TokenKind::Int(i) => Ok(Literal::Int(if neg { -i } else { i })),
            TokenKind::Float(f) => Ok(Literal::Float(if neg { -f } else { f })),
            TokenKind::Str(s) => Ok(Literal::Str(Rc::from(s.as_str()))),
            TokenKind::Keyword("True") => Ok(Literal::Bool(true)),
            TokenKind::Keyword("False") => Ok(Literal::Bool(false)),
            TokenKind::Keyword("None") => Ok(Literal::None),
            _ => Err(self.err("expected a literal pattern")),
        }
    }

    // --- Targets ------------------------------------------------------

    fn parse_target_list(&mut self) -> PResult<AssignTarget> {
        let mut elements = Vec::new();
        let mut star_at = None;
        let mut saw_comma = false;
        loop {
            if self.eat_op("*") {
                star_at = Some(elements.len());
            }
            elements.push(self.parse_single_target()?);
            if !self.eat_op(",") {
                break;
            }
            saw_comma = true;
            if self.is_kw("in") {
                break;
            }
        }
        if !saw_comma && star_at.is_none() {
            return Ok(elements.pop().unwrap());
        }
        Ok(AssignTarget::Tuple { elements, star_at })
    }

    fn parse_single_target(&mut self) -> PResult<AssignTarget> {
        if self.eat_op("(") {
            let inner = self.parse_target_list()?;
            self.expect_op(")")?;
            return Ok(inner);
        }
        let expr = self.parse_postfix_expr()?;
        expr_to_target(expr, self.line())
    }

    // --- Expressions ----------------------------------------------------

    /// Parses a bare tuple display without surrounding parentheses, used
    /// wherever a top-level expression statement, assignment value, or
    /// `return`/`yield` operand may be a comma-separated tuple.
    fn parse_tuple_or_expr(&mut self) -> PResult<Expr> {
        let line = self.line();
        let first = self.parse_named_expr()?;
        if !self.is_op(",") {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.at_statement_end() || self.is_op("=") || self.is_op(")") || self.is_op("]") || self.is_op(":") {
                break;
            }
            elements.push(self.parse_named_expr()?);
        }
        Ok(Expr::Tuple { elements, line })
    }

    fn parse_named_expr(&mut self) -> PResult<Expr> {
        if let TokenKind::Name(name) = self.peek().clone() {
            let save = self.pos;
            self.advance();
            if self.eat_op(":=") {
                let line = self.line();
                let value = Box::new(self.parse_expr()?);
                return Ok(Expr::Walrus { name, value, line });
            }
            self.pos = save;
        }
        self.parse_expr()
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        if self.is_kw("lambda") {
            return self.parse_lambda();
        }
        self.parse_ternary()
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let line = self.line();
        self.advance();
        let mut positional = Vec::new();
        let mut kwonly = Vec::new();
        let mut star_args = None;
        let mut star_kwargs = None;
        let mut seen_star = false;
        while !self.is_op(":") {
            if self.eat_op("**") {
                star_kwargs = Some(self.expect_name()?);
                break;
            }
            if self.eat_op("*") {
                if matches!(self.peek(), TokenKind::Name(_)) {
                    star_args = Some(self.expect_name()?);
                }
                seen_star = true;
                if !self.eat_op(",") {
                    break;
                }
                continue;
            }
            let name = self.expect_name()?;
            let default = if self.eat_op("=") { Some(self.parse_expr()?) } else { None };
            let param = Param { name, default, annotation: None };
            if seen_star {
                kwonly.push(param);
            } else {
                positional.push(param);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = Box::new(self.parse_expr()?);
        Ok(Expr::Lambda { params: Params { positional, star_args, kwonly, star_kwargs }, body, line })
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let line = self.line();
        let body = self.parse_or_test()?;
        if self.eat_kw("if") {
            let test = Box::new(self.parse_or_test()?);
            self.expect_kw("else")?;
            let orelse = Box::new(self.parse_expr()?);
            return Ok(Expr::Ternary { test, body: Box::new(body), orelse, line });
        }
        Ok(body)
    }

    fn parse_or_test(&mut self) -> PResult<Expr> {
        let line = self.line();
        let mut values = vec![self.parse_and_test()?];
        while self.eat_kw("or") {
            values.push(self.parse_and_test()?);
        }
        if values.len() == 1 {
            Ok(values.pop().unwrap())
        } else {
            Ok(Expr::BoolOp { op: BoolOp::Or, values, line })
        }
    }

    fn parse_and_test(&mut self) -> PResult<Expr> {
        let line = self.line();
        let mut values = vec![self.parse_not_test()?];
        while self.eat_kw("and") {
            values.push(self.parse_not_test()?);
        }
        if values.len() == 1 {
            Ok(values.pop().unwrap())
        } else {
            Ok(Expr::BoolOp { op: BoolOp::And, values, line })
        }
    }

    fn parse_not_test(&mut self) -> PResult<Expr> {
        let line = self.line();
        if self.eat_kw("not") {
            let operand = Box::new(self.parse_not_test()?);
            return Ok(Expr::UnaryOp { op: UnaryOp::Not, operand, line });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let line = self.line();
        let first = self.parse_bitwise_or()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek().clone() {
                TokenKind::Op("==") => CmpOp::Eq,
                TokenKind::Op("!=") => CmpOp::NotEq,
                TokenKind::Op("<") => CmpOp::Lt,
                TokenKind::Op("<=") => CmpOp::LtE,
                TokenKind::Op(">") => CmpOp::Gt,
                TokenKind::Op(">=") => CmpOp::GtE,
                TokenKind::Keyword("in") => CmpOp::In,
                TokenKind::Keyword("is") => {
                    self.advance();
                    let op = if self.eat_kw("not") { CmpOp::IsNot } else { CmpOp::Is };
                    rest.push((op, self.parse_bitwise_or()?));
                    continue;
                }
                TokenKind::Keyword("not") => {
                    let save = self.pos;
                    self.advance();
                    if self.eat_kw("in") {
                        rest.push((CmpOp::NotIn, self.parse_bitwise_or()?));
                        continue;
                    }
                    self.pos = save;
                    break;
                }
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_bitwise_or()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::ChainedCompare { first: Box::new(first), rest, line })
        }
    }

    fn parse_bitwise_or(&mut self) -> PResult<Expr> {
        self.parse_binop_level(&[("|", BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> PResult<Expr> {
        self.parse_binop_level(&[("^", BinOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> PResult<Expr> {
        self.parse_binop_level(&[("&", BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        self.parse_binop_level(&[("<<", BinOp::LShift), (">>", BinOp::RShift)], Self::parse_arith)
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        self.parse_binop_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::parse_term)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        self.parse_binop_level(
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("//", BinOp::FloorDiv), ("%", BinOp::Mod), ("@", BinOp::MatMul)],
            Self::parse_factor,
        )
    }

    fn parse_binop_level(&mut self, ops: &[(&str, BinOp)], mut next: impl FnMut(&mut Self) -> PResult<Expr>) -> PResult<Expr> {
        let line = self.line();
        let mut left = next(self)?;
        loop {
            let matched = ops.iter().find(|(op, _)| self.is_op(op));
            let Some((_, op)) = matched else { break };
            let op = *op;
            self.advance();
            let right = next(self)?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), line };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let line = self.line();
        let op = match self.peek() {
            TokenKind::Op("+") => Some(UnaryOp::Pos),
            TokenKind::Op("-") => Some(UnaryOp::Neg),
            TokenKind::Op("~") => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = Box::new(self.parse_factor()?);
            return Ok(Expr::UnaryOp { op, operand, line });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let line = self.line();
        let base = self.parse_postfix_expr()?;
        if self.eat_op("**") {
            let exponent = Box::new(self.parse_factor()?);
            return Ok(Expr::BinOp { left: Box::new(base), op: BinOp::Pow, right: exponent, line });
        }
        Ok(base)
    }

    fn parse_postfix_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            let line = self.line();
            if self.eat_op(".") {
                let attr = self.expect_name()?;
                expr = Expr::GetAttr { object: Box::new(expr), attr, line };
            } else if self.eat_op("(") {
                expr = self.parse_call_trailer(expr, line)?;
            } else if self.eat_op("[") {
                expr = self.parse_subscript_trailer(expr, line)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_trailer(&mut self, func: Expr, line: Line) -> PResult<Expr> {
        let mut args = Vec::new();
        let mut starred = Vec::new();
        let mut kwargs = Vec::new();
        let mut double_star = None;
        while !self.is_op(")") {
            if self.eat_op("**") {
                double_star = Some(Box::new(self.parse_expr()?));
            } else if self.eat_op("*") {
                starred.push(args.len());
                args.push(self.parse_expr()?);
            } else if let TokenKind::Name(name) = self.peek().clone() {
                let save = self.pos;
                self.advance();
                if self.eat_op("=") {
                    kwargs.push((name, self.parse_expr()?));
                } else {
                    self.pos = save;
                    args.push(self.parse_named_expr()?);
                }
            } else {
                args.push(self.parse_named_expr()?);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(Expr::Call { func: Box::new(func), args, starred, kwargs, double_star, line })
    }

    fn parse_subscript_trailer(&mut self, object: Expr, line: Line) -> PResult<Expr> {
        let index = self.parse_slice_or_index()?;
        self.expect_op("]")?;
        Ok(Expr::Subscript { object: Box::new(object), index: Box::new(index), line })
    }

    fn parse_slice_or_index(&mut self) -> PResult<Expr> {
        let line = self.line();
        let start = if self.is_op(":") { None } else { Some(Box::new(self.parse_tuple_or_expr()?)) };
        if !self.is_op(":") {
            return Ok(*start.unwrap());
        }
        self.advance();
        let stop = if self.is_op(":") || self.is_op("]") { None } else { Some(Box::new(self.parse_expr()?)) };
        let step = if self.eat_op(":") {
            if self.is_op("]") { None } else { Some(Box::new(self.parse_expr()?)) }
        } else {
            None
        };
        Ok(Expr::Slice { start, stop, step, line })
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Int(i) => {
                self.advance();
                Ok(Expr::Lit { value: Literal::Int(i), line })
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Lit { value: Literal::Float(f), line })
            }
            TokenKind::Str(s) | TokenKind::RawStr(s) => {
                self.advance();
                let mut value = s;
                while let TokenKind::Str(more) | TokenKind::RawStr(more) = self.peek().clone() {
                    self.advance();
                    value.push_str(&more);
                }
                Ok(Expr::Lit { value: Literal::Str(Rc::from(value.as_str())), line })
            }
            TokenKind::FString(s) => {
                self.advance();
                let parts = parse_fstring_parts(&s, line)?;
                Ok(Expr::FString { parts, line })
            }
            TokenKind::Keyword("True") => {
                self.advance();
                Ok(Expr::Lit { value: Literal::Bool(true), line })
            }
            TokenKind::Keyword("False") => {
                self.advance();
                Ok(Expr::Lit { value: Literal::Bool(false), line })
            }
            TokenKind::Keyword("None") => {
                self.advance();
                Ok(Expr::Lit { value: Literal::None, line })
            }
            TokenKind::Name(name) => {
                self.advance();
                Ok(Expr::Var { name, line })
            }
            TokenKind::Op("...") => {
                self.advance();
                Ok(Expr::Lit { value: Literal::None, line })
            }
            TokenKind::Op("*") => {
                self.advance();
                let value = Box::new(self.parse_or_test()?);
                Ok(Expr::Starred { value, line })
            }
            TokenKind::Op("(") => self.parse_paren_atom(line),
            TokenKind::Op("[") => self.parse_list_atom(line),
            TokenKind::Op("{") => self.parse_brace_atom(line),
            other => Err(self.err(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_paren_atom(&mut self, line: Line) -> PResult<Expr> {
        self.advance();
        if self.eat_op(")") {
            return Ok(Expr::Tuple { elements: Vec::new(), line });
        }
        let first = self.parse_named_expr()?;
        if self.is_kw("for") {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(Expr::GenExpr { element: Box::new(first), generators, line });
        }
        if self.eat_op(",") {
            let mut elements = vec![first];
            while !self.is_op(")") {
                elements.push(self.parse_named_expr()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
            return Ok(Expr::Tuple { elements, line });
        }
        self.expect_op(")")?;
        Ok(first)
    }

    fn parse_list_atom(&mut self, line: Line) -> PResult<Expr> {
        self.advance();
        if self.eat_op("]") {
            return Ok(Expr::List { elements: Vec::new(), line });
        }
        let first = self.parse_named_expr()?;
        if self.is_kw("for") {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(Expr::ListComp { element: Box::new(first), generators, line });
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.is_op("]") {
                break;
            }
            elements.push(self.parse_named_expr()?);
        }
        self.expect_op("]")?;
        Ok(Expr::List { elements, line })
    }

    fn parse_brace_atom(&mut self, line: Line) -> PResult<Expr> {
        self.advance();
        if self.eat_op("}") {
            return Ok(Expr::Dict { items: Vec::new(), line });
        }
        if self.eat_op("**") {
            let spread = self.parse_or_test()?;
            let mut items = vec![(None, spread)];
            while self.eat_op(",") {
                if self.is_op("}") {
                    break;
                }
                if self.eat_op("**") {
                    items.push((None, self.parse_or_test()?));
                } else {
                    let key = self.parse_named_expr()?;
                    self.expect_op(":")?;
                    let value = self.parse_named_expr()?;
                    items.push((Some(key), value));
                }
            }
            self.expect_op("}")?;
            return Ok(Expr::Dict { items, line });
        }
        let first = self.parse_named_expr()?;
        if self.eat_op(":") {
            let value = self.parse_named_expr()?;
            if self.is_kw("for") {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(Expr::DictComp { key: Box::new(first), value: Box::new(value), generators, line });
            }
            let mut items = vec![(Some(first), value)];
            while self.eat_op(",") {
                if self.is_op("}") {
                    break;
                }
                let key = self.parse_named_expr()?;
                self.expect_op(":")?;
                let value = self.parse_named_expr()?;
                items.push((Some(key), value));
            }
            self.expect_op("}")?;
            return Ok(Expr::Dict { items, line });
        }
        if self.is_kw("for") {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("}")?;
            return Ok(Expr::SetComp { element: Box::new(first), generators, line });
        }
        let mut elements = vec![first];
        while self.eat_op(",") {
            if self.is_op("}") {
                break;
            }
            elements.push(self.parse_named_expr()?);
        }
        self.expect_op("}")?;
        Ok(Expr::Set { elements, line })
    }

    fn parse_comprehension_clauses(&mut self) -> PResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat_kw("for") {
            let target = self.parse_target_list()?;
            self.expect_kw("in")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.eat_kw("if") {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }
}

/// Converts a parsed expression into an assignment target, rejecting
/// anything that cannot legally appear on the left of `=` (spec.md §4.6
/// "Assignment").
fn expr_to_target(expr: Expr, line: Line) -> PResult<AssignTarget> {
    match expr {
        Expr::Var { name, .. } => Ok(AssignTarget::Name(name)),
        Expr::Tuple { elements, .. } | Expr::List { elements, .. } => {
            let mut star_at = None;
            let mut targets = Vec::with_capacity(elements.len());
            for (i, e) in elements.into_iter().enumerate() {
                if let Expr::Starred { value, .. } = e {
                    star_at = Some(i);
                    targets.push(expr_to_target(*value, line)?);
                } else {
                    targets.push(expr_to_target(e, line)?);
                }
            }
            Ok(AssignTarget::Tuple { elements: targets, star_at })
        }
        Expr::Subscript { object, index, .. } => Ok(AssignTarget::Subscript { object: *object, index: *index }),
        Expr::GetAttr { object, attr, .. } => Ok(AssignTarget::Attribute { object: *object, attr }),
        Expr::Starred { value, .. } => expr_to_target(*value, line),
        _ => Err(ParseError { message: "cannot assign to this expression".into(), line }),
    }
}

fn body_contains_yield(body: &[Stmt]) -> bool {
    body.iter().any(stmt_contains_yield)
}

fn stmt_contains_yield(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Yield { .. } | Stmt::YieldFrom { .. } => true,
        Stmt::If { clauses, orelse, .. } => {
            clauses.iter().any(|c| body_contains_yield(&c.body)) || body_contains_yield(orelse)
        }
        Stmt::While { body, orelse, .. } | Stmt::For { body, orelse, .. } => {
            body_contains_yield(body) || body_contains_yield(orelse)
        }
        Stmt::Try { body, handlers, orelse, finalbody, .. } => {
            body_contains_yield(body)
                || handlers.iter().any(|h| body_contains_yield(&h.body))
                || body_contains_yield(orelse)
                || body_contains_yield(finalbody)
        }
        Stmt::With { body, .. } => body_contains_yield(body),
        Stmt::Match { cases, .. } => cases.iter().any(|c| body_contains_yield(&c.body)),
        Stmt::Expr { value, .. } => expr_contains_yield(value),
        _ => false,
    }
}

fn expr_contains_yield(_expr: &Expr) -> bool {
    false
}

/// Splits an f-string's already-escape-resolved text into literal and
/// `{expr}` parts, recursively lexing+parsing each expression part.
fn parse_fstring_parts(text: &str, line: Line) -> PResult<Vec<FStringPart>> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if i + 1 < chars.len() && chars[i + 1] == '{' => {
                literal.push('{');
                i += 2;
            }
            '}' if i + 1 < chars.len() && chars[i + 1] == '}' => {
                literal.push('}');
                i += 2;
            }
            '{' => {
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                i += 1;
                let start = i;
                let mut depth = 1;
                while i < chars.len() && depth > 0 {
                    match chars[i] {
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        i += 1;
                    }
                }
                let inner: String = chars[start..i].iter().collect();
                i += 1; // consume closing '}'
                let (expr_text, conversion, format_spec) = split_fstring_expr(&inner);
                let value = Box::new(parse_expr_source(expr_text.trim(), line)?);
                parts.push(FStringPart::Expr { value, conversion, format_spec });
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

/// Splits `expr!r:spec` (conversion and format-spec are both optional) at
/// the top nesting level only, so `{d['a:b']}` isn't mis-split.
fn split_fstring_expr(inner: &str) -> (String, Option<char>, Option<String>) {
    let chars: Vec<char> = inner.chars().collect();
    let mut depth = 0i32;
    let mut colon_at = None;
    let mut bang_at = None;
    for (idx, &c) in chars.iter().enumerate() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '!' if depth == 0 && idx + 1 < chars.len() && chars[idx + 1] != '=' && colon_at.is_none() => {
                bang_at = Some(idx);
            }
            ':' if depth == 0 && colon_at.is_none() => colon_at = Some(idx),
            _ => {}
        }
    }
    let expr_end = bang_at.or(colon_at).unwrap_or(chars.len());
    let expr_text: String = chars[..expr_end].iter().collect();
    let conversion = bang_at.map(|i| chars[i + 1]);
    let format_spec = colon_at.map(|i| chars[i + 1..].iter().collect());
    (expr_text, conversion, format_spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_assignment() {
        let module = parse("x = 1\n").unwrap();
        assert_eq!(module.body.len(), 1);
        assert!(matches!(module.body[0], Stmt::Assign { .. }));
    }

    #[test]
    fn parses_if_elif_else() {
        let module = parse("if x:\n    y = 1\nelif z:\n    y = 2\nelse:\n    y = 3\n").unwrap();
        match &module.body[0] {
            Stmt::If { clauses, orelse, .. } => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(orelse.len(), 1);
            }
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn parses_function_def_with_default_and_varargs() {
        let module = parse("def f(a, b=1, *args, **kwargs):\n    return a\n").unwrap();
        match &module.body[0] {
            Stmt::Def { params, .. } => {
                assert_eq!(params.positional.len(), 2);
                assert_eq!(params.star_args.as_deref(), Some("args"));
                assert_eq!(params.star_kwargs.as_deref(), Some("kwargs"));
            }
            _ => panic!("expected def"),
        }
    }

    #[test]
    fn parses_list_comprehension() {
        let module = parse("y = [x * x for x in range(5) if x % 2 == 0]\n").unwrap();
        match &module.body[0] {
            Stmt::Assign { value: Expr::ListComp { generators, .. }, .. } => {
                assert_eq!(generators.len(), 1);
                assert_eq!(generators[0].ifs.len(), 1);
            }
            _ => panic!("expected list comprehension"),
        }
    }

    #[test]
    fn parses_try_except_as() {
        let module = parse("try:\n    x = 1\nexcept ZeroDivisionError as e:\n    y = 2\n").unwrap();
        match &module.body[0] {
            Stmt::Try { handlers, .. } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].exc_type.as_deref(), Some("ZeroDivisionError"));
                assert_eq!(handlers[0].name.as_deref(), Some("e"));
            }
            _ => panic!("expected try"),
        }
    }

    #[test]
    fn parses_fstring_with_expression_and_conversion() {
        let module = parse("y = f\"hi {name!r}\"\n").unwrap();
        match &module.body[0] {
            Stmt::Assign { value: Expr::FString { parts, .. }, .. } => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[1], FStringPart::Expr { conversion: Some('r'), .. }));
            }
            _ => panic!("expected f-string"),
        }
    }

    #[test]
    fn parses_class_with_bases_and_decorator() {
        let module = parse("@register\nclass Foo(Base):\n    pass\n").unwrap();
        match &module.body[0] {
            Stmt::Class { name, bases, decorators, .. } => {
                assert_eq!(name, "Foo");
                assert_eq!(bases.len(), 1);
                assert_eq!(decorators.len(), 1);
            }
            _ => panic!("expected class"),
        }
    }
}
