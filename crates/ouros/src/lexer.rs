//! Source text → token stream, with significant-indentation handling.
//!
//! Implements the pipeline from spec.md §4.1: normalise line endings, strip
//! comments (respecting string literals), join backslash-continued lines,
//! desugar `;` into a synthetic newline at the current indentation, lex
//! tokens, reject unsupported literal forms, suppress newlines inside
//! balanced brackets, and turn leading whitespace into `Indent`/`Dedent`
//! tokens via a column-width stack.

use std::fmt;

use num_bigint::BigInt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(BigInt),
    Float(f64),
    Str(String),
    FString(String),
    RawStr(String),
    Name(String),
    Keyword(&'static str),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {} (line {})", self.message, self.line)
    }
}

impl std::error::Error for LexError {}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "match",
    "case", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Multi-char operators, longest first so the scanner's greedy match never
/// splits e.g. `**=` into `**` + `=`.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", "==", "<=", ">=", "->", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "**", "//", "<<", ">>", "+", "-", "*", "/", "%", "@", "&", "|", "^", "~", "<", ">", "=", "(", ")", "[",
    "]", "{", "}", ",", ":", ".", ";",
];

struct LineJoiner;

impl LineJoiner {
    /// Normalises line endings, strips comments (outside strings),
    /// desugars `;` to a newline at the current line's indentation, and
    /// joins backslash-continued lines, all in one scan so string-literal
    /// boundaries are only tracked once.
    fn process(src: &str) -> String {
        let src = src.replace("\r\n", "\n").replace('\r', "\n");
        let mut out = String::with_capacity(src.len());
        let bytes: Vec<char> = src.chars().collect();
        let mut i = 0;
        let mut in_string: Option<(char, bool, bool)> = None; // (quote, triple, raw)
        let mut line_indent = String::new();
        let mut at_line_start = true;
        while i < bytes.len() {
            let c = bytes[i];
            if at_line_start && in_string.is_none() {
                let start = i;
                while i < bytes.len() && (bytes[i] == ' ' || bytes[i] == '\t') {
                    i += 1;
                }
                line_indent = bytes[start..i].iter().collect();
                out.push_str(&line_indent);
                at_line_start = false;
                continue;
            }
            if let Some((quote, triple, raw)) = in_string {
                if !raw && c == '\\' && i + 1 < bytes.len() {
                    out.push(c);
                    out.push(bytes[i + 1]);
                    i += 2;
                    continue;
                }
                if c == quote {
                    if triple {
                        if i + 2 < bytes.len() && bytes[i + 1] == quote && bytes[i + 2] == quote {
                            out.push(quote);
                            out.push(quote);
                            out.push(quote);
                            i += 3;
                            in_string = None;
                            continue;
                        }
                    } else {
                        out.push(c);
                        i += 1;
                        in_string = None;
                        continue;
                    }
                }
                if c == '\n' {
                    at_line_start = true;
                }
                out.push(c);
                i += 1;
                continue;
            }
            match c {
                '#' => {
                    while i < bytes.len() && bytes[i] != '\n' {
                        i += 1;
                    }
                }
                '\\' if i + 1 < bytes.len() && bytes[i + 1] == '\n' => {
                    i += 2;
                }
                ';' => {
                    out.push('\n');
                    out.push_str(&line_indent);
                    i += 1;
                }
                '\n' => {
                    out.push('\n');
                    at_line_start = true;
                    i += 1;
                }
                '"' | '\'' => {
                    let raw = i > 0 && matches!(bytes[i - 1], 'r' | 'R');
                    let triple = i + 2 < bytes.len() && bytes[i + 1] == c && bytes[i + 2] == c;
                    out.push(c);
                    if triple {
                        out.push(c);
                        out.push(c);
                        i += 3;
                    } else {
                        i += 1;
                    }
                    in_string = Some((c, triple, raw));
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }
}

pub struct Lexer;

impl Lexer {
    pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
        let processed = LineJoiner::process(source);
        let chars: Vec<char> = processed.chars().collect();
        let mut tokens = Vec::new();
        let mut indent_stack = vec![0usize];
        let mut line: u32 = 1;
        let mut i = 0usize;
        let mut bracket_depth: i32 = 0;
        let mut at_line_start = true;
        let mut pending_blank_or_comment_only = false;

        while i < chars.len() {
            if at_line_start {
                let start = i;
                let mut col = 0usize;
                while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                    col += if chars[i] == '\t' { 8 - (col % 8) } else { 1 };
                    i += 1;
                }
                // A line that is blank or starts a comment contributes no
                // indentation change and no Newline token.
                if i >= chars.len() || chars[i] == '\n' {
                    at_line_start = false;
                    pending_blank_or_comment_only = true;
                    let _ = start;
                    continue;
                }
                at_line_start = false;
                if bracket_depth == 0 {
                    let top = *indent_stack.last().unwrap();
                    if col > top {
                        indent_stack.push(col);
                        tokens.push(Token { kind: TokenKind::Indent, line });
                    } else if col < top {
                        while *indent_stack.last().unwrap() > col {
                            indent_stack.pop();
                            tokens.push(Token { kind: TokenKind::Dedent, line });
                        }
                        if *indent_stack.last().unwrap() != col {
                            return Err(LexError { message: "unindent does not match any outer indentation level".into(), line });
                        }
                    }
                }
                continue;
            }

            let c = chars[i];
            match c {
                '\n' => {
                    if bracket_depth == 0 && !pending_blank_or_comment_only && !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Newline) | None) {
                        tokens.push(Token { kind: TokenKind::Newline, line });
                    }
                    pending_blank_or_comment_only = false;
                    line += 1;
                    i += 1;
                    at_line_start = true;
                }
                ' ' | '\t' => {
                    i += 1;
                }
                '(' | '[' | '{' => {
                    bracket_depth += 1;
                    let s: &'static str = match c {
                        '(' => "(",
                        '[' => "[",
                        _ => "{",
                    };
                    tokens.push(Token { kind: TokenKind::Op(s), line });
                    i += 1;
                }
                ')' | ']' | '}' => {
                    bracket_depth = (bracket_depth - 1).max(0);
                    let s: &'static str = match c {
                        ')' => ")",
                        ']' => "]",
                        _ => "}",
                    };
                    tokens.push(Token { kind: TokenKind::Op(s), line });
                    i += 1;
                }
                '"' | '\'' => {
                    let (tok, consumed) = Self::lex_string(&chars, i, line, false, false)?;
                    tokens.push(tok);
                    i += consumed;
                }
                c if c.is_ascii_digit() => {
                    let (tok, consumed) = Self::lex_number(&chars, i, line)?;
                    tokens.push(tok);
                    i += consumed;
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    if (word == "r" || word == "R" || word == "f" || word == "F" || word == "rf" || word == "fr")
                        && i < chars.len()
                        && matches!(chars[i], '"' | '\'')
                    {
                        let is_f = word.to_ascii_lowercase().contains('f');
                        let is_r = word.to_ascii_lowercase().contains('r');
                        let (tok, consumed) = Self::lex_string(&chars, i, line, is_f, is_r)?;
                        tokens.push(tok);
                        i += consumed;
                        continue;
                    }
                    if word == "j" || word == "J" {
                        return Err(LexError { message: "complex-number literals are not supported".into(), line });
                    }
                    if let Some(&kw) = KEYWORDS.iter().find(|&&k| k == word) {
                        tokens.push(Token { kind: TokenKind::Keyword(kw), line });
                    } else {
                        tokens.push(Token { kind: TokenKind::Name(word), line });
                    }
                }
                _ => {
                    let rest: String = chars[i..(i + 3).min(chars.len())].iter().collect();
                    let Some(&op) = OPERATORS.iter().find(|&&op| rest.starts_with(op)) else {
                        return Err(LexError { message: format!("unexpected character '{c}'"), line });
                    };
                    tokens.push(Token { kind: TokenKind::Op(op), line });
                    i += op.chars().count();
                }
            }
        }
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Newline) | None) {
            tokens.push(Token { kind: TokenKind::Newline, line });
        }
        while indent_stack.len() > 1 {
            indent_stack.pop();
            tokens.push(Token { kind: TokenKind::Dedent, line });
        }
        tokens.push(Token { kind: TokenKind::Eof, line });
        Ok(tokens)
    }

    fn lex_number(chars: &[char], start: usize, line: u32) -> Result<(Token, usize), LexError> {
        let mut i = start;
        if chars[i] == '0' && i + 1 < chars.len() && matches!(chars[i + 1], 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            let radix_char = chars[i + 1];
            let radix = match radix_char {
                'x' | 'X' => 16,
                'o' | 'O' => 8,
                _ => 2,
            };
            i += 2;
            let digit_start = i;
            while i < chars.len() && (chars[i].is_ascii_hexdigit() || chars[i] == '_') {
                i += 1;
            }
            let digits: String = chars[digit_start..i].iter().filter(|&&c| c != '_').collect();
            let value = BigInt::parse_bytes(digits.as_bytes(), radix)
                .ok_or_else(|| LexError { message: "invalid numeric literal".into(), line })?;
            return Ok((Token { kind: TokenKind::Int(value), line }, i - start));
        }
        let digit_start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
            i += 1;
        }
        let mut is_float = false;
        if i < chars.len() && chars[i] == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            is_float = true;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
        } else if i < chars.len() && chars[i] == '.' && (i + 1 >= chars.len() || !chars[i + 1].is_alphabetic()) {
            is_float = true;
            i += 1;
        }
        if i < chars.len() && matches!(chars[i], 'e' | 'E') {
            let mut j = i + 1;
            if j < chars.len() && matches!(chars[j], '+' | '-') {
                j += 1;
            }
            if j < chars.len() && chars[j].is_ascii_digit() {
                is_float = true;
                i = j;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }
        if i < chars.len() && (chars[i] == 'j' || chars[i] == 'J') {
            return Err(LexError { message: "complex-number literals are not supported".into(), line });
        }
        let text: String = chars[digit_start..i].iter().filter(|&&c| c != '_').collect();
        if is_float {
            let value: f64 = text.parse().map_err(|_| LexError { message: "invalid float literal".into(), line })?;
            Ok((Token { kind: TokenKind::Float(value), line }, i - start))
        } else {
            let value = BigInt::parse_bytes(text.as_bytes(), 10)
                .ok_or_else(|| LexError { message: "invalid numeric literal".into(), line })?;
            Ok((Token { kind: TokenKind::Int(value), line }, i - start))
        }
    }

    fn lex_string(chars: &[char], start: usize, line: u32, is_f: bool, is_raw: bool) -> Result<(Token, usize), LexError> {
        let quote = chars[start];
        let triple = start + 2 < chars.len() && chars[start + 1] == quote && chars[start + 2] == quote;
        let mut i = start + if triple { 3 } else { 1 };
        let mut value = String::new();
        loop {
            if i >= chars.len() {
                return Err(LexError { message: "unterminated string literal".into(), line });
            }
            let c = chars[i];
            if c == quote {
                if triple {
                    if i + 2 < chars.len() && chars[i + 1] == quote && chars[i + 2] == quote {
                        i += 3;
                        break;
                    }
                } else {
                    i += 1;
                    break;
                }
            }
            if c == '\\' && !is_raw {
                i += 1;
                if i >= chars.len() {
                    return Err(LexError { message: "unterminated string literal".into(), line });
                }
                let escaped = chars[i];
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    'a' => value.push('\u{7}'),
                    'b' => value.push('\u{8}'),
                    'f' => value.push('\u{c}'),
                    'v' => value.push('\u{b}'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\n' => {}
                    'x' => {
                        let hex: String = chars[i + 1..(i + 3).min(chars.len())].iter().collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| LexError { message: "invalid \\x escape".into(), line })?;
                        value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        i += 2;
                    }
                    'u' => {
                        let hex: String = chars[i + 1..(i + 5).min(chars.len())].iter().collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| LexError { message: "invalid \\u escape".into(), line })?;
                        value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        i += 4;
                    }
                    'U' => {
                        let hex: String = chars[i + 1..(i + 9).min(chars.len())].iter().collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| LexError { message: "invalid \\U escape".into(), line })?;
                        value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        i += 8;
                    }
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                i += 1;
                continue;
            }
            if c == '\\' && is_raw {
                value.push(c);
                i += 1;
                if i < chars.len() {
                    value.push(chars[i]);
                    i += 1;
                }
                continue;
            }
            if c == '\n' && !triple {
                return Err(LexError { message: "unterminated string literal".into(), line });
            }
            value.push(c);
            i += 1;
        }
        let kind = if is_f { TokenKind::FString(value) } else if is_raw { TokenKind::RawStr(value) } else { TokenKind::Str(value) };
        Ok((Token { kind, line }, i - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn indentation_emits_indent_and_dedent() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
    }

    #[test]
    fn semicolon_splits_statements() {
        let toks = kinds("x = 1; y = 2\n");
        let newline_count = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn hex_and_underscore_literals() {
        let toks = kinds("0x1F\n1_000\n");
        assert_eq!(toks[0], TokenKind::Int(BigInt::from(31)));
        assert_eq!(toks[2], TokenKind::Int(BigInt::from(1000)));
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let toks = kinds("\"\"\"a\nb\"\"\"\n");
        assert_eq!(toks[0], TokenKind::Str("a\nb".into()));
    }

    #[test]
    fn mismatched_dedent_is_an_error() {
        let err = Lexer::lex("if x:\n   y = 1\n  z = 2\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }

    #[test]
    fn newline_suppressed_inside_brackets() {
        let toks = kinds("x = [\n1,\n2,\n]\n");
        let newline_count = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn rejects_complex_number_suffix() {
        assert!(Lexer::lex("1j\n").is_err());
    }
}
