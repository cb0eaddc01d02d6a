//! Minimal Rust tokenizer for locating marking macros.
//!
//! Only the distinctions the scanner relies on are made: identifiers, string
//! literals (unescaped exactly as the compiler would), line comments, and
//! single punctuation characters. Block comments, byte and C strings, char
//! literals, lifetimes, and numbers are consumed so that their contents can
//! never be mistaken for a macro invocation.

use thiserror::Error;

/// Classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TokenKind {
    Ident(String),
    /// A `"..."` or `r#"..."#` literal with escapes resolved.
    Str(String),
    /// Literals that can never carry message text.
    OtherLiteral,
    /// Text following `//`, without the slashes.
    LineComment(String),
    Punct(char),
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) offset: usize,
}

/// Malformed source that prevents tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub(super) struct LexError {
    pub(super) offset: usize,
    pub(super) reason: &'static str,
}

struct Cursor<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Cursor<'src> {
    const fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'src str {
        self.source.get(self.pos..).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> &'src str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.source.get(start..self.pos).unwrap_or_default()
    }

    const fn error(&self, reason: &'static str) -> LexError {
        LexError {
            offset: self.pos,
            reason,
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Split `source` into tokens.
///
/// `source` must already use `\n` line endings.
pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    while let Some(ch) = cursor.peek() {
        let offset = cursor.pos;
        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }
        if cursor.rest().starts_with("//") {
            cursor.pos += 2;
            let text = cursor.eat_while(|c| c != '\n');
            tokens.push(Token {
                kind: TokenKind::LineComment(text.to_owned()),
                offset,
            });
            continue;
        }
        if cursor.rest().starts_with("/*") {
            skip_block_comment(&mut cursor)?;
            continue;
        }
        if let Some(kind) = lex_prefixed_literal(&mut cursor)? {
            tokens.push(Token { kind, offset });
            continue;
        }
        let kind = match ch {
            '"' => {
                cursor.bump();
                TokenKind::Str(lex_quoted(&mut cursor)?)
            }
            '\'' => lex_char_or_lifetime(&mut cursor)?,
            c if is_ident_start(c) => TokenKind::Ident(lex_ident(&mut cursor)),
            c if c.is_ascii_digit() => {
                cursor.eat_while(is_ident_continue);
                TokenKind::OtherLiteral
            }
            c => {
                cursor.bump();
                TokenKind::Punct(c)
            }
        };
        tokens.push(Token { kind, offset });
    }
    Ok(tokens)
}

fn lex_ident(cursor: &mut Cursor<'_>) -> String {
    // Raw identifiers (`r#match`) lex as their bare name.
    if cursor.rest().starts_with("r#") && cursor.peek_nth(2).is_some_and(is_ident_start) {
        cursor.pos += 2;
    }
    cursor.eat_while(is_ident_continue).to_owned()
}

fn skip_block_comment(cursor: &mut Cursor<'_>) -> Result<(), LexError> {
    let start = cursor.error("unterminated block comment");
    cursor.pos += 2;
    let mut depth = 1usize;
    while depth > 0 {
        let rest = cursor.rest();
        if rest.is_empty() {
            return Err(start);
        }
        if rest.starts_with("/*") {
            depth += 1;
            cursor.pos += 2;
        } else if rest.starts_with("*/") {
            depth -= 1;
            cursor.pos += 2;
        } else {
            cursor.bump();
        }
    }
    Ok(())
}

/// Handle literals introduced by `r`, `b`, `br`, `c`, and `cr` prefixes.
///
/// Returns `None` without consuming anything when the prefix letter starts
/// an ordinary identifier instead.
fn lex_prefixed_literal(cursor: &mut Cursor<'_>) -> Result<Option<TokenKind>, LexError> {
    let rest = cursor.rest();
    if rest.starts_with("r\"") || is_raw_string_start(rest, 1) {
        cursor.pos += 1;
        return lex_raw(cursor).map(|value| Some(TokenKind::Str(value)));
    }
    for prefix in ["br", "cr"] {
        if rest.starts_with(prefix)
            && (rest.get(2..).is_some_and(|tail| tail.starts_with('"'))
                || is_raw_string_start(rest, 2))
        {
            cursor.pos += 2;
            lex_raw(cursor)?;
            return Ok(Some(TokenKind::OtherLiteral));
        }
    }
    if rest.starts_with("b\"") || rest.starts_with("c\"") {
        cursor.pos += 2;
        lex_quoted(cursor)?;
        return Ok(Some(TokenKind::OtherLiteral));
    }
    if rest.starts_with("b'") {
        cursor.pos += 1;
        return lex_char_or_lifetime(cursor).map(Some);
    }
    Ok(None)
}

/// Return `true` when `rest[prefix_len..]` is `#`+ followed by `"`.
fn is_raw_string_start(rest: &str, prefix_len: usize) -> bool {
    let Some(tail) = rest.get(prefix_len..) else {
        return false;
    };
    let hashes = tail.chars().take_while(|c| *c == '#').count();
    hashes > 0 && tail.get(hashes..).is_some_and(|t| t.starts_with('"'))
}

/// Lex a raw string body; the cursor sits on the first `#` or `"`.
fn lex_raw(cursor: &mut Cursor<'_>) -> Result<String, LexError> {
    let hashes = cursor.eat_while(|c| c == '#').len();
    if cursor.bump() != Some('"') {
        return Err(cursor.error("raw string literal missing opening quote"));
    }
    let terminator = format!("\"{}", "#".repeat(hashes));
    let rest = cursor.rest();
    let Some(end) = rest.find(&terminator) else {
        return Err(cursor.error("unterminated raw string literal"));
    };
    let content = rest.get(..end).unwrap_or_default().to_owned();
    cursor.pos += end + terminator.len();
    Ok(content)
}

/// Lex a quoted literal body; the opening quote is already consumed.
fn lex_quoted(cursor: &mut Cursor<'_>) -> Result<String, LexError> {
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => return Err(cursor.error("unterminated string literal")),
            Some('"') => return Ok(value),
            Some('\\') => {
                if let Some(ch) = lex_escape(cursor)? {
                    value.push(ch);
                }
            }
            Some(ch) => value.push(ch),
        }
    }
}

/// Resolve one escape sequence; the backslash is already consumed.
///
/// Returns `None` for line continuations, which produce no character.
fn lex_escape(cursor: &mut Cursor<'_>) -> Result<Option<char>, LexError> {
    let Some(ch) = cursor.bump() else {
        return Err(cursor.error("unterminated escape sequence"));
    };
    let resolved = match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '\\' => '\\',
        '0' => '\0',
        '\'' => '\'',
        '"' => '"',
        'x' => lex_hex_escape(cursor)?,
        'u' => lex_unicode_escape(cursor)?,
        '\n' => {
            cursor.eat_while(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
            return Ok(None);
        }
        _ => return Err(cursor.error("unknown character escape")),
    };
    Ok(Some(resolved))
}

fn lex_hex_escape(cursor: &mut Cursor<'_>) -> Result<char, LexError> {
    let digits: String = [cursor.bump(), cursor.bump()].into_iter().flatten().collect();
    u8::from_str_radix(&digits, 16)
        .ok()
        .filter(|byte| digits.len() == 2 && *byte <= 0x7f)
        .map(char::from)
        .ok_or_else(|| cursor.error("invalid \\x escape"))
}

fn lex_unicode_escape(cursor: &mut Cursor<'_>) -> Result<char, LexError> {
    if cursor.bump() != Some('{') {
        return Err(cursor.error("invalid \\u escape"));
    }
    let digits: String = cursor
        .eat_while(|c| c.is_ascii_hexdigit() || c == '_')
        .chars()
        .filter(|c| *c != '_')
        .collect();
    if cursor.bump() != Some('}') || digits.is_empty() || digits.len() > 6 {
        return Err(cursor.error("invalid \\u escape"));
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| cursor.error("invalid \\u escape"))
}

/// Lex `'x'`, `'\n'`, or a lifetime/label such as `'a`.
fn lex_char_or_lifetime(cursor: &mut Cursor<'_>) -> Result<TokenKind, LexError> {
    cursor.bump();
    if cursor.peek() == Some('\\') {
        cursor.bump();
        lex_escape(cursor)?;
        if cursor.bump() != Some('\'') {
            return Err(cursor.error("unterminated character literal"));
        }
        return Ok(TokenKind::OtherLiteral);
    }
    if cursor.peek_nth(1) == Some('\'') {
        cursor.bump();
        cursor.bump();
        return Ok(TokenKind::OtherLiteral);
    }
    cursor.eat_while(is_ident_continue);
    Ok(TokenKind::OtherLiteral)
}
