use crate::diag::Diagnostics;
use crate::span::Span;
use crate::token::{Keyword, Punct, Token, TokenKind};

pub fn lex(src: &str, diags: &mut Diagnostics) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();

    while let Some(ch) = lexer.peek() {
        if ch.is_whitespace() {
            lexer.bump();
            continue;
        }
        if ch == '#' || (ch == '/' && lexer.peek_at(1) == Some('/')) {
            while let Some(c) = lexer.peek() {
                if c == '\n' {
                    break;
                }
                lexer.bump();
            }
            continue;
        }

        let start = lexer.mark();

        if is_ident_start(ch) {
            let mut text = String::new();
            while let Some(c) = lexer.peek() {
                if !is_ident_continue(c) {
                    break;
                }
                text.push(c);
                lexer.bump();
            }
            let kind = if let Some(kw) = Keyword::from_str(&text) {
                TokenKind::Keyword(kw)
            } else if text == "true" {
                TokenKind::Bool(true)
            } else if text == "false" {
                TokenKind::Bool(false)
            } else {
                TokenKind::Ident(text)
            };
            tokens.push(Token {
                kind,
                span: lexer.span_from(start),
            });
            continue;
        }

        if ch.is_ascii_digit() {
            let mut text = String::new();
            while let Some(c) = lexer.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                lexer.bump();
            }
            let span = lexer.span_from(start);
            let value = match text.parse::<i32>() {
                Ok(value) => value,
                Err(_) => {
                    diags.warning(span, "integer literal too large; using max value");
                    i32::MAX
                }
            };
            tokens.push(Token {
                kind: TokenKind::Int(value),
                span,
            });
            continue;
        }

        if ch == '"' {
            if let Some(raw) = lex_string(&mut lexer, start, diags) {
                tokens.push(Token {
                    kind: TokenKind::String(raw),
                    span: lexer.span_from(start),
                });
            }
            continue;
        }

        if let Some((punct, width)) = match_punct(ch, lexer.peek_at(1)) {
            for _ in 0..width {
                lexer.bump();
            }
            tokens.push(Token {
                kind: TokenKind::Punct(punct),
                span: lexer.span_from(start),
            });
            continue;
        }

        lexer.bump();
        diags.error(lexer.span_from(start), "unexpected character");
    }

    let end = lexer.mark();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: lexer.span_from(end),
    });
    tokens
}

/// Scans a string literal starting at the opening quote. Returns the raw
/// lexeme, or `None` when the literal is malformed and dropped.
fn lex_string(lexer: &mut Lexer<'_>, start: Mark, diags: &mut Diagnostics) -> Option<String> {
    let mut raw = String::new();
    let mut bad_escape = false;
    let mut terminated = false;

    if let Some(quote) = lexer.bump() {
        raw.push(quote);
    }
    while let Some(c) = lexer.peek() {
        if c == '\n' {
            break;
        }
        lexer.bump();
        raw.push(c);
        if c == '"' {
            terminated = true;
            break;
        }
        if c == '\\' {
            match lexer.peek() {
                Some(esc @ ('n' | 't' | '\'' | '"' | '\\')) => {
                    lexer.bump();
                    raw.push(esc);
                }
                Some('\n') | None => {}
                Some(other) => {
                    bad_escape = true;
                    lexer.bump();
                    raw.push(other);
                }
            }
        }
    }

    let span = lexer.span_from(start);
    if !terminated {
        diags.error(span, "unterminated string literal");
        return None;
    }
    if bad_escape {
        diags.error(span, "bad escape sequence in string literal");
        return None;
    }
    Some(raw)
}

#[derive(Clone, Copy)]
struct Mark {
    offset: usize,
    line: u32,
    col: u32,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = *self.chars.get(self.pos)?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(idx, _)| *idx)
            .unwrap_or(self.src.len())
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.offset(),
            line: self.line,
            col: self.col,
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.offset, self.offset(), mark.line, mark.col)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn match_punct(ch: char, next: Option<char>) -> Option<(Punct, usize)> {
    let double = match (ch, next) {
        ('&', Some('&')) => Some(Punct::AndAnd),
        ('|', Some('|')) => Some(Punct::OrOr),
        ('=', Some('=')) => Some(Punct::EqEq),
        ('!', Some('=')) => Some(Punct::NotEq),
        ('<', Some('=')) => Some(Punct::LtEq),
        ('>', Some('=')) => Some(Punct::GtEq),
        ('+', Some('+')) => Some(Punct::PlusPlus),
        ('-', Some('-')) => Some(Punct::MinusMinus),
        ('>', Some('>')) => Some(Punct::ShiftRight),
        ('<', Some('<')) => Some(Punct::ShiftLeft),
        _ => None,
    };
    if let Some(punct) = double {
        return Some((punct, 2));
    }
    let punct = match ch {
        '{' => Punct::LBrace,
        '}' => Punct::RBrace,
        '(' => Punct::LParen,
        ')' => Punct::RParen,
        ';' => Punct::Semicolon,
        ',' => Punct::Comma,
        '.' => Punct::Dot,
        '=' => Punct::Assign,
        '+' => Punct::Plus,
        '-' => Punct::Minus,
        '*' => Punct::Star,
        '/' => Punct::Slash,
        '!' => Punct::Bang,
        '<' => Punct::Lt,
        '>' => Punct::Gt,
        _ => return None,
    };
    Some((punct, 1))
}
