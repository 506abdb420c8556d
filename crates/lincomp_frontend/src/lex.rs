use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error)]
#[error("Unrecognized token at position {0}")]
pub struct Error(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Name(String),
    IntLit(i64),

    Scalar,
    Matrix,
    Input,
    Output,
    Assume,

    LParen,
    RParen,
    Comma,
    Semicolon,

    Add,
    Sub,
    Mul,
    DotI,
    DotT,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "{}", name),
            Token::IntLit(val) => write!(f, "{}", val),
            Token::Scalar => write!(f, "scalar"),
            Token::Matrix => write!(f, "matrix"),
            Token::Input => write!(f, "input"),
            Token::Output => write!(f, "output"),
            Token::Assume => write!(f, "assume"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Add => write!(f, "+"),
            Token::Sub => write!(f, "-"),
            Token::Mul => write!(f, "*"),
            Token::DotI => write!(f, ".I"),
            Token::DotT => write!(f, ".T"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }
}

fn char_at(src: &str, pos: usize) -> Option<char> {
    src[pos..].chars().next()
}

// Advances past the character at `pos`, which must exist.
fn next_pos(pos: usize, src: &str) -> usize {
    pos + char_at(src, pos).map_or(1, char::len_utf8)
}

fn consume_exact(pos: usize, src: &str, target: &str) -> Option<usize> {
    if src[pos..].starts_with(target) {
        Some(pos + target.len())
    } else {
        None
    }
}

fn consume_while(mut pos: usize, src: &str, pred: impl Fn(char) -> bool) -> usize {
    while let Some(c) = char_at(src, pos) {
        if !pred(c) {
            break;
        }
        pos = next_pos(pos, src);
    }
    pos
}

fn consume_comment(pos: usize, src: &str) -> Option<usize> {
    let body = consume_exact(pos, src, "//")?;
    let end = consume_while(body, src, |c| c != '\n');
    Some(consume_exact(end, src, "\n").unwrap_or(end))
}

fn consume_whitespace(pos: usize, src: &str) -> Option<usize> {
    if !char_at(src, pos)?.is_whitespace() {
        return None;
    }
    Some(consume_while(pos, src, char::is_whitespace))
}

fn skip_invisibles(mut pos: usize, src: &str) -> usize {
    loop {
        match (consume_comment(pos, src), consume_whitespace(pos, src)) {
            (None, None) => return pos,
            (Some(after_comment), _) => pos = after_comment,
            (_, Some(after_whitespace)) => pos = after_whitespace,
        }
    }
}

fn consume_name(pos: usize, src: &str) -> Option<usize> {
    if !char_at(src, pos)?.is_alphabetic() {
        return None;
    }
    Some(consume_while(pos, src, |c| c.is_alphanumeric() || c == '_'))
}

fn consume_int(pos: usize, src: &str) -> Option<usize> {
    if !char_at(src, pos)?.is_ascii_digit() {
        return None;
    }
    Some(consume_while(pos, src, |c| c.is_ascii_digit()))
}

// `.I` and `.T` must not run into a following name, so `X.Inv` is a lexing error.
fn consume_postfix(pos: usize, src: &str, target: &str) -> Option<usize> {
    let end = consume_exact(pos, src, target)?;
    match char_at(src, end) {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(end),
    }
}

const SYMBOLS: &[(&str, Token)] = &[
    ("(", Token::LParen),
    (")", Token::RParen),
    (",", Token::Comma),
    (";", Token::Semicolon),
    ("+", Token::Add),
    ("-", Token::Sub),
    ("*", Token::Mul),
];

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<(usize, Token, usize), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pos = skip_invisibles(self.pos, self.src);

        if self.pos == self.src.len() {
            return None;
        }

        let start = self.pos;

        if let Some(name_end) = consume_name(start, self.src) {
            self.pos = name_end;
            let token = match &self.src[start..name_end] {
                "scalar" => Token::Scalar,
                "matrix" => Token::Matrix,
                "input" => Token::Input,
                "output" => Token::Output,
                "assume" => Token::Assume,
                name => Token::Name(name.to_owned()),
            };
            return Some(Ok((start, token, name_end)));
        }

        if let Some(int_end) = consume_int(start, self.src) {
            self.pos = int_end;
            return Some(match self.src[start..int_end].parse() {
                Ok(value) => Ok((start, Token::IntLit(value), int_end)),
                Err(_) => Err(Error(start)),
            });
        }

        for (target, token) in [(".I", Token::DotI), (".T", Token::DotT)] {
            if let Some(end) = consume_postfix(start, self.src, target) {
                self.pos = end;
                return Some(Ok((start, token, end)));
            }
        }

        for (target, token) in SYMBOLS {
            if let Some(end) = consume_exact(start, self.src, target) {
                self.pos = end;
                return Some(Ok((start, token.clone(), end)));
            }
        }

        // Skip the offending character so the lexer can make progress if polled again.
        self.pos = next_pos(start, self.src);
        Some(Err(Error(start)))
    }
}
