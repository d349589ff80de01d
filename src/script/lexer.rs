//! Tokenizer for script bodies.
//!
//! Produces a flat token stream with explicit `Newline`, `Indent` and
//! `Dedent` tokens. Newlines inside brackets are not significant.

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    And,
    Break,
    Continue,
    Elif,
    Else,
    False,
    For,
    If,
    In,
    None,
    Not,
    Or,
    Pass,
    Return,
    True,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Int(i) => format!("integer {i}"),
            TokenKind::Float(f) => format!("float {f}"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::And => "and",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::False => "False",
            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::None => "None",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Return => "return",
            TokenKind::True => "True",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::SlashSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Keywords reserved by the language family but not available in tag bodies.
const UNSUPPORTED_KEYWORDS: [&str; 12] = [
    "def", "lambda", "while", "load", "class", "import", "from", "try", "except", "with",
    "yield", "global",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
    indents: Vec<usize>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token { kind, line: self.line });
    }

    fn error<T>(&self, msg: impl Into<String>) -> Result<T, EvalError> {
        Err(EvalError::syntax(self.line, msg))
    }

    fn run(mut self) -> Result<Vec<Token>, EvalError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.depth == 0 {
                at_line_start = false;
                if !self.indentation()? {
                    break;
                }
            }
            let Some(c) = self.peek() else { break };
            match c {
                ' ' | '\t' | '\r' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '\n' => {
                    if self.depth == 0 {
                        self.push(TokenKind::Newline);
                        at_line_start = true;
                    }
                    self.pos += 1;
                    self.line += 1;
                }
                '"' | '\'' => self.string(false)?,
                'r' if matches!(self.peek_at(1), Some('"' | '\'')) => {
                    self.pos += 1;
                    self.string(true)?;
                }
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.word()?,
                _ => self.punctuation()?,
            }
        }

        if self.tokens.last().is_some_and(|t| t.kind != TokenKind::Newline) {
            self.push(TokenKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::Eof);
        Ok(self.tokens)
    }

    /// Measures the indentation of the next non-blank line and emits
    /// indent/dedent tokens. Returns `false` at end of input.
    fn indentation(&mut self) -> Result<bool, EvalError> {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width += 8 - width % 8,
                    '\r' => {}
                    _ => break,
                }
                self.pos += 1;
            }
            match self.peek() {
                None => return Ok(false),
                Some('\n') => {
                    self.pos += 1;
                    self.line += 1;
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {}
            }

            let current = self.indents.last().copied().unwrap_or(0);
            if width > current {
                self.indents.push(width);
                self.push(TokenKind::Indent);
            } else if width < current {
                while self.indents.last().is_some_and(|&w| w > width) {
                    self.indents.pop();
                    self.push(TokenKind::Dedent);
                }
                if self.indents.last().copied().unwrap_or(0) != width {
                    return self.error("unindent does not match any outer indentation level");
                }
            }
            return Ok(true);
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn string(&mut self, raw: bool) -> Result<(), EvalError> {
        let start_line = self.line;
        let quote = self.chars[self.pos];
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(EvalError::syntax(start_line, "unterminated string literal"));
            };
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if c == '\n' {
                if !triple {
                    return Err(EvalError::syntax(start_line, "unterminated string literal"));
                }
                self.line += 1;
            }
            if c == '\\' && !raw {
                self.pos += 1;
                let Some(escaped) = self.peek() else {
                    return Err(EvalError::syntax(start_line, "unterminated string literal"));
                };
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\n' => self.line += 1,
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.pos += 1;
                continue;
            }
            value.push(c);
            self.pos += 1;
        }
        self.tokens.push(Token { kind: TokenKind::Str(value), line: start_line });
        Ok(())
    }

    fn number(&mut self) -> Result<(), EvalError> {
        let start = self.pos;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start + 2..self.pos].iter().collect();
            return match i64::from_str_radix(&digits, 16) {
                Ok(value) => {
                    self.push(TokenKind::Int(value));
                    Ok(())
                }
                Err(_) => self.error(format!("invalid hex literal '0x{digits}'")),
            };
        }

        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.')
            && self.peek_at(1).map_or(true, |c| !c.is_alphabetic() && c != '_')
        {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.push(TokenKind::Float(value)),
                Err(_) => return self.error(format!("invalid float literal '{text}'")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.push(TokenKind::Int(value)),
                Err(_) => return self.error(format!("integer literal '{text}' out of range")),
            }
        }
        Ok(())
    }

    fn word(&mut self) -> Result<(), EvalError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let kind = match word.as_str() {
            "and" => TokenKind::And,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "False" => TokenKind::False,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "None" => TokenKind::None,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "return" => TokenKind::Return,
            "True" => TokenKind::True,
            w if UNSUPPORTED_KEYWORDS.contains(&w) => {
                return self.error(format!("'{w}' is not supported in tag bodies"));
            }
            _ => TokenKind::Ident(word),
        };
        self.push(kind);
        Ok(())
    }

    fn punctuation(&mut self) -> Result<(), EvalError> {
        let c = self.chars[self.pos];
        let next = self.peek_at(1);
        let (kind, width) = match (c, next) {
            ('/', Some('/')) => (TokenKind::SlashSlash, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('+', Some('=')) => (TokenKind::PlusAssign, 2),
            ('-', Some('=')) => (TokenKind::MinusAssign, 2),
            ('*', Some('=')) => (TokenKind::StarAssign, 2),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            (other, _) => return self.error(format!("unexpected character '{other}'")),
        };
        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }
        self.push(kind);
        self.pos += width;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_indentation_tokens() {
        let tokens = kinds("if x:\n    y\nz");
        assert_eq!(
            tokens,
            vec![
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident("y".into()),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Ident("z".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_ignored() {
        let tokens = kinds("[1,\n 2]");
        assert!(!tokens[..tokens.len() - 2].contains(&TokenKind::Newline));
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\n\n# note\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_unsupported_keyword() {
        let err = tokenize("def f(): pass").unwrap_err();
        assert!(err.msg.contains("'def' is not supported"));
    }
}
