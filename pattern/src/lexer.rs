use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token {
    pub offset: usize,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Char(char),
    Escaped(char),
    LeftBracket,
    LeftParen,
    Minus,
    Pipe,
    Plus,
    QuestionMark,
    RightBracket,
    RightParen,
    Star,
}

#[derive(Debug, Clone)]
pub(crate) struct Lexer<'s> {
    rest: &'s str,
    byte: usize,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unexpected end of pattern after '\\' at byte {0}")]
    UnexpectedEOF(usize),
}

impl Token {
    /// The character this token stands for when it is read as a literal.
    pub fn literal(&self) -> char {
        match self.kind {
            TokenKind::Char(c) | TokenKind::Escaped(c) => c,
            TokenKind::LeftBracket => '[',
            TokenKind::LeftParen => '(',
            TokenKind::Minus => '-',
            TokenKind::Pipe => '|',
            TokenKind::Plus => '+',
            TokenKind::QuestionMark => '?',
            TokenKind::RightBracket => ']',
            TokenKind::RightParen => ')',
            TokenKind::Star => '*',
        }
    }
}

impl<'s> Lexer<'s> {
    pub fn new(input: &'s str) -> Self {
        Self {
            rest: input,
            byte: 0,
        }
    }
}

impl<'s> Iterator for Lexer<'s> {
    type Item = Result<Token, TokenError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        let c_at = self.byte;
        self.rest = chars.as_str();
        self.byte += c.len_utf8();

        let make_token = move |kind: TokenKind| {
            Some(Ok(Token {
                kind,
                offset: c_at,
            }))
        };

        match c {
            '[' => return make_token(TokenKind::LeftBracket),
            '(' => return make_token(TokenKind::LeftParen),
            '-' => return make_token(TokenKind::Minus),
            '|' => return make_token(TokenKind::Pipe),
            '+' => return make_token(TokenKind::Plus),
            '?' => return make_token(TokenKind::QuestionMark),
            ']' => return make_token(TokenKind::RightBracket),
            ')' => return make_token(TokenKind::RightParen),
            '*' => return make_token(TokenKind::Star),
            '\\' => {}
            c => return make_token(TokenKind::Char(c)),
        }

        let escaped = match self.rest.chars().next() {
            Some(escaped) => escaped,
            None => return Some(Err(TokenError::UnexpectedEOF(c_at))),
        };

        self.byte += escaped.len_utf8();
        self.rest = &self.rest[escaped.len_utf8()..];
        Some(Ok(Token {
            kind: TokenKind::Escaped(escaped),
            offset: c_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer() {
        let kinds: Vec<_> = Lexer::new("(a|b)*ü[x-y]+?")
            .map(|token| token.unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LeftParen,
                TokenKind::Char('a'),
                TokenKind::Pipe,
                TokenKind::Char('b'),
                TokenKind::RightParen,
                TokenKind::Star,
                TokenKind::Char('ü'),
                TokenKind::LeftBracket,
                TokenKind::Char('x'),
                TokenKind::Minus,
                TokenKind::Char('y'),
                TokenKind::RightBracket,
                TokenKind::Plus,
                TokenKind::QuestionMark,
            ]
        );
    }

    #[test]
    fn test_lexer_offsets() {
        let mut lexer = Lexer::new("ü#");
        assert_eq!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::Char('ü'),
                offset: 0,
            }))
        );
        assert_eq!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::Char('#'),
                offset: 2,
            }))
        );
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_lexer_escaped() {
        let mut lexer = Lexer::new(r"\w\(\d");
        assert_eq!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::Escaped('w'),
                offset: 0,
            }))
        );
        assert_eq!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::Escaped('('),
                offset: 2,
            }))
        );
        assert_eq!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::Escaped('d'),
                offset: 4,
            }))
        );
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_lexer_dangling_backslash() {
        let mut lexer = Lexer::new(r"ab\");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_ok());
        assert_eq!(lexer.next(), Some(Err(TokenError::UnexpectedEOF(2))));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_literal() {
        let tokens: String = Lexer::new(r"(\)-*]")
            .map(|token| token.unwrap().literal())
            .collect();
        assert_eq!(tokens, "()-*]");
    }
}
