use crate::lexer;
use crate::lexer::Lexer;
use crate::lexer::TokenError;
use crate::lexer::TokenKind;
use crate::Symbol;
use crate::Token;
use std::iter;
use std::mem;
use thiserror::Error;

/// Upper bound on the length of a normalized token stream.
pub const MAX_NORMALIZED_TOKENS: usize = 1 << 20;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("Unclosed '{0}' opened at byte {1}")]
    Unclosed(char, usize),
    #[error("Unmatched '{0}' at byte {1}")]
    Unmatched(char, usize),
    #[error("Empty character class at byte {0}")]
    EmptyClass(usize),
    #[error("Quantifier '{0}' at byte {1} must be preceded by an operand")]
    QuantifierNotPreceded(char, usize),
    #[error("Unrecognized quantifier '{0}'")]
    InvalidQuantifier(char),
    #[error("Invalid class range '{0}-{1}'")]
    InvalidRange(char, char),
    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("Pattern expands to more than {0} tokens")]
    TooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
}

impl TryFrom<char> for Quantifier {
    type Error = SyntaxError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '*' => Ok(Quantifier::ZeroOrMore),
            '+' => Ok(Quantifier::OneOrMore),
            '?' => Ok(Quantifier::ZeroOrOne),
            c => Err(SyntaxError::InvalidQuantifier(c)),
        }
    }
}

impl Quantifier {
    /// Number of tokens `apply` adds to an operand of `len` tokens.
    fn growth(self, len: usize) -> usize {
        match self {
            Quantifier::ZeroOrMore => 1,
            Quantifier::OneOrMore => len + 1,
            Quantifier::ZeroOrOne => 4,
        }
    }

    /// Rewrites the operand occupying `output[start..]` in place.
    fn apply(self, output: &mut Vec<Token>, start: usize) {
        match self {
            Quantifier::ZeroOrMore => output.push(Token::Star),
            Quantifier::OneOrMore => {
                let operand = output[start..].to_vec();
                output.extend(operand);
                output.push(Token::Star);
            }
            Quantifier::ZeroOrOne => {
                let operand = output.split_off(start);
                output.push(Token::LeftParen);
                output.extend(operand);
                output.push(Token::Pipe);
                output.push(Token::Symbol(Symbol::Epsilon));
                output.push(Token::RightParen);
            }
        }
    }
}

/// Expands quantifiers, character classes and escapes of `input` into a flat
/// stream of symbols, parentheses, alternations and stars.
///
/// Fails with [`SyntaxError::TooLarge`] once the stream would exceed
/// [`MAX_NORMALIZED_TOKENS`].
pub fn normalize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let lexemes = Lexer::new(input).collect::<Result<Vec<_>, _>>()?;
    let normalizer = Normalizer {
        lexemes: &lexemes,
        pos: 0,
        groups: Vec::new(),
        suspended: 0,
    };
    normalizer.run()
}

/// The normalized output of one group body, or of the top level.
#[derive(Debug, Default)]
struct Sequence {
    output: Vec<Token>,
    /// Start of the most recent operand in `output`, the target of quantifiers.
    operand: Option<usize>,
}

impl Sequence {
    fn push_operand(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.operand = Some(self.output.len());
        self.output.extend(tokens);
    }

    /// An empty trailing alternative stands for epsilon.
    fn finish(mut self) -> Vec<Token> {
        if self.operand.is_none() {
            self.output.push(Token::Symbol(Symbol::Epsilon));
        }
        self.output
    }
}

struct Normalizer<'l> {
    lexemes: &'l [lexer::Token],
    pos: usize,
    /// Enclosing sequences of the open groups, with the offset of their `(`.
    groups: Vec<(usize, Sequence)>,
    /// Number of tokens held by `groups`.
    suspended: usize,
}

impl Normalizer<'_> {
    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut current = Sequence::default();

        while let Some(&lexeme) = self.lexemes.get(self.pos) {
            self.pos += 1;
            match lexeme.kind {
                TokenKind::LeftParen => {
                    self.suspended += current.output.len();
                    let parent = mem::take(&mut current);
                    self.groups.push((lexeme.offset, parent));
                }
                TokenKind::RightParen => {
                    let Some((_, parent)) = self.groups.pop() else {
                        return Err(SyntaxError::Unmatched(')', lexeme.offset));
                    };
                    self.suspended -= parent.output.len();
                    let inner = mem::replace(&mut current, parent).finish();
                    self.reserve(&current, inner.len() + 2)?;
                    current.push_operand(
                        iter::once(Token::LeftParen)
                            .chain(inner)
                            .chain(iter::once(Token::RightParen)),
                    );
                }
                TokenKind::RightBracket => {
                    return Err(SyntaxError::Unmatched(']', lexeme.offset));
                }
                TokenKind::Star | TokenKind::Plus | TokenKind::QuestionMark => {
                    let start = current.operand.ok_or(SyntaxError::QuantifierNotPreceded(
                        lexeme.literal(),
                        lexeme.offset,
                    ))?;
                    let quantifier = Quantifier::try_from(lexeme.literal())?;
                    self.reserve(&current, quantifier.growth(current.output.len() - start))?;
                    quantifier.apply(&mut current.output, start);
                }
                TokenKind::Pipe => {
                    self.reserve(&current, 2)?;
                    if current.operand.is_none() {
                        current.output.push(Token::Symbol(Symbol::Epsilon));
                    }
                    current.output.push(Token::Pipe);
                    current.operand = None;
                }
                TokenKind::LeftBracket => {
                    let tokens = alternation(self.expand_class(lexeme.offset)?);
                    self.reserve(&current, tokens.len())?;
                    current.push_operand(tokens);
                }
                TokenKind::Escaped(c) => {
                    let symbols = expand_escape(c);
                    let tokens = if symbols.len() == 1 {
                        symbols.into_iter().map(Token::Symbol).collect()
                    } else {
                        alternation(symbols)
                    };
                    self.reserve(&current, tokens.len())?;
                    current.push_operand(tokens);
                }
                TokenKind::Char(_) | TokenKind::Minus => {
                    self.reserve(&current, 1)?;
                    current.push_operand([Token::Symbol(Symbol::Char(lexeme.literal()))]);
                }
            }
        }

        if let Some((offset, _)) = self.groups.last() {
            return Err(SyntaxError::Unclosed('(', *offset));
        }
        Ok(current.finish())
    }

    /// Checks that `extra` more tokens in `current` keep the whole stream
    /// within [`MAX_NORMALIZED_TOKENS`].
    fn reserve(&self, current: &Sequence, extra: usize) -> Result<(), SyntaxError> {
        let total = self.suspended + current.output.len() + extra;
        if total > MAX_NORMALIZED_TOKENS {
            return Err(SyntaxError::TooLarge(MAX_NORMALIZED_TOKENS));
        }
        Ok(())
    }

    /// Consumes a class body and its closing `]`, returning its symbols in order.
    fn expand_class(&mut self, opened_at: usize) -> Result<Vec<Symbol>, SyntaxError> {
        let start = self.pos;
        let end = self.lexemes[start..]
            .iter()
            .position(|lexeme| lexeme.kind == TokenKind::RightBracket)
            .map(|len| start + len)
            .ok_or(SyntaxError::Unclosed('[', opened_at))?;
        self.pos = end + 1;

        let body = &self.lexemes[start..end];
        if body.is_empty() {
            return Err(SyntaxError::EmptyClass(opened_at));
        }

        let kinds: Vec<TokenKind> = body.iter().map(|lexeme| lexeme.kind).collect();
        let mut symbols = Vec::new();
        let mut i = 0;
        while i < kinds.len() {
            match kinds[i..] {
                [TokenKind::Char(lo), TokenKind::Minus, TokenKind::Char(hi), ..]
                    if lo.is_alphanumeric() && hi.is_alphanumeric() =>
                {
                    if lo > hi {
                        return Err(SyntaxError::InvalidRange(lo, hi));
                    }
                    symbols.extend((lo..=hi).map(Symbol::Char));
                    i += 3;
                }
                [TokenKind::Escaped(c), ..] => {
                    symbols.extend(expand_escape(c));
                    i += 1;
                }
                _ => {
                    symbols.push(Symbol::Char(body[i].literal()));
                    i += 1;
                }
            }
        }
        Ok(symbols)
    }
}

/// Symbols matched by the escape `\c`.
fn expand_escape(c: char) -> Vec<Symbol> {
    match c {
        'd' => ('0'..='9').map(Symbol::Char).collect(),
        'w' => ('a'..='z')
            .chain('A'..='Z')
            .chain('0'..='9')
            .map(Symbol::Char)
            .collect(),
        's' => [' ', '\t', '\n', '\r', '\x0b', '\x0c']
            .into_iter()
            .map(Symbol::Char)
            .collect(),
        c => vec![Symbol::Char(c)],
    }
}

/// `(s1|s2|...|sn)`
fn alternation(symbols: Vec<Symbol>) -> Vec<Token> {
    let mut output = Vec::with_capacity(symbols.len() * 2 + 1);
    output.push(Token::LeftParen);
    for (i, symbol) in symbols.into_iter().enumerate() {
        if i > 0 {
            output.push(Token::Pipe);
        }
        output.push(Token::Symbol(symbol));
    }
    output.push(Token::RightParen);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::tokens;
    use test_case::test_case;

    #[test_case("a", "a"; "literal")]
    #[test_case("abc", "abc"; "literals")]
    #[test_case("a|b", "a|b"; "alternation")]
    #[test_case("a*", "a*"; "star")]
    #[test_case("a+", "aa*"; "plus")]
    #[test_case("a?", "(a|ε)"; "question mark")]
    #[test_case("ab+", "abb*"; "plus binds to last char")]
    #[test_case("(ab)", "(ab)"; "group")]
    #[test_case("(ab)+", "(ab)(ab)*"; "plus on group")]
    #[test_case("(ab)?", "((ab)|ε)"; "question mark on group")]
    #[test_case("(a|b)*abb", "(a|b)*abb"; "textbook")]
    #[test_case("((a)b)*", "((a)b)*"; "nested group")]
    #[test_case("a*?", "(a*|ε)"; "stacked quantifiers")]
    #[test_case("a-b", "a-b"; "minus outside class is literal")]
    #[test_case("#.", "#."; "reserved looking literals")]
    fn test_normalize(pattern: &str, expected: &str) {
        let expected: Vec<Token> = tokens(expected)
            .into_iter()
            .map(|token| match token {
                Token::Symbol(Symbol::EndMarker) => Token::Symbol(Symbol::Char('#')),
                Token::Concat => Token::Symbol(Symbol::Char('.')),
                token => token,
            })
            .collect();
        assert_eq!(normalize(pattern), Ok(expected));
    }

    #[test_case(""; "empty pattern")]
    #[test_case("()"; "empty group")]
    fn test_normalize_empty(pattern: &str) {
        let normalized = normalize(pattern).unwrap();
        assert!(normalized.contains(&Token::Symbol(Symbol::Epsilon)));
    }

    #[test_case("a|", "a|ε"; "trailing")]
    #[test_case("|a", "ε|a"; "leading")]
    #[test_case("(|a)", "(ε|a)"; "inside group")]
    #[test_case("a||b", "a|ε|b"; "between")]
    fn test_normalize_empty_alternative(pattern: &str, expected: &str) {
        assert_eq!(normalize(pattern), Ok(tokens(expected)));
    }

    #[test]
    fn test_escape_digit() {
        assert_eq!(normalize(r"\d"), Ok(tokens("(0|1|2|3|4|5|6|7|8|9)")));
    }

    #[test]
    fn test_escape_word_order() {
        let normalized = normalize(r"\w").unwrap();
        let symbols: String = normalized
            .iter()
            .filter_map(|token| match token {
                Token::Symbol(Symbol::Char(c)) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(
            symbols,
            "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
        );
        assert_eq!(normalized.first(), Some(&Token::LeftParen));
        assert_eq!(normalized.last(), Some(&Token::RightParen));
    }

    #[test]
    fn test_escape_whitespace() {
        assert_eq!(
            normalize(r"\s"),
            Ok(tokens("( |\t|\n|\r|\x0b|\x0c)"))
        );
    }

    #[test_case(r"\.", "."; "dot")]
    #[test_case(r"\(", "("; "left paren")]
    #[test_case(r"\n", "n"; "letter")]
    #[test_case(r"\\", "\\"; "backslash")]
    fn test_escape_literal(pattern: &str, literal: &str) {
        let c = literal.chars().next().unwrap();
        assert_eq!(normalize(pattern), Ok(vec![Token::Symbol(Symbol::Char(c))]));
    }

    #[test]
    fn test_escape_with_quantifier() {
        assert_eq!(normalize(r"\d*"), Ok(tokens("(0|1|2|3|4|5|6|7|8|9)*")));
        assert_eq!(
            normalize(r"\.+"),
            Ok(vec![
                Token::Symbol(Symbol::Char('.')),
                Token::Symbol(Symbol::Char('.')),
                Token::Star,
            ])
        );
    }

    #[test_case("[abc]", "(a|b|c)"; "literals")]
    #[test_case("[a-e]", "(a|b|c|d|e)"; "range")]
    #[test_case("[a-cx]", "(a|b|c|x)"; "range and literal")]
    #[test_case("[-a]", "(-|a)"; "leading minus")]
    #[test_case("[a-]", "(a|-)"; "trailing minus")]
    #[test_case("[ab]*", "(a|b)*"; "star")]
    #[test_case("[ab]?", "((a|b)|ε)"; "question mark")]
    #[test_case("[a]", "(a)"; "single symbol")]
    fn test_char_class(pattern: &str, expected: &str) {
        assert_eq!(normalize(pattern), Ok(tokens(expected)));
    }

    #[test]
    fn test_char_class_structural_chars() {
        let literals = |chars: &[char]| {
            let mut expected = vec![Token::LeftParen];
            for (i, c) in chars.iter().enumerate() {
                if i > 0 {
                    expected.push(Token::Pipe);
                }
                expected.push(Token::Symbol(Symbol::Char(*c)));
            }
            expected.push(Token::RightParen);
            expected
        };
        assert_eq!(normalize("[(|)]"), Ok(literals(&['(', '|', ')'])));
        // `-` between non-alphanumerics is not a range.
        assert_eq!(normalize("[+-*]"), Ok(literals(&['+', '-', '*'])));
    }

    #[test]
    fn test_char_class_escapes() {
        assert_eq!(normalize(r"[\dx]").unwrap().len(), 2 * 11 + 1);
        assert_eq!(normalize(r"[\]]"), Ok(tokens("(])")));
    }

    #[test_case("(a|b", SyntaxError::Unclosed('(', 0); "unclosed group")]
    #[test_case("a(b(c)", SyntaxError::Unclosed('(', 1); "unclosed outer group")]
    #[test_case("[ab", SyntaxError::Unclosed('[', 0); "unclosed class")]
    #[test_case("a)", SyntaxError::Unmatched(')', 1); "stray paren")]
    #[test_case("a]", SyntaxError::Unmatched(']', 1); "stray bracket")]
    #[test_case("[]", SyntaxError::EmptyClass(0); "empty class")]
    #[test_case("*a", SyntaxError::QuantifierNotPreceded('*', 0); "leading star")]
    #[test_case("a|+", SyntaxError::QuantifierNotPreceded('+', 2); "plus after pipe")]
    #[test_case("(?)", SyntaxError::QuantifierNotPreceded('?', 1); "question mark in empty group")]
    #[test_case("[z-a]", SyntaxError::InvalidRange('z', 'a'); "reversed range")]
    #[test_case(r"a\", SyntaxError::InvalidToken(TokenError::UnexpectedEOF(1)); "backslash")]
    fn test_normalize_errors(pattern: &str, expected: SyntaxError) {
        assert_eq!(normalize(pattern), Err(expected));
    }

    #[test]
    fn test_deeply_nested_groups() {
        let depth = 100_000;
        let pattern = format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
        let normalized = normalize(&pattern).unwrap();
        assert_eq!(normalized.len(), 2 * depth + 1);
        assert_eq!(normalized[depth], Token::Symbol(Symbol::Char('a')));
    }

    #[test]
    fn test_long_literal() {
        let pattern = "a".repeat(200_000);
        assert_eq!(normalize(&pattern).map(|tokens| tokens.len()), Ok(200_000));
    }

    #[test]
    fn test_stacked_plus_is_bounded() {
        let stacked = format!("a{}", "+".repeat(64));
        assert_eq!(
            normalize(&stacked),
            Err(SyntaxError::TooLarge(MAX_NORMALIZED_TOKENS))
        );
        let nested = format!("{}a{}", "(".repeat(64), ")+".repeat(64));
        assert_eq!(
            normalize(&nested),
            Err(SyntaxError::TooLarge(MAX_NORMALIZED_TOKENS))
        );
        assert_eq!(normalize("a++").map(|tokens| tokens.len()), Ok(7));
    }

    #[test_case('*', Ok(Quantifier::ZeroOrMore); "star")]
    #[test_case('+', Ok(Quantifier::OneOrMore); "plus")]
    #[test_case('?', Ok(Quantifier::ZeroOrOne); "question mark")]
    #[test_case('{', Err(SyntaxError::InvalidQuantifier('{')); "brace")]
    fn test_quantifier_from_char(c: char, expected: Result<Quantifier, SyntaxError>) {
        assert_eq!(Quantifier::try_from(c), expected);
    }
}
