use crate::normalizer::SyntaxError;
use crate::Symbol;
use crate::Token;

/// Makes concatenation explicit and appends the end-marker, producing
/// `( normalized ) . #`.
pub fn augment(normalized: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(normalized.len() * 2 + 4);
    output.push(Token::LeftParen);
    let mut tokens = normalized.into_iter().peekable();
    while let Some(token) = tokens.next() {
        let concat = token.ends_operand() && tokens.peek().is_some_and(Token::starts_operand);
        output.push(token);
        if concat {
            output.push(Token::Concat);
        }
    }
    output.push(Token::RightParen);
    output.push(Token::Concat);
    output.push(Token::Symbol(Symbol::EndMarker));
    output
}

/// Shunting-yard conversion of an augmented infix stream to postfix order.
/// Every operator is left-associative.
pub fn to_postfix(infix: Vec<Token>) -> Result<Vec<Token>, SyntaxError> {
    let mut output = Vec::with_capacity(infix.len());
    let mut operators: Vec<Token> = Vec::new();

    for token in infix {
        match token {
            Token::Symbol(_) => output.push(token),
            Token::LeftParen => operators.push(token),
            Token::RightParen => loop {
                match operators.pop() {
                    Some(Token::LeftParen) => break,
                    Some(operator) => output.push(operator),
                    None => return Err(SyntaxError::UnbalancedParentheses),
                }
            },
            Token::Star | Token::Concat | Token::Pipe => {
                while let Some(top) = operators.pop() {
                    if top.precedence() < token.precedence() {
                        operators.push(top);
                        break;
                    }
                    output.push(top);
                }
                operators.push(token);
            }
        }
    }

    while let Some(operator) = operators.pop() {
        if operator == Token::LeftParen {
            return Err(SyntaxError::UnbalancedParentheses);
        }
        output.push(operator);
    }
    Ok(output)
}
