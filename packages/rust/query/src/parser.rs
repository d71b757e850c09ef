//! Recursive-descent parser for boolean topic queries.
//!
//! Grammar (lowest precedence first):
//! - `or_expr   := and_expr (OR and_expr)*`
//! - `and_expr  := not_expr ((AND)? not_expr)*` — adjacency is implicit AND
//! - `not_expr  := NOT not_expr | primary`
//! - `primary   := '(' or_expr ')' | term | quoted phrase`
//!
//! Operators are case-insensitive keywords. Errors are hard: an unbalanced
//! parenthesis, dangling operator, or empty input yields [`ParseError`],
//! never a partial tree.

use crate::QueryNode;

/// Why a topic failed to parse as a boolean query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input contained no terms at all.
    #[error("empty query expression")]
    Empty,
    /// A `(` without matching `)` or vice versa.
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    /// An operator with a missing operand, e.g. `a AND` or `OR b`.
    #[error("dangling operator: {0}")]
    DanglingOperator(String),
    /// A quote was opened but never closed.
    #[error("unterminated quoted phrase")]
    UnterminatedQuote,
    /// Leftover input after a complete expression.
    #[error("unexpected trailing input: {0}")]
    TrailingInput(String),
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(ch);
                }
                if !closed {
                    return Err(ParseError::UnterminatedQuote);
                }
                let phrase = phrase.trim().to_string();
                if !phrase.is_empty() {
                    tokens.push(Token::Term(phrase));
                }
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                match word.to_uppercase().as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => tokens.push(Token::Term(word)),
                }
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a topic string into a [`QueryNode`] tree.
pub fn parse(input: &str) -> Result<QueryNode, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.or_expr()?;

    match parser.peek() {
        None => Ok(node),
        Some(Token::RParen) => Err(ParseError::UnbalancedParens),
        Some(tok) => Err(ParseError::TrailingInput(format!("{tok:?}"))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn or_expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let right = self.and_expr()?;
            left = QueryNode::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut left = self.not_expr()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    let right = self.not_expr()?;
                    left = QueryNode::And(Box::new(left), Box::new(right));
                }
                // Two primaries in a row (e.g. `mobile crash`) join as AND.
                Some(Token::Term(_)) | Some(Token::LParen) | Some(Token::Not) => {
                    let right = self.not_expr()?;
                    left = QueryNode::And(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<QueryNode, ParseError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let child = self.not_expr()?;
            return Ok(QueryNode::Not(Box::new(child)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<QueryNode, ParseError> {
        match self.advance() {
            Some(Token::Term(term)) => Ok(QueryNode::Term(term)),
            Some(Token::LParen) => {
                let node = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(node),
                    _ => Err(ParseError::UnbalancedParens),
                }
            }
            Some(tok @ (Token::And | Token::Or)) => {
                Err(ParseError::DanglingOperator(format!("{tok:?}")))
            }
            Some(Token::RParen) => Err(ParseError::UnbalancedParens),
            Some(Token::Not) => Err(ParseError::DanglingOperator("Not".into())),
            None => Err(ParseError::DanglingOperator("end of input".into())),
        }
    }
}
