//! Recursive-descent parser producing the expression tree.
//!
//! Precedence, loosest first: conditional (`a if c else b`), `or`, `and`, `not`, comparisons,
//! `+ -`, `* / // %`, unary sign, then subscripts and calls.

use serde_json::Value as JsonValue;

use super::EvaluationError;
use super::lexer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(JsonValue),
    List(Vec<Expr>),
    Name(String),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// Chained comparison: `a < b <= c` holds when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOperator, Expr)>,
    },
    Conditional {
        then: Box<Expr>,
        condition: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        function: String,
        arguments: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    NotIn,
}

/// Parses `source` into a single expression, enforcing the nesting limit.
pub(crate) fn parse(source: &str, max_depth: usize) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
        max_depth,
    };
    let expression = parser.expression()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::End {
        return Err(EvaluationError::syntax("unexpected trailing input", trailing.position));
    }
    Ok(expression)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> &TokenKind {
        &self.tokens[(self.cursor + 1).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.cursor += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name == keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, description: &str) -> Result<(), EvaluationError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(EvaluationError::syntax(format!("expected {description}"), self.peek().position))
        }
    }

    fn enter(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvaluationError::limit(format!("expression nesting exceeds {} levels", self.max_depth)));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expression(&mut self) -> Result<Expr, EvaluationError> {
        self.enter()?;
        let then = self.or_expression()?;
        let result = if self.at_keyword("if") {
            self.advance();
            let condition = self.or_expression()?;
            if !self.at_keyword("else") {
                return Err(EvaluationError::syntax("expected 'else' in conditional expression", self.peek().position));
            }
            self.advance();
            let otherwise = self.expression()?;
            Expr::Conditional {
                then: Box::new(then),
                condition: Box::new(condition),
                otherwise: Box::new(otherwise),
            }
        } else {
            then
        };
        self.leave();
        Ok(result)
    }

    fn or_expression(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.and_expression()?;
        let mut chained = 0;
        while self.at_keyword("or") {
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.and_expression()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn and_expression(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.not_expression()?;
        let mut chained = 0;
        while self.at_keyword("and") {
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.not_expression()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn not_expression(&mut self) -> Result<Expr, EvaluationError> {
        if self.at_keyword("not") {
            self.advance();
            self.enter()?;
            let operand = self.not_expression()?;
            self.leave();
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvaluationError> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        while let Some(operator) = self.compare_operator() {
            let operand = self.sum()?;
            rest.push((operator, operand));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn compare_operator(&mut self) -> Option<CompareOperator> {
        let operator = match &self.peek().kind {
            TokenKind::EqualEqual => CompareOperator::Equal,
            TokenKind::NotEqual => CompareOperator::NotEqual,
            TokenKind::Less => CompareOperator::Less,
            TokenKind::LessEqual => CompareOperator::LessEqual,
            TokenKind::Greater => CompareOperator::Greater,
            TokenKind::GreaterEqual => CompareOperator::GreaterEqual,
            TokenKind::Identifier(name) if name == "in" => CompareOperator::In,
            TokenKind::Identifier(name)
                if name == "not" && matches!(self.peek_second(), TokenKind::Identifier(next) if next == "in") =>
            {
                CompareOperator::NotIn
            }
            _ => return None,
        };
        if operator == CompareOperator::NotIn {
            self.advance();
        }
        self.advance();
        Some(operator)
    }

    fn sum(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.term()?;
        let mut chained = 0;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.term()?;
            left = Expr::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.unary()?;
        let mut chained = 0;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::DoubleSlash => BinaryOperator::FloorDivide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chained += 1;
            let right = self.unary()?;
            left = Expr::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                self.enter()?;
                let operand = self.unary()?;
                self.leave();
                Ok(Expr::Negate(Box::new(operand)))
            }
            TokenKind::Plus => {
                self.advance();
                self.enter()?;
                let operand = self.unary()?;
                self.leave();
                Ok(operand)
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, EvaluationError> {
        let mut expression = self.primary()?;
        let mut chained = 0;
        loop {
            match self.peek().kind {
                TokenKind::LeftBracket => {
                    self.advance();
                    self.enter()?;
                    chained += 1;
                    let index = self.expression()?;
                    self.expect(TokenKind::RightBracket, "']'")?;
                    expression = Expr::Index {
                        target: Box::new(expression),
                        index: Box::new(index),
                    };
                }
                TokenKind::LeftParen => {
                    let position = self.peek().position;
                    let Expr::Name(function) = expression else {
                        return Err(EvaluationError::syntax("only named functions can be called", position));
                    };
                    self.advance();
                    self.enter()?;
                    chained += 1;
                    let arguments = self.sequence(TokenKind::RightParen, "')'")?;
                    expression = Expr::Call { function, arguments };
                }
                _ => break,
            }
        }
        self.depth -= chained;
        Ok(expression)
    }

    /// Parses comma-separated expressions up to `closing`, allowing a trailing comma.
    fn sequence(&mut self, closing: TokenKind, description: &str) -> Result<Vec<Expr>, EvaluationError> {
        let mut items = Vec::new();
        if self.eat(&closing) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&closing) {
                return Ok(items);
            }
            self.expect(TokenKind::Comma, &format!("',' or {description}"))?;
            if self.eat(&closing) {
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(number) => Ok(Expr::Literal(JsonValue::from(number))),
            TokenKind::Float(number) => Ok(Expr::Literal(JsonValue::from(number))),
            TokenKind::Text(text) => Ok(Expr::Literal(JsonValue::String(text))),
            TokenKind::Identifier(name) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(JsonValue::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(JsonValue::Bool(false))),
                "None" | "null" => Ok(Expr::Literal(JsonValue::Null)),
                "and" | "or" | "not" | "in" | "if" | "else" => Err(EvaluationError::syntax(
                    format!("unexpected keyword '{name}'"),
                    token.position,
                )),
                _ => Ok(Expr::Name(name)),
            },
            TokenKind::LeftParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                self.enter()?;
                let items = self.sequence(TokenKind::RightBracket, "']'")?;
                self.leave();
                Ok(Expr::List(items))
            }
            TokenKind::End => Err(EvaluationError::syntax("unexpected end of expression", token.position)),
            other => Err(EvaluationError::syntax(format!("unexpected token {other:?}"), token.position)),
        }
    }
}
