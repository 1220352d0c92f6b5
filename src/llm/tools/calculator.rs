//! Arithmetic expression tool.
//!
//! Evaluates plain infix arithmetic so the model does not have to do the
//! math itself. Supports `+ - * /`, `^` for exponentiation, parentheses,
//! and `sqrt(..)`. Evaluation happens locally; nothing leaves the process.

use crate::error::{AgentryError, Result};
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Tool for evaluating arithmetic expressions
#[derive(Debug, Clone, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    /// Creates a new CalculatorTool instance
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Sqrt,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number.parse::<f64>().map_err(|_| {
                    AgentryError::ParseError(format!("invalid number '{}'", number))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphabetic() {
                        word.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "sqrt" => tokens.push(Token::Sqrt),
                    other => {
                        return Err(AgentryError::ParseError(format!(
                            "unknown function '{}'",
                            other
                        )))
                    }
                }
            }
            other => {
                return Err(AgentryError::ParseError(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

/// Recursive-descent evaluator over the token stream
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(AgentryError::ParseError(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;

        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                Token::Slash => {
                    self.advance();
                    value /= self.unary()?;
                }
                _ => break,
            }
        }

        Ok(value)
    }

    // unary := '-' unary | power
    fn unary(&mut self) -> Result<f64> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            return Ok(-self.unary()?);
        }
        self.power()
    }

    // power := atom ('^' unary)?   -- right associative
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;

        if self.peek() == Some(&Token::Caret) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }

        Ok(base)
    }

    // atom := number | '(' expr ')' | 'sqrt' '(' expr ')'
    fn atom(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Sqrt) => {
                self.expect(Token::LParen)?;
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value.sqrt())
            }
            other => Err(AgentryError::ParseError(format!(
                "expected a value, found {:?}",
                other
            ))),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;

    if tokens.is_empty() {
        return Err(AgentryError::ParseError("empty expression".to_string()));
    }

    let mut parser = Parser::new(tokens);
    let value = parser.expr()?;

    if parser.peek().is_some() {
        return Err(AgentryError::ParseError(format!(
            "unexpected trailing token {:?}",
            parser.peek()
        )));
    }

    if !value.is_finite() {
        return Err(AgentryError::ToolError(
            "expression did not evaluate to a finite number".to_string(),
        ));
    }

    Ok(value)
}

#[async_trait]
impl LlmTool for CalculatorTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let expression = args.get("expression").and_then(|v| v.as_str()).ok_or_else(|| {
            AgentryError::InvalidArgument("expression parameter is required".to_string())
        })?;

        let result = evaluate(expression)?;

        Ok(json!({ "expression": expression, "result": result }))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: "calculator".to_string(),
                description: "Evaluate an arithmetic expression. Supports +, -, *, /, ^, parentheses, and sqrt(). Use this for any math instead of computing it yourself.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "The expression to evaluate, e.g. \"sqrt(289) + 12 * 3\""
                        }
                    },
                    "required": ["expression"]
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
