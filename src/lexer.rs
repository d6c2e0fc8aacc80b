use crate::ast::Token;
use crate::value::QDate;

/// A lexing failure and the character offset it happened at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

impl LexError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        LexError {
            message: message.into(),
            position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Symbols additionally allow dots (`` `a.b ``).
    fn read_symbol(&mut self) -> String {
        self.advance(); // Consume backtick
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(LexError::new(
                                format!("Invalid escape sequence '\\{}'", ch),
                                self.position,
                            ));
                        }
                        None => return Err(LexError::new("Unterminated string", start)),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Unterminated string", start))
    }

    /// Numbers, dates (two dots) and the boolean literals `0b`/`1b`.
    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut text = String::new();
        let mut dots = 0;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                dots += 1;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if dots == 0
            && (text == "0" || text == "1")
            && self.current_char() == Some('b')
            && !self.peek_char(1).is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
            return Ok(Token::Boolean(text == "1"));
        }

        match dots {
            0 | 1 => text
                .parse::<f64>()
                .map(Token::Number)
                .map_err(|_| LexError::new(format!("Invalid number '{}'", text), start)),
            2 => QDate::parse(&text)
                .map(Token::Date)
                .ok_or_else(|| LexError::new(format!("Invalid date '{}'", text), start)),
            _ => Err(LexError::new(format!("Invalid number '{}'", text), start)),
        }
    }

    /// Captures `{...}` verbatim, nested braces and strings included.
    fn read_function(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut source = String::new();

        while let Some(ch) = self.current_char() {
            source.push(ch);
            self.advance();
            match ch {
                '"' => in_string = !in_string,
                '\\' if in_string => {
                    if let Some(escaped) = self.current_char() {
                        source.push(escaped);
                        self.advance();
                    }
                }
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(source);
                    }
                }
                _ => {}
            }
        }

        Err(LexError::new("Unterminated function literal", start))
    }

    fn single(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        match self.current_char() {
            None => Ok(Token::Eof),
            Some('+') => self.single(Token::Plus),
            Some('-') => self.single(Token::Minus),
            Some('*') => self.single(Token::Star),
            Some('/') => self.single(Token::Slash),
            Some('%') => self.single(Token::Percent),
            Some('=') => self.single(Token::Equal),
            Some(':') => self.single(Token::Colon),
            Some(';') => self.single(Token::Semicolon),
            Some(',') => self.single(Token::Comma),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('<') => match self.peek_char(1) {
                Some('>') => {
                    self.advance();
                    self.single(Token::NotEqual)
                }
                Some('=') => {
                    self.advance();
                    self.single(Token::LtEq)
                }
                _ => self.single(Token::Lt),
            },
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.single(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some('"') => Ok(Token::Text(self.read_string()?)),
            Some('`') => Ok(Token::Symbol(self.read_symbol())),
            Some('{') => Ok(Token::Function(self.read_function()?)),
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.to_ascii_lowercase().as_str() {
                    "select" => Token::Select,
                    "by" => Token::By,
                    "from" => Token::From,
                    "where" => Token::Where,
                    "in" => Token::In,
                    "wavg" => Token::Wavg,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) => Err(LexError::new(
                format!("Unexpected character '{}'", ch),
                self.position,
            )),
        }
    }

    /// Lexes the whole input; the returned vector always ends with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                tracing::trace!(count = tokens.len(), "tokenized statement");
                return Ok(tokens);
            }
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("select by FROM where in wavg");
    assert_eq!(lexer.next_token().unwrap(), Token::Select);
    assert_eq!(lexer.next_token().unwrap(), Token::By);
    assert_eq!(lexer.next_token().unwrap(), Token::From);
    assert_eq!(lexer.next_token().unwrap(), Token::Where);
    assert_eq!(lexer.next_token().unwrap(), Token::In);
    assert_eq!(lexer.next_token().unwrap(), Token::Wavg);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_where_clause() {
    let mut lexer = Lexer::new("where price > 200");
    assert_eq!(lexer.next_token().unwrap(), Token::Where);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("price".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Gt);
    assert_eq!(lexer.next_token().unwrap(), Token::Number(200.0));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
