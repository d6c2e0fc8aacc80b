use crate::{
    ast::{BinOp, ColumnDef, Expr, Projection, SelectQuery, TableLiteral, Token},
    lexer::{LexError, Lexer},
};

/// Errors raised while turning tokens into an AST.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The statement could not be tokenized
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A token other than the one the grammar requires
    #[error("Expected {expected}, got {found:?}")]
    UnexpectedToken { expected: String, found: Token },

    /// Input ended where the grammar requires more
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },

    /// Expressions nested deeper than [`MAX_NESTING`]
    #[error("Expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Deepest nesting of parentheses, unary minus and prefix application the
/// parser accepts.
pub const MAX_NESTING: usize = 128;

/// Recursive-descent parser over one statement.
///
/// Precedence, loosest first: comparison and `in`, additive, multiplicative,
/// `wavg`, unary minus, application, primary.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            position: 0,
            depth: 0,
        })
    }

    // The token vector always ends with Eof and `position` never moves past it.
    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if token != Token::Eof {
            self.position += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Token::Eof => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
            found => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.clone(),
            },
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, description: &str) -> Result<String, ParseError> {
        match self.current() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(description)),
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // Each operator in a left-associative chain adds one level to the tree.
    fn link(&mut self, links: &mut usize) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        *links += 1;
        Ok(())
    }

    /// Parses a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        let op = match self.current() {
            Token::Equal => BinOp::Equal,
            Token::NotEqual => BinOp::NotEqual,
            Token::Lt => BinOp::LessThan,
            Token::Gt => BinOp::GreaterThan,
            Token::LtEq => BinOp::LessEqual,
            Token::GtEq => BinOp::GreaterEqual,
            Token::In => BinOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;

        Ok(Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut links = 0;

        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            self.link(&mut links)?;
            let right = self.parse_multiplicative()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_weighted()?;
        let mut links = 0;

        loop {
            let op = match self.current() {
                Token::Star => BinOp::Multiply,
                Token::Slash | Token::Percent => BinOp::Divide,
                _ => break,
            };

            self.advance();
            self.link(&mut links)?;
            let right = self.parse_weighted()?;

            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_weighted(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;

        while self.check(&Token::Wavg) {
            self.advance();
            self.link(&mut links)?;
            let right = self.parse_unary()?;

            left = Expr::BinaryOp {
                op: BinOp::WeightedAvg,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            self.advance();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_application()
    }

    /// `name[args]` or `name operand`; the operand binds tighter than any
    /// infix operator, so `avg price, sum size` and `sum[a*b] % sum b` read
    /// as expected.
    fn parse_application(&mut self) -> Result<Expr, ParseError> {
        // `wavg` is an infix keyword but also callable as `wavg[w; x]`.
        if self.check(&Token::Wavg) && self.peek(1) == &Token::LBracket {
            self.advance();
            self.advance();
            let args = self.parse_args()?;
            return Ok(Expr::Apply {
                function: "wavg".to_string(),
                args,
            });
        }

        if let Token::Identifier(name) = self.current() {
            let function = name.clone();

            if self.peek(1) == &Token::LBracket {
                self.advance(); // name
                self.advance(); // '['
                let args = self.parse_args()?;
                return Ok(Expr::Apply { function, args });
            }

            if self.peek(1).starts_operand() {
                self.advance();
                let arg = self.nested(Self::parse_application)?;
                return Ok(Expr::Apply {
                    function,
                    args: vec![arg],
                });
            }
        }
        self.parse_primary()
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![];

        if self.check(&Token::RBracket) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Semicolon) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RBracket, "']'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current() {
            token if token.is_atom_literal() => Ok(self.parse_vector()),
            Token::Function(source) => {
                let source = source.clone();
                self.advance();
                Ok(Expr::Function(source))
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Name(name))
            }
            Token::LParen => {
                self.advance();
                self.parse_paren()
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Literal atoms written side by side form one vector (`1 2 3`, `` `a`b ``).
    fn parse_vector(&mut self) -> Expr {
        let mut items = vec![];

        while self.current().is_atom_literal() {
            let item = match self.advance() {
                Token::Number(n) => Expr::Number(n),
                Token::Date(d) => Expr::Date(d),
                Token::Text(s) => Expr::Text(s),
                Token::Symbol(s) => Expr::Symbol(s),
                Token::Boolean(b) => Expr::Boolean(b),
                _ => unreachable!("is_atom_literal covers the matched tokens"),
            };
            items.push(item);
        }

        if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::List(items)
        }
    }

    /// After `(`: a table literal, `()`, a grouped expression or `(a; b; c)`.
    fn parse_paren(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::LBracket) {
            self.advance();
            return self.parse_table_literal();
        }

        if self.check(&Token::RParen) {
            self.advance();
            return Ok(Expr::List(vec![]));
        }

        let first = self.parse_expression()?;
        if !self.check(&Token::Semicolon) {
            self.expect(Token::RParen, "')'")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.check(&Token::Semicolon) {
            self.advance();
            items.push(self.parse_expression()?);
        }
        self.expect(Token::RParen, "')'")?;
        Ok(Expr::List(items))
    }

    fn parse_table_literal(&mut self) -> Result<Expr, ParseError> {
        let keys = self.parse_column_defs(&Token::RBracket)?;
        self.expect(Token::RBracket, "']'")?;

        let columns = self.parse_column_defs(&Token::RParen)?;
        self.expect(Token::RParen, "')'")?;

        Ok(Expr::Table(TableLiteral { keys, columns }))
    }

    fn parse_column_defs(&mut self, terminator: &Token) -> Result<Vec<ColumnDef>, ParseError> {
        let mut defs = vec![];

        while !self.check(terminator) {
            let name = self.expect_identifier("a column name")?;
            self.expect(Token::Colon, "':'")?;
            let value = self.parse_expression()?;
            defs.push(ColumnDef { name, value });

            if self.check(&Token::Semicolon) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(defs)
    }
}

impl Parser {
    /// Parses `select [projections] [by groups] from name [where filters]`.
    pub fn parse_select(&mut self) -> Result<SelectQuery, ParseError> {
        self.expect(Token::Select, "'select'")?;

        let projections = if self.check(&Token::By) || self.check(&Token::From) {
            vec![]
        } else {
            self.parse_projections()?
        };

        let by = if self.check(&Token::By) {
            self.advance();
            self.parse_projections()?
        } else {
            vec![]
        };

        self.expect(Token::From, "'from'")?;
        let from = self.expect_identifier("a table name")?;

        let mut filters = vec![];
        if self.check(&Token::Where) {
            self.advance();
            loop {
                filters.push(self.parse_expression()?);
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::Eof, "end of query")?;

        Ok(SelectQuery {
            projections,
            by,
            from,
            filters,
        })
    }

    fn parse_projections(&mut self) -> Result<Vec<Projection>, ParseError> {
        let mut projections = vec![];

        loop {
            let name = match (self.current(), self.peek(1)) {
                (Token::Identifier(name), Token::Colon) => {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };
            let expr = self.parse_expression()?;
            projections.push(Projection { name, expr });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(projections)
    }
}
