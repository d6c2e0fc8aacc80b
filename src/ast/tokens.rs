use crate::value::QDate;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Number, always floating point
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 185.25
    /// .5
    /// ```
    Number(f64),

    /// Date literal
    ///
    /// # Examples
    /// ```text
    /// 2023.10.01
    /// ```
    Date(QDate),

    /// String literal enclosed in double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// "item #1"
    /// ```
    Text(String),

    /// Symbol literal. Consecutive symbols (`` `a`b`c ``) lex as separate
    /// tokens and are joined into a vector by the parser.
    ///
    /// # Examples
    /// ```text
    /// `AAPL
    /// `
    /// ```
    Symbol(String),

    /// Boolean literal
    ///
    /// # Examples
    /// ```text
    /// 1b
    /// 0b
    /// true
    /// ```
    Boolean(bool),

    /// Raw source of a function literal, braces included
    ///
    /// # Examples
    /// ```text
    /// {x*x}
    /// {[x;y] x + y}
    /// ```
    Function(String),

    // Identifiers
    /// Variable, column or builtin name
    ///
    /// Starts with a letter or underscore, followed by letters, digits or underscores.
    Identifier(String),

    // Query keywords (case-insensitive)
    Select,
    By,
    From,
    Where,

    /// Membership (`sym in `AAPL`MSFT`)
    In,

    /// Weighted average (`size wavg price`)
    Wavg,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,

    /// q's divide (`%`)
    Percent,

    // Comparison
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Delimiters
    /// Assignment or column naming (`:`)
    Colon,
    /// Separator inside brackets, lists and table literals (`;`)
    Semicolon,
    /// Separator between query clauses (`,`)
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    /// End of input
    Eof,
}

impl Token {
    /// Whether this token can start an operand, which is what makes a
    /// preceding name a prefix application (`avg price`).
    pub fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::Date(_)
                | Token::Text(_)
                | Token::Symbol(_)
                | Token::Boolean(_)
                | Token::Function(_)
                | Token::Identifier(_)
                | Token::LParen
        )
    }

    /// Literal atoms that join into a vector when written side by side.
    pub fn is_atom_literal(&self) -> bool {
        matches!(
            self,
            Token::Number(_) | Token::Date(_) | Token::Text(_) | Token::Symbol(_) | Token::Boolean(_)
        )
    }
}
