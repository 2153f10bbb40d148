// SQL lexer - tokenizes the statements produced by the query compiler

use std::fmt;

/// Declares `Token` with one unit variant per keyword and the lookup from
/// keyword text.
macro_rules! tokens {
    (
        keywords { $($keyword:ident = $text:literal),* $(,)? }
        symbols { $($symbol:ident = $sym:literal),* $(,)? }
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum Token {
            Identifier(String),
            Number(String),
            String(String),
            $($keyword,)*
            $($symbol,)*
            Unknown(char),
            Eof,
        }

        impl Token {
            /// Keyword token for `word`, ignoring case
            pub fn keyword_from_str(word: &str) -> Option<Token> {
                match word.to_uppercase().as_str() {
                    $($text => Some(Token::$keyword),)*
                    _ => None,
                }
            }
        }

        impl fmt::Display for Token {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Token::Identifier(name) => write!(f, "identifier {}", name),
                    Token::Number(number) => write!(f, "number {}", number),
                    Token::String(string) => write!(f, "string '{}'", string),
                    $(Token::$keyword => f.write_str($text),)*
                    $(Token::$symbol => f.write_str($sym),)*
                    Token::Unknown(c) => write!(f, "character {:?}", c),
                    Token::Eof => f.write_str("end of input"),
                }
            }
        }
    };
}

tokens! {
    keywords {
        Select = "SELECT", From = "FROM", Where = "WHERE",
        Insert = "INSERT", Into = "INTO", Values = "VALUES",
        Update = "UPDATE", Set = "SET", Delete = "DELETE",
        Create = "CREATE", Table = "TABLE",
        And = "AND", Or = "OR", Not = "NOT", Null = "NULL",
        Order = "ORDER", By = "BY", Asc = "ASC", Desc = "DESC",
        Limit = "LIMIT", Distinct = "DISTINCT",
        In = "IN", Like = "LIKE", Escape = "ESCAPE", Is = "IS",
        True = "TRUE", False = "FALSE",
        Int = "INT", Integer = "INTEGER", Bigint = "BIGINT", Double = "DOUBLE",
        Boolean = "BOOLEAN", Varchar = "VARCHAR", Blob = "BLOB", Date = "DATE",
    }
    symbols {
        Star = "*", Equal = "=", NotEqual = "<>",
        Less = "<", Greater = ">", LessEqual = "<=", GreaterEqual = ">=",
        Minus = "-", Placeholder = "?",
        LeftParen = "(", RightParen = ")", Comma = ",", Semicolon = ";", Dot = ".",
    }
}

pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Token::Eof;
        };

        match ch {
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Equal),
            '?' => self.single(Token::Placeholder),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            '.' => self.single(Token::Dot),
            '-' => {
                self.advance();
                // Check for comments
                if self.current_char() == Some('-') {
                    self.skip_comment();
                    return self.next_token();
                }
                Token::Minus
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => self.single(Token::LessEqual),
                    Some('>') => self.single(Token::NotEqual),
                    _ => Token::Less,
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.single(Token::GreaterEqual)
                } else {
                    Token::Greater
                }
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                self.single(Token::NotEqual)
            }
            '\'' => self.read_string(),
            '"' => self.read_quoted_identifier(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c => self.single(Token::Unknown(c)),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip single-line comments starting with --
    fn skip_comment(&mut self) {
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read a quoted identifier (e.g., "table name")
    fn read_quoted_identifier(&mut self) -> Token {
        self.advance(); // Skip opening quote
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '"' {
                break;
            }
            identifier.push(ch);
        }

        Token::Identifier(identifier)
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // Skip opening quote
        let mut string = String::new();

        while let Some(ch) = self.current_char() {
            if ch == '\'' {
                if self.peek() == Some('\'') {
                    // Handle escaped single quotes
                    string.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // Skip closing quote
                    break;
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Token::String(string)
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(number)
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }
}
