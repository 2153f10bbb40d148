// SQL parser - converts tokens to AST

use super::ast::*;
use super::lexer::{Lexer, Token};
use super::table::ColumnType;
use crate::metamodel::Value;
use anyhow::{anyhow, bail, Result};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    parameters: usize,
}

impl Parser {
    pub fn new(sql: &str) -> Self {
        let tokens = Lexer::new(sql).tokenize();
        Parser {
            tokens,
            position: 0,
            parameters: 0,
        }
    }

    /// Number of `?` placeholders seen so far
    pub fn parameter_count(&self) -> usize {
        self.parameters
    }

    /// Parse a single SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_token() {
            Token::Select => self.parse_select()?,
            Token::Insert => self.parse_insert()?,
            Token::Update => self.parse_update()?,
            Token::Delete => self.parse_delete()?,
            Token::Create => self.parse_create_table()?,
            token => bail!("Expected SQL statement, found {}", token),
        };

        if self.match_token(&Token::Semicolon) {
            self.advance();
        }
        if !self.match_token(&Token::Eof) {
            bail!("Unexpected token after statement: {}", self.current_token());
        }
        Ok(statement)
    }

    /// Parse a SELECT statement
    fn parse_select(&mut self) -> Result<Statement> {
        self.expect_token(Token::Select)?;

        let distinct = if self.match_token(&Token::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let projections = self.parse_select_items()?;

        self.expect_token(Token::From)?;
        let from = self.parse_identifier_list()?;

        let where_clause = self.parse_where()?;

        let mut order_by = vec![];
        if self.match_token(&Token::Order) {
            self.advance();
            self.expect_token(Token::By)?;
            order_by = self.parse_order_by_items()?;
        }

        let limit = if self.match_token(&Token::Limit) {
            self.advance();
            let number = self.expect_number()?;
            Some(
                number
                    .parse::<usize>()
                    .map_err(|e| anyhow!("Invalid limit {}: {}", number, e))?,
            )
        } else {
            None
        };

        Ok(Statement::Select(SelectStatement {
            distinct,
            projections,
            from,
            where_clause,
            order_by,
            limit,
        }))
    }

    /// Parse SELECT items
    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = vec![];

        loop {
            if self.match_token(&Token::Star) {
                self.advance();
                items.push(SelectItem::AllColumns);
            } else {
                items.push(SelectItem::Expression(self.parse_primary()?));
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_where(&mut self) -> Result<Option<Expression>> {
        if self.match_token(&Token::Where) {
            self.advance();
            Ok(Some(self.parse_expression()?))
        } else {
            Ok(None)
        }
    }

    /// Parse ORDER BY items
    fn parse_order_by_items(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = vec![];

        loop {
            let expression = self.parse_primary()?;
            let direction = if self.match_token(&Token::Asc) {
                self.advance();
                OrderDirection::Asc
            } else if self.match_token(&Token::Desc) {
                self.advance();
                OrderDirection::Desc
            } else {
                OrderDirection::Asc
            };

            items.push(OrderByItem {
                expression,
                direction,
            });

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    /// Parse INSERT statement
    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_token(Token::Insert)?;
        self.expect_token(Token::Into)?;

        let table_name = self.expect_identifier()?;

        let columns = if self.match_token(&Token::LeftParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect_token(Token::RightParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect_token(Token::Values)?;

        let mut values = vec![];
        loop {
            self.expect_token(Token::LeftParen)?;
            let row = self.parse_expression_list()?;
            self.expect_token(Token::RightParen)?;
            values.push(row);

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(Statement::Insert(InsertStatement {
            table_name,
            columns,
            values,
        }))
    }

    /// Parse UPDATE statement
    fn parse_update(&mut self) -> Result<Statement> {
        self.expect_token(Token::Update)?;

        let table_name = self.expect_identifier()?;

        self.expect_token(Token::Set)?;

        let mut assignments = vec![];
        loop {
            let column = self.expect_identifier()?;
            self.expect_token(Token::Equal)?;
            let value = self.parse_operand()?;
            assignments.push(Assignment { column, value });

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_where()?;

        Ok(Statement::Update(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        }))
    }

    /// Parse DELETE statement
    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect_token(Token::Delete)?;
        self.expect_token(Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where()?;

        Ok(Statement::Delete(DeleteStatement {
            table_name,
            where_clause,
        }))
    }

    /// Parse CREATE TABLE statement
    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect_token(Token::Create)?;
        self.expect_token(Token::Table)?;

        let table_name = self.expect_identifier()?;

        self.expect_token(Token::LeftParen)?;
        let mut columns = vec![];
        loop {
            let name = self.expect_identifier()?;
            let data_type = self.parse_data_type()?;
            columns.push((name, data_type));

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect_token(Token::RightParen)?;

        Ok(Statement::CreateTable(CreateTableStatement {
            table_name,
            columns,
        }))
    }

    /// Parse data type
    fn parse_data_type(&mut self) -> Result<ColumnType> {
        let data_type = match self.current_token() {
            Token::Int | Token::Integer => ColumnType::Integer,
            Token::Bigint => ColumnType::BigInt,
            Token::Double => ColumnType::Double,
            Token::Boolean => ColumnType::Boolean,
            Token::Varchar => ColumnType::Varchar,
            Token::Blob => ColumnType::Blob,
            Token::Date => ColumnType::Date,
            token => bail!("Expected data type, found {}", token),
        };
        self.advance();

        // Length is accepted and ignored
        if data_type == ColumnType::Varchar && self.match_token(&Token::LeftParen) {
            self.advance();
            self.expect_number()?;
            self.expect_token(Token::RightParen)?;
        }

        Ok(data_type)
    }

    /// Parse expression
    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> Result<Expression> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::Not(Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    /// Parse comparison expression
    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_operand()?;

        if self.match_token(&Token::Is) {
            self.advance();
            let negated = if self.match_token(&Token::Not) {
                self.advance();
                true
            } else {
                false
            };
            self.expect_token(Token::Null)?;
            return Ok(Expression::IsNull {
                expression: Box::new(left),
                negated,
            });
        }

        // [NOT] IN / [NOT] LIKE
        let negated = if self.match_token(&Token::Not) {
            self.advance();
            true
        } else {
            false
        };

        if self.match_token(&Token::In) {
            self.advance();
            self.expect_token(Token::LeftParen)?;
            let list = self.parse_expression_list()?;
            self.expect_token(Token::RightParen)?;
            return Ok(Expression::InList {
                expression: Box::new(left),
                list,
                negated,
            });
        }

        if self.match_token(&Token::Like) {
            self.advance();
            let pattern = self.parse_operand()?;
            let escape = if self.match_token(&Token::Escape) {
                self.advance();
                Some(self.parse_escape_char()?)
            } else {
                None
            };
            return Ok(Expression::Like {
                expression: Box::new(left),
                pattern: Box::new(pattern),
                escape,
                negated,
            });
        }

        if negated {
            bail!("Expected IN or LIKE after NOT");
        }

        let op = match self.current_token() {
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::Less => BinaryOperator::Less,
            Token::Greater => BinaryOperator::Greater,
            Token::LessEqual => BinaryOperator::LessEqual,
            Token::GreaterEqual => BinaryOperator::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_operand()?;
        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// Parse a parenthesised expression or a primary
    fn parse_operand(&mut self) -> Result<Expression> {
        if self.match_token(&Token::LeftParen) {
            self.advance();
            let expr = self.parse_expression()?;
            self.expect_token(Token::RightParen)?;
            Ok(expr)
        } else {
            self.parse_primary()
        }
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> Result<Expression> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                parse_number(&n, false)
            }
            Token::Minus => {
                self.advance();
                let n = self.expect_number()?;
                parse_number(&n, true)
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Literal(Value::Null))
            }
            Token::Placeholder => {
                self.advance();
                self.parameters += 1;
                Ok(Expression::Parameter(self.parameters))
            }
            Token::Identifier(name) => {
                self.advance();

                // Check for qualified column (table.column)
                if self.match_token(&Token::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    Ok(Expression::QualifiedColumn(name, column))
                } else {
                    Ok(Expression::Column(name))
                }
            }
            token => bail!("Unexpected token: {}", token),
        }
    }

    /// Parse list of expressions
    fn parse_expression_list(&mut self) -> Result<Vec<Expression>> {
        let mut expressions = vec![];

        loop {
            expressions.push(self.parse_operand()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(expressions)
    }

    /// Parse list of identifiers
    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![];

        loop {
            identifiers.push(self.expect_identifier()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    // Helper methods

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.tokens.get(self.position) == Some(token)
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> Result<()> {
        if self.match_token(&token) {
            self.advance();
            Ok(())
        } else {
            bail!("Expected {}, found {}", token, self.current_token())
        }
    }

    /// Single-character string literal following ESCAPE
    fn parse_escape_char(&mut self) -> Result<char> {
        let escape = match self.current_token() {
            Token::String(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => bail!("ESCAPE requires a single character, found '{}'", text),
                }
            }
            token => bail!("Expected escape character, found {}", token),
        };
        self.advance();
        Ok(escape)
    }

    /// Expect an identifier and return it
    fn expect_identifier(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            token => bail!("Expected identifier, found {}", token),
        }
    }

    /// Expect a number and return it
    fn expect_number(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                Ok(n)
            }
            token => bail!("Expected number, found {}", token),
        }
    }
}

/// Integers that fit stay `Integer`, larger ones become `Long`
fn parse_number(text: &str, negative: bool) -> Result<Expression> {
    let signed = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    let value = if let Ok(i) = signed.parse::<i32>() {
        Value::Integer(i)
    } else if let Ok(l) = signed.parse::<i64>() {
        Value::Long(l)
    } else {
        Value::Double(
            signed
                .parse::<f64>()
                .map_err(|e| anyhow!("Invalid number {}: {}", signed, e))?,
        )
    };
    Ok(Expression::Literal(value))
}
