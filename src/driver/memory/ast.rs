// SQL Abstract Syntax Tree (AST) definitions

use super::table::ColumnType;
use crate::metamodel::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projections: Vec<SelectItem>,
    pub from: Vec<String>,
    pub where_clause: Option<Expression>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    AllColumns,
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expression: Expression,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table_name: String,
    pub columns: Option<Vec<String>>,
    pub values: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table_name: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table_name: String,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub table_name: String,
    pub columns: Vec<(String, ColumnType)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),

    /// `?`, numbered from 1 in order of appearance
    Parameter(usize),

    Column(String),
    QualifiedColumn(String, String), // table.column

    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    Not(Box<Expression>),

    InList {
        expression: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },

    Like {
        expression: Box<Expression>,
        pattern: Box<Expression>,
        escape: Option<char>,
        negated: bool,
    },

    IsNull {
        expression: Box<Expression>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl Statement {
    /// Column names of the result rows, for statements that return rows
    pub fn result_columns(&self, mut all_columns: impl FnMut(&str) -> Vec<String>) -> Vec<String> {
        let Statement::Select(select) = self else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for item in &select.projections {
            match item {
                SelectItem::AllColumns => {
                    for table in &select.from {
                        names.extend(all_columns(table));
                    }
                }
                SelectItem::Expression(Expression::Column(name))
                | SelectItem::Expression(Expression::QualifiedColumn(_, name)) => {
                    names.push(name.clone())
                }
                SelectItem::Expression(_) => names.push(format!("EXPR{}", names.len() + 1)),
            }
        }
        names
    }
}
