//! Constraint expression trees.
//!
//! A constraint is an immutable predicate over fields of one or more entity
//! types. Trees are built with the associated constructors below and handed
//! to a select, update or delete builder, which compiles them once and binds
//! their operand values on every execution.

use crate::accessor::{Accessor, FedAccessor};
use crate::metamodel::{Field, TypedField, Value};
use std::fmt;

/// Comparison operator of a binary comparison node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    /// Renders `<=`
    LessThan,
    /// Renders `>=`
    BiggerThan,
    StrictlyBiggerThan,
    StrictlyLesserThan,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::LessThan => "<=",
            CompareOp::BiggerThan => ">=",
            CompareOp::StrictlyBiggerThan => ">",
            CompareOp::StrictlyLesserThan => "<",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Leaf value source of a comparison
#[derive(Debug, Clone)]
pub enum Operand {
    /// Column reference, rendered as `table.column`
    Field(Field),

    /// Literal value, coerced to the kind of `field` when bound
    Value { field: Field, value: Value },

    /// Value read from an accessor at bind time
    Accessor { field: Field, accessor: Accessor },
}

impl Operand {
    /// Whether the operand renders a `?` placeholder
    pub fn is_parameter(&self) -> bool {
        !matches!(self, Operand::Field(_))
    }

    /// Field whose kind drives rendering or coercion
    pub fn field(&self) -> &Field {
        match self {
            Operand::Field(field) => field,
            Operand::Value { field, .. } => field,
            Operand::Accessor { field, .. } => field,
        }
    }
}

/// Predicate tree node
#[derive(Debug, Clone)]
pub enum Constraint {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },

    And(Box<Constraint>, Box<Constraint>),

    Or(Box<Constraint>, Box<Constraint>),

    /// One placeholder per value, in list order
    In { field: Field, values: Vec<Value> },

    NotIn { field: Field, values: Vec<Value> },

    /// `IS NULL` when `is_null`, `IS NOT NULL` otherwise; no placeholder
    IsOrNotNull { field: Field, is_null: bool },

    /// Substring match; `contains == false` renders `NOT LIKE`
    Contains {
        field: Field,
        value: String,
        contains: bool,
    },
}

impl Constraint {
    /// Create a comparison between a field and a value
    pub fn compare(op: CompareOp, field: &Field, value: impl Into<Value>) -> Self {
        Constraint::Compare {
            op,
            left: Operand::Field(field.clone()),
            right: Operand::Value {
                field: field.clone(),
                value: value.into(),
            },
        }
    }

    /// Create a comparison between two fields
    pub fn compare_fields(op: CompareOp, left: &Field, right: &Field) -> Self {
        Constraint::Compare {
            op,
            left: Operand::Field(left.clone()),
            right: Operand::Field(right.clone()),
        }
    }

    /// Create a comparison between a field and the value of an accessor
    pub fn compare_accessor(op: CompareOp, field: &Field, accessor: impl Into<Accessor>) -> Self {
        Constraint::Compare {
            op,
            left: Operand::Field(field.clone()),
            right: Operand::Accessor {
                field: field.clone(),
                accessor: accessor.into(),
            },
        }
    }

    pub fn equal<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::Equal, field.as_field(), native)
    }

    pub fn not_equal<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::NotEqual, field.as_field(), native)
    }

    /// `field <= value`
    pub fn less_than<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::LessThan, field.as_field(), native)
    }

    /// `field >= value`
    pub fn bigger_than<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::BiggerThan, field.as_field(), native)
    }

    pub fn strictly_bigger_than<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::StrictlyBiggerThan, field.as_field(), native)
    }

    pub fn strictly_lesser_than<F: TypedField>(field: &F, value: impl Into<F::Native>) -> Self {
        let native: F::Native = value.into();
        Self::compare(CompareOp::StrictlyLesserThan, field.as_field(), native)
    }

    /// Equality against an untyped value, checked against the field kind at bind time
    pub fn equal_value(field: &Field, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Equal, field, value)
    }

    pub fn fields_equal(left: &Field, right: &Field) -> Self {
        Self::compare_fields(CompareOp::Equal, left, right)
    }

    pub fn fields_not_equal(left: &Field, right: &Field) -> Self {
        Self::compare_fields(CompareOp::NotEqual, left, right)
    }

    /// Equality against a value fed before each execution
    pub fn equal_fed(field: &Field, accessor: &FedAccessor) -> Self {
        Self::compare_accessor(CompareOp::Equal, field, accessor.clone())
    }

    pub fn and(left: Constraint, right: Constraint) -> Self {
        Constraint::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Constraint, right: Constraint) -> Self {
        Constraint::Or(Box::new(left), Box::new(right))
    }

    /// AND of the present constraints; `None` when all are absent
    pub fn and_all<I>(constraints: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Constraint>>,
    {
        constraints.into_iter().flatten().reduce(Constraint::and)
    }

    /// OR of the present constraints; `None` when all are absent
    pub fn or_all<I>(constraints: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Constraint>>,
    {
        constraints.into_iter().flatten().reduce(Constraint::or)
    }

    pub fn in_values<F, I, V>(field: &F, values: I) -> Self
    where
        F: TypedField,
        I: IntoIterator<Item = V>,
        V: Into<F::Native>,
    {
        Constraint::In {
            field: field.as_field().clone(),
            values: values
                .into_iter()
                .map(|v| Into::<F::Native>::into(v).into())
                .collect(),
        }
    }

    pub fn not_in<F, I, V>(field: &F, values: I) -> Self
    where
        F: TypedField,
        I: IntoIterator<Item = V>,
        V: Into<F::Native>,
    {
        Constraint::NotIn {
            field: field.as_field().clone(),
            values: values
                .into_iter()
                .map(|v| Into::<F::Native>::into(v).into())
                .collect(),
        }
    }

    pub fn is_null(field: &Field) -> Self {
        Constraint::IsOrNotNull {
            field: field.clone(),
            is_null: true,
        }
    }

    pub fn is_not_null(field: &Field) -> Self {
        Constraint::IsOrNotNull {
            field: field.clone(),
            is_null: false,
        }
    }

    pub fn contains(field: &Field, value: impl Into<String>) -> Self {
        Constraint::Contains {
            field: field.clone(),
            value: value.into(),
            contains: true,
        }
    }

    pub fn not_contains(field: &Field, value: impl Into<String>) -> Self {
        Constraint::Contains {
            field: field.clone(),
            value: value.into(),
            contains: false,
        }
    }

    /// Number of `?` placeholders the constraint renders
    pub fn parameter_count(&self) -> usize {
        match self {
            Constraint::Compare { left, right, .. } => {
                usize::from(left.is_parameter()) + usize::from(right.is_parameter())
            }
            Constraint::And(left, right) | Constraint::Or(left, right) => {
                left.parameter_count() + right.parameter_count()
            }
            Constraint::In { values, .. } | Constraint::NotIn { values, .. } => values.len(),
            Constraint::IsOrNotNull { .. } => 0,
            Constraint::Contains { .. } => 1,
        }
    }

    /// Fields referenced by column, depth first and left before right
    pub fn referenced_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<Field>) {
        match self {
            Constraint::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Field(field) = operand {
                        fields.push(field.clone());
                    }
                }
            }
            Constraint::And(left, right) | Constraint::Or(left, right) => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Constraint::In { field, .. }
            | Constraint::NotIn { field, .. }
            | Constraint::IsOrNotNull { field, .. }
            | Constraint::Contains { field, .. } => fields.push(field.clone()),
        }
    }
}
