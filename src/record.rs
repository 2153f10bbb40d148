//! Materialized rows.

use crate::metamodel::{Field, Value};

/// One result row, as `(field, value)` pairs in selection order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<(Field, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: Value) {
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn get(&self, field: &Field) -> Option<&Value> {
        self.values
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.get(field).is_some()
    }

    pub fn is_null(&self, field: &Field) -> bool {
        matches!(self.get(field), None | Some(Value::Null))
    }

    pub fn get_integer(&self, field: &Field) -> Option<i32> {
        match self.get(field) {
            Some(Value::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_long(&self, field: &Field) -> Option<i64> {
        match self.get(field) {
            Some(Value::Long(v)) => Some(*v),
            Some(Value::Integer(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn get_double(&self, field: &Field) -> Option<f64> {
        match self.get(field) {
            Some(Value::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_boolean(&self, field: &Field) -> Option<bool> {
        match self.get(field) {
            Some(Value::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, field: &Field) -> Option<&str> {
        match self.get(field) {
            Some(Value::String(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_blob(&self, field: &Field) -> Option<&[u8]> {
        match self.get(field) {
            Some(Value::Blob(v)) => Some(v),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.values.iter().map(|(field, _)| field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::{EntityType, FieldKind};

    #[test]
    fn test_record_access() {
        let entity = EntityType::builder("Sample")
            .field("count", FieldKind::Integer)
            .field("label", FieldKind::String)
            .field("ratio", FieldKind::Double)
            .build();
        let count = entity.field("count").unwrap();
        let label = entity.field("label").unwrap();
        let ratio = entity.field("ratio").unwrap();

        let mut record = Record::new();
        record.set(count.clone(), Value::Integer(3));
        record.set(label.clone(), Value::Null);
        record.set(count.clone(), Value::Integer(4));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get_integer(&count), Some(4));
        assert_eq!(record.get_long(&count), Some(4));
        assert!(record.is_null(&label));
        assert!(record.contains(&label));
        assert!(!record.contains(&ratio));
        assert_eq!(record.get_string(&label), None);
    }
}
