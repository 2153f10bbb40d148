use fieldsql::binder::{escape_like, Binder, BoundValues};
use fieldsql::compiler::{compile_index_sequence, WhereCompiler};
use fieldsql::config::BlobMode;
use fieldsql::constraint::Constraint;
use fieldsql::metamodel::{EntityType, FieldKind, IntegerField, StringField, Value};
use fieldsql::naming::DefaultNaming;
use proptest::prelude::*;

/// Constraint tree over two fields, built into a real `Constraint` per case
#[derive(Debug, Clone)]
enum Shape {
    EqualNumber(i32),
    EqualText(i32),
    In(Vec<i32>),
    NotIn(Vec<i32>),
    NullTest(bool),
    Contains(String, bool),
    And(Box<Shape>, Box<Shape>),
    Or(Box<Shape>, Box<Shape>),
}

struct Fixture {
    number: IntegerField,
    text: StringField,
}

impl Fixture {
    fn new() -> Self {
        let entity = EntityType::builder("sample")
            .key("number", FieldKind::Integer)
            .field("text", FieldKind::String)
            .build();
        Self {
            number: entity.integer_field("number").unwrap(),
            text: entity.string_field("text").unwrap(),
        }
    }

    fn build(&self, shape: &Shape) -> Constraint {
        match shape {
            Shape::EqualNumber(v) => Constraint::equal(&self.number, *v),
            Shape::EqualText(v) => Constraint::equal(&self.text, v.to_string()),
            Shape::In(values) => Constraint::in_values(&self.number, values.iter().copied()),
            Shape::NotIn(values) => Constraint::not_in(&self.number, values.iter().copied()),
            Shape::NullTest(true) => Constraint::is_null(&self.number),
            Shape::NullTest(false) => Constraint::is_not_null(&self.text),
            Shape::Contains(s, true) => Constraint::contains(&self.text, s.clone()),
            Shape::Contains(s, false) => Constraint::not_contains(&self.text, s.clone()),
            Shape::And(l, r) => Constraint::and(self.build(l), self.build(r)),
            Shape::Or(l, r) => Constraint::or(self.build(l), self.build(r)),
        }
    }
}

/// Values in left-to-right reading order of the rendered predicate
fn expected_values(shape: &Shape, out: &mut Vec<Value>) {
    match shape {
        Shape::EqualNumber(v) => out.push(Value::Integer(*v)),
        Shape::EqualText(v) => out.push(Value::String(v.to_string())),
        Shape::In(values) | Shape::NotIn(values) => {
            out.extend(values.iter().map(|v| Value::Integer(*v)))
        }
        Shape::NullTest(_) => {}
        Shape::Contains(s, _) => out.push(Value::String(format!("%{}%", escape_like(s)))),
        Shape::And(l, r) | Shape::Or(l, r) => {
            expected_values(l, out);
            expected_values(r, out);
        }
    }
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(Shape::EqualNumber),
        any::<i32>().prop_map(Shape::EqualText),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(Shape::In),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(Shape::NotIn),
        any::<bool>().prop_map(Shape::NullTest),
        ("[a-z%_]{0,6}", any::<bool>()).prop_map(|(s, c)| Shape::Contains(s, c)),
    ];

    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Shape::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| Shape::Or(Box::new(l), Box::new(r))),
        ]
    })
}

proptest! {
    #[test]
    fn bind_order_matches_compile_order(shape in arb_shape()) {
        let fixture = Fixture::new();
        let naming = DefaultNaming::default();
        let constraint = fixture.build(&shape);

        let placeholders = compile_index_sequence(&constraint, &naming).unwrap();
        let mut bound = BoundValues::new();
        let count = Binder::new("", BlobMode::Native)
            .bind(&mut bound, &[], Some(&constraint), placeholders.len())
            .unwrap();

        let mut expected = Vec::new();
        expected_values(&shape, &mut expected);

        prop_assert_eq!(count, placeholders.len());
        prop_assert_eq!(constraint.parameter_count(), placeholders.len());
        prop_assert_eq!(bound.values(), expected.as_slice());

        for (position, placeholder) in placeholders.iter().enumerate() {
            prop_assert_eq!(placeholder.index, position + 1);
            let kind = placeholder.field.kind();
            prop_assert!(kind.accepts(&bound.values()[position]));
        }
    }

    #[test]
    fn rendered_placeholders_match_sequence(shape in arb_shape()) {
        let fixture = Fixture::new();
        let naming = DefaultNaming::default();
        let constraint = fixture.build(&shape);

        let mut compiler = WhereCompiler::new(&naming);
        let next = compiler.compile(&constraint, 1).unwrap();

        prop_assert_eq!(compiler.sql().matches('?').count(), next - 1);
        prop_assert_eq!(compiler.placeholders().len(), next - 1);
    }
}
