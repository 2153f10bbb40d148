use fieldsql::constraint::Constraint;
use fieldsql::driver::memory::MemoryDatabase;
use fieldsql::metamodel::{
    BlobField, BooleanField, DoubleField, EntityType, FieldKind, IntegerField, LongField,
    StringField, TypedField, Value,
};
use fieldsql::naming::DefaultNaming;
use fieldsql::{
    BlobMode, CursorPhase, FedAccessor, SqlRequest, SqlSession, SqlStreamError, SqlStreamsConfig,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

struct People {
    database: MemoryDatabase,
    session: SqlSession,
    entity: EntityType,
    id: LongField,
    name: StringField,
    age: IntegerField,
    score: DoubleField,
    active: BooleanField,
    photo: BlobField,
}

impl People {
    fn new() -> Self {
        Self::with_config(SqlStreamsConfig::default())
    }

    fn with_config(config: SqlStreamsConfig) -> Self {
        let entity = EntityType::builder("person")
            .key("id", FieldKind::Long)
            .field("firstName", FieldKind::String)
            .field("age", FieldKind::Integer)
            .field("score", FieldKind::Double)
            .field("active", FieldKind::Boolean)
            .field("photo", FieldKind::Blob)
            .build();
        let database = MemoryDatabase::new();
        let session = SqlSession::new(Arc::new(database.connection()), config);
        database
            .create_table_for(&entity, session.naming())
            .unwrap();

        Self {
            id: entity.long_field("id").unwrap(),
            name: entity.string_field("firstName").unwrap(),
            age: entity.integer_field("age").unwrap(),
            score: entity.double_field("score").unwrap(),
            active: entity.boolean_field("active").unwrap(),
            photo: entity.blob_field("photo").unwrap(),
            database,
            session,
            entity,
        }
    }

    fn insert(&self, id: i64, name: Option<&str>, age: i32, score: Option<f64>) {
        let mut create = self.session.create(&self.entity);
        create.set(&self.id, id).set(&self.age, age);
        if let Some(name) = name {
            create.set(&self.name, name);
        }
        if let Some(score) = score {
            create.set(&self.score, score);
        }
        assert_eq!(create.run().unwrap(), 1);
    }

    fn seed(&self) {
        self.insert(1, Some("ann"), 30, Some(1.5));
        self.insert(2, Some("bob"), 17, None);
        self.insert(3, None, 45, Some(0.0));
        self.insert(4, Some("dan"), 22, Some(3.0));
    }

    fn ids(&self, constraint: Option<Constraint>) -> Vec<i64> {
        let mut select = match constraint {
            Some(c) => self.session.select_where(&self.entity, c),
            None => self.session.select(&self.entity),
        };
        let id = select.retrieve_long(&self.id);
        select.order_asc(&self.id);
        let mut query = select.get_query().unwrap();
        let mut cursor = query.execute().unwrap();
        let mut ids = Vec::new();
        while cursor.next().unwrap() {
            ids.push(id.get().unwrap().unwrap());
        }
        ids
    }
}

#[test]
fn test_round_trip() {
    let people = People::new();
    people.seed();

    let mut select = people.session.select(&people.entity);
    let name = select.retrieve_string(&people.name);
    let age = select.retrieve_integer(&people.age);
    select.order_desc(&people.age);
    let mut query = select.get_query().unwrap();
    assert_eq!(
        query.sql(),
        "SELECT PERSON.FIRST_NAME, PERSON.AGE FROM PERSON ORDER BY AGE DESC"
    );

    let mut cursor = query.execute().unwrap();
    assert_eq!(cursor.phase(), CursorPhase::Unopened);
    let mut rows = Vec::new();
    while cursor.next().unwrap() {
        rows.push((name.get().unwrap(), age.get().unwrap()));
        assert_eq!(cursor.row_id(), rows.len());
    }
    assert_eq!(
        rows,
        vec![
            (None, Some(45)),
            (Some("ann".to_string()), Some(30)),
            (Some("dan".to_string()), Some(22)),
            (Some("bob".to_string()), Some(17)),
        ]
    );
    assert!(cursor.is_closed());
    assert!(matches!(cursor.next(), Err(SqlStreamError::CursorClosed)));
}

#[test]
fn test_in_binding() {
    let people = People::new();
    people.seed();

    let ids = people.ids(Some(Constraint::in_values(&people.id, [4i64, 2, 9])));
    assert_eq!(ids, vec![2, 4]);

    let ids = people.ids(Some(Constraint::not_in(&people.id, [1i64, 3])));
    assert_eq!(ids, vec![2, 4]);

    // An empty list matches nothing, its negation everything
    let ids = people.ids(Some(Constraint::in_values(&people.id, Vec::<i64>::new())));
    assert!(ids.is_empty());
    let ids = people.ids(Some(Constraint::not_in(&people.id, Vec::<i64>::new())));
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_null_tests() {
    let people = People::new();
    people.seed();

    let mut select = people
        .session
        .select_where(&people.entity, Constraint::is_null(&people.name));
    select.with_keys();
    let mut query = select.get_query().unwrap();
    assert_eq!(query.parameter_count(), 0);
    let records = query.execute_as_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_long(&people.id), Some(3));

    let ids = people.ids(Some(Constraint::is_not_null(&people.score)));
    assert_eq!(ids, vec![1, 3, 4]);
}

#[test]
fn test_compound_constraint() {
    let people = People::new();
    people.seed();

    let constraint = Constraint::or(
        Constraint::and(
            Constraint::bigger_than(&people.age, 18),
            Constraint::contains(&people.name, "n"),
        ),
        Constraint::strictly_lesser_than(&people.age, 18),
    );
    assert_eq!(people.ids(Some(constraint)), vec![1, 2, 4]);

    let constraint = Constraint::and_all([
        Some(Constraint::not_contains(&people.name, "a")),
        Some(Constraint::not_equal(&people.id, 3i64)),
    ]);
    assert_eq!(people.ids(constraint), vec![2]);
}

#[test]
fn test_unique() {
    let people = People::new();
    people.seed();

    let mut select = people
        .session
        .select_where(&people.entity, Constraint::equal(&people.id, 4i64));
    select.select_all();
    let record = select.get_query().unwrap().execute_unique().unwrap();
    assert_eq!(record.get_string(&people.name), Some("dan"));
    assert_eq!(record.get_integer(&people.age), Some(22));
    assert!(record.is_null(&people.photo));

    let mut select = people
        .session
        .select_where(&people.entity, Constraint::equal(&people.id, 99i64));
    select.with_keys();
    let err = select.get_query().unwrap().execute_unique().unwrap_err();
    assert!(matches!(err, SqlStreamError::NotFound { .. }));

    let mut select = people
        .session
        .select_where(&people.entity, Constraint::bigger_than(&people.age, 18));
    select.with_keys();
    let err = select.get_query().unwrap().execute_unique().unwrap_err();
    assert!(matches!(err, SqlStreamError::TooManyRows { .. }));
    assert!(err.is_cardinality());
}

#[test]
fn test_zero_and_null_doubles() {
    let people = People::new();
    people.seed();

    let mut select = people.session.select(&people.entity);
    let score = select.retrieve_double(&people.score);
    select.order_asc(&people.id);
    let mut query = select.get_query().unwrap();
    let mut cursor = query.execute().unwrap();

    let mut scores = Vec::new();
    while cursor.next().unwrap() {
        scores.push(score.get().unwrap());
    }
    assert_eq!(scores, vec![Some(1.5), None, Some(0.0), Some(3.0)]);
}

#[test]
fn test_close_twice() {
    let people = People::new();
    people.seed();

    let mut select = people.session.select(&people.entity);
    select.with_keys();
    let mut query = select.get_not_auto_close_query().unwrap();

    let mut cursor = query.execute().unwrap();
    assert!(cursor.next().unwrap());
    cursor.close().unwrap();
    cursor.close().unwrap();
    assert!(cursor.is_closed());
    assert!(!query.is_closed());

    query.close().unwrap();
    query.close().unwrap();
    assert!(query.is_closed());
    assert!(matches!(
        query.execute(),
        Err(SqlStreamError::QueryClosed { .. })
    ));
}

#[test]
fn test_auto_close_releases_statement() {
    let people = People::new();
    people.seed();

    let mut select = people.session.select(&people.entity);
    select.with_keys();
    let mut query = select.get_query().unwrap();
    let records = query.execute_as_records().unwrap();
    assert_eq!(records.len(), 4);
    assert!(query.is_closed());

    // Builders hand their accumulated selection to the first query only
    assert!(matches!(
        select.get_query(),
        Err(SqlStreamError::EmptySelection)
    ));
}

#[test]
fn test_fed_accessor_reexecution() {
    let people = People::new();
    people.seed();

    let wanted = FedAccessor::with_value(1i64);
    let mut select = people
        .session
        .select_where(&people.entity, Constraint::equal_fed(&people.id, &wanted));
    let name = select.retrieve_string(&people.name);
    let mut query = select.get_not_auto_close_query().unwrap();

    let mut cursor = query.execute().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(name.get().unwrap(), Some("ann".to_string()));
    drop(cursor);

    wanted.set(4i64);
    let mut cursor = query.execute().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(name.get().unwrap(), Some("dan".to_string()));
    assert!(!cursor.next().unwrap());
    query.close().unwrap();
}

#[test]
fn test_external_sql() {
    let people = People::new();
    people.seed();

    let mut select = people.session.select_sql(
        "SELECT PERSON.AGE, PERSON.FIRST_NAME FROM PERSON WHERE PERSON.AGE > 21 ORDER BY AGE",
    );
    let name = select.retrieve_string(&people.name);
    let age = select.retrieve_integer(&people.age);
    // Not in the result columns: skipped with a warning
    let score = select.retrieve_double(&people.score);
    let mut query = select.get_query().unwrap();

    assert_eq!(name.column().index(), Some(2));
    assert_eq!(age.column().index(), Some(1));
    assert_eq!(score.column().index(), None);

    let mut cursor = query.execute().unwrap();
    let mut rows = Vec::new();
    while cursor.next().unwrap() {
        rows.push((age.get().unwrap(), name.get().unwrap()));
        assert!(matches!(
            score.get(),
            Err(SqlStreamError::UnboundAccessor { .. })
        ));
    }
    assert_eq!(
        rows,
        vec![
            (Some(22), Some("dan".to_string())),
            (Some(30), Some("ann".to_string())),
            (Some(45), None),
        ]
    );
}

#[test]
fn test_update_continues_indexes() {
    let people = People::new();
    people.seed();

    let mut update = people.session.update(
        &people.entity,
        Some(Constraint::in_values(&people.id, [2i64, 3])),
    );
    update.set(&people.age, 50).set(&people.active, true);
    let mut request = update.get_request().unwrap();
    assert_eq!(
        request.sql(),
        "UPDATE PERSON SET AGE = ?, ACTIVE = ? WHERE PERSON.ID IN (?, ?)"
    );
    assert_eq!(request.parameter_count(), 4);
    assert_eq!(request.run().unwrap(), 2);
    request.close().unwrap();

    let ids = people.ids(Some(Constraint::equal(&people.active, true)));
    assert_eq!(ids, vec![2, 3]);
    let ids = people.ids(Some(Constraint::equal(&people.age, 50)));
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_update_with_fed_value() {
    let people = People::new();
    people.seed();

    let score = FedAccessor::new();
    let mut update = people
        .session
        .update(&people.entity, Some(Constraint::equal(&people.id, 2i64)));
    update.set_accessor(&people.score, score.clone());
    let mut request = update.get_request().unwrap();

    score.set(9.5);
    assert_eq!(request.run().unwrap(), 1);

    let mut select = people
        .session
        .select_where(&people.entity, Constraint::equal(&people.id, 2i64));
    select.select_all();
    let record = select.get_query().unwrap().execute_unique().unwrap();
    assert_eq!(record.get_double(&people.score), Some(9.5));
}

#[test]
fn test_delete() {
    let people = People::new();
    people.seed();

    let mut delete = people
        .session
        .delete(&people.entity, Some(Constraint::strictly_bigger_than(&people.age, 25)))
        .unwrap();
    assert_eq!(delete.run().unwrap(), 2);
    delete.close().unwrap();
    assert!(delete.is_closed());
    assert!(matches!(
        delete.run(),
        Err(SqlStreamError::QueryClosed { .. })
    ));

    assert_eq!(people.database.row_count("PERSON").unwrap(), 2);
    assert_eq!(people.ids(None), vec![2, 4]);

    let mut delete = people.session.delete(&people.entity, None).unwrap();
    assert_eq!(delete.run().unwrap(), 2);
}

#[test]
fn test_null_literal_rejected() {
    let people = People::new();

    let mut create = people.session.create(&people.entity);
    assert!(matches!(
        create.set_value(&people.name, None::<String>),
        Err(SqlStreamError::NullLiteral { .. })
    ));
    assert!(matches!(
        create.set_value(&people.age, "old"),
        Err(SqlStreamError::KindMismatch { .. })
    ));
}

#[test]
fn test_blob_modes() {
    for mode in [BlobMode::Native, BlobMode::LengthPrefixed] {
        let config = SqlStreamsConfig {
            blob_mode: mode,
            ..SqlStreamsConfig::default()
        };
        let people = People::with_config(config);

        let mut create = people.session.create(&people.entity);
        create
            .set(&people.id, 1i64)
            .set(&people.photo, vec![0u8, 1, 2, 255]);
        create.run().unwrap();

        let mut select = people.session.select(&people.entity);
        let photo = select.retrieve_blob(&people.photo);
        let mut query = select.get_query().unwrap();
        let mut cursor = query.execute().unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(photo.get().unwrap(), Some(vec![0u8, 1, 2, 255]));
    }
}

#[test]
fn test_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{ "strict_column_resolution": true, "auto_close": false }}"#
    )
    .unwrap();
    let config = SqlStreamsConfig::from_file(file.path()).unwrap();
    assert!(config.strict_column_resolution);
    assert!(!config.auto_close);

    let people = People::with_config(config.clone());
    people.seed();

    // auto_close off: the statement survives an exhausted cursor
    let mut select = people.session.select(&people.entity);
    select.with_keys();
    let mut query = select.get_query().unwrap();
    assert_eq!(query.execute_as_records().unwrap().len(), 4);
    assert!(!query.is_closed());
    assert_eq!(query.execute_as_records().unwrap().len(), 4);

    // strict: a field without a column fails compilation
    let naming = DefaultNaming::new(config.naming.clone()).without_column(&people.score);
    let session = SqlSession::with_naming(
        Arc::new(people.database.connection()),
        Arc::new(naming),
        config,
    );
    let mut select = session.select(&people.entity);
    select.select(&people.score).select(&people.id);
    assert!(matches!(
        select.get_query(),
        Err(SqlStreamError::UnresolvedColumn { .. })
    ));
}

#[test]
fn test_permissive_resolution_skips_fields() {
    let people = People::new();
    people.seed();

    let naming = DefaultNaming::default().without_column(&people.score);
    let session = SqlSession::with_naming(
        Arc::new(people.database.connection()),
        Arc::new(naming),
        SqlStreamsConfig::default(),
    );
    let mut select = session.select(&people.entity);
    select.select(&people.score).select(&people.id).top(2);
    select.order_asc(&people.score).order_asc(&people.id);
    let mut query = select.get_query().unwrap();
    assert_eq!(
        query.sql(),
        "SELECT PERSON.ID FROM PERSON ORDER BY ID ASC LIMIT 2"
    );

    let records = query.execute_as_records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(!records[0].contains(&people.score));
    assert_eq!(records[1].get_long(&people.id), Some(2));
}

#[test]
fn test_unknown_table_fails_prepare() {
    let people = People::new();
    people.database.drop_table("PERSON").unwrap();

    let mut select = people.session.select(&people.entity);
    select.with_keys();
    assert!(matches!(
        select.get_query(),
        Err(SqlStreamError::Prepare { .. })
    ));
}

#[test]
fn test_contains_matches_wildcards_literally() {
    let people = People::new();
    people.insert(1, Some("50% off"), 20, None);
    people.insert(2, Some("500 off"), 20, None);
    people.insert(3, Some("a_b"), 20, None);
    people.insert(4, Some("axb"), 20, None);
    people.insert(5, Some("c:\\dir"), 20, None);

    assert_eq!(
        people.ids(Some(Constraint::contains(&people.name, "0%"))),
        vec![1]
    );
    assert_eq!(
        people.ids(Some(Constraint::contains(&people.name, "a_b"))),
        vec![3]
    );
    assert_eq!(
        people.ids(Some(Constraint::contains(&people.name, "\\"))),
        vec![5]
    );
    assert_eq!(
        people.ids(Some(Constraint::not_contains(&people.name, "_"))),
        vec![1, 2, 4, 5]
    );
    assert_eq!(
        people.ids(Some(Constraint::not_contains(&people.name, "%"))),
        vec![2, 3, 4, 5]
    );
}

#[test]
fn test_external_sql_with_constraint() {
    let people = People::new();
    people.seed();

    let wanted = FedAccessor::with_value(2i64);
    let constraint = Constraint::or(
        Constraint::equal_fed(&people.id, &wanted),
        Constraint::strictly_bigger_than(&people.age, 40),
    );
    let mut select = people.session.select_sql_where(
        "SELECT PERSON.FIRST_NAME, PERSON.ID FROM PERSON \
         WHERE PERSON.ID = ? OR PERSON.AGE > ? ORDER BY ID",
        constraint,
    );
    let id = select.retrieve_long(&people.id);
    let name = select.retrieve_string(&people.name);
    let mut query = select.get_not_auto_close_query().unwrap();
    assert_eq!(query.parameter_count(), 2);

    let read = |query: &mut fieldsql::SelectQuery| {
        let mut cursor = query.execute().unwrap();
        let mut rows = Vec::new();
        while cursor.next().unwrap() {
            rows.push((id.get().unwrap(), name.get().unwrap()));
        }
        rows
    };

    assert_eq!(
        read(&mut query),
        vec![(Some(2), Some("bob".to_string())), (Some(3), None)]
    );
    wanted.set(4i64);
    assert_eq!(
        read(&mut query),
        vec![(Some(3), None), (Some(4), Some("dan".to_string()))]
    );
    query.close().unwrap();
}

#[test]
fn test_bulk_insert() {
    let people = People::new();

    let mut create = people.session.create(&people.entity);
    create
        .set(&people.id, 0i64)
        .set(&people.name, "anon")
        .set(&people.age, 18);
    let mut bulk = create.get_bulk_request().unwrap();
    assert_eq!(
        bulk.sql(),
        "INSERT INTO PERSON (ID, FIRST_NAME, AGE) VALUES (?, ?, ?)"
    );

    let rows: Vec<Vec<(fieldsql::Field, Value)>> = (1..=5i64)
        .map(|i| {
            vec![
                (people.id.as_field().clone(), Value::from(i)),
                (people.age.as_field().clone(), Value::from(20 + i as i32)),
            ]
        })
        .collect();
    assert_eq!(bulk.insert_all(&rows).unwrap(), 5);
    assert_eq!(
        bulk.insert(&[
            (people.id.as_field().clone(), Value::from(6i64)),
            (people.name.as_field().clone(), Value::from("eve")),
        ])
        .unwrap(),
        1
    );
    // The builder's own values make a row as well
    assert_eq!(bulk.run().unwrap(), 1);
    assert_eq!(bulk.inserted(), 7);

    assert!(matches!(
        bulk.insert(&[(people.score.as_field().clone(), Value::from(1.0))]),
        Err(SqlStreamError::UnresolvedColumn { .. })
    ));
    assert!(matches!(
        bulk.insert(&[(people.age.as_field().clone(), Value::from("old"))]),
        Err(SqlStreamError::KindMismatch { .. })
    ));
    bulk.close().unwrap();
    assert!(bulk.is_closed());
    assert!(matches!(
        bulk.insert(&[]),
        Err(SqlStreamError::QueryClosed { .. })
    ));

    assert_eq!(people.database.row_count("PERSON").unwrap(), 7);
    assert_eq!(people.ids(None), vec![0, 1, 2, 3, 4, 5, 6]);

    let mut select = people.session.select_where(
        &people.entity,
        Constraint::in_values(&people.id, [0i64, 3, 6]),
    );
    let name = select.retrieve_string(&people.name);
    let age = select.retrieve_integer(&people.age);
    select.order_asc(&people.id);
    let mut query = select.get_query().unwrap();
    let mut cursor = query.execute().unwrap();
    let mut rows = Vec::new();
    while cursor.next().unwrap() {
        rows.push((name.get().unwrap(), age.get().unwrap()));
    }
    assert_eq!(
        rows,
        vec![
            (Some("anon".to_string()), Some(18)),
            (Some("anon".to_string()), Some(23)),
            (Some("eve".to_string()), Some(18)),
        ]
    );
}

#[test]
fn test_failed_compile_leaves_accessors_unbound() {
    let people = People::new();
    let config = SqlStreamsConfig {
        strict_column_resolution: true,
        ..SqlStreamsConfig::default()
    };
    let naming = DefaultNaming::new(config.naming.clone()).without_column(&people.score);
    let session = SqlSession::with_naming(
        Arc::new(people.database.connection()),
        Arc::new(naming),
        config,
    );

    let mut select = session.select(&people.entity);
    let id = select.retrieve_long(&people.id);
    select.select(&people.score);
    assert!(matches!(
        select.get_query(),
        Err(SqlStreamError::UnresolvedColumn { .. })
    ));
    assert_eq!(id.column().index(), None);
}
