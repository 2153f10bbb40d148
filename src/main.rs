//! fieldsql - runs a typed query session against an in-memory database

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use fieldsql::constraint::Constraint;
use fieldsql::driver::memory::MemoryDatabase;
use fieldsql::metamodel::{EntityType, FieldKind};
use fieldsql::{SqlRequest, SqlSession, SqlStreamsConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// fieldsql - typed constraints compiled to parameterized SQL
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of sample rows to insert
    #[arg(short, long, default_value = "5")]
    rows: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &args.config {
        Some(path) => SqlStreamsConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SqlStreamsConfig::default(),
    };

    let person = EntityType::builder("person")
        .key("id", FieldKind::Long)
        .field("firstName", FieldKind::String)
        .field("age", FieldKind::Integer)
        .field("score", FieldKind::Double)
        .build();

    let database = MemoryDatabase::new();
    let session = SqlSession::new(Arc::new(database.connection()), config);
    database
        .create_table_for(&person, session.naming())
        .context("Failed to create table")?;

    run_demo(&session, &person, args.rows)
}

fn run_demo(session: &SqlSession, person: &EntityType, rows: u32) -> Result<()> {
    let id = person.long_field("id").context("Missing id field")?;
    let name = person
        .string_field("firstName")
        .context("Missing firstName field")?;
    let age = person.integer_field("age").context("Missing age field")?;
    let score = person.double_field("score").context("Missing score field")?;

    for i in 0..rows {
        let mut create = session.create(person);
        create
            .set(&id, i64::from(i) + 1)
            .set(&name, format!("person{}", i + 1))
            .set(&age, 20 + i as i32);
        if i % 2 == 0 {
            create.set(&score, f64::from(i) * 1.5);
        }
        create.run().context("Insert failed")?;
    }
    log::info!("Inserted {} rows", rows);

    let adults = Constraint::bigger_than(&age, 21);
    let mut select = session.select_where(person, adults);
    let ids = select.retrieve_long(&id);
    let names = select.retrieve_string(&name);
    let scores = select.retrieve_double(&score);
    select.order_desc(&age);

    let mut query = select.get_query().context("Failed to compile select")?;
    println!("{}", query.sql());
    let mut cursor = query.execute().context("Select failed")?;
    while cursor.next()? {
        let shown = match scores.get()? {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:>4} {:<12} {}",
            ids.get()?.unwrap_or_default(),
            names.get()?.unwrap_or_default(),
            shown
        );
    }

    let mut update = session.update(person, Some(Constraint::is_null(&score)));
    update.set(&score, 0.0);
    let updated = update.run().context("Update failed")?;
    log::info!("Set a score on {} rows", updated);

    let mut unique = session.select_where(person, Constraint::equal(&id, 1i64));
    unique.select_all();
    let record = unique
        .get_query()?
        .execute_unique()
        .context("Lookup by key failed")?;
    println!("{:?}", record.get_string(&name));

    let mut delete = session.delete(person, Some(Constraint::less_than(&age, 21)))?;
    let deleted = delete.run()?;
    delete.close()?;
    log::info!("Deleted {} rows", deleted);

    Ok(())
}
