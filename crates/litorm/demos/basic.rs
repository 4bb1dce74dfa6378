//! Basic usage example for litorm
//!
//! Run with: cargo run --example basic -p litorm
//!
//! Set RUST_LOG=litorm=debug to see every statement.

use litorm::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Record)]
#[orm(table = "users")]
struct User {
    #[orm(primary_key(autoincrement))]
    id: i64,
    #[orm(unique)]
    username: String,
    email: Option<String>,
}

fn main() -> OrmResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let conn = Connection::builder().register::<User>().open(":memory:")?;
    conn.create_tables(true)?;

    // ============================================
    // Example 1: Insert records
    // ============================================
    println!("=== Insert records ===");

    let mut alice = User {
        username: "alice".into(),
        email: Some("alice@example.com".into()),
        ..Default::default()
    };
    conn.insert_record(&mut alice)?;
    println!("Inserted: {alice:?}");

    let mut bob = User {
        username: "bob".into(),
        ..Default::default()
    };
    conn.insert_record(&mut bob)?;
    println!("Inserted: {bob:?}");

    // ============================================
    // Example 2: Query with the builder
    // ============================================
    println!("\n=== Query ===");

    let with_email = conn.select::<User>()?.is_not_null("email").fetch_all()?;
    println!("Users with email: {with_email:?}");

    let by_name = conn.select::<User>()?.eq("username", "bob").fetch_one()?;
    println!("Found by name: {by_name:?}");

    // ============================================
    // Example 3: Update and delete
    // ============================================
    println!("\n=== Update / delete ===");

    let changed = conn
        .update::<User>()?
        .set("email", "bob@example.com")
        .eq("id", bob.id)
        .exec()?;
    println!("Updated {changed} row(s)");

    let deleted = conn.delete_record::<User>(alice.id)?;
    println!("Deleted {deleted} row(s)");

    // ============================================
    // Example 4: Error handling
    // ============================================
    println!("\n=== Error handling ===");

    let mut duplicate = User {
        username: "bob".into(),
        ..Default::default()
    };
    match conn.insert_record(&mut duplicate) {
        Err(e) if e.is_unique_violation() => println!("Duplicate rejected: {e}"),
        other => println!("Unexpected: {other:?}"),
    }

    match conn.select::<User>()?.eq("id", "not a number").fetch_all() {
        Err(e) if e.is_type_mismatch() => println!("Rejected before execution: {e}"),
        other => println!("Unexpected: {other:?}"),
    }

    println!("\nRemaining: {:?}", conn.select::<User>()?.fetch_all()?);
    Ok(())
}
