//! Joins, subqueries and upserts
//!
//! Run with: cargo run --example joins -p litorm

use litorm::prelude::*;

#[derive(Debug, Default, Record)]
#[orm(table = "authors")]
struct Author {
    #[orm(primary_key(autoincrement))]
    id: i64,
    name: String,
}

#[derive(Debug, Default, Record)]
#[orm(table = "books")]
struct Book {
    #[orm(primary_key)]
    id: i64,
    #[orm(foreign_key(table = "authors", column = "id", on_delete = "cascade"))]
    author_id: i64,
    title: String,
    year: i64,
}

fn main() -> OrmResult<()> {
    tracing_subscriber::fmt().init();

    let conn = Connection::builder()
        .register::<Author>()
        .register::<Book>()
        .open(":memory:")?;
    conn.create_tables(false)?;

    conn.transaction(|conn| {
        for name in ["Le Guin", "Lem", "Tiptree"] {
            conn.insert_record(&mut Author {
                name: name.into(),
                ..Default::default()
            })?;
        }
        let books = [
            Book { id: 1, author_id: 1, title: "The Dispossessed".into(), year: 1974 },
            Book { id: 2, author_id: 1, title: "The Lathe of Heaven".into(), year: 1971 },
            Book { id: 3, author_id: 2, title: "Solaris".into(), year: 1961 },
        ];
        conn.insert_many(&books)?.exec()?;
        Ok(())
    })?;

    println!("=== Authors with books after 1970 ===");
    let authors = conn
        .select::<Author>()?
        .join::<Book>(Expr::columns_eq("books.author_id", "authors.id"))
        .gt("books.year", 1970)
        .distinct()
        .fetch_all()?;
    println!("{authors:?}");

    println!("\n=== Authors without books ===");
    let idle = conn
        .select::<Author>()?
        .left_join::<Book>(Expr::columns_eq("books.author_id", "authors.id"))
        .is_null("books.id")
        .fetch_all()?;
    println!("{idle:?}");

    println!("\n=== Books from a subquery ===");
    let sixties = conn.select::<Book>()?.lt("year", 1970).subquery("sixties")?;
    let books = conn
        .select_from::<Book>(sixties)?
        .order_by("sixties.title", Order::Asc)
        .fetch_all()?;
    println!("{books:?}");

    println!("\n=== Upsert ===");
    let renamed = Book {
        id: 3,
        author_id: 2,
        title: "Solaris (1961)".into(),
        year: 1961,
    };
    conn.insert(&renamed)?
        .on_conflict(OnConflict::do_update_columns(["id"], ["title"]))
        .exec()?;
    println!("{:?}", conn.find_record::<Book>(3)?);

    Ok(())
}
