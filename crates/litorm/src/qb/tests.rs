//! Rendering and validation tests across the query builders.

use crate::error::{OrmError, SchemaError};
use crate::qb::{Expr, Filter, JoinKind, OnConflict, Order, QueryState, SqlQb};
use crate::schema::{Action, Column, Conflict, Reference, Table};
use crate::value::Value;
use crate::{Connection, SqlLogConfig};
use pretty_assertions::assert_eq;

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    score: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Post {
    id: i64,
    user_id: i64,
    title: String,
}

fn users() -> Table<User> {
    Table::builder("users")
        .column(Column::field("id", |u: &User| &u.id, |u: &mut User| &mut u.id).autoincrement(Conflict::Abort))
        .column(Column::field("name", |u: &User| &u.name, |u: &mut User| &mut u.name).unique(Conflict::Abort))
        .column(Column::field("score", |u: &User| &u.score, |u: &mut User| &mut u.score))
        .build()
        .unwrap()
}

fn posts() -> Table<Post> {
    Table::builder("posts")
        .column(Column::field("id", |p: &Post| &p.id, |p: &mut Post| &mut p.id).primary_key(Conflict::Abort))
        .column(
            Column::field("user_id", |p: &Post| &p.user_id, |p: &mut Post| &mut p.user_id).foreign_key(
                Reference::new("users", "id"),
                Action::Cascade,
                Action::Cascade,
            ),
        )
        .column(Column::field("title", |p: &Post| &p.title, |p: &mut Post| &mut p.title))
        .build()
        .unwrap()
}

fn conn() -> Connection {
    let conn = Connection::builder()
        .table(users())
        .table(posts())
        .config(crate::ConnectionConfig::new().sql_log(SqlLogConfig::new().disabled()))
        .open(":memory:")
        .unwrap();
    conn.create_tables(false).unwrap();
    conn
}

fn schema_error(err: OrmError) -> SchemaError {
    err.as_schema_error().cloned().unwrap()
}

// ==================== SELECT ====================

#[test]
fn select_defaults_to_every_column() {
    let conn = conn();
    let query = conn.select::<User>().unwrap();
    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `users`.`id`, `users`.`name`, `users`.`score` FROM `users`;"
    );
}

#[test]
fn select_with_conditions_binds_in_order() {
    let conn = conn();
    let built = conn
        .select::<User>()
        .unwrap()
        .eq("name", "alice")
        .gt("score", 1.5)
        .order_by("id", Order::Desc)
        .limit(10)
        .offset(20)
        .build()
        .unwrap();

    assert_eq!(
        built.sql,
        "SELECT `users`.`id`, `users`.`name`, `users`.`score` FROM `users` \
         WHERE (`name` = ? AND `score` > ?) ORDER BY `id` DESC LIMIT 10 OFFSET 20;"
    );
    assert_eq!(
        built.params.as_slice(),
        &[Value::Text("alice".into()), Value::Real(1.5)]
    );
}

#[test]
fn select_offset_without_limit() {
    let conn = conn();
    let sql = conn.select::<User>().unwrap().offset(5).to_sql().unwrap();
    assert!(sql.ends_with(" LIMIT -1 OFFSET 5;"));
}

#[test]
fn select_projection_and_distinct() {
    let conn = conn();
    let sql = conn
        .select::<User>()
        .unwrap()
        .columns(["name"])
        .distinct()
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT DISTINCT `name` FROM `users`;");
}

#[test]
fn join_renders_each_source_and_predicate() {
    let conn = conn();
    let sql = conn
        .select::<User>()
        .unwrap()
        .join::<Post>(Expr::columns_eq("posts.user_id", "users.id"))
        .eq("posts.title", "hello")
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT `users`.`id`, `users`.`name`, `users`.`score` FROM `users` \
         JOIN `posts` ON `posts`.`user_id` = `users`.`id` WHERE `posts`.`title` = ?;"
    );
}

#[test]
fn left_join_and_ambiguous_reference() {
    let conn = conn();
    let query = conn
        .select::<User>()
        .unwrap()
        .left_join::<Post>(Expr::columns_eq("posts.user_id", "users.id"))
        .eq("id", 1);
    assert!(query.to_sql().unwrap_err().is_schema_error());

    let query = conn
        .select::<User>()
        .unwrap()
        .left_join::<Post>(Expr::columns_eq("posts.user_id", "users.id"));
    assert!(query.to_sql().unwrap().contains(" LEFT JOIN `posts` ON "));
}

#[test]
fn unknown_columns_fail_at_build() {
    let conn = conn();
    let err = conn.select::<User>().unwrap().eq("email", "x").build().unwrap_err();
    assert_eq!(
        schema_error(err),
        SchemaError::UnknownColumn {
            table: "`users`".into(),
            column: "email".into()
        }
    );

    let err = conn.select::<User>().unwrap().eq("posts.id", 1).build().unwrap_err();
    assert_eq!(schema_error(err), SchemaError::UnknownTable("posts".into()));
}

#[test]
fn mistyped_values_fail_at_build() {
    let conn = conn();
    let err = conn.select::<User>().unwrap().eq("id", "one").build().unwrap_err();
    assert!(err.is_type_mismatch());

    // integers widen into REAL columns
    assert!(conn.select::<User>().unwrap().eq("score", 3).build().is_ok());
}

#[test]
fn count_wraps_limited_queries() {
    let conn = conn();
    let built = conn.select::<User>().unwrap().eq("name", "a").build_count().unwrap();
    assert_eq!(built.sql, "SELECT COUNT(*) FROM `users` WHERE `name` = ?;");

    let built = conn.select::<User>().unwrap().limit(3).build_count().unwrap();
    assert_eq!(
        built.sql,
        "SELECT COUNT(*) FROM (SELECT `users`.`id`, `users`.`name`, `users`.`score` FROM `users` LIMIT 3);"
    );
}

#[test]
fn subquery_as_source_carries_its_params() {
    let conn = conn();
    let inner = conn
        .select::<Post>()
        .unwrap()
        .columns(["user_id"])
        .eq("title", "hello")
        .subquery("authors")
        .unwrap();

    let built = conn
        .select::<User>()
        .unwrap()
        .join_subquery(inner, JoinKind::Inner, Expr::columns_eq("authors.user_id", "users.id"))
        .gt("users.score", 2.0)
        .build()
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT `users`.`id`, `users`.`name`, `users`.`score` FROM `users` \
         JOIN (SELECT `user_id` FROM `posts` WHERE `title` = ?) AS `authors` \
         ON `authors`.`user_id` = `users`.`id` WHERE `users`.`score` > ?;"
    );
    assert_eq!(
        built.params.as_slice(),
        &[Value::Text("hello".into()), Value::Real(2.0)]
    );
}

#[test]
fn mutation_after_prepare_is_rejected() {
    let conn = conn();
    let mut query = conn.select::<User>().unwrap();
    query.prepare().unwrap();
    assert_eq!(query.state(), QueryState::Prepared);

    let mut query = query.eq("id", 1);
    assert!(matches!(query.prepare(), Err(OrmError::Validation(_))));
}

#[test]
fn unregistered_join_target_is_reported() {
    struct Tag;

    let conn = conn();
    let err = conn
        .select::<User>()
        .unwrap()
        .join::<Tag>(Expr::columns_eq("tags.id", "users.id"))
        .build()
        .unwrap_err();
    assert!(err.is_not_found());
}

// ==================== INSERT ====================

#[test]
fn insert_skips_autoincrement_keys() {
    let conn = conn();
    let user = User {
        id: 0,
        name: "alice".into(),
        score: 1.0,
    };
    let built = conn.insert(&user).unwrap().build().unwrap();
    assert_eq!(built.sql, "INSERT INTO `users` (`name`, `score`) VALUES (?, ?);");
    assert_eq!(
        built.params.as_slice(),
        &[Value::Text("alice".into()), Value::Real(1.0)]
    );
}

#[test]
fn insert_many_renders_one_tuple_per_record() {
    let conn = conn();
    let posts = vec![
        Post {
            id: 1,
            user_id: 1,
            title: "a".into(),
        },
        Post {
            id: 2,
            user_id: 1,
            title: "b".into(),
        },
    ];
    let built = conn.insert_many(&posts).unwrap().build().unwrap();
    assert_eq!(
        built.sql,
        "INSERT INTO `posts` (`id`, `user_id`, `title`) VALUES (?, ?, ?), (?, ?, ?);"
    );
    assert_eq!(built.params.len(), 6);

    let empty: Vec<Post> = Vec::new();
    let err = conn.insert_many(&empty).unwrap().build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn upsert_clauses() {
    let conn = conn();
    let post = Post {
        id: 1,
        user_id: 1,
        title: "a".into(),
    };

    let sql = conn
        .insert(&post)
        .unwrap()
        .on_conflict(OnConflict::do_nothing(["id"]))
        .to_sql()
        .unwrap();
    assert!(sql.ends_with(" ON CONFLICT (`id`) DO NOTHING;"));

    let sql = conn
        .insert(&post)
        .unwrap()
        .on_conflict(OnConflict::do_update(["id"]))
        .to_sql()
        .unwrap();
    assert!(sql.ends_with(
        " ON CONFLICT (`id`) DO UPDATE SET `user_id` = excluded.`user_id`, `title` = excluded.`title`;"
    ));

    let sql = conn
        .insert(&post)
        .unwrap()
        .on_conflict(OnConflict::do_update_columns(["id"], ["title"]))
        .to_sql()
        .unwrap();
    assert!(sql.ends_with(" ON CONFLICT (`id`) DO UPDATE SET `title` = excluded.`title`;"));

    let err = conn
        .insert(&post)
        .unwrap()
        .on_conflict(OnConflict::do_update(Vec::<String>::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

// ==================== UPDATE ====================

#[test]
fn update_binds_set_before_where() {
    let conn = conn();
    let built = conn
        .update::<User>()
        .unwrap()
        .set("name", "bob")
        .set("score", 2.5)
        .eq("id", 7)
        .build()
        .unwrap();
    assert_eq!(
        built.sql,
        "UPDATE `users` SET `name` = ?, `score` = ? WHERE `id` = ?;"
    );
    assert_eq!(
        built.params.as_slice(),
        &[
            Value::Text("bob".into()),
            Value::Real(2.5),
            Value::Integer(7)
        ]
    );
}

#[test]
fn update_requires_set_and_known_columns() {
    let conn = conn();
    let err = conn.update::<User>().unwrap().eq("id", 1).build().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = conn.update::<User>().unwrap().set("email", "x").build().unwrap_err();
    assert!(err.is_schema_error());

    let err = conn.update::<User>().unwrap().set("id", "x").build().unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn update_set_json_serializes_text() {
    let conn = conn();
    let built = conn
        .update::<User>()
        .unwrap()
        .set_json("name", &vec!["a", "b"])
        .build()
        .unwrap();
    assert_eq!(built.params.as_slice(), &[Value::Text(r#"["a","b"]"#.into())]);
}

// ==================== DELETE ====================

#[test]
fn delete_starts_with_delete_then_from() {
    let conn = conn();
    let sql = conn.delete::<User>().unwrap().to_sql().unwrap();
    assert_eq!(sql, "DELETE FROM `users`;");

    let sql = conn
        .delete::<User>()
        .unwrap()
        .eq("id", 1)
        .and_where(Expr::is_null("name") | Expr::lt("score", 0))
        .to_sql()
        .unwrap();
    assert!(sql.starts_with("DELETE "));
    assert_eq!(
        sql,
        "DELETE FROM `users` WHERE (`id` = ? AND (`name` IS NULL OR `score` < ?));"
    );
}

#[test]
fn raw_conditions_check_their_placeholder_count() {
    let conn = conn();
    let built = conn
        .delete::<User>()
        .unwrap()
        .where_raw("length(`name`) > ?", [Value::Integer(3)])
        .build()
        .unwrap();
    assert_eq!(built.sql, "DELETE FROM `users` WHERE length(`name`) > ?;");

    let err = conn
        .delete::<User>()
        .unwrap()
        .where_raw("`id` = ? OR `id` = ?", [Value::Integer(3)])
        .build()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn raw_conditions_ignore_question_marks_in_literals() {
    let conn = conn();
    let built = conn
        .delete::<User>()
        .unwrap()
        .where_raw("`name` = 'who?'", [])
        .build()
        .unwrap();
    assert_eq!(built.sql, "DELETE FROM `users` WHERE `name` = 'who?';");
    assert!(built.params.is_empty());

    let built = conn
        .select::<User>()
        .unwrap()
        .where_raw("`name` = 'a?' OR `name` = ?", [Value::Text("b".into())])
        .build()
        .unwrap();
    assert_eq!(built.params.len(), 1);

    conn.delete::<User>()
        .unwrap()
        .where_raw("`name` = 'who?'", [])
        .exec()
        .unwrap();
}
