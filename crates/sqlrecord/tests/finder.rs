mod common;

use common::{MockConnection, blog, persisted_post, row};
use sqlrecord::{Conditions, FindOptions, Found, Identifier, RecordErrorKind, Value};

#[test]
fn find_by_id_with_no_rows_is_record_not_found() {
    let schema = blog();
    let conn = MockConnection::new();
    let posts = schema.model("Post").unwrap();

    let err = posts
        .find(42_i64, &FindOptions::new(), &conn)
        .unwrap_err();
    assert_eq!(err.record_error_kind(), Some(RecordErrorKind::RecordNotFound));
    assert_eq!(
        conn.statements(),
        vec!["SELECT * FROM posts WHERE posts.id = 42"]
    );
}

#[test]
fn find_ids_with_no_rows_is_record_not_found() {
    let schema = blog();
    let conn = MockConnection::new();
    let posts = schema.model("Post").unwrap();

    let err = posts
        .find_ids(vec![Value::BigInt(1), Value::BigInt(2)], &FindOptions::new(), &conn)
        .unwrap_err();
    assert!(err.is_record_not_found());
    assert_eq!(conn.statements(), vec!["SELECT * FROM posts WHERE id IN (1,2)"]);
}

#[test]
fn empty_id_list_returns_nothing_without_querying() {
    let schema = blog();
    let conn = MockConnection::new();
    let posts = schema.model("Post").unwrap();

    let found = posts
        .find(Identifier::Ids(vec![]), &FindOptions::new(), &conn)
        .unwrap();
    assert!(matches!(found, Found::Many(ref records) if records.is_empty()));
    assert!(conn.statements().is_empty());
}

#[test]
fn all_and_first_with_no_rows_are_empty() {
    let schema = blog();
    let conn = MockConnection::new();
    let posts = schema.model("Post").unwrap();

    assert!(posts.find_all(&FindOptions::new(), &conn).unwrap().is_empty());
    assert!(
        posts
            .find_first(&FindOptions::new().order("id DESC"), &conn)
            .unwrap()
            .is_none()
    );
    assert_eq!(
        conn.statements(),
        vec![
            "SELECT * FROM posts",
            "SELECT * FROM posts ORDER BY id DESC LIMIT 1"
        ]
    );
}

#[test]
fn plain_rows_become_persisted_records() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT * FROM posts",
        vec![
            row(&[
                ("id", Value::BigInt(1)),
                ("title", Value::from("One")),
                ("author_id", Value::Null),
            ]),
            row(&[
                ("id", Value::BigInt(2)),
                ("title", Value::from("Two")),
                ("author_id", Value::BigInt(7)),
            ]),
        ],
    );
    let posts = schema.model("Post").unwrap();

    let found = posts
        .find_all(
            &FindOptions::new().conditions(Conditions::positional("title <> ?", ["x"])),
            &conn,
        )
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(!found[0].is_new_record());
    assert!(!found[0].is_modified());
    assert_eq!(found[1].value("title").unwrap(), Value::from("Two"));
    assert_eq!(found[1].value("author_id").unwrap(), Value::BigInt(7));
    assert!(!found[1].association("author").unwrap().is_loaded());
    assert_eq!(
        conn.statements(),
        vec!["SELECT * FROM posts WHERE ( title <> 'x' )"]
    );
}

fn post_with_comment(post: i64, title: &str, comment: Option<(i64, &str)>) -> sqlrecord_core::Row {
    let (cid, body, fk) = match comment {
        Some((id, body)) => (Value::BigInt(id), Value::from(body), Value::BigInt(post)),
        None => (Value::Null, Value::Null, Value::Null),
    };
    row(&[
        ("t0_r0", Value::BigInt(post)),
        ("t0_r1", Value::from(title)),
        ("t0_r2", Value::Null),
        ("t1_r0", cid),
        ("t1_r1", body),
        ("t1_r2", fk),
    ])
}

#[test]
fn fanned_rows_collapse_into_one_base_record() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT posts.id AS t0_r0",
        vec![
            post_with_comment(1, "Hello", Some((10, "a"))),
            post_with_comment(1, "Hello", Some((11, "b"))),
            post_with_comment(1, "Hello", Some((12, "c"))),
        ],
    );
    let posts = schema.model("Post").unwrap();

    let found = posts
        .find_all(&FindOptions::new().include("comments"), &conn)
        .unwrap();
    assert_eq!(found.len(), 1);
    let post = &found[0];
    assert_eq!(post.value("title").unwrap(), Value::from("Hello"));

    let comments = post.get("comments").unwrap().records();
    let bodies: Vec<Value> = comments.iter().map(|c| c.value("body").unwrap()).collect();
    assert_eq!(
        bodies,
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
    assert!(comments.iter().all(|c| !c.is_new_record()));
    assert_eq!(
        post.value("comment_ids").unwrap(),
        Value::Array(vec![Value::BigInt(10), Value::BigInt(11), Value::BigInt(12)])
    );

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT posts.id AS t0_r0, posts.title AS t0_r1, posts.author_id AS t0_r2, \
             comments.id AS t1_r0, comments.body AS t1_r1, comments.post_id AS t1_r2 \
             FROM posts LEFT JOIN comments ON comments.post_id = posts.id"
        ]
    );
}

#[test]
fn interleaved_rows_keep_first_seen_order() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT posts.id AS t0_r0",
        vec![
            post_with_comment(1, "One", Some((10, "a"))),
            post_with_comment(2, "Two", None),
            post_with_comment(1, "One", Some((11, "b"))),
            // A repeated pair from a second join must not duplicate.
            post_with_comment(1, "One", Some((10, "a"))),
        ],
    );
    let posts = schema.model("Post").unwrap();

    let found = posts
        .find_all(&FindOptions::new().include("comments"), &conn)
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id(), Value::BigInt(1));
    assert_eq!(found[1].id(), Value::BigInt(2));
    assert_eq!(found[0].get("comments").unwrap().records().len(), 2);

    // The outer join matched nothing for post 2, but the association is loaded.
    assert!(found[1].get("comments").unwrap().records().is_empty());
    assert!(found[1].association("comments").unwrap().is_loaded());
}

#[test]
fn belongs_to_is_eager_loaded_and_unknown_includes_ignored() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT posts.id AS t0_r0",
        vec![row(&[
            ("t0_r0", Value::BigInt(1)),
            ("t0_r1", Value::from("Hello")),
            ("t0_r2", Value::BigInt(7)),
            ("t1_r0", Value::BigInt(7)),
            ("t1_r1", Value::from("Ann")),
        ])],
    );
    let posts = schema.model("Post").unwrap();

    let post = posts
        .find(1_i64, &FindOptions::new().include("tags, author"), &conn)
        .unwrap()
        .into_one()
        .unwrap();
    let author = post.get("author").unwrap().record().unwrap();
    assert_eq!(author.value("name").unwrap(), Value::from("Ann"));
    assert_eq!(author.entity().name(), "User");

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT posts.id AS t0_r0, posts.title AS t0_r1, posts.author_id AS t0_r2, \
             users.id AS t1_r0, users.name AS t1_r1 FROM posts \
             LEFT JOIN users ON users.id = posts.author_id WHERE posts.id = 1"
        ]
    );
}

#[test]
fn options_decoded_from_json() {
    let schema = blog();
    let conn = MockConnection::new();
    let posts = schema.model("Post").unwrap();

    let options = FindOptions::from_json(
        r#"{"conditions": ["title = :t", {"t": "O'Hara"}], "limit": 5, "offset": "10"}"#,
    )
    .unwrap();
    posts.find_all(&options, &conn).unwrap();
    assert_eq!(
        conn.statements(),
        vec!["SELECT * FROM posts WHERE ( title = 'O''Hara' ) LIMIT 5 OFFSET 10"]
    );
}

#[test]
fn lazy_loading_queries_each_association_once() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT * FROM comments",
        vec![row(&[
            ("id", Value::BigInt(10)),
            ("body", Value::from("a")),
            ("post_id", Value::BigInt(5)),
        ])],
    );
    conn.respond(
        "SELECT * FROM users",
        vec![row(&[("id", Value::BigInt(7)), ("name", Value::from("Ann"))])],
    );

    let mut post = persisted_post(&schema, 5, "Hello");
    post.set("author_id", 7_i64).unwrap();

    assert_eq!(post.fetch("comments", &conn).unwrap().records().len(), 1);
    assert_eq!(post.fetch("comments", &conn).unwrap().records().len(), 1);
    let author = post.fetch("author", &conn).unwrap().record().unwrap().clone();
    assert_eq!(author.value("name").unwrap(), Value::from("Ann"));

    assert_eq!(
        conn.statements(),
        vec![
            "SELECT * FROM comments WHERE ( post_id = 5 )",
            "SELECT * FROM users WHERE ( id = 7 ) LIMIT 1",
        ]
    );
}
