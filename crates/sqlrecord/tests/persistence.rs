mod common;

use common::{MockConnection, blog, blog_builder, persisted_post, row};
use sqlrecord::{
    Arg, AssociationOptions, EntityBuilder, Error, LifecycleEvent, RecordErrorKind, Schema, Value,
};
use std::sync::{Arc, Mutex};

#[test]
fn saving_a_new_record_inserts_once() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    post.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec!["INSERT INTO posts (title, author_id) VALUES ('Hello', NULL)"]
    );
    assert_eq!(post.id(), Value::BigInt(1));
    assert!(!post.is_new_record());
    assert!(!post.is_modified());

    conn.clear();
    post.save(&conn).unwrap();
    assert!(conn.statements().is_empty());
}

#[test]
fn saving_a_modified_record_updates_by_primary_key() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = persisted_post(&schema, 3, "Old");
    post.set("title", "New").unwrap();
    post.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec!["UPDATE posts SET title = 'New', author_id = NULL WHERE id = 3 LIMIT 1"]
    );
    assert!(!post.is_modified());
}

#[test]
fn explicit_primary_key_is_inserted() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut user = schema.new_record("User").unwrap();
    user.set("id", 40_i64).unwrap();
    user.set("name", "Ann").unwrap();
    user.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec!["INSERT INTO users (id, name) VALUES (40, 'Ann')"]
    );
    assert_eq!(user.id(), Value::BigInt(40));
}

#[test]
fn update_attributes_writes_then_saves() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = persisted_post(&schema, 3, "Old");
    post.update_attributes([("title", Value::from("It's new"))], &conn)
        .unwrap();
    assert_eq!(
        conn.statements(),
        vec!["UPDATE posts SET title = 'It''s new', author_id = NULL WHERE id = 3 LIMIT 1"]
    );

    let err = post
        .update_attributes([("nope", Value::Null)], &conn)
        .unwrap_err();
    assert_eq!(
        err.record_error_kind(),
        Some(RecordErrorKind::AttributeNotFound)
    );
}

#[test]
fn belongs_to_target_is_saved_first() {
    let schema = blog();
    let conn = MockConnection::new();

    let author = schema
        .model("User")
        .unwrap()
        .build([("name", "Ann")])
        .unwrap();
    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    post.set("author", author).unwrap();
    post.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "INSERT INTO users (name) VALUES ('Ann')",
            "INSERT INTO posts (title, author_id) VALUES ('Hello', 1)",
        ]
    );
    assert_eq!(post.value("author_id").unwrap(), Value::BigInt(1));
    let author = post.get("author").unwrap().record().unwrap();
    assert!(!author.is_new_record());
}

#[test]
fn pushed_dependents_are_saved_after_the_owner() {
    let schema = blog();
    let conn = MockConnection::new();
    let comments = schema.model("Comment").unwrap();

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    post.call(
        "comments_push",
        vec![
            Arg::from(comments.build([("body", "a")]).unwrap()),
            Arg::from(comments.build([("body", "b")]).unwrap()),
        ],
    )
    .unwrap();
    assert_eq!(post.call("comments_size", vec![]).unwrap(), Value::BigInt(2));

    post.save(&conn).unwrap();
    assert_eq!(
        conn.statements(),
        vec![
            "INSERT INTO posts (title, author_id) VALUES ('Hello', NULL)",
            "INSERT INTO comments (body, post_id) VALUES ('a', 1)",
            "INSERT INTO comments (body, post_id) VALUES ('b', 1)",
        ]
    );
    assert_eq!(
        post.value("comment_ids").unwrap(),
        Value::Array(vec![Value::BigInt(2), Value::BigInt(3)])
    );

    conn.clear();
    post.save(&conn).unwrap();
    assert!(conn.statements().is_empty());
}

#[test]
fn push_on_a_persisted_owner_links_immediately() {
    let schema = blog();
    let mut post = persisted_post(&schema, 5, "Hello");
    let comment = schema
        .model("Comment")
        .unwrap()
        .build([("body", "hi")])
        .unwrap();

    post.call("comments_push", vec![Arg::from(comment)]).unwrap();

    let comments = post.get("comments").unwrap().records();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].value("post_id").unwrap(), Value::BigInt(5));
    assert_eq!(comments[0].value("body").unwrap(), Value::from("hi"));
}

#[test]
fn assigning_ids_relinks_dependents() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = persisted_post(&schema, 5, "Hello");
    post.set("comment_ids", vec![1_i64, 2]).unwrap();
    post.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "UPDATE comments SET post_id = NULL WHERE post_id = 5 AND id NOT IN (1, 2)",
            "UPDATE comments SET post_id = 5 WHERE id = 1 LIMIT 1",
            "UPDATE comments SET post_id = 5 WHERE id = 2 LIMIT 1",
        ]
    );
}

#[test]
fn clearing_and_deleting_dependents() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = persisted_post(&schema, 5, "Hello");
    post.call("comments_delete", vec![Arg::from(9_i64)]).unwrap();
    post.save(&conn).unwrap();
    assert_eq!(
        conn.statements(),
        vec!["UPDATE comments SET post_id = NULL WHERE post_id = 5 AND id IN (9)"]
    );

    conn.clear();
    post.call("comments_clear", vec![]).unwrap();
    post.save(&conn).unwrap();
    assert_eq!(
        conn.statements(),
        vec!["UPDATE comments SET post_id = NULL WHERE post_id = 5 AND 1 = 1"]
    );
}

#[test]
fn has_one_dependent_is_saved_with_owner_key() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    post.call(
        "summary_build",
        vec![Arg::Attributes(vec![("text".to_string(), Value::from("short"))])],
    )
    .unwrap();
    assert_eq!(post.call("summary_size", vec![]).unwrap(), Value::BigInt(1));
    post.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec![
            "INSERT INTO posts (title, author_id) VALUES ('Hello', NULL)",
            "INSERT INTO summaries (text, post_id) VALUES ('short', 1)",
        ]
    );
}

#[test]
fn destroy_cascades_deletes_and_freezes() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.respond(
        "SELECT * FROM summaries",
        vec![row(&[
            ("id", Value::BigInt(3)),
            ("text", Value::from("s")),
            ("post_id", Value::BigInt(5)),
        ])],
    );

    let mut post = persisted_post(&schema, 5, "Hello");
    assert!(post.destroy(&conn).unwrap());

    assert_eq!(
        conn.statements(),
        vec![
            "UPDATE comments SET post_id = NULL WHERE post_id = 5",
            "SELECT * FROM summaries WHERE ( post_id = 5 )",
            "DELETE FROM summaries WHERE id = 3 LIMIT 1",
            "DELETE FROM posts WHERE id = 5 LIMIT 1",
        ]
    );
    assert!(post.is_frozen());
    assert_eq!(post.value("title").unwrap(), Value::from("Hello"));
    assert!(
        post.get("summary")
            .unwrap()
            .record()
            .is_some_and(|summary| summary.is_frozen())
    );

    let err = post.set("title", "again").unwrap_err();
    assert_eq!(err.record_error_kind(), Some(RecordErrorKind::ObjectFrozen));
    let err = post.save(&conn).unwrap_err();
    assert_eq!(err.record_error_kind(), Some(RecordErrorKind::ObjectFrozen));
}

#[test]
fn destroying_an_unsaved_record_issues_no_delete() {
    let schema = blog();
    let conn = MockConnection::new();

    let mut post = schema.new_record("Post").unwrap();
    assert!(post.destroy(&conn).unwrap());
    assert!(conn.statements().is_empty());
    assert!(post.is_frozen());
}

#[test]
fn driver_errors_propagate_unchanged() {
    let schema = blog();
    let conn = MockConnection::new();
    conn.fail_on("INSERT INTO posts");

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    let err = post.save(&conn).unwrap_err();

    assert!(matches!(err, Error::Query(_)));
    assert_eq!(
        err.sql(),
        Some("INSERT INTO posts (title, author_id) VALUES ('Hello', NULL)")
    );
    assert!(post.is_new_record());
}

fn hooked_schema(log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Schema> {
    let mut post = EntityBuilder::new("Post").columns(["id", "title", "slug"]);
    for event in [
        LifecycleEvent::BeforeSave,
        LifecycleEvent::BeforeCreate,
        LifecycleEvent::AfterCreate,
        LifecycleEvent::BeforeUpdate,
        LifecycleEvent::AfterUpdate,
        LifecycleEvent::AfterSave,
        LifecycleEvent::BeforeDestroy,
        LifecycleEvent::AfterDestroy,
    ] {
        let log = Arc::clone(log);
        post = post.hook(event, move |_| {
            log.lock().unwrap().push(event.as_str());
            Ok(())
        });
    }
    Schema::builder().entity(post).build().unwrap()
}

#[test]
fn hooks_run_in_lifecycle_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = hooked_schema(&log);
    let conn = MockConnection::new();

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello").unwrap();
    post.save(&conn).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["before_save", "before_create", "after_create", "after_save"]
    );

    log.lock().unwrap().clear();
    post.set("title", "Changed").unwrap();
    post.save(&conn).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["before_save", "before_update", "after_update", "after_save"]
    );

    log.lock().unwrap().clear();
    post.save(&conn).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before_save", "after_save"]);

    log.lock().unwrap().clear();
    post.destroy(&conn).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before_destroy", "after_destroy"]);
}

#[test]
fn hooks_can_modify_and_abort() {
    let schema = Schema::builder()
        .entity(
            EntityBuilder::new("Post")
                .columns(["id", "title", "slug"])
                .hook(LifecycleEvent::BeforeSave, |post| {
                    let slug = post
                        .value("title")?
                        .as_str()
                        .unwrap_or_default()
                        .to_lowercase()
                        .replace(' ', "-");
                    post.set("slug", slug)
                })
                .hook(LifecycleEvent::BeforeUpdate, |_| {
                    Err(Error::Custom("posts are immutable".to_string()))
                }),
        )
        .build()
        .unwrap();
    let conn = MockConnection::new();

    let mut post = schema.new_record("Post").unwrap();
    post.set("title", "Hello World").unwrap();
    post.save(&conn).unwrap();
    assert_eq!(
        conn.statements(),
        vec!["INSERT INTO posts (title, slug) VALUES ('Hello World', 'hello-world')"]
    );

    conn.clear();
    post.set("title", "Other").unwrap();
    let err = post.save(&conn).unwrap_err();
    assert!(matches!(err, Error::Custom(_)));
    assert!(conn.statements().is_empty());
    assert!(post.is_modified());
}

#[test]
fn custom_table_and_foreign_key() {
    let schema = blog_builder()
        .entity(
            EntityBuilder::new("Tag")
                .table("labels")
                .primary_key("tag_id")
                .columns(["tag_id", "label", "article"])
                .belongs_to(
                    "post",
                    AssociationOptions::new().foreign_key("article"),
                ),
        )
        .build()
        .unwrap();
    let conn = MockConnection::new();

    let mut tag = schema.new_record("Tag").unwrap();
    tag.set("post", persisted_post(&schema, 5, "Hello")).unwrap();
    tag.set("label", "rust").unwrap();
    tag.save(&conn).unwrap();

    assert_eq!(
        conn.statements(),
        vec!["INSERT INTO labels (label, article) VALUES ('rust', 5)"]
    );
    assert_eq!(tag.id(), Value::BigInt(1));
}
