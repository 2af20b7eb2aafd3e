//! End-to-end exercises of the engine through the public facade: list
//! definition, registration, updates, filters, search, pagination,
//! unique values, export, and relationship expansion.

use fieldstone::prelude::*;
use std::collections::BTreeMap;

fn blog_engine() -> Engine {
    let mut engine = Engine::new(MemoryBackend::new());

    let mut users = engine.new_list("User", ListOptions::default());
    users
        .add([
            AddItem::from(FieldDef::new("name", "text").with_options(
                FieldOptions::new().required(),
            )),
            AddItem::from(FieldDef::new("email", "text").with_options(
                FieldOptions::new().unique(),
            )),
            AddItem::from(FieldDef::new("password", "password")),
        ])
        .unwrap();
    engine.register(users).unwrap();

    let mut posts = engine.new_list(
        "Post",
        ListOptions {
            track: TrackOptions::timestamps(),
            search_fields: vec!["title".to_string(), "body".to_string()],
            default_sort: Some("title".to_string()),
            ..ListOptions::default()
        },
    );
    posts
        .add([
            AddItem::from("Content"),
            AddItem::from(FieldDef::new("title", "text").with_options(
                FieldOptions::new().required(),
            )),
            AddItem::from(FieldDef::new("slug", "text").with_options(FieldOptions::new().unique())),
            AddItem::from(FieldDef::new("body", "textarea")),
            AddItem::from("Meta"),
            AddItem::from(FieldDef::new("state", "select").with_options(
                FieldOptions::new()
                    .with(
                        "options",
                        serde_json::json!([
                            {"value": "draft", "label": "Draft"},
                            {"value": "published", "label": "Published"},
                        ]),
                    )
                    .default_json(serde_json::json!("draft")),
            )),
            AddItem::from(FieldDef::new("published_on", NativeType::Date)),
            AddItem::from(FieldDef::new("views", NativeType::Number)),
            AddItem::from(FieldDef::new("featured", NativeType::Boolean)),
            AddItem::from(FieldDef::new("author", "relationship").with_options(
                FieldOptions::new().with("ref", serde_json::json!("User")),
            )),
        ])
        .unwrap();
    engine.register(posts).unwrap();

    engine
}

fn update(
    engine: &Engine,
    list: &str,
    doc: &mut Document,
    pairs: &[(&str, Value)],
) -> UpdateOutcome {
    let data: UpdateData = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    engine
        .list(list)
        .unwrap()
        .update_item(engine.backend(), doc, &data, None)
        .unwrap()
}

fn seed_post(engine: &Engine, title: &str, state: &str, views: i64) -> Document {
    let mut doc = Document::new();
    let outcome = update(
        engine,
        "Post",
        &mut doc,
        &[
            ("title", Value::Text(title.to_string())),
            ("state", Value::Text(state.to_string())),
            ("views", Value::Int(views)),
        ],
    );
    assert!(outcome.is_applied(), "seed failed for {title}");
    doc
}

#[test]
fn version_is_exported() {
    assert!(!fieldstone::VERSION.is_empty());
}

#[test]
fn full_update_flow_with_tracking_and_defaults() {
    let engine = blog_engine();
    let mut doc = Document::new();

    let outcome = update(
        &engine,
        "Post",
        &mut doc,
        &[("title", Value::Text("Hello World".into()))],
    );
    assert!(outcome.is_applied());
    assert!(doc.id().is_some());
    // select default applied on create
    assert_eq!(doc.get("state"), &Value::Text("draft".into()));
    // tracking stamped
    assert!(doc.get("created_at").as_timestamp().is_some());
    assert!(doc.get("updated_at").as_timestamp().is_some());

    // the select's derived label virtual reads through the list
    let posts = engine.list("Post").unwrap();
    assert_eq!(posts.read(&doc, "state_label"), Value::Text("Draft".into()));
}

#[test]
fn rejected_update_is_all_or_nothing() {
    let engine = blog_engine();
    let mut doc = seed_post(&engine, "Original", "draft", 5);
    let before = doc.clone();

    let outcome = update(
        &engine,
        "Post",
        &mut doc,
        &[
            // valid change that must not land
            ("views", Value::Int(99)),
            // invalid change that rejects the submission
            ("published_on", Value::Text("not a date... ever".into())),
        ],
    );

    match outcome {
        UpdateOutcome::Rejected(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].field, "published_on");
        }
        UpdateOutcome::Applied => panic!("expected rejection"),
    }
    assert_eq!(doc, before);
}

#[test]
fn filters_translate_and_run_against_the_backend() {
    let engine = blog_engine();
    seed_post(&engine, "Alpha", "draft", 1);
    seed_post(&engine, "Beta", "published", 10);
    seed_post(&engine, "Gamma", "published", 100);

    let posts = engine.list("Post").unwrap();
    let filters = posts.process_filters(&serde_json::json!({
        "state": {"value": "published"},
        "views": {"mode": "between", "value": [5, 50]},
    }));

    let mut query = Query::new();
    posts
        .add_filters_to_query(&engine, &mut query, &filters)
        .unwrap();

    let found = engine.backend().find("Post", &query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("title"), &Value::Text("Beta".into()));
}

#[test]
fn unknown_filter_path_is_loud() {
    let engine = blog_engine();
    let posts = engine.list("Post").unwrap();
    let filters = posts.process_filters(&serde_json::json!({"bogus": "x"}));

    let mut query = Query::new();
    let err = posts
        .add_filters_to_query(&engine, &mut query, &filters)
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownFilterPath { .. }));
}

#[test]
fn dot_path_filters_reach_through_relationships() {
    let engine = blog_engine();
    let posts = engine.list("Post").unwrap();

    let filters = posts.process_filters(&serde_json::json!({
        "author.name": {"mode": "contains", "value": "ada"},
    }));
    let mut query = Query::new();
    posts
        .add_filters_to_query(&engine, &mut query, &filters)
        .unwrap();

    // predicate is keyed by the populated sub-document path
    let mut doc = Document::new();
    doc.set("author.name", Value::Text("Ada Lovelace".into()));
    assert!(query.predicate.matches(&doc));
    let mut other = Document::new();
    other.set("author.name", Value::Text("Grace".into()));
    assert!(!query.predicate.matches(&other));
}

#[test]
fn search_ors_across_configured_fields() {
    let engine = blog_engine();
    seed_post(&engine, "Needle in title", "draft", 0);

    let mut with_body = Document::new();
    update(
        &engine,
        "Post",
        &mut with_body,
        &[
            ("title", Value::Text("Other".into())),
            ("body", Value::Text("hay and a needle".into())),
        ],
    );

    seed_post(&engine, "Nothing here", "draft", 0);

    let posts = engine.list("Post").unwrap();
    let mut query = Query::new();
    posts.add_search_to_query(&mut query, "NEEDLE").unwrap();

    let found = engine.backend().find("Post", &query).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn pagination_clamps_and_windows() {
    let engine = blog_engine();
    for n in 0..25 {
        seed_post(&engine, &format!("Post {n:02}"), "draft", n);
    }

    let posts = engine.list("Post").unwrap();
    let page = posts
        .paginate(
            engine.backend(),
            &Predicate::True,
            &PaginateOptions::page(999).per_page(10),
        )
        .unwrap();

    assert_eq!(page.total, 25);
    assert_eq!(page.current_page, 3);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.results.len(), 5);
    assert_eq!((page.first, page.last), (21, 25));
}

#[test]
fn unique_value_suffixing() {
    let engine = blog_engine();
    let posts = engine.list("Post").unwrap();
    let backend = engine.backend();

    assert_eq!(
        posts.get_unique_value(backend, "slug", "post", None, None).unwrap(),
        "post"
    );

    let mut a = Document::new();
    update(
        &engine,
        "Post",
        &mut a,
        &[
            ("title", Value::Text("A".into())),
            ("slug", Value::Text("post".into())),
        ],
    );
    assert_eq!(
        posts.get_unique_value(backend, "slug", "post", None, None).unwrap(),
        "post2"
    );

    let mut b = Document::new();
    update(
        &engine,
        "Post",
        &mut b,
        &[
            ("title", Value::Text("B".into())),
            ("slug", Value::Text("post2".into())),
        ],
    );
    assert_eq!(
        posts.get_unique_value(backend, "slug", "post", None, None).unwrap(),
        "post3"
    );
}

#[test]
fn sort_and_column_expansion() {
    let engine = blog_engine();
    let posts = engine.list("Post").unwrap();

    let sort = posts.expand_sort("-created_at title bogus");
    assert_eq!(sort.len(), 2);
    assert_eq!(sort[0], SortField::desc("created_at"));
    assert_eq!(sort[1], SortField::asc("title"));

    let columns = posts.expand_columns("title|30%,state,bogus");
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].path, "title");
    assert_eq!(columns[0].width.as_deref(), Some("30%"));
}

#[test]
fn export_respects_cancellation() {
    let engine = blog_engine();
    seed_post(&engine, "One", "draft", 1);

    let posts = engine.list("Post").unwrap();
    let columns = posts.expand_columns("title,state");

    let rows = posts
        .export_rows(engine.backend(), &columns, &Predicate::True, None)
        .unwrap();
    assert_eq!(rows, vec![vec!["One".to_string(), "Draft".to_string()]]);

    let token = CancelToken::new();
    token.cancel();
    assert!(matches!(
        posts.export_rows(engine.backend(), &columns, &Predicate::True, Some(&token)),
        Err(EngineError::Cancelled)
    ));
}

#[test]
fn relationship_expansion_resolves_display_names() {
    let engine = blog_engine();

    let mut author = Document::new();
    update(
        &engine,
        "User",
        &mut author,
        &[("name", Value::Text("Ada".into()))],
    );
    let author_id = author.id().unwrap();

    let mut post = Document::new();
    update(
        &engine,
        "Post",
        &mut post,
        &[
            ("title", Value::Text("Linked".into())),
            ("author", Value::Text(author_id.to_string())),
        ],
    );

    let expanded = engine.expand_relationship("Post", &post, "author").unwrap();
    assert_eq!(expanded.len(), 1);
    assert_eq!(expanded[0].id, author_id);
    assert_eq!(expanded[0].name, "Ada");
}

#[test]
fn format_is_idempotent_for_every_built_in_type() {
    let engine = blog_engine();
    let posts = engine.list("Post").unwrap();

    let inputs: BTreeMap<&str, Value> = [
        ("title", Value::Text("Hello".into())),
        ("body", Value::Text("Body text".into())),
        ("state", Value::Text("published".into())),
        ("published_on", Value::Text("2024-03-01".into())),
        ("views", Value::Text("1,234".into())),
        ("featured", Value::Text("true".into())),
    ]
    .into_iter()
    .collect();

    let mut doc = Document::new();
    let data: UpdateData = inputs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    posts
        .update_item(engine.backend(), &mut doc, &data, None)
        .unwrap();

    let first: Vec<String> = inputs.keys().map(|p| posts.format(&doc, p)).collect();

    // a second application of the same input must not change anything
    posts
        .update_item(engine.backend(), &mut doc, &data, None)
        .unwrap();
    let second: Vec<String> = inputs.keys().map(|p| posts.format(&doc, p)).collect();

    assert_eq!(first, second);
    assert_eq!(posts.format(&doc, "views"), "1,234");
    assert_eq!(posts.format(&doc, "published_on"), "2024-03-01");
}

#[test]
fn password_round_trip_masks_and_compares() {
    let engine = blog_engine();
    let mut user = Document::new();
    update(
        &engine,
        "User",
        &mut user,
        &[
            ("name", Value::Text("Ada".into())),
            ("password", Value::Text("hunter2".into())),
        ],
    );

    let users = engine.list("User").unwrap();
    let mask = users.format(&user, "password");
    assert!(!mask.contains("hunter2"));
    assert!(!mask.is_empty());

    let ok = users
        .call(&user, "password", "compare", &[Value::Text("hunter2".into())])
        .unwrap();
    assert_eq!(ok, Value::Bool(true));
}

#[test]
fn unique_email_collision_rejects_across_documents() {
    let engine = blog_engine();

    let mut a = Document::new();
    let outcome = update(
        &engine,
        "User",
        &mut a,
        &[
            ("name", Value::Text("A".into())),
            ("email", Value::Text("a@example.com".into())),
        ],
    );
    assert!(outcome.is_applied());

    let mut b = Document::new();
    let outcome = update(
        &engine,
        "User",
        &mut b,
        &[
            ("name", Value::Text("B".into())),
            ("email", Value::Text("a@example.com".into())),
        ],
    );
    match outcome {
        UpdateOutcome::Rejected(failures) => {
            assert_eq!(failures[0].field, "email");
            assert_eq!(failures[0].reason, "must be unique");
        }
        UpdateOutcome::Applied => panic!("expected rejection"),
    }
}
