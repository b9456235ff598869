use classboard_core::db::open_db_in_memory;
use classboard_core::model::credential::verify_password;
use classboard_core::model::AttributeMap;
use classboard_core::{
    Board, Conflict, Course, DocumentStore, Entity, EntityService, Instructor, Projection,
    RepoError, Repository, ServiceError, Session, SqliteDocumentStore, Student,
};
use serde_json::{json, Value};

fn changes(value: Value) -> AttributeMap {
    match value {
        Value::Object(map) => map,
        other => panic!("changes must be an object, got {other}"),
    }
}

#[test]
fn board_lifecycle_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let boards = Repository::<Board, _>::new(SqliteDocumentStore::new(&conn));

    let created = boards.create(&Board::new("Math")).unwrap();
    assert!(!created.id.is_empty());
    assert!(created.active);
    assert_eq!(created.created_at, created.updated_at);

    let updated = boards
        .update(&created.id, changes(json!({ "title": "Algebra" })))
        .unwrap();
    assert_eq!(updated.title, "Algebra");
    assert!(updated.active);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > updated.created_at);

    boards.delete(&created.id).unwrap();
    assert!(boards.delete(&created.id).unwrap_err().is_not_found());
    assert!(boards.get(&created.id).unwrap().is_none());
}

#[test]
fn successive_updates_strictly_advance_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let boards = Repository::<Board, _>::new(SqliteDocumentStore::new(&conn));
    let board = boards.create(&Board::new("Math")).unwrap();

    let mut previous = board.updated_at.clone();
    for round in 0..5 {
        let updated = boards
            .update(
                &board.id,
                changes(json!({
                    "title": format!("Math {round}"),
                    "id": "hijack",
                    "created_at": "2000-01-01T00:00:00.000000Z"
                })),
            )
            .unwrap();
        assert_eq!(updated.id, board.id);
        assert_eq!(updated.created_at, board.created_at);
        assert!(updated.updated_at > previous);
        previous = updated.updated_at;
    }
}

#[test]
fn duplicate_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let boards = Repository::<Board, _>::new(SqliteDocumentStore::new(&conn));
    let board = Board::new("Math");

    boards.create(&board).unwrap();
    match boards.create(&board).unwrap_err() {
        RepoError::AlreadyExists {
            conflict: Conflict::Id(id),
            ..
        } => assert_eq!(id, board.id),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_entity_never_reaches_the_store() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let boards = Repository::<Board, _>::new(store);

    let err = boards.create(&Board::new("   ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(err.to_string(), "Title is required");
    assert_eq!(store.count("boards").unwrap(), 0);
}

#[test]
fn unique_email_is_checked_on_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let instructors = Repository::<Instructor, _>::new(SqliteDocumentStore::new(&conn));

    let ada = instructors
        .create(&Instructor::register("Ada", "ada@school.test", "secret1").unwrap())
        .unwrap();
    let grace = instructors
        .create(&Instructor::register("Grace", "grace@school.test", "secret2").unwrap())
        .unwrap();

    let err = instructors
        .create(&Instructor::register("Imposter", "ada@school.test", "secret3").unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::AlreadyExists {
            conflict: Conflict::IndexedField { field: "email", .. },
            ..
        }
    ));

    let err = instructors
        .update(&grace.id, changes(json!({ "email": "ada@school.test" })))
        .unwrap_err();
    assert!(err.is_already_exists());

    // Re-saving one's own email is not a conflict.
    instructors
        .update(&ada.id, changes(json!({ "email": "ada@school.test" })))
        .unwrap();

    let found = instructors.find_by_email("grace@school.test").unwrap().unwrap();
    assert_eq!(found.id, grace.id);
    assert!(instructors.find_by_email("nobody@school.test").unwrap().is_none());
}

#[test]
fn same_email_may_exist_in_both_roles() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let instructors = Repository::<Instructor, _>::new(store);
    let students = Repository::<Student, _>::new(store);

    instructors
        .create(&Instructor::register("Ada", "ada@school.test", "secret1").unwrap())
        .unwrap();
    students
        .create(&Student::register("Ada", "ada@school.test", "secret1").unwrap())
        .unwrap();
}

#[test]
fn index_queries_by_name_or_field() {
    let conn = open_db_in_memory().unwrap();
    let sessions = Repository::<Session, _>::new(SqliteDocumentStore::new(&conn));
    sessions.create(&Session::new("c1", "b1", "Mon")).unwrap();
    sessions.create(&Session::new("c1", "b2", "Tue")).unwrap();
    sessions.create(&Session::new("c2", "b1", "Wed")).unwrap();

    assert_eq!(sessions.query_by_index("course_id", "c1").unwrap().len(), 2);
    assert_eq!(sessions.query_by_index("CourseIndex", "c1").unwrap().len(), 2);
    assert_eq!(sessions.list_by_board("b1").unwrap().len(), 2);
    assert!(sessions.list_by_course("c3").unwrap().is_empty());

    assert!(matches!(
        sessions.query_by_index("name", "Mon").unwrap_err(),
        RepoError::UnknownIndex(name) if name == "name"
    ));
}

#[test]
fn courses_list_by_instructor() {
    let conn = open_db_in_memory().unwrap();
    let courses = Repository::<Course, _>::new(SqliteDocumentStore::new(&conn));
    courses.create(&Course::new("Algebra", "i1")).unwrap();
    courses.create(&Course::new("Geometry", "i2")).unwrap();

    let listed = courses.list_by_instructor("i1").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Algebra");
}

#[test]
fn list_uses_default_page_size_and_clamps() {
    let conn = open_db_in_memory().unwrap();
    let boards = Repository::<Board, _>::new(SqliteDocumentStore::new(&conn));
    for index in 0..3 {
        boards.create(&Board::new(format!("Board {index}"))).unwrap();
    }

    assert_eq!(boards.list(None).unwrap().len(), 3);
    assert_eq!(boards.list(Some(2)).unwrap().len(), 2);
    assert_eq!(boards.list(Some(0)).unwrap().len(), 1);
}

#[test]
fn corrupt_record_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    store
        .create(
            "boards",
            changes(json!({
                "id": "b1",
                "title": "Math",
                "created_at": "2026-02-01T00:00:00.000000Z",
                "updated_at": "2026-01-01T00:00:00.000000Z"
            })),
        )
        .unwrap();

    let boards = Repository::<Board, _>::new(store);
    assert!(matches!(
        boards.get("b1").unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn wrong_typed_update_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let boards = Repository::<Board, _>::new(store);
    let board = boards.create(&Board::new("Math")).unwrap();

    let err = boards
        .update(&board.id, changes(json!({ "title": 5 })))
        .unwrap_err();
    assert!(matches!(err, RepoError::Codec(_)));

    let raw = store.get_by_id("boards", &board.id).unwrap().unwrap();
    assert_eq!(raw["title"], "Math");
    assert_eq!(raw["updated_at"], board.updated_at.as_str());
    assert_eq!(boards.get(&board.id).unwrap().unwrap(), board);
    assert_eq!(boards.list(None).unwrap().len(), 1);

    assert!(boards
        .update("missing", changes(json!({ "title": "x" })))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn custom_collection_names_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let staging = Repository::<Board, _>::with_collection(store, "staging-boards");
    let board = staging.create(&Board::new("Math")).unwrap();

    assert_eq!(staging.collection(), "staging-boards");
    assert!(Repository::<Board, _>::new(store).get(&board.id).unwrap().is_none());
    assert!(store.get_by_id("staging-boards", &board.id).unwrap().is_some());
}

#[test]
fn service_rejects_empty_updates() {
    let conn = open_db_in_memory().unwrap();
    let boards = EntityService::new(Repository::<Board, _>::new(SqliteDocumentStore::new(&conn)));
    let board = boards.create(&Board::new("Math")).unwrap();

    assert!(matches!(
        boards.update_fields(&board.id, AttributeMap::new()).unwrap_err(),
        ServiceError::NoFieldsToUpdate
    ));
    assert!(matches!(
        boards
            .update_fields(&board.id, changes(json!({ "id": "x", "updated_at": "y" })))
            .unwrap_err(),
        ServiceError::NoFieldsToUpdate
    ));

    let unchanged = boards.get(&board.id).unwrap().unwrap();
    assert_eq!(unchanged.updated_at, board.updated_at);
}

#[test]
fn service_validates_merged_state() {
    let conn = open_db_in_memory().unwrap();
    let students = EntityService::new(Repository::<Student, _>::new(SqliteDocumentStore::new(&conn)));
    let student = students
        .create(&Student::register("Lin", "lin@school.test", "secret1").unwrap())
        .unwrap();

    assert!(matches!(
        students
            .update_fields(&student.id, changes(json!({ "score": 101 })))
            .unwrap_err(),
        ServiceError::Validation(_)
    ));
    assert!(matches!(
        students
            .update_fields(&student.id, changes(json!({ "score": "high" })))
            .unwrap_err(),
        ServiceError::InvalidChange(_)
    ));
    assert!(matches!(
        students
            .update_fields("missing", changes(json!({ "score": 5 })))
            .unwrap_err(),
        ServiceError::Repo(RepoError::NotFound { .. })
    ));

    let updated = students
        .update_fields(&student.id, changes(json!({ "score": 88 })))
        .unwrap();
    assert_eq!(updated.score, 88);
}

#[test]
fn password_changes_are_hashed_and_hidden_by_default() {
    let conn = open_db_in_memory().unwrap();
    let instructors =
        EntityService::new(Repository::<Instructor, _>::new(SqliteDocumentStore::new(&conn)));
    let ada = instructors
        .create(&Instructor::register("Ada", "ada@school.test", "secret1").unwrap())
        .unwrap();
    assert_ne!(ada.password, "secret1");

    let updated = instructors
        .update_fields(&ada.id, changes(json!({ "password": "better-secret" })))
        .unwrap();
    assert!(verify_password("better-secret", &updated.password));

    assert!(matches!(
        instructors
            .update_fields(&ada.id, changes(json!({ "password": "short" })))
            .unwrap_err(),
        ServiceError::Validation(_)
    ));

    let public = instructors
        .get_projected(&ada.id, Projection::Public)
        .unwrap()
        .unwrap();
    assert!(!public.contains_key("password"));
    assert_eq!(public["email"], "ada@school.test");

    let full = instructors
        .get_projected(&ada.id, Projection::WithCredentials)
        .unwrap()
        .unwrap();
    assert_eq!(full["password"], updated.password.as_str());

    for record in instructors.list(None).unwrap() {
        assert!(!record.contains_key("password"));
    }
    assert_eq!(Instructor::SENSITIVE_FIELDS, &["password"]);
}
