use super::{
    BatchRequest, BucketSchema, CreelConfig, CreelInstance, DeleteOptions, Document, FieldType,
    FieldValue, PutOptions,
};

#[tokio::test]
async fn api_open_put_get_delete_roundtrip() {
    let db = CreelInstance::open(CreelConfig::default());
    db.create_bucket("users", BucketSchema::new()).expect("bucket");

    let etag = db
        .put_object(
            "users",
            "u1",
            Document::new().set("name", "ann"),
            PutOptions::default(),
        )
        .await
        .expect("put");

    let record = db.get_object("users", "u1").await.expect("get");
    assert_eq!(record.etag, etag);
    assert_eq!(record.value.get("name"), Some(&FieldValue::Text("ann".into())));

    db.delete_object("users", "u1", DeleteOptions::default())
        .await
        .expect("delete");
    let err = db.get_object("users", "u1").await.expect_err("gone");
    assert_eq!(err.code_str(), "object_not_found");
}

#[tokio::test]
async fn put_with_stale_etag_is_rejected() {
    let db = CreelInstance::open(CreelConfig::default());
    db.create_bucket("users", BucketSchema::new()).expect("bucket");

    let first = db
        .put_object("users", "u1", Document::new().set("v", 1i64), PutOptions::default())
        .await
        .expect("first put");
    db.put_object("users", "u1", Document::new().set("v", 2i64), PutOptions::default())
        .await
        .expect("second put");

    let err = db
        .put_object(
            "users",
            "u1",
            Document::new().set("v", 3i64),
            PutOptions {
                expected_etag: Some(first),
            },
        )
        .await
        .expect_err("stale etag");
    assert_eq!(err.code_str(), "etag_conflict");

    let record = db.get_object("users", "u1").await.expect("get");
    assert_eq!(record.value.get("v"), Some(&FieldValue::Number(2.0)));
}

#[tokio::test]
async fn delete_bucket_drops_schema_and_objects() {
    let db = CreelInstance::open(CreelConfig::default());
    db.create_bucket("tmp", BucketSchema::new()).expect("bucket");
    db.put_object("tmp", "k", Document::new(), PutOptions::default())
        .await
        .expect("put");

    db.delete_bucket("tmp").await.expect("drop");
    assert_eq!(
        db.get_object("tmp", "k").await.expect_err("bucket gone").code_str(),
        "bucket_not_found"
    );

    // Recreating the bucket must not resurrect old objects.
    db.create_bucket("tmp", BucketSchema::new()).expect("recreate");
    assert_eq!(
        db.get_object("tmp", "k").await.expect_err("object gone").code_str(),
        "object_not_found"
    );
}

#[tokio::test]
async fn metrics_count_batches_and_conflicts() {
    let db = CreelInstance::open(CreelConfig::default());
    db.create_bucket(
        "users",
        BucketSchema::new().with_index("email", FieldType::String, true),
    )
    .expect("bucket");

    db.batch(vec![BatchRequest::put(
        "users",
        "u1",
        Document::new().set("email", "a@x"),
    )])
    .await
    .expect("first put");
    db.batch(vec![BatchRequest::put(
        "users",
        "u2",
        Document::new().set("email", "a@x"),
    )])
    .await
    .expect_err("unique conflict");

    let metrics = db.metrics();
    assert_eq!(metrics.batches_total, 2);
    assert_eq!(metrics.batch_errors, 1);
    assert_eq!(metrics.conflict_rejections, 1);
    assert_eq!(metrics.objects_written, 1);
    assert_eq!(metrics.objects_deleted, 0);
}

#[tokio::test]
async fn bucket_names_are_sorted() {
    let db = CreelInstance::default();
    db.create_bucket("zeta", BucketSchema::new()).expect("zeta");
    db.create_bucket("alpha", BucketSchema::new()).expect("alpha");
    let names = db.bucket_names();
    assert_eq!(names, vec!["alpha", "zeta"]);
}
