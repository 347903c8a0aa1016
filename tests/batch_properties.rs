use creel::{
    BatchRequest, BucketSchema, CreelConfig, CreelInstance, Document, FieldValue, KeyPrefix,
    PutOptions,
};
use std::sync::Arc;

fn grouped_schema() -> BucketSchema {
    BucketSchema::new().with_key_transform(Arc::new(KeyPrefix::new('/')))
}

async fn open_with_buckets(buckets: &[&str]) -> CreelInstance {
    let db = CreelInstance::open(CreelConfig::default());
    for bucket in buckets {
        db.create_bucket(bucket, grouped_schema()).expect("bucket");
    }
    db
}

#[tokio::test]
async fn single_put_reads_back_the_submitted_value() {
    let db = open_with_buckets(&["things"]).await;
    let value = Document::new().set("name", "anvil").set("weight", 40i64);

    let result = db
        .batch(vec![BatchRequest::put("things", "acct/anvil", value.clone())])
        .await
        .expect("batch");
    assert_eq!(result.etags.len(), 1);
    let etag = result.etags[0].etag.clone().expect("put etag");

    let record = db.get_object("things", "acct/anvil").await.expect("read");
    assert_eq!(record.value, value);
    assert_eq!(record.etag, etag);
}

#[tokio::test]
async fn single_delete_clears_the_object_and_returns_no_etag() {
    let db = open_with_buckets(&["things"]).await;
    db.put_object("things", "acct/empty", Document::new(), PutOptions::default())
        .await
        .expect("seed empty object");

    let result = db
        .batch(vec![BatchRequest::delete("things", "acct/empty")])
        .await
        .expect("batch");
    assert_eq!(result.etags.len(), 1);
    assert!(result.etags[0].etag.is_none());
    assert_eq!(result.etags[0].key, "acct/empty");

    let err = db
        .get_object("things", "acct/empty")
        .await
        .expect_err("deleted");
    assert_eq!(err.code_str(), "object_not_found");
}

#[tokio::test]
async fn puts_sharing_a_transform_key_commit_together() {
    let db = open_with_buckets(&["left", "right"]).await;
    let result = db
        .batch(vec![
            BatchRequest::put("left", "acct/1", Document::new().set("n", 1i64)),
            BatchRequest::put("right", "acct/2", Document::new().set("n", 2i64)),
        ])
        .await
        .expect("same container across buckets");
    assert_eq!(result.etags.len(), 2);

    let one = db.get_object("left", "acct/1").await.expect("left");
    let two = db.get_object("right", "acct/2").await.expect("right");
    assert_eq!(one.value.get("n"), Some(&FieldValue::Number(1.0)));
    assert_eq!(two.value.get("n"), Some(&FieldValue::Number(2.0)));
}

#[tokio::test]
async fn mismatched_transform_keys_fail_with_the_literal_message() {
    let db = open_with_buckets(&["things"]).await;
    let err = db
        .batch(vec![
            BatchRequest::put("things", "acct/1", Document::new()),
            BatchRequest::put("things", "other/2", Document::new()),
        ])
        .await
        .expect_err("containers differ");
    assert_eq!(err.to_string(), "all requests must transform to the same key");

    for key in ["acct/1", "other/2"] {
        assert_eq!(
            db.get_object("things", key).await.expect_err("nothing created").code_str(),
            "object_not_found"
        );
    }
}

#[tokio::test]
async fn unsupported_operations_poison_the_whole_batch() {
    let db = open_with_buckets(&["things"]).await;
    for bad_op in ["update", "deleteMany"] {
        let bad: BatchRequest = serde_json::from_value(serde_json::json!({
            "operation": bad_op,
            "bucket": "things",
            "key": "acct/x",
        }))
        .expect("wire request");
        let err = db
            .batch(vec![
                BatchRequest::put("things", "acct/valid", Document::new().set("ok", true)),
                bad,
            ])
            .await
            .expect_err("unsupported operation");
        assert_eq!(
            err.to_string(),
            format!("\"{bad_op}\" is not an allowed batch operation")
        );
        assert_eq!(
            db.get_object("things", "acct/valid")
                .await
                .expect_err("valid request must not be applied")
                .code_str(),
            "object_not_found"
        );
    }
}

#[tokio::test]
async fn mixed_batch_applies_positionally_across_buckets() {
    let db = open_with_buckets(&["inbox", "outbox"]).await;
    db.put_object("inbox", "acct/old", Document::new(), PutOptions::default())
        .await
        .expect("seed");

    let result = db
        .batch(vec![
            BatchRequest::delete("inbox", "acct/old"),
            BatchRequest::put("inbox", "acct/a", Document::new().set("n", 1i64)),
            BatchRequest::put("outbox", "acct/b", Document::new().set("n", 2i64)),
        ])
        .await
        .expect("mixed batch");

    assert_eq!(result.etags.len(), 3);
    assert_eq!(result.etags[0].key, "acct/old");
    assert!(result.etags[0].etag.is_none());
    assert_eq!(result.etags[1].key, "acct/a");
    assert!(result.etags[1].etag.is_some());
    assert_eq!(result.etags[2].bucket, "outbox");
    assert!(result.etags[2].etag.is_some());

    assert_eq!(
        db.get_object("inbox", "acct/old").await.expect_err("deleted").code_str(),
        "object_not_found"
    );
    assert_eq!(
        db.get_object("inbox", "acct/a").await.expect("a").value.get("n"),
        Some(&FieldValue::Number(1.0))
    );
    assert_eq!(
        db.get_object("outbox", "acct/b").await.expect("b").value.get("n"),
        Some(&FieldValue::Number(2.0))
    );
}

#[tokio::test]
async fn failing_batches_are_idempotent() {
    let db = open_with_buckets(&["things"]).await;
    let requests = vec![
        BatchRequest::put("things", "acct/1", Document::new()),
        BatchRequest::put("things", "other/2", Document::new()),
    ];

    let first = db.batch(requests.clone()).await.expect_err("first run");
    let second = db.batch(requests).await.expect_err("second run");
    assert_eq!(first.to_string(), second.to_string());

    for key in ["acct/1", "other/2"] {
        assert_eq!(
            db.get_object("things", key).await.expect_err("no side effect").code_str(),
            "object_not_found"
        );
    }
}
