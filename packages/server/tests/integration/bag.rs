use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let res = app.get_without_token(routes::HEALTH).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn bag_routes_require_token() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::BAGS).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");

    let res = app.get_with_token(routes::BAGS, "not-a-jwt").await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_INVALID");

    let res = app
        .post_without_token(routes::BAGS, &json!({ "file_id": 1 }))
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn create_returns_record_with_default_hash() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "reports/q3.txt", b"quarterly").await;

    let bag = app.create_bag(&token, file_id, None).await;

    assert_eq!(bag["file_id"], file_id);
    assert_eq!(bag["hash_type"], "md5");
    assert_eq!(bag["hash_value"].as_str().unwrap().len(), 32);
    assert_eq!(bag["created"], bag["updated"]);
    assert!(bag["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn create_validates_input() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "a.txt", b"a").await;

    let res = app
        .post_with_token(
            routes::BAGS,
            &json!({ "file_id": file_id, "hash_type": "crc32" }),
            &token,
        )
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let res = app
        .post_with_token(routes::BAGS, &json!({ "file": "a.txt" }), &token)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let res = app
        .post_with_token(routes::BAGS, &json!({ "file_id": -7 }), &token)
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn create_rejects_oversized_source() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app
        .put_file("alice", "big.bin", &vec![0u8; 2 * 1024 * 1024])
        .await;

    let res = app
        .post_with_token(routes::BAGS, &json!({ "file_id": file_id }), &token)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn list_and_lookups() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "notes.txt", b"notes").await;
    let bag = app.create_bag(&token, file_id, Some("sha256")).await;
    let bag_id = bag["bag_id"].as_str().unwrap();

    let res = app.get_with_token(routes::BAGS, &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 1);
    let item = &res.body["bags"][0];
    assert_eq!(item["id"], bag_id);
    assert_eq!(item["name"], "notes.txt");
    assert_eq!(item["type"], "bag");
    assert_eq!(item["replica_d"], 0);
    assert_eq!(item["replica_sm"], 0);
    assert_eq!(item["timestamp"], bag["created"]);

    let res = app.get_with_token(&routes::bag(bag_id), &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["records"][0]["hash_type"], "sha256");

    let res = app.get_with_token(&routes::file(file_id), &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["records"][0]["bag_id"], bag_id);

    let res = app.get_with_token(&routes::bag("not-a-uuid"), &token).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn bags_are_private_to_their_owner() {
    let app = TestApp::spawn().await;
    let alice = app.token("alice");
    let bob = app.token("bob");
    let file_id = app.put_file("alice", "secret.txt", b"mine").await;
    let bag = app.create_bag(&alice, file_id, None).await;
    let bag_id = bag["bag_id"].as_str().unwrap();

    let res = app.get_with_token(routes::BAGS, &bob).await;
    assert_eq!(res.body["total"], 0);

    let res = app.get_with_token(&routes::bag(bag_id), &bob).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 0);

    let res = app.delete_with_token(&routes::bag(bag_id), &bob).await;
    assert_eq!(res.status, 404);

    let res = app.post_with_token(&routes::file_validate(file_id), &json!({}), &bob).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn show_content_and_storage_summary() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "photo.jpg", b"JPEGDATA").await;
    app.create_bag(&token, file_id, None).await;

    let res = app.get_with_token(&routes::file_content(file_id), &token).await;
    assert_eq!(res.status, 200);
    let paths: Vec<&str> = res.body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"data/photo.jpg"));
    assert!(paths.contains(&"manifest-md5.txt"));

    let res = app.get_with_token(routes::STORAGE, &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["name"], "bagit");
    assert_eq!(res.body["bags"], 1);
}

#[tokio::test]
async fn full_lifecycle() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "data.csv", b"a,b\n1,2\n").await;

    // create
    let created = app.create_bag(&token, file_id, None).await;
    let first_bag = created["bag_id"].as_str().unwrap().to_string();

    // update after the source changed
    std::fs::write(app.source_path("alice", "data.csv"), b"a,b\n1,2\n3,4\n").unwrap();
    let res = app.put_with_token(&routes::file(file_id), &token).await;
    assert_eq!(res.status, 200, "update failed: {}", res.text);
    let updated = res.body;
    let second_bag = updated["bag_id"].as_str().unwrap().to_string();
    assert_eq!(updated["id"], created["id"]);
    assert_ne!(second_bag, first_bag);
    assert_ne!(updated["hash_value"], created["hash_value"]);
    assert!(!app.bag_path("alice", &first_bag).exists());

    // validate untampered
    let res = app
        .post_with_token(&routes::file_validate(file_id), &json!({}), &token)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["valid"], true);
    assert_eq!(res.body["bag"]["hash_value"], updated["hash_value"]);
    assert!(res.body.get("expected").is_none());

    // tamper, then validate again
    std::fs::write(
        app.bag_path("alice", &second_bag).join("data/data.csv"),
        b"forged",
    )
    .unwrap();
    let before = app.get_with_token(&routes::file(file_id), &token).await;
    let res = app
        .post_with_token(&routes::file_validate(file_id), &json!({}), &token)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["valid"], false);
    assert_eq!(res.body["expected"], updated["hash_value"]);
    assert_ne!(res.body["actual"], res.body["expected"]);
    let after = app.get_with_token(&routes::file(file_id), &token).await;
    assert_eq!(before.body, after.body);

    // delete
    let res = app.delete_with_token(&routes::bag(&second_bag), &token).await;
    assert_eq!(res.status, 204);
    assert!(!app.bag_path("alice", &second_bag).exists());

    let res = app.get_with_token(&routes::file(file_id), &token).await;
    assert_eq!(res.body["total"], 0);
    let res = app.delete_with_token(&routes::bag(&second_bag), &token).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn update_and_validate_without_bag_are_not_found() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let file_id = app.put_file("alice", "lonely.txt", b"x").await;

    let res = app.put_with_token(&routes::file(file_id), &token).await;
    assert_eq!(res.status, 404);

    let res = app
        .post_with_token(&routes::file_validate(file_id), &json!({}), &token)
        .await;
    assert_eq!(res.status, 404);

    let res = app.get_with_token(&routes::file_content(file_id), &token).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn list_skips_bag_whose_container_vanished() {
    let app = TestApp::spawn().await;
    let token = app.token("alice");
    let kept = app.put_file("alice", "kept.txt", b"kept").await;
    let lost = app.put_file("alice", "lost.txt", b"lost").await;
    app.create_bag(&token, kept, None).await;
    let lost_bag = app.create_bag(&token, lost, None).await;

    std::fs::remove_dir_all(app.bag_path("alice", lost_bag["bag_id"].as_str().unwrap())).unwrap();

    let res = app.get_with_token(routes::BAGS, &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["bags"][0]["name"], "kept.txt");
}
