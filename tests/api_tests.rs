mod common;

use actix_web::{App, http::StatusCode, test, web};
use common::{Fixture, SLEEPER, install_server};
use serde_json::{Value, json};
use server_warden::{Supervisor, api};

macro_rules! init_app {
    ($data:expr) => {
        test::init_service(App::new().app_data($data.clone()).configure(api::configure)).await
    };
}

fn split(fixture: Fixture) -> (tempfile::TempDir, web::Data<Supervisor>) {
    let Fixture { root, supervisor } = fixture;
    (root, web::Data::new(supervisor))
}

#[actix_web::test]
async fn test_full_server_flow() {
    let fixture = Fixture::new();
    fixture.install_default_template();
    let (_root, data) = split(fixture);
    let app = init_app!(data);

    // Create
    let req = test::TestRequest::post()
        .uri("/api/server/create")
        .set_json(json!({ "server_id": "arena" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "created");

    // Config round trip
    let req = test::TestRequest::put()
        .uri("/api/server/arena/config")
        .set_json(json!({ "maxplayers": 64 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "config_updated");

    let req = test::TestRequest::get()
        .uri("/api/server/arena/config")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["config"], json!({ "maxplayers": 64 }));

    // Start
    let req = test::TestRequest::post()
        .uri("/api/server/start")
        .set_json(json!({ "server_id": "arena" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "started");
    assert!(body["pid"].as_u64().unwrap() > 0);

    // Starting again conflicts
    let req = test::TestRequest::post()
        .uri("/api/server/start")
        .set_json(json!({ "server_id": "arena" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 409);

    // Status
    let req = test::TestRequest::get()
        .uri("/api/server/arena/status")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "running");
    assert!(body["memoryBytes"].as_u64().is_some());
    assert!(body["cpuPercent"].as_f64().is_some());

    let req = test::TestRequest::get().uri("/api/servers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["servers"][0]["id"], "arena");
    assert_eq!(body["servers"][0]["status"], "running");

    // Stop
    let req = test::TestRequest::post()
        .uri("/api/server/stop")
        .set_json(json!({ "server_id": "arena" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["forced"], false);

    // Delete
    let req = test::TestRequest::delete().uri("/api/server/arena").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "deleted");
}

#[actix_web::test]
async fn test_logs_endpoint() {
    let fixture = Fixture::new();
    install_server(fixture.servers(), "arena", SLEEPER);
    std::fs::write(
        fixture.servers().join("arena").join("console.log"),
        "one\ntwo\nthree\n",
    )
    .unwrap();
    let (_root, data) = split(fixture);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/server/arena/logs?lines=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["logs"], "two\nthree\n");

    let req = test::TestRequest::get()
        .uri("/api/server/arena/logs")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["logs"], "one\ntwo\nthree\n");

    let req = test::TestRequest::get()
        .uri("/api/server/nobody/logs")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_error_mapping() {
    let fixture = Fixture::new();
    let (_root, data) = split(fixture);
    let app = init_app!(data);

    let cases = [
        (
            test::TestRequest::post()
                .uri("/api/server/stop")
                .set_json(json!({ "server_id": "nobody" })),
            StatusCode::NOT_FOUND,
        ),
        (
            test::TestRequest::post()
                .uri("/api/server/start")
                .set_json(json!({ "server_id": "nobody" })),
            StatusCode::NOT_FOUND,
        ),
        (
            test::TestRequest::post()
                .uri("/api/server/start")
                .set_json(json!({ "server_id": ".." })),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::post()
                .uri("/api/server/create")
                .set_json(json!({ "server_id": "arena", "template_name": "../x.zip" })),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::post()
                .uri("/api/server/create")
                .set_json(json!({ "server_id": "arena", "template_name": "missing.zip" })),
            StatusCode::NOT_FOUND,
        ),
        (
            test::TestRequest::put()
                .uri("/api/server/arena/config")
                .set_json(json!(["not", "an", "object"])),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::delete().uri("/api/server/arena"),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (req, expected) in cases {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), expected);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], expected.as_u16());
        assert!(body["error"].as_str().is_some());
    }
}

#[actix_web::test]
async fn test_status_of_unknown_server() {
    let fixture = Fixture::new();
    let (_root, data) = split(fixture);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/server/nobody/status")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({ "status": "stopped", "cpuPercent": 0.0, "memoryBytes": 0 })
    );
}

#[actix_web::test]
async fn test_templates_endpoint() {
    let fixture = Fixture::new();
    fixture.install_default_template();
    let (_root, data) = split(fixture);
    let app = init_app!(data);

    let req = test::TestRequest::get().uri("/api/templates").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["templates"], json!(["default.zip"]));
}
