use sensifai::{Client, ClientBuilder, SensifaiError, UploadResult, UploadedFile};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    ClientBuilder::new()
        .token("tok")
        .base_url(format!("{}/api/", server.uri()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn upload_by_url_returns_accepted_tasks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "variables": { "token": "tok", "urls": ["https://example.com/a.jpg"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "uploadByUrl": {
                "result": true,
                "error": "",
                "succeed": [{ "file": "a.jpg", "taskId": "T123" }],
                "cannotUpload": []
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .upload_by_url(&["https://example.com/a.jpg"])
        .await
        .unwrap();

    assert_eq!(
        result,
        UploadResult {
            error_message: String::new(),
            success: true,
            succeeded: vec![UploadedFile {
                source_file: "a.jpg".into(),
                task_id: "T123".into(),
            }],
            rejected: vec![],
        }
    );
    assert!(result.accounts_for(&["https://example.com/a.jpg"]));
}

#[tokio::test]
async fn upload_by_url_reports_partial_acceptance_without_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "uploadByUrl": {
                "result": false,
                "error": "some urls could not be fetched",
                "succeed": [{ "file": "a.jpg", "taskId": "T1" }],
                "cannotUpload": ["https://example.com/missing.png"]
            } }
        })))
        .mount(&server)
        .await;

    let inputs = ["https://example.com/a.jpg", "https://example.com/missing.png"];
    let result = client_for(&server).upload_by_url(&inputs).await.unwrap();

    assert!(!result.success);
    assert!(!result.is_fully_accepted());
    assert_eq!(result.rejected, vec!["https://example.com/missing.png"]);
    assert!(result.accounts_for(&inputs));
}

#[tokio::test]
async fn upload_by_file_sends_graphql_multipart_request() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.jpg");
    let second = dir.path().join("clip.mp4");
    std::fs::write(&first, b"JPEG-BYTES").unwrap();
    std::fs::write(&second, b"MP4-BYTES").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "uploadByFile": {
                "result": true,
                "error": "",
                "succeed": [
                    { "file": "a.jpg", "taskId": "T1" },
                    { "file": "clip.mp4", "taskId": "T2" }
                ],
                "cannotUpload": []
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let paths = [first.clone(), second.clone()];
    let result = client_for(&server).upload_by_file(&paths).await.unwrap();

    assert!(result.is_fully_accepted());
    assert_eq!(result.task_id_for("a.jpg"), Some("T1"));
    assert_eq!(result.task_id_for("clip.mp4"), Some("T2"));
    assert!(result.accounts_for(&[
        first.to_str().unwrap(),
        second.to_str().unwrap()
    ]));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);

    let operations = body.find(r#"name="operations""#).unwrap();
    let map = body.find(r#"name="map""#).unwrap();
    let file0 = body.find(r#"name="0"; filename="a.jpg""#).unwrap();
    let file1 = body.find(r#"name="1"; filename="clip.mp4""#).unwrap();
    assert!(operations < map && map < file0 && file0 < file1);

    assert!(body.contains(r#""files":[null,null]"#));
    assert!(body.contains(r#""token":"tok""#));
    assert!(body.contains(r#"{"0":["variables.files.0"],"1":["variables.files.1"]}"#));
    assert!(body.contains("JPEG-BYTES"));
    assert!(body.contains("MP4-BYTES"));
}

#[tokio::test]
async fn upload_by_file_surfaces_service_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.jpg");
    std::fs::write(&file, b"bytes").unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "data": { "uploadByFile": { "error": "quota exceeded" } }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).upload_by_file(&[file]).await.unwrap_err();

    match err {
        SensifaiError::Service {
            status_code,
            message,
            body,
        } => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "quota exceeded");
            assert!(body.is_some());
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_by_file_with_missing_path_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("a.jpg");
    std::fs::write(&present, b"bytes").unwrap();
    let missing = dir.path().join("missing.jpg");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_by_file(&[present, missing.clone()])
        .await
        .unwrap_err();

    match err {
        SensifaiError::Io { path, source } => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected io error, got {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_inputs_are_rejected_locally() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let no_paths: [&str; 0] = [];
    let err = client.upload_by_file(&no_paths).await.unwrap_err();
    assert!(matches!(err, SensifaiError::InvalidInput { .. }));

    let err = client.upload_by_url(&no_paths).await.unwrap_err();
    assert!(matches!(err, SensifaiError::InvalidInput { .. }));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_is_an_http_error() {
    let client = ClientBuilder::new()
        .token("tok")
        .base_url("http://127.0.0.1:9/api/")
        .build()
        .unwrap();

    let err = client
        .upload_by_url(&["https://example.com/a.jpg"])
        .await
        .unwrap_err();

    assert!(matches!(err, SensifaiError::Http(_)));
}
