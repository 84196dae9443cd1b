//! Mock certificate, registry and blob endpoints

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Artifact body served for `name`
pub fn artifact_body(name: &str) -> Vec<u8> {
    format!("%PDF-1.4 certificate for {name}").into_bytes()
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "responseCode": "OK", "result": result }))
}

/// Mount a generate response for `name`
pub async fn mount_generate(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(path("/cert/v1/certs/generate"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "request": { "certificate": { "data": [{ "recipientName": name }] } }
        })))
        .respond_with(ok(json!({
            "response": [{
                "id": format!("gen-{name}"),
                "pdfUrl": format!("{}/docs/{name}.pdf", server.uri()),
                "accessCode": "A1B2",
                "jsonData": { "recipient": { "name": name } }
            }]
        })))
        .mount(server)
        .await;
}

/// Mount a generate rejection for `name`
pub async fn mount_generate_rejected(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(path("/cert/v1/certs/generate"))
        .and(body_partial_json(json!({
            "request": { "certificate": { "data": [{ "recipientName": name }] } }
        })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "responseCode": "CLIENT_ERROR", "result": null })),
        )
        .mount(server)
        .await;
}

/// Mount a registry add response for `name`
pub async fn mount_register(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(path("/certreg/v1/certs/add"))
        .and(body_partial_json(json!({ "request": { "id": format!("gen-{name}") } })))
        .respond_with(ok(json!({ "id": format!("reg-{name}") })))
        .mount(server)
        .await;
}

/// Mount a sign response for `name`, answering after `delay`
pub async fn mount_sign(server: &MockServer, name: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/certreg/v1/certs/download"))
        .and(body_partial_json(json!({
            "request": { "pdfUrl": format!("{}/docs/{name}.pdf", server.uri()) }
        })))
        .respond_with(
            ok(json!({ "signedUrl": format!("{}/blobs/{name}.pdf?sig=xyz", server.uri()) }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mount the artifact download for `name`
pub async fn mount_blob(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/blobs/{name}.pdf")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(artifact_body(name)))
        .mount(server)
        .await;
}

/// Mount every stage for `name` to succeed
pub async fn mount_happy_record(server: &MockServer, name: &str) {
    mount_generate(server, name).await;
    mount_register(server, name).await;
    mount_sign(server, name, Duration::ZERO).await;
    mount_blob(server, name).await;
}
