//! `DrsApi` against a throw-away metadata server on a loopback port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use wes_drs::api::{DrsApi, ObjectMetadataSource};
use wes_drs::{InputResolver, ResolveError};

async fn get_object(Path(id): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
    match id.as_str() {
        "abc123" => Ok(Json(json!({
            "id": "abc123",
            "access_methods": [
                {"type": "file", "access_url": {"url": "file:///data/abc123"}},
                {"type": "https", "access_id": "stream-abc"}
            ]
        }))),
        "garbled" => Ok(Json(json!({"access_methods": "not-a-list"}))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_metadata_server() -> SocketAddr {
    let app = Router::new().route("/ga4gh/drs/v1/objects/{id}", get(get_object));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> DrsApi {
    DrsApi::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetches_and_decodes_object_document() {
    let addr = spawn_metadata_server().await;
    let object = client()
        .fetch_object(&format!("http://{addr}/ga4gh/drs/v1/objects/abc123"))
        .await
        .unwrap();

    assert_eq!(object.id.as_deref(), Some("abc123"));
    assert_eq!(object.access_methods.len(), 2);
    assert_eq!(
        object.access_methods[0].access_url.as_ref().unwrap().url,
        "file:///data/abc123"
    );
    assert_eq!(object.access_methods[1].access_id.as_deref(), Some("stream-abc"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let addr = spawn_metadata_server().await;
    assert_matches!(
        client()
            .fetch_object(&format!("http://{addr}/ga4gh/drs/v1/objects/missing"))
            .await,
        Err(ResolveError::Api { status: 404, .. })
    );
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let addr = spawn_metadata_server().await;
    assert_matches!(
        client()
            .fetch_object(&format!("http://{addr}/ga4gh/drs/v1/objects/garbled"))
            .await,
        Err(ResolveError::InvalidMetadata { .. })
    );
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert_matches!(
        client()
            .fetch_object(&format!("http://{addr}/ga4gh/drs/v1/objects/abc123"))
            .await,
        Err(ResolveError::Unreachable { .. })
    );
}

#[tokio::test]
async fn resolver_over_http_uses_direct_url_for_loopback() {
    let addr = spawn_metadata_server().await;
    let resolver = InputResolver::new(Arc::new(client()), "ga4gh/drs/v1");

    let resolved = resolver
        .resolve_params(&json!({"input": format!("drs://127.0.0.1:{}/abc123", addr.port())}))
        .await
        .unwrap();

    assert_eq!(resolved["input"], "file:///data/abc123");
}
