//! Mock server helpers for the update endpoints
//!
//! Paths follow the published layout:
//! - `/<cmd>/<platform>.json`
//! - `/<cmd>/<from>/<to>/<platform>`
//! - `/<cmd>/<to>/<platform>.gz`

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::builders::*;
use super::constants::*;

pub fn metadata_path() -> String {
    format!("/{}/{}.json", CMD_NAME, TEST_PLATFORM)
}

pub fn patch_path(from: &str, to: &str) -> String {
    format!("/{}/{}/{}/{}", CMD_NAME, from, to, TEST_PLATFORM)
}

pub fn full_binary_path(to: &str) -> String {
    format!("/{}/{}/{}.gz", CMD_NAME, to, TEST_PLATFORM)
}

/// Serve metadata announcing `version` with `digest`
pub async fn mock_metadata(server: &MockServer, version: &str, digest: &[u8]) {
    Mock::given(method("GET"))
        .and(path(metadata_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string(metadata_json(version, digest)))
        .mount(server)
        .await;
}

/// Serve metadata that must never be requested
pub async fn mock_metadata_never_called(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(metadata_path()))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

/// Metadata endpoint answering with a raw body
pub async fn mock_metadata_body(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(metadata_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Metadata endpoint always failing with 500
pub async fn mock_failing_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(metadata_path()))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

/// Serve `patch` for `from -> to`, expecting exactly `calls` requests
pub async fn mock_patch(server: &MockServer, from: &str, to: &str, patch: Vec<u8>, calls: u64) {
    Mock::given(method("GET"))
        .and(path(patch_path(from, to)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(patch))
        .expect(calls)
        .mount(server)
        .await;
}

/// Patch endpoint failing with 500, expecting exactly `calls` requests
pub async fn mock_failing_patch(server: &MockServer, from: &str, to: &str, calls: u64) {
    Mock::given(method("GET"))
        .and(path(patch_path(from, to)))
        .respond_with(ResponseTemplate::new(500))
        .expect(calls)
        .mount(server)
        .await;
}

/// Serve a raw, already compressed body for `to`, expecting exactly `calls` requests
pub async fn mock_full_binary_body(server: &MockServer, to: &str, body: Vec<u8>, calls: u64) {
    Mock::given(method("GET"))
        .and(path(full_binary_path(to)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Serve `binary` gzip-compressed for `to`, expecting exactly `calls` requests
pub async fn mock_full_binary(server: &MockServer, to: &str, binary: &[u8], calls: u64) {
    Mock::given(method("GET"))
        .and(path(full_binary_path(to)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(binary)))
        .expect(calls)
        .mount(server)
        .await;
}
