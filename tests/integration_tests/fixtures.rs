//! Test fixtures for integration tests
//!
//! Provides Flickr-shaped JSON bodies and helpers to mount them on a
//! wiremock server.

use fetchr::config::{Config, FailureMode};
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";
pub const USER_ID: &str = "48475357@N00";

/// Photo id for the `index`th photo on `page`
pub fn photo_id(page: usize, index: usize) -> String {
    format!("1469{page:02}{index:04}")
}

pub fn secret_for(id: &str) -> String {
    format!("sec{id}")
}

fn summary_json(id: &str) -> Value {
    json!({
        "id": id,
        "owner": USER_ID,
        "secret": secret_for(id),
        "server": "3916",
        "farm": 4,
        "title": "",
        "ispublic": 1,
        "isfriend": 0,
        "isfamily": 0,
        "originalsecret": format!("orig{id}"),
        "originalformat": "jpg"
    })
}

/// Body of a successful `flickr.photos.search` call
pub fn search_page_json(page: usize, pages: usize, ids: &[String]) -> Value {
    json!({
        "photos": {
            "page": page,
            "pages": pages,
            "perpage": 500,
            "total": ids.len().to_string(),
            "photo": ids.iter().map(|id| summary_json(id)).collect::<Vec<_>>()
        },
        "stat": "ok"
    })
}

/// Body of a successful `flickr.photos.getInfo` call
pub fn photo_info_json(id: &str) -> Value {
    json!({
        "photo": {
            "id": id,
            "secret": secret_for(id),
            "server": "3916",
            "farm": 4,
            "dateuploaded": "1407690835",
            "originalsecret": format!("orig{id}"),
            "originalformat": "jpg",
            "owner": {"nsid": USER_ID, "username": "pete-t"},
            "title": {"_content": format!("Photo {id}")},
            "description": {"_content": "Olympus digital camera"},
            "media": "photo"
        },
        "stat": "ok"
    })
}

/// Body of a failed API call
pub fn fail_json(code: u32, message: &str) -> Value {
    json!({"stat": "fail", "code": code, "message": message})
}

/// Mount one search response per page; each page must be requested exactly once
///
/// Returns every photo id in listing order.
pub async fn mount_pages(server: &MockServer, sizes: &[usize]) -> Vec<String> {
    let pages = sizes.len();
    let mut all_ids = Vec::new();

    for (i, size) in sizes.iter().enumerate() {
        let page = i + 1;
        let ids: Vec<String> = (0..*size).map(|n| photo_id(page, n)).collect();

        Mock::given(method("GET"))
            .and(query_param("method", "flickr.photos.search"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(search_page_json(page, pages, &ids)),
            )
            .expect(1)
            .mount(server)
            .await;

        all_ids.extend(ids);
    }

    all_ids
}

/// Mount a Flickr-style empty photostream (`pages: 0`)
pub async fn mount_empty_stream(server: &MockServer) {
    Mock::given(method("GET"))
        .and(query_param("method", "flickr.photos.search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(1, 0, &[])))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount detail responses; ids in `failing` get an API failure instead
pub async fn mount_details(server: &MockServer, ids: &[String], failing: &[&str]) {
    for id in ids {
        let response = if failing.contains(&id.as_str()) {
            ResponseTemplate::new(200).set_body_json(fail_json(1, "Photo not found"))
        } else {
            ResponseTemplate::new(200).set_body_json(photo_info_json(id))
        };

        Mock::given(method("GET"))
            .and(query_param("method", "flickr.photos.getInfo"))
            .and(query_param("photo_id", id.as_str()))
            .and(query_param("secret", secret_for(id)))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

/// Configuration pointing at the mock server
pub fn test_config(
    base_url: &str,
    output: &Path,
    workers: usize,
    failure_mode: FailureMode,
) -> Config {
    let mut config = Config::default();
    config.flickr.api_key = API_KEY.to_string();
    config.flickr.user_id = USER_ID.to_string();
    config.flickr.base_url = base_url.to_string();
    config.flickr.request_timeout_secs = 5;
    config.output.path = output.to_path_buf();
    config.pipeline.workers = workers;
    config.pipeline.failure_mode = failure_mode;
    config
}
