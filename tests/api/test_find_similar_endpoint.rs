// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Find-similar endpoint tests
//!
//! Exercises the HTTP contract end to end with a deterministic extractor:
//! status codes, error bodies, result ordering and the self-match skip.

use crate::common::{
    catalog_file_name, find_similar_request, fixture, grid_image, multipart_body, png_bytes,
    send_json, PixelGridExtractor, GRID_DIMENSION, MAX_UPLOAD_BYTES,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_similarity_node::api::http_server::{create_app, AppState};
use image_similarity_node::catalog::Catalog;
use image_similarity_node::similarity::SimilarityService;
use image_similarity_node::vision::FeatureExtractor;
use mockall::mock;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

mock! {
    pub Extractor {}
    impl FeatureExtractor for Extractor {
        fn extract(&self, image: &DynamicImage) -> anyhow::Result<Vec<f32>>;
        fn dimension(&self) -> usize;
        fn name(&self) -> String;
    }
}

fn state_for(catalog: Arc<Catalog>, expose_distances: bool) -> AppState {
    let service = SimilarityService::new(Arc::new(PixelGridExtractor), catalog, MAX_UPLOAD_BYTES)
        .expect("fixture dimensions match");
    AppState::new(Arc::new(service)).with_distances(expose_distances)
}

fn upload(bytes: &[u8]) -> Request<Body> {
    find_similar_request(multipart_body("image", "query.png", bytes))
}

#[tokio::test]
async fn test_catalog_member_query_excludes_itself() {
    let fx = fixture(10);
    let app = create_app(state_for(fx.catalog.clone(), true));

    let query = png_bytes(&grid_image(3));
    let (status, json) = send_json(app, upload(&query)).await;

    assert_eq!(status, StatusCode::OK);
    let images = json["similar_images"].as_array().unwrap();
    assert_eq!(images.len(), 5);

    let matches = json["matches"].as_array().unwrap();
    assert_eq!(matches.len(), images.len());
    assert!(
        matches.iter().all(|m| m["index"] != 3),
        "exact match should be skipped"
    );
    assert!(matches
        .iter()
        .all(|m| m["filename"] != catalog_file_name(3).as_str()));

    let distances: Vec<f64> = matches
        .iter()
        .map(|m| m["distance"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(distances[0] > 0.0);
}

#[tokio::test]
async fn test_results_are_decodable_jpegs() {
    let fx = fixture(8);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let (status, json) = send_json(app, upload(&png_bytes(&grid_image(0)))).await;
    assert_eq!(status, StatusCode::OK);

    for encoded in json["similar_images"].as_array().unwrap() {
        let bytes = STANDARD.decode(encoded.as_str().unwrap()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "expected JPEG SOI marker");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }
}

#[tokio::test]
async fn test_matches_hidden_by_default() {
    let fx = fixture(8);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let (status, json) = send_json(app, upload(&png_bytes(&grid_image(1)))).await;

    assert_eq!(status, StatusCode::OK);
    let body = json.as_object().unwrap();
    assert!(body.contains_key("similar_images"));
    assert!(!body.contains_key("matches"));
}

#[tokio::test]
async fn test_small_catalog_returns_remaining_images() {
    let fx = fixture(3);
    let app = create_app(state_for(fx.catalog.clone(), true));

    let (status, json) = send_json(app, upload(&png_bytes(&grid_image(2)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["similar_images"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_identical_requests_identical_responses() {
    let fx = fixture(12);
    let app = create_app(state_for(fx.catalog.clone(), true));
    let query = png_bytes(&grid_image(7));

    let (_, first) = send_json(app.clone(), upload(&query)).await;
    let (_, second) = send_json(app, upload(&query)).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_image_field() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let body = multipart_body("photo", "query.png", &png_bytes(&grid_image(0)));
    let (status, json) = send_json(app, find_similar_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No image provided");
}

#[tokio::test]
async fn test_empty_image_field() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let (status, json) = send_json(app, upload(&[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Empty file provided");
}

#[tokio::test]
async fn test_non_image_upload() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let (status, json) = send_json(app, upload(b"definitely not an image payload")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid image format or corrupted file");
}

#[tokio::test]
async fn test_truncated_png_upload() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let bytes = png_bytes(&grid_image(0));
    let (status, json) = send_json(app, upload(&bytes[..bytes.len() / 2])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_json_body_rejected() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let request = Request::builder()
        .method("POST")
        .uri("/find-similar")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"image": "aGVsbG8="}"#))
        .unwrap();
    let (status, json) = send_json(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Expected a multipart/form-data body");
}

/// PNG of pseudo-random noise; noise does not compress, so size grows with `side`
fn noisy_png(side: u32) -> Vec<u8> {
    let mut noisy = RgbImage::new(side, side);
    for (i, pixel) in noisy.pixels_mut().enumerate() {
        let v = (i.wrapping_mul(2654435761) >> 7) as u8;
        *pixel = Rgb([v, v.wrapping_mul(3), v.wrapping_add(101)]);
    }
    let mut buffer = Cursor::new(Vec::new());
    noisy.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_oversized_image_rejected() {
    let fx = fixture(6);
    let service =
        SimilarityService::new(Arc::new(PixelGridExtractor), fx.catalog.clone(), 1024).unwrap();
    let app = create_app(AppState::new(Arc::new(service)));

    // Over the image cap but inside the request body limit
    let bytes = noisy_png(64);
    assert!(bytes.len() > 1024);

    let (status, json) = send_json(app, upload(&bytes)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_oversized_image_same_status_past_body_limit() {
    let fx = fixture(6);
    let service =
        SimilarityService::new(Arc::new(PixelGridExtractor), fx.catalog.clone(), 1024).unwrap();
    let app = create_app(AppState::new(Arc::new(service)));

    let small = noisy_png(64);
    let large = noisy_png(256);
    assert!(large.len() > 1024 + 64 * 1024);

    let (small_status, small_json) = send_json(app.clone(), upload(&small)).await;
    let (large_status, large_json) = send_json(app, upload(&large)).await;

    assert_eq!(small_status, StatusCode::BAD_REQUEST);
    assert_eq!(large_status, StatusCode::BAD_REQUEST);
    assert!(small_json["error"].as_str().unwrap().contains("too large"));
    assert!(large_json["error"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_all_catalog_files_missing() {
    let fx = fixture(8);
    for seed in 0..8 {
        std::fs::remove_file(fx.dir.path().join(catalog_file_name(seed))).unwrap();
    }
    let app = create_app(state_for(fx.catalog.clone(), false));

    let (status, json) = send_json(app.clone(), upload(&png_bytes(&grid_image(4)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No similar images found");

    // The server keeps serving after a failed request
    let ping = Request::builder()
        .uri("/ping")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(ping).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_some_catalog_files_missing() {
    let fx = fixture(10);
    let app = create_app(state_for(fx.catalog.clone(), true));
    let query = png_bytes(&grid_image(9));

    let (_, before) = send_json(app.clone(), upload(&query)).await;
    let removed: Vec<u64> = before["matches"].as_array().unwrap()[..2]
        .iter()
        .map(|m| m["index"].as_u64().unwrap())
        .collect();
    for index in &removed {
        std::fs::remove_file(fx.dir.path().join(catalog_file_name(*index as usize))).unwrap();
    }

    let (status, after) = send_json(app, upload(&query)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["similar_images"].as_array().unwrap().len(), 3);
    assert!(after["matches"]
        .as_array()
        .unwrap()
        .iter()
        .all(|m| !removed.contains(&m["index"].as_u64().unwrap())));
}

#[tokio::test]
async fn test_extractor_failure_hides_details() {
    let fx = fixture(6);
    let mut mock = MockExtractor::new();
    mock.expect_dimension().return_const(GRID_DIMENSION);
    mock.expect_name().return_const("failing".to_string());
    mock.expect_extract()
        .returning(|_| Err(anyhow::anyhow!("onnx session exploded at /opt/models")));

    let service = SimilarityService::new(Arc::new(mock), fx.catalog.clone(), MAX_UPLOAD_BYTES).unwrap();
    let app = create_app(AppState::new(Arc::new(service)));

    let (status, json) = send_json(app, upload(&png_bytes(&grid_image(0)))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert!(!json.to_string().contains("/opt/models"));
}

#[tokio::test]
async fn test_cors_header_present() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let mut request = upload(&png_bytes(&grid_image(0)));
    request
        .headers_mut()
        .insert("origin", "http://localhost:3000".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_get_not_allowed() {
    let fx = fixture(6);
    let app = create_app(state_for(fx.catalog.clone(), false));

    let request = Request::builder()
        .uri("/find-similar")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
