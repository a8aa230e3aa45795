// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! End-to-end tests of the HTTP API over an in-memory object store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use pi_delivery::api::{AppState, GetResponse, router};
use pi_delivery::cdf::Radix;
use pi_delivery::index::Index;
use pi_delivery::service::Service;
use pi_delivery::store::memory::MemoryBucket;
use pi_delivery::test_utils::{PI_DEC, PI_HEX, fixture_in};

const MAX_DIGITS: i64 = 1000;

fn test_router() -> Router {
    let bucket = Arc::new(MemoryBucket::default());
    let decimal = fixture_in(bucket.clone(), Radix::Decimal, &PI_DEC[..100], 50, None);
    let hexadecimal = fixture_in(bucket.clone(), Radix::Hexadecimal, &PI_HEX[..100], 50, None);

    let state = AppState {
        service: Arc::new(Service::new(bucket)),
        index: Arc::new(Index::from_sets(decimal.set, hexadecimal.set)),
        max_digits_per_request: MAX_DIGITS,
    };
    router(state)
}

async fn get(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (parts, body) = response.into_parts();
    let body = body.collect().await.unwrap().to_bytes().to_vec();
    (parts.status, parts.headers, body)
}

#[tokio::test]
async fn returns_digits_as_json() {
    // (radix, start, n, expected)
    let cases: &[(u32, i64, i64, &str)] = &[
        (10, 0, 0, ""),
        (10, 1, 0, ""),
        (10, 0, 1, "3"),
        (10, 1, 1, "1"),
        (10, 0, 50, "31415926535897932384626433832795028841971693993751"),
        (10, 1, 50, "14159265358979323846264338327950288419716939937510"),
        (10, 100, 5, "9"),
        (16, 0, 0, ""),
        (16, 0, 1, "3"),
        (16, 1, 1, "2"),
        (16, 0, 50, "3243f6a8885a308d313198a2e03707344a4093822299f31d00"),
        (16, 1, 50, "243f6a8885a308d313198a2e03707344a4093822299f31d008"),
    ];

    for &(radix, start, n, expected) in cases {
        let uri = if radix == 16 {
            format!("/?radix=16&start={start}&numberOfDigits={n}")
        } else {
            format!("/?start={start}&numberOfDigits={n}")
        };
        let (status, headers, body) = get(test_router(), &uri).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let response: GetResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.content, expected, "{uri}");
    }
}

#[tokio::test]
async fn default_parameters() {
    // radix 10, start 0, 100 digits.
    let (status, _, body) = get(test_router(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let response: GetResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.content, format!("3{}", &PI_DEC[..99]));
}

#[tokio::test]
async fn rejects_bad_requests() {
    // (query, expected fragment)
    let cases: &[(&str, &str)] = &[
        ("radix=42&start=0", "radix"),
        ("radix=2", "radix"),
        ("start=-1", "negative"),
        ("radix=abc", "invalid"),
        ("start=9999999999999999999999", "invalid"),
        ("start=9223372036854775807", "out of range"),
        ("start=101", "out of range"),
        ("start=123&numberOfDigits=-1", "negative"),
        ("radix=16&start=456&numberOfDigits=12x", "invalid"),
        ("radix=16&numberOfDigits=1001", "too big"),
    ];

    for &(query, fragment) in cases {
        let (status, headers, body) = get(test_router(), &format!("/?{query}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain", "{query}");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains(fragment), "{query}: {body}");
        assert!(!body.contains("\"content\""), "{query}: {body}");
    }
}

#[tokio::test]
async fn unknown_paths_return_404() {
    let (status, headers, body) = get(test_router(), "/NotFound").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "The requested url /NotFound was not found.\n"
    );
}

#[tokio::test]
async fn concatenated_requests_are_continuous() {
    let router = test_router();
    for (a, x, y) in [(0i64, 7i64, 13i64), (42, 8, 50), (99, 1, 1)] {
        let whole = content(&router, &format!("/?start={a}&numberOfDigits={}", x + y)).await;
        let first = content(&router, &format!("/?start={a}&numberOfDigits={x}")).await;
        let second = content(
            &router,
            &format!("/?start={}&numberOfDigits={y}", a + x),
        )
        .await;
        assert_eq!(format!("{first}{second}"), whole, "a {a} x {x} y {y}");
    }
}

async fn content(router: &Router, uri: &str) -> String {
    let (status, _, body) = get(router.clone(), uri).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    let response: GetResponse = serde_json::from_slice(&body).unwrap();
    response.content
}
