//! Back-office product management against a running admin service.

use reqwest::{StatusCode, multipart};
use serde_json::{Value, json};
use uuid::Uuid;

use souq_integration_tests::{admin_client, admin_url, client, get_json};

/// Smallest valid PNG (1x1, transparent).
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

async fn create_product(client: &reqwest::Client) -> Value {
    let slug = format!("it-{}", Uuid::new_v4().simple());
    let resp = client
        .post(format!("{}/api/products", admin_url()))
        .json(&json!({
            "slug": slug,
            "title": "Integration Abaya",
            "price": "899.00",
            "sizes": ["S", "M"],
            "stock": 4,
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Invalid product body")
}

#[tokio::test]
#[ignore = "Requires running admin service"]
async fn test_requires_session() {
    let (status, body) = get_json(&client(), &format!("{}/api/products", admin_url())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Sign in required");
}

#[tokio::test]
#[ignore = "Requires running admin service and an admin account"]
async fn test_product_crud() {
    let client = admin_client().await;
    let product = create_product(&client).await;
    let url = format!("{}/api/products/{}", admin_url(), product["id"]);

    let (status, detail) = get_json(&client, &url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Integration Abaya");
    assert_eq!(detail["images"].as_array().map(Vec::len), Some(0));

    let resp = client.delete(&url).send().await.expect("Failed to delete");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, _) = get_json(&client, &url).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running admin service and an admin account"]
async fn test_bad_secondary_image_keeps_main() {
    let client = admin_client().await;
    let product = create_product(&client).await;
    let base = format!("{}/api/products/{}", admin_url(), product["id"]);

    let form = multipart::Form::new()
        .part(
            "main",
            multipart::Part::bytes(PIXEL_PNG)
                .file_name("main.png")
                .mime_str("image/png")
                .expect("valid mime"),
        )
        .part(
            "additional",
            multipart::Part::bytes(b"%PDF-1.7".as_slice())
                .file_name("size-guide.pdf")
                .mime_str("application/pdf")
                .expect("valid mime"),
        );

    let resp = client
        .post(format!("{base}/images"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload");
    assert_eq!(resp.status(), StatusCode::OK);

    let report: Value = resp.json().await.expect("Invalid report");
    assert_eq!(report["stored"], 1);
    assert_eq!(report["failed"], 1);

    let (_, detail) = get_json(&client, &base).await;
    let images = detail["images"].as_array().cloned().unwrap_or_default();
    assert_eq!(images.len(), 1);
    assert_eq!(images.first().map(|i| i["is_main"].clone()), Some(json!(true)));

    client.delete(&base).send().await.expect("Failed to clean up");
}
