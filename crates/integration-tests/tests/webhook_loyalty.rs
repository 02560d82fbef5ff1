//! Order webhooks against a running storefront: mirroring, idempotent
//! redelivery and loyalty points.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use souq_core::loyalty::points_for_total;
use souq_integration_tests::{deliver_webhook, get_json, registered_customer, storefront_url};

fn order(number: &str, email: &str, total: &str) -> Value {
    json!({
        "id": number,
        "order_number": number,
        "email": email,
        "total_price": total,
        "currency": "EGP",
        "financial_status": "paid",
        "fulfillment_status": null,
        "gateway": "cash_on_delivery",
        "line_items": [
            { "product_id": 10, "title": "Linen Kaftan", "quantity": 1, "price": total }
        ]
    })
}

fn unique_number() -> String {
    (Uuid::new_v4().as_u128() % 1_000_000_000).to_string()
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_create_awards_points_once() {
    let (client, email) = registered_customer().await;
    let number = unique_number();
    let payload = order(&number, &email, "1250.00");

    let (status, body) = deliver_webhook("storefront", "orders/create", &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "created");

    let (status, body) = deliver_webhook("storefront", "orders/create", &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unchanged");

    let (status, loyalty) =
        get_json(&client, &format!("{}/api/account/loyalty", storefront_url())).await;
    assert_eq!(status, StatusCode::OK);
    let expected = points_for_total(Decimal::new(125_000, 2));
    assert_eq!(loyalty["balance"], expected);
    assert_eq!(loyalty["transactions"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_cancel_reverses_points() {
    let (client, email) = registered_customer().await;
    let number = unique_number();
    let payload = order(&number, &email, "500.00");

    deliver_webhook("catalog", "orders/create", &payload).await;
    let (status, body) = deliver_webhook("catalog", "orders/cancelled", &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "updated");
    assert_eq!(body["status"], "cancelled");

    let (_, loyalty) =
        get_json(&client, &format!("{}/api/account/loyalty", storefront_url())).await;
    assert_eq!(loyalty["balance"], 0);

    let (_, orders) =
        get_json(&client, &format!("{}/api/account/orders", storefront_url())).await;
    let mirrored = orders
        .as_array()
        .and_then(|o| o.iter().find(|o| o["external_order_number"] == number.as_str()))
        .cloned()
        .unwrap_or(Value::Null);
    assert_eq!(mirrored["status"], "cancelled");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_same_number_from_two_sources_is_two_orders() {
    let (_client, email) = registered_customer().await;
    let number = unique_number();
    let payload = order(&number, &email, "100.00");

    let (_, first) = deliver_webhook("storefront", "orders/create", &payload).await;
    let (_, second) = deliver_webhook("catalog", "orders/create", &payload).await;

    assert_eq!(first["result"], "created");
    assert_eq!(second["result"], "created");
    assert_ne!(first["order_id"], second["order_id"]);
}
