mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::{Session, TestServer};

async fn list_product(server: &TestServer, seller: &Session, name: &str, price_cents: i64, stock: i64) -> Result<Value> {
    let (status, body) = server
        .call(
            Method::POST,
            "/shoppingMall/seller/products",
            Some(&seller.access),
            Some(json!({
                "name": name,
                "description": format!("{} for sale", name),
                "category": "home",
                "price_cents": price_cents,
                "stock": stock,
            })),
        )
        .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "list product failed with {}: {}", status, body);
    Ok(body)
}

async fn stock_of(server: &TestServer, product: &Value) -> Result<i64> {
    let (_, body) = server
        .call(
            Method::GET,
            &format!("/shoppingMall/products/{}", product["id"].as_str().unwrap_or_default()),
            None,
            None,
        )
        .await?;
    body["stock"].as_i64().ok_or_else(|| anyhow::anyhow!("no stock in {}", body))
}

#[tokio::test]
async fn order_ship_deliver_review() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seller = server.join("seller", "shop").await?;
    let customer = server.join("customer", "buyer").await?;
    let product = list_product(&server, &seller, "Teapot", 2_400, 3).await?;

    let (status, order) = server
        .call(
            Method::POST,
            "/shoppingMall/customer/orders",
            Some(&customer.access),
            Some(json!({ "product_id": product["id"], "quantity": 2 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(order["total_cents"], 4_800);
    assert_eq!(stock_of(&server, &product).await?, 1);

    let (status, _) = server
        .call(
            Method::POST,
            "/shoppingMall/customer/orders",
            Some(&customer.access),
            Some(json!({ "product_id": product["id"], "quantity": 2 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(stock_of(&server, &product).await?, 1);

    let review_url = format!("/shoppingMall/customer/products/{}/reviews", product["id"].as_str().unwrap_or_default());
    let review = json!({ "rating": 5, "body": "Pours well" });
    let (status, _) = server
        .call(Method::POST, &review_url, Some(&customer.access), Some(review.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let order_id = order["id"].as_str().unwrap_or_default().to_string();
    let (status, shipment) = server
        .call(
            Method::POST,
            &format!("/shoppingMall/seller/orders/{}/shipments", order_id),
            Some(&seller.access),
            Some(json!({ "carrier": "postal", "tracking_number": "PX-42" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", shipment);

    let (status, body) = server
        .call(
            Method::GET,
            &format!("/shoppingMall/customer/orders/{}/shipment", order_id),
            Some(&customer.access),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracking_number"], "PX-42");

    let (status, _) = server
        .call(
            Method::PUT,
            &format!("/shoppingMall/seller/shipments/{}/deliver", shipment["id"].as_str().unwrap_or_default()),
            Some(&seller.access),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server
        .call(Method::GET, &format!("/shoppingMall/customer/orders/{}", order_id), Some(&customer.access), None)
        .await?;
    assert_eq!(body["status"], "delivered");

    let (status, created) = server
        .call(Method::POST, &review_url, Some(&customer.access), Some(review.clone()))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server
        .call(Method::POST, &review_url, Some(&customer.access), Some(review))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .call(
            Method::PATCH,
            &format!("/shoppingMall/products/{}/reviews", product["id"].as_str().unwrap_or_default()),
            None,
            Some(json!({ "min_rating": 4 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], created["id"]);
    Ok(())
}

#[tokio::test]
async fn cancel_restores_stock() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seller = server.join("seller", "shop").await?;
    let customer = server.join("customer", "buyer").await?;
    let product = list_product(&server, &seller, "Lamp", 3_000, 5).await?;

    let (_, order) = server
        .call(
            Method::POST,
            "/shoppingMall/customer/orders",
            Some(&customer.access),
            Some(json!({ "product_id": product["id"], "quantity": 5 })),
        )
        .await?;
    assert_eq!(stock_of(&server, &product).await?, 0);

    let cancel_url = format!("/shoppingMall/customer/orders/{}/cancel", order["id"].as_str().unwrap_or_default());
    let (status, body) = server.call(Method::PUT, &cancel_url, Some(&customer.access), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(stock_of(&server, &product).await?, 5);

    let (status, _) = server.call(Method::PUT, &cancel_url, Some(&customer.access), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn sellers_see_only_their_own() -> Result<()> {
    let server = TestServer::spawn().await?;
    let seller = server.join("seller", "shop").await?;
    let rival = server.join("seller", "rival").await?;
    let customer = server.join("customer", "buyer").await?;
    let product = list_product(&server, &seller, "Stool", 1_500, 2).await?;
    let product_url = format!("/shoppingMall/seller/products/{}", product["id"].as_str().unwrap_or_default());

    let (status, _) = server
        .call(Method::PUT, &product_url, Some(&rival.access), Some(json!({ "price_cents": 1 })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // customers cannot use seller routes
    let (status, _) = server
        .call(Method::PUT, &product_url, Some(&customer.access), Some(json!({ "price_cents": 1 })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    server
        .call(
            Method::POST,
            "/shoppingMall/customer/orders",
            Some(&customer.access),
            Some(json!({ "product_id": product["id"], "quantity": 1 })),
        )
        .await?;

    let (_, mine) = server.call(Method::PATCH, "/shoppingMall/seller/orders", Some(&seller.access), Some(json!({}))).await?;
    assert_eq!(mine["pagination"]["records"], 1);
    let (_, theirs) = server.call(Method::PATCH, "/shoppingMall/seller/orders", Some(&rival.access), Some(json!({}))).await?;
    assert_eq!(theirs["pagination"]["records"], 0);

    let (status, body) = server
        .call(
            Method::PATCH,
            "/shoppingMall/products",
            None,
            Some(json!({ "min_price": 1_000, "max_price": 2_000, "seller_id": seller.id })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);
    Ok(())
}
