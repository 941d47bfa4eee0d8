// handlers/market.rs - /shoppingMall
//
// Catalogue and reviews are public to read. Sellers manage their own
// products, orders and shipments; customers place and track orders and
// review what they received.

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::database::models::{Order, Product, Review, Shipment};
use crate::database::Page;
use crate::middleware::{customer_guard, seller_guard, ApiResponse, ApiResult, Principal};
use crate::services::market::orders::{self, OrderCreate, OrderSearch};
use crate::services::market::products::{self, ProductCreate, ProductSearch, ProductUpdate};
use crate::services::market::reviews::{self, ReviewCreate, ReviewSearch, ReviewUpdate};
use crate::services::market::shipments::{self, ShipmentCreate, ShipmentSearch};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/shoppingMall/products", patch(search_products))
        .route("/shoppingMall/products/:product_id", get(get_product))
        .route("/shoppingMall/products/:product_id/reviews", patch(search_reviews));

    let seller = Router::new()
        .route("/shoppingMall/seller/products", post(create_product))
        .route("/shoppingMall/seller/products/:product_id", put(update_product).delete(remove_product))
        .route("/shoppingMall/seller/orders", patch(search_seller_orders))
        .route("/shoppingMall/seller/orders/:order_id/shipments", post(ship_order))
        .route("/shoppingMall/seller/shipments", patch(search_shipments))
        .route("/shoppingMall/seller/shipments/:shipment_id/deliver", put(deliver_shipment))
        .route_layer(middleware::from_fn_with_state(state.clone(), seller_guard));

    let customer = Router::new()
        .route("/shoppingMall/customer/orders", post(place_order).patch(search_own_orders))
        .route("/shoppingMall/customer/orders/:order_id", get(get_own_order))
        .route("/shoppingMall/customer/orders/:order_id/cancel", put(cancel_order))
        .route("/shoppingMall/customer/orders/:order_id/shipment", get(order_shipment))
        .route("/shoppingMall/customer/products/:product_id/reviews", post(create_review))
        .route("/shoppingMall/customer/reviews/:review_id", put(update_review).delete(remove_review))
        .route_layer(middleware::from_fn_with_state(state.clone(), customer_guard));

    public.merge(seller).merge(customer)
}

// ---- products ---------------------------------------------------------------

/// PATCH /shoppingMall/products
async fn search_products(State(state): State<AppState>, Json(input): Json<ProductSearch>) -> ApiResult<Page<Product>> {
    Ok(ApiResponse::success(products::search(&state.pool, input).await?))
}

/// GET /shoppingMall/products/:product_id
async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Product> {
    Ok(ApiResponse::success(products::get(&state.pool, id).await?))
}

/// POST /shoppingMall/seller/products
async fn create_product(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Json(input): Json<ProductCreate>,
) -> ApiResult<Product> {
    Ok(ApiResponse::created(products::create(&state.pool, &seller, input).await?))
}

/// PUT /shoppingMall/seller/products/:product_id
async fn update_product(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductUpdate>,
) -> ApiResult<Product> {
    Ok(ApiResponse::success(products::update(&state.pool, &seller, id, input).await?))
}

/// DELETE /shoppingMall/seller/products/:product_id
async fn remove_product(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    products::remove(&state.pool, &seller, id).await?;
    Ok(ApiResponse::no_content())
}

// ---- orders -----------------------------------------------------------------

/// POST /shoppingMall/customer/orders
async fn place_order(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Json(input): Json<OrderCreate>,
) -> ApiResult<Order> {
    Ok(ApiResponse::created(orders::place(&state.pool, &customer, input).await?))
}

/// PATCH /shoppingMall/customer/orders
async fn search_own_orders(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Json(input): Json<OrderSearch>,
) -> ApiResult<Page<Order>> {
    Ok(ApiResponse::success(orders::search_own(&state.pool, &customer, input).await?))
}

/// GET /shoppingMall/customer/orders/:order_id
async fn get_own_order(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    Ok(ApiResponse::success(orders::get_own(&state.pool, &customer, id).await?))
}

/// PUT /shoppingMall/customer/orders/:order_id/cancel
async fn cancel_order(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    Ok(ApiResponse::success(orders::cancel(&state.pool, &customer, id).await?))
}

/// GET /shoppingMall/customer/orders/:order_id/shipment
async fn order_shipment(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    Ok(ApiResponse::success(orders::shipment(&state.pool, &customer, id).await?))
}

/// PATCH /shoppingMall/seller/orders
async fn search_seller_orders(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Json(input): Json<OrderSearch>,
) -> ApiResult<Page<Order>> {
    Ok(ApiResponse::success(orders::search_for_seller(&state.pool, &seller, input).await?))
}

// ---- shipments --------------------------------------------------------------

/// POST /shoppingMall/seller/orders/:order_id/shipments
async fn ship_order(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ShipmentCreate>,
) -> ApiResult<Shipment> {
    Ok(ApiResponse::created(shipments::ship(&state.pool, &seller, order_id, input).await?))
}

/// PATCH /shoppingMall/seller/shipments
async fn search_shipments(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Json(input): Json<ShipmentSearch>,
) -> ApiResult<Page<Shipment>> {
    Ok(ApiResponse::success(shipments::search(&state.pool, &seller, input).await?))
}

/// PUT /shoppingMall/seller/shipments/:shipment_id/deliver
async fn deliver_shipment(
    State(state): State<AppState>,
    Extension(seller): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    Ok(ApiResponse::success(shipments::deliver(&state.pool, &seller, id).await?))
}

// ---- reviews ----------------------------------------------------------------

/// PATCH /shoppingMall/products/:product_id/reviews
async fn search_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ReviewSearch>,
) -> ApiResult<Page<Review>> {
    Ok(ApiResponse::success(reviews::search(&state.pool, product_id, input).await?))
}

/// POST /shoppingMall/customer/products/:product_id/reviews
async fn create_review(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ReviewCreate>,
) -> ApiResult<Review> {
    Ok(ApiResponse::created(reviews::create(&state.pool, &customer, product_id, input).await?))
}

/// PUT /shoppingMall/customer/reviews/:review_id
async fn update_review(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(input): Json<ReviewUpdate>,
) -> ApiResult<Review> {
    Ok(ApiResponse::success(reviews::update(&state.pool, &customer, id, input).await?))
}

/// DELETE /shoppingMall/customer/reviews/:review_id
async fn remove_review(
    State(state): State<AppState>,
    Extension(customer): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    reviews::remove(&state.pool, &customer, id).await?;
    Ok(ApiResponse::no_content())
}
