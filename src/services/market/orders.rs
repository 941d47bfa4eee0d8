use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{Order, OrderStatus, Product, ProductStatus, Shipment};
use crate::database::{find_in_404, Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::CreatedRange;

const SORTABLE: &[&str] = &["created_at", "updated_at", "total_cents", "quantity", "status"];

#[derive(Debug, Deserialize)]
pub struct OrderCreate {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderSearch {
    pub status: Option<OrderStatus>,
    pub product_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Reserve stock and record the order in one transaction. The conditional
/// decrement is the transaction's first statement, so it takes the write
/// lock up front and concurrent orders can never drive stock negative.
pub async fn place(pool: &SqlitePool, customer: &Principal, input: OrderCreate) -> Result<Order, ApiError> {
    if input.quantity < 1 {
        return Err(ApiError::invalid_field("quantity", "quantity must be at least 1"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let reserved = sqlx::query_as::<_, Product>(
        "UPDATE market_products SET stock = stock - ?1, updated_at = ?2 \
         WHERE id = ?3 AND status = ?4 AND stock >= ?1 AND deleted_at IS NULL RETURNING *",
    )
    .bind(input.quantity)
    .bind(now)
    .bind(input.product_id)
    .bind(ProductStatus::Active)
    .fetch_optional(&mut *tx)
    .await?;

    let product = match reserved {
        Some(product) => product,
        None => {
            let product = find_in_404::<Product, _>(&mut *tx, input.product_id).await?;
            if product.status != ProductStatus::Active {
                return Err(ApiError::bad_request("Product is not available for purchase"));
            }
            warn!(
                "Order by '{}' for {} x {} rejected: {} in stock",
                customer.username, input.quantity, product.id, product.stock
            );
            return Err(ApiError::conflict("Insufficient stock"));
        }
    };

    let total_cents = product
        .price_cents
        .checked_mul(input.quantity)
        .ok_or_else(|| ApiError::invalid_field("quantity", "order total is too large"))?;

    let order = Order {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        seller_id: product.seller_id,
        product_id: product.id,
        quantity: input.quantity,
        unit_price_cents: product.price_cents,
        total_cents,
        status: OrderStatus::Placed,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO market_orders (id, customer_id, seller_id, product_id, quantity, unit_price_cents, total_cents, \
         status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(order.id)
    .bind(order.customer_id)
    .bind(order.seller_id)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.unit_price_cents)
    .bind(order.total_cents)
    .bind(order.status)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Customer '{}' placed order {}", customer.username, order.id);
    Ok(order)
}

pub async fn search_own(pool: &SqlitePool, customer: &Principal, input: OrderSearch) -> Result<Page<Order>, ApiError> {
    search_by(pool, "customer_id", customer.id, input).await
}

/// Orders for the seller's own products.
pub async fn search_for_seller(pool: &SqlitePool, seller: &Principal, input: OrderSearch) -> Result<Page<Order>, ApiError> {
    search_by(pool, "seller_id", seller.id, input).await
}

async fn search_by(pool: &SqlitePool, column: &str, account_id: Uuid, input: OrderSearch) -> Result<Page<Order>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Order>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq(column, account_id)
        .eq_opt("status", input.status)
        .eq_opt("product_id", input.product_id);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get_own(pool: &SqlitePool, customer: &Principal, id: Uuid) -> Result<Order, ApiError> {
    let order = Repository::<Order>::new(pool).find_404(id).await?;
    if order.customer_id != customer.id {
        warn!("Customer '{}' requested order {} placed by someone else", customer.username, id);
        return Err(ApiError::forbidden("You can only view your own orders"));
    }
    Ok(order)
}

/// Cancel a `placed` order and return its quantity to stock.
pub async fn cancel(pool: &SqlitePool, customer: &Principal, id: Uuid) -> Result<Order, ApiError> {
    let mut order = get_own(pool, customer, id).await?;
    if order.status != OrderStatus::Placed {
        return Err(ApiError::bad_request(format!(
            "Only placed orders can be cancelled, this one is {}",
            order.status
        )));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    // status guard in the WHERE clause loses the race against a concurrent ship
    let cancelled = sqlx::query("UPDATE market_orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
        .bind(OrderStatus::Cancelled)
        .bind(now)
        .bind(order.id)
        .bind(OrderStatus::Placed)
        .execute(&mut *tx)
        .await?;
    if cancelled.rows_affected() == 0 {
        return Err(ApiError::bad_request("Only placed orders can be cancelled"));
    }

    sqlx::query("UPDATE market_products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
        .bind(order.quantity)
        .bind(now)
        .bind(order.product_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Customer '{}' cancelled order {}", customer.username, order.id);
    order.status = OrderStatus::Cancelled;
    order.updated_at = now;
    Ok(order)
}

/// The shipment for one of the customer's orders.
pub async fn shipment(pool: &SqlitePool, customer: &Principal, order_id: Uuid) -> Result<Shipment, ApiError> {
    let order = get_own(pool, customer, order_id).await?;
    let repo = Repository::<Shipment>::new(pool);
    let mut filter = repo.filter()?;
    filter.eq("order_id", order.id);
    repo.select_one(filter)
        .await?
        .ok_or_else(|| ApiError::not_found("Order has not shipped yet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::market::{fixtures, products};
    use crate::services::test_support;

    #[tokio::test]
    async fn placing_reserves_stock_and_prices_the_order() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Mug", 1_250, 5).await;

        let order = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 3 }).await.unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.seller_id, seller.id);
        assert_eq!(order.total_cents, 3_750);
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn insufficient_stock_is_a_conflict_and_changes_nothing() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Rare vase", 90_000, 1).await;

        let err = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 2 }).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 1);

        let page = search_own(&pool, &customer, OrderSearch::default()).await.unwrap();
        assert_eq!(page.pagination.records, 0);
    }

    #[tokio::test]
    async fn invalid_quantity_and_inactive_product() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Kettle", 3_000, 10).await;

        let err = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 0 }).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { .. }));

        products::update(
            &pool,
            &seller,
            product.id,
            products::ProductUpdate { status: Some(ProductStatus::Inactive), ..Default::default() },
        )
        .await
        .unwrap();
        let err = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 1 }).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn cancel_restores_stock_once() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Chair", 4_500, 4).await;
        let order = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 4 }).await.unwrap();
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 0);

        let cancelled = cancel(&pool, &customer, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 4);

        assert!(matches!(cancel(&pool, &customer, order.id).await.unwrap_err(), ApiError::BadRequest(_)));
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn orders_are_visible_to_their_customer_and_seller_only() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let other_seller = test_support::principal(&pool, Role::Seller, "other_seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let stranger = test_support::principal(&pool, Role::Customer, "stranger").await;
        let product = fixtures::product(&pool, &seller, "Desk", 20_000, 3).await;
        let order = place(&pool, &customer, OrderCreate { product_id: product.id, quantity: 1 }).await.unwrap();

        assert!(matches!(get_own(&pool, &stranger, order.id).await.unwrap_err(), ApiError::Forbidden(_)));
        assert_eq!(search_for_seller(&pool, &seller, OrderSearch::default()).await.unwrap().pagination.records, 1);
        assert_eq!(search_for_seller(&pool, &other_seller, OrderSearch::default()).await.unwrap().pagination.records, 0);

        let err = shipment(&pool, &customer, order.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_sell_exactly_the_stock() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_support::file_pool(&dir).await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let product = fixtures::product(&pool, &seller, "Lamp", 2_000, 10).await;

        let mut handles = Vec::new();
        for i in 0..24 {
            let customer = test_support::principal(&pool, Role::Customer, &format!("customer{}", i)).await;
            let pool = pool.clone();
            let product_id = product.id;
            handles.push(tokio::spawn(async move {
                place(&pool, &customer, OrderCreate { product_id, quantity: 1 }).await
            }));
        }

        let (mut placed, mut sold_out) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(ApiError::Conflict(_)) => sold_out += 1,
                Err(other) => panic!("unexpected order failure: {:?}", other),
            }
        }
        assert_eq!(placed, 10);
        assert_eq!(sold_out, 14);
        assert_eq!(products::get(&pool, product.id).await.unwrap().stock, 0);
        pool.close().await;
    }
}
