use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Order, OrderStatus, Shipment, ShipmentStatus};
use crate::database::{find_in_404, Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "shipped_at", "delivered_at", "carrier", "status"];

#[derive(Debug, Deserialize)]
pub struct ShipmentCreate {
    pub carrier: String,
    pub tracking_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipmentSearch {
    pub status: Option<ShipmentStatus>,
    pub carrier: Option<String>,
    pub order_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Ship a `placed` order. The order moves to `shipped` in the same
/// transaction that records the shipment; the guarded status change runs
/// first so two shipments of one order cannot both succeed.
pub async fn ship(pool: &SqlitePool, seller: &Principal, order_id: Uuid, input: ShipmentCreate) -> Result<Shipment, ApiError> {
    let carrier = required_text("carrier", &input.carrier, 64)?;
    let tracking_number = required_text("tracking_number", &input.tracking_number, 128)?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let shipped = sqlx::query_as::<_, Order>(
        "UPDATE market_orders SET status = ?1, updated_at = ?2 \
         WHERE id = ?3 AND seller_id = ?4 AND status = ?5 RETURNING *",
    )
    .bind(OrderStatus::Shipped)
    .bind(now)
    .bind(order_id)
    .bind(seller.id)
    .bind(OrderStatus::Placed)
    .fetch_optional(&mut *tx)
    .await?;

    let order = match shipped {
        Some(order) => order,
        None => {
            let order = find_in_404::<Order, _>(&mut *tx, order_id).await?;
            ensure_owner(order.seller_id, seller, "order")?;
            return Err(ApiError::bad_request(format!("Only placed orders can be shipped, this one is {}", order.status)));
        }
    };

    let shipment = Shipment {
        id: Uuid::new_v4(),
        order_id: order.id,
        seller_id: seller.id,
        carrier,
        tracking_number,
        status: ShipmentStatus::InTransit,
        shipped_at: now,
        delivered_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO market_shipments (id, order_id, seller_id, carrier, tracking_number, status, shipped_at, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
    )
    .bind(shipment.id)
    .bind(shipment.order_id)
    .bind(shipment.seller_id)
    .bind(&shipment.carrier)
    .bind(&shipment.tracking_number)
    .bind(shipment.status)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Seller '{}' shipped order {} via {}", seller.username, order.id, shipment.carrier);
    Ok(shipment)
}

pub async fn search(pool: &SqlitePool, seller: &Principal, input: ShipmentSearch) -> Result<Page<Shipment>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Shipment>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq("seller_id", seller.id)
        .eq_opt("status", input.status)
        .eq_opt("carrier", input.carrier)
        .eq_opt("order_id", input.order_id);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "shipped_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

/// Mark an in-transit shipment delivered, which also delivers its order.
pub async fn deliver(pool: &SqlitePool, seller: &Principal, id: Uuid) -> Result<Shipment, ApiError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let delivered = sqlx::query_as::<_, Shipment>(
        "UPDATE market_shipments SET status = ?1, delivered_at = ?2, updated_at = ?2 \
         WHERE id = ?3 AND seller_id = ?4 AND status = ?5 RETURNING *",
    )
    .bind(ShipmentStatus::Delivered)
    .bind(now)
    .bind(id)
    .bind(seller.id)
    .bind(ShipmentStatus::InTransit)
    .fetch_optional(&mut *tx)
    .await?;

    let shipment = match delivered {
        Some(shipment) => shipment,
        None => {
            let shipment = find_in_404::<Shipment, _>(&mut *tx, id).await?;
            ensure_owner(shipment.seller_id, seller, "shipment")?;
            return Err(ApiError::bad_request("Shipment was already delivered"));
        }
    };

    sqlx::query("UPDATE market_orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(OrderStatus::Delivered)
        .bind(now)
        .bind(shipment.order_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Seller '{}' delivered shipment {}", seller.username, shipment.id);
    Ok(shipment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::market::{fixtures, orders};
    use crate::services::test_support;

    fn parcel() -> ShipmentCreate {
        ShipmentCreate {
            carrier: "postal".into(),
            tracking_number: "PX-1001".into(),
        }
    }

    #[tokio::test]
    async fn ship_then_deliver_moves_the_order_along() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Rug", 15_000, 2).await;
        let order = orders::place(&pool, &customer, orders::OrderCreate { product_id: product.id, quantity: 1 })
            .await
            .unwrap();

        let shipment = ship(&pool, &seller, order.id, parcel()).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        assert_eq!(orders::get_own(&pool, &customer, order.id).await.unwrap().status, OrderStatus::Shipped);
        assert_eq!(orders::shipment(&pool, &customer, order.id).await.unwrap().id, shipment.id);

        // a shipped order can no longer be cancelled or shipped twice
        assert!(matches!(orders::cancel(&pool, &customer, order.id).await.unwrap_err(), ApiError::BadRequest(_)));
        assert!(matches!(ship(&pool, &seller, order.id, parcel()).await.unwrap_err(), ApiError::BadRequest(_)));

        let delivered = deliver(&pool, &seller, shipment.id).await.unwrap();
        assert_eq!(delivered.status, ShipmentStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(orders::get_own(&pool, &customer, order.id).await.unwrap().status, OrderStatus::Delivered);
        assert!(matches!(deliver(&pool, &seller, shipment.id).await.unwrap_err(), ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn only_the_selling_account_ships() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let rival = test_support::principal(&pool, Role::Seller, "rival").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Clock", 5_000, 2).await;
        let order = orders::place(&pool, &customer, orders::OrderCreate { product_id: product.id, quantity: 1 })
            .await
            .unwrap();

        assert!(matches!(ship(&pool, &rival, order.id, parcel()).await.unwrap_err(), ApiError::Forbidden(_)));
        ship(&pool, &seller, order.id, parcel()).await.unwrap();

        let mine = search(&pool, &seller, ShipmentSearch { carrier: Some("postal".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(mine.pagination.records, 1);
        assert_eq!(search(&pool, &rival, ShipmentSearch::default()).await.unwrap().pagination.records, 0);
    }
}
