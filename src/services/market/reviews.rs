use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::database::models::{Order, OrderStatus, Product, Review};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "rating"];

#[derive(Debug, Deserialize)]
pub struct ReviewCreate {
    pub rating: i64,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i64>,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewSearch {
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub customer_id: Option<Uuid>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, product_id: Uuid, input: ReviewSearch) -> Result<Page<Review>, ApiError> {
    let window = input.page.resolve()?;
    Repository::<Product>::new(pool).find_404(product_id).await?;

    let repo = Repository::<Review>::new(pool);
    let mut filter = repo.filter()?;
    filter
        .eq("product_id", product_id)
        .eq_opt("customer_id", input.customer_id)
        .gte_opt("rating", input.min_rating)
        .lte_opt("rating", input.max_rating);
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

/// Only customers who received the product may review it, once.
pub async fn create(pool: &SqlitePool, customer: &Principal, product_id: Uuid, input: ReviewCreate) -> Result<Review, ApiError> {
    let rating = rating(input.rating)?;
    let body = required_text("body", &input.body, 5_000)?;
    let product = Repository::<Product>::new(pool).find_404(product_id).await?;

    let orders = Repository::<Order>::new(pool);
    let mut filter = orders.filter()?;
    filter
        .eq("customer_id", customer.id)
        .eq("product_id", product.id)
        .eq("status", OrderStatus::Delivered);
    filter.limit(1, 0)?;
    if orders.select_one(filter).await?.is_none() {
        warn!("Customer '{}' tried to review product {} without a delivered order", customer.username, product.id);
        return Err(ApiError::forbidden("Only customers with a delivered order may review this product"));
    }

    let reviews = Repository::<Review>::new(pool);
    let mut filter = reviews.filter()?;
    filter.eq("product_id", product.id).eq("customer_id", customer.id);
    if reviews.select_one(filter).await?.is_some() {
        return Err(ApiError::conflict("You have already reviewed this product"));
    }

    let now = Utc::now();
    let review = Review {
        id: Uuid::new_v4(),
        product_id: product.id,
        customer_id: customer.id,
        rating,
        body,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO market_reviews (id, product_id, customer_id, rating, body, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(review.id)
    .bind(review.product_id)
    .bind(review.customer_id)
    .bind(review.rating)
    .bind(&review.body)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(review)
}

pub async fn update(pool: &SqlitePool, customer: &Principal, id: Uuid, input: ReviewUpdate) -> Result<Review, ApiError> {
    let mut review = Repository::<Review>::new(pool).find_404(id).await?;
    ensure_owner(review.customer_id, customer, "review")?;

    if let Some(value) = input.rating {
        review.rating = rating(value)?;
    }
    if let Some(body) = input.body.as_deref() {
        review.body = required_text("body", body, 5_000)?;
    }
    review.updated_at = Utc::now();

    sqlx::query("UPDATE market_reviews SET rating = ?1, body = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(review.rating)
        .bind(&review.body)
        .bind(review.updated_at)
        .bind(review.id)
        .execute(pool)
        .await?;
    Ok(review)
}

pub async fn remove(pool: &SqlitePool, customer: &Principal, id: Uuid) -> Result<(), ApiError> {
    let repo = Repository::<Review>::new(pool);
    let review = repo.find_404(id).await?;
    ensure_owner(review.customer_id, customer, "review")?;
    repo.soft_delete(id).await?;
    Ok(())
}

fn rating(value: i64) -> Result<i64, ApiError> {
    if !(1..=5).contains(&value) {
        return Err(ApiError::invalid_field("rating", "rating must be between 1 and 5"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::models::Shipment;
    use crate::services::market::{fixtures, orders, shipments};
    use crate::services::test_support;

    async fn delivered(pool: &SqlitePool, seller: &Principal, customer: &Principal, product: &Product) -> Shipment {
        let order = orders::place(pool, customer, orders::OrderCreate { product_id: product.id, quantity: 1 })
            .await
            .unwrap();
        let shipment = shipments::ship(
            pool,
            seller,
            order.id,
            shipments::ShipmentCreate { carrier: "courier".into(), tracking_number: "C-77".into() },
        )
        .await
        .unwrap();
        shipments::deliver(pool, seller, shipment.id).await.unwrap()
    }

    fn stars(rating: i64) -> ReviewCreate {
        ReviewCreate { rating, body: format!("{} stars", rating) }
    }

    #[tokio::test]
    async fn review_requires_a_delivered_order() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let customer = test_support::principal(&pool, Role::Customer, "customer").await;
        let product = fixtures::product(&pool, &seller, "Blender", 8_000, 5).await;

        let err = create(&pool, &customer, product.id, stars(5)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // placed but not delivered is still not enough
        orders::place(&pool, &customer, orders::OrderCreate { product_id: product.id, quantity: 1 }).await.unwrap();
        let err = create(&pool, &customer, product.id, stars(5)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        delivered(&pool, &seller, &customer, &product).await;
        let review = create(&pool, &customer, product.id, stars(4)).await.unwrap();
        assert_eq!(review.rating, 4);

        let err = create(&pool, &customer, product.id, stars(2)).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn rating_range_and_author_edits() {
        let pool = test_support::pool().await;
        let seller = test_support::principal(&pool, Role::Seller, "seller").await;
        let happy = test_support::principal(&pool, Role::Customer, "happy").await;
        let grumpy = test_support::principal(&pool, Role::Customer, "grumpy").await;
        let product = fixtures::product(&pool, &seller, "Toaster", 4_000, 5).await;
        delivered(&pool, &seller, &happy, &product).await;
        delivered(&pool, &seller, &grumpy, &product).await;

        assert!(matches!(
            create(&pool, &happy, product.id, stars(6)).await.unwrap_err(),
            ApiError::ValidationError { .. }
        ));
        let good = create(&pool, &happy, product.id, stars(5)).await.unwrap();
        let bad = create(&pool, &grumpy, product.id, stars(1)).await.unwrap();

        let page = search(&pool, product.id, ReviewSearch { min_rating: Some(3), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, good.id);

        let err = update(&pool, &happy, bad.id, ReviewUpdate { rating: Some(5), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let revised = update(&pool, &grumpy, bad.id, ReviewUpdate { rating: Some(3), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(revised.rating, 3);

        remove(&pool, &grumpy, bad.id).await.unwrap();
        // a removed review frees the slot
        create(&pool, &grumpy, product.id, stars(2)).await.unwrap();
    }
}
