use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Product, ProductStatus};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "name", "price_cents", "stock"];

#[derive(Debug, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub stock: i64,
    /// Defaults to active
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    /// Substring of name or description
    pub search: Option<String>,
    pub category: Option<String>,
    /// Any of these categories
    pub categories: Option<Vec<String>>,
    pub seller_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, input: ProductSearch) -> Result<Page<Product>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Product>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq_opt("category", input.category)
        .in_opt("category", input.categories)
        .eq_opt("seller_id", input.seller_id)
        .eq_opt("status", input.status)
        .gte_opt("price_cents", input.min_price)
        .lte_opt("price_cents", input.max_price)
        .contains_opt(&["name", "description"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Product, ApiError> {
    Ok(Repository::<Product>::new(pool).find_404(id).await?)
}

pub async fn create(pool: &SqlitePool, seller: &Principal, input: ProductCreate) -> Result<Product, ApiError> {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        seller_id: seller.id,
        name: required_text("name", &input.name, 200)?,
        description: required_text("description", &input.description, 10_000)?,
        category: required_text("category", &input.category, 64)?,
        price_cents: non_negative("price_cents", input.price_cents)?,
        stock: non_negative("stock", input.stock)?,
        status: input.status.unwrap_or(ProductStatus::Active),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO market_products (id, seller_id, name, description, category, price_cents, stock, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )
    .bind(product.id)
    .bind(product.seller_id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.status)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Seller '{}' listed product {}", seller.username, product.id);
    Ok(product)
}

pub async fn update(pool: &SqlitePool, seller: &Principal, id: Uuid, input: ProductUpdate) -> Result<Product, ApiError> {
    let mut product = get(pool, id).await?;
    ensure_owner(product.seller_id, seller, "product")?;

    if let Some(name) = input.name.as_deref() {
        product.name = required_text("name", name, 200)?;
    }
    if let Some(description) = input.description.as_deref() {
        product.description = required_text("description", description, 10_000)?;
    }
    if let Some(category) = input.category.as_deref() {
        product.category = required_text("category", category, 64)?;
    }
    if let Some(price_cents) = input.price_cents {
        product.price_cents = non_negative("price_cents", price_cents)?;
    }
    if let Some(stock) = input.stock {
        product.stock = non_negative("stock", stock)?;
    }
    if let Some(status) = input.status {
        product.status = status;
    }
    product.updated_at = Utc::now();

    sqlx::query(
        "UPDATE market_products SET name = ?1, description = ?2, category = ?3, price_cents = ?4, stock = ?5, \
         status = ?6, updated_at = ?7 WHERE id = ?8",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.status)
    .bind(product.updated_at)
    .bind(product.id)
    .execute(pool)
    .await?;
    Ok(product)
}

pub async fn remove(pool: &SqlitePool, seller: &Principal, id: Uuid) -> Result<(), ApiError> {
    let product = get(pool, id).await?;
    ensure_owner(product.seller_id, seller, "product")?;
    Repository::<Product>::new(pool).soft_delete(id).await?;
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<i64, ApiError> {
    if value < 0 {
        return Err(ApiError::invalid_field(field, format!("{} must not be negative", field)));
    }
    Ok(value)
}
