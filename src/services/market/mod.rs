//! Marketplace: seller catalogues, customer orders with stock reservation,
//! shipments and reviews from customers who received the product.

pub mod orders;
pub mod products;
pub mod reviews;
pub mod shipments;
