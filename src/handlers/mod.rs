// handlers/mod.rs - HTTP surface, one module per product
//
// Every handler unpacks the request, calls one provider in `services` and
// wraps the result in an `ApiResponse`. Role checks live in the guards
// (`middleware::auth`) layered onto each route group, so a handler that
// takes `Extension<Principal>` only ever runs for an authorized account.
//
// Route groups:
//   /auth/:role/*        account lifecycle for each role
//   /admin/*             account administration (admin)
//   /discussionBoard/*   topics, replies, reports, moderation, appeals
//   /community/*         communities, posts, votes, comments
//   /shoppingMall/*      products, orders, shipments, reviews
//   /todoList/*          personal todos (user)

pub mod admin;
pub mod auth;
pub mod board;
pub mod community;
pub mod market;
pub mod system;
pub mod todo;
