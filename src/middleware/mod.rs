pub mod auth;
pub mod response;

pub use auth::{
    admin_guard, appellant_guard, authorize, customer_guard, member_guard, moderator_guard, seller_guard, staff_guard, user_guard,
    Principal,
};
pub use response::{ApiResponse, ApiResult};
