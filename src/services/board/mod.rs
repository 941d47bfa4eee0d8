//! Discussion board: topics with threaded replies, member reports, staff
//! moderation actions and the appeals against them.

pub mod appeals;
pub mod moderation;
pub mod replies;
pub mod reports;
pub mod topics;
