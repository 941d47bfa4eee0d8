//! Community platform: named communities, posts ranked by vote score and
//! threaded comments.

pub mod comments;
pub mod communities;
pub mod posts;
