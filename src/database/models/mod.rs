//! Row types, one struct per table.

/// Declares a string-backed enum stored as its snake_case name in TEXT
/// columns and serialized the same way in JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for crate::filter::SqlValue {
            fn from(value: $name) -> Self {
                crate::filter::SqlValue::Text(value.as_str().to_string())
            }
        }
    };
}

pub mod account;
pub mod board;
pub mod community;
pub mod market;
pub mod todo;

pub use account::{Account, Role};
pub use board::{
    Appeal, AppealStatus, ModerationAction, ModerationKind, ModerationTarget, Reply, Report, ReportStatus,
    ReportTarget, Topic, TopicStatus,
};
pub use community::{Comment, Community, Post};
pub use market::{Order, OrderStatus, Product, ProductStatus, Review, Shipment, ShipmentStatus};
pub use todo::Todo;
