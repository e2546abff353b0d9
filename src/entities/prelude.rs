//! `SeaORM` Entity prelude

pub use super::price_history::Entity as PriceHistory;
