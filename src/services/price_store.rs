//! Price history store
//!
//! Persistence for `PricePoint`s keyed by (date, asset). Writes from the sync
//! pipeline and reads from the query endpoints both go through here.

use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use crate::entities::{price_history, prelude::PriceHistory};
use crate::models::price_history::{Currency, DateFilter, PriceFilter, PricePoint};

/// Rows per INSERT statement. Keeps bind parameters well under driver limits.
const INSERT_CHUNK_SIZE: usize = 1000;

/// Dates per `IN (...)` list in `find_by_dates`.
const LOOKUP_CHUNK_SIZE: usize = 1000;

#[derive(Clone)]
pub struct PriceStore {
    db: DatabaseConnection,
}

fn active_model(point: &PricePoint) -> price_history::ActiveModel {
    price_history::ActiveModel {
        id: NotSet,
        date: Set(point.date),
        asset: Set(point.asset.clone()),
        usd: Set(point.usd),
        inr: Set(point.inr),
    }
}

async fn insert_chunks<C: ConnectionTrait>(conn: &C, points: &[PricePoint]) -> Result<usize, DbErr> {
    for chunk in points.chunks(INSERT_CHUNK_SIZE) {
        PriceHistory::insert_many(chunk.iter().map(active_model))
            .exec_without_returning(conn)
            .await?;
    }
    Ok(points.len())
}

async fn delete_asset<C: ConnectionTrait>(conn: &C, asset: &str) -> Result<u64, DbErr> {
    let result = PriceHistory::delete_many()
        .filter(price_history::Column::Asset.eq(asset))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

impl PriceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts the point, or overwrites usd/inr of the existing (date, asset) row.
    pub async fn upsert(&self, point: &PricePoint) -> Result<(), DbErr> {
        PriceHistory::insert(active_model(point))
            .on_conflict(
                OnConflict::columns([price_history::Column::Date, price_history::Column::Asset])
                    .update_columns([price_history::Column::Usd, price_history::Column::Inr])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Removes every stored point of `asset`. Returns the number of rows deleted.
    pub async fn delete_all_for_asset(&self, asset: &str) -> Result<u64, DbErr> {
        delete_asset(&self.db, asset).await
    }

    /// Plain bulk insert. Callers must make sure no (date, asset) collides.
    pub async fn insert_many(&self, points: &[PricePoint]) -> Result<usize, DbErr> {
        insert_chunks(&self.db, points).await
    }

    /// Replaces the whole history of `asset` in one transaction.
    ///
    /// Returns (rows deleted, rows inserted).
    pub async fn replace_asset(
        &self,
        asset: &str,
        points: &[PricePoint],
    ) -> Result<(u64, usize), DbErr> {
        let txn = self.db.begin().await?;

        let deleted = delete_asset(&txn, asset).await?;
        let inserted = insert_chunks(&txn, points).await?;

        txn.commit().await?;

        debug!(asset, deleted, inserted, "Replaced price history");
        Ok((deleted, inserted))
    }

    /// Points matching `filter`, newest first.
    pub async fn query(&self, filter: &PriceFilter) -> Result<Vec<price_history::Model>, DbErr> {
        let mut select = PriceHistory::find().filter(price_history::Column::Asset.eq(&filter.asset));

        select = match filter.dates {
            DateFilter::Any => select,
            DateFilter::On(day) => select.filter(price_history::Column::Date.eq(day)),
            DateFilter::Range { from, to } => {
                if let Some(from) = from {
                    select = select.filter(price_history::Column::Date.gte(from));
                }
                if let Some(to) = to {
                    select = select.filter(price_history::Column::Date.lte(to));
                }
                select
            }
        };

        select = match filter.currency {
            Some(Currency::Usd) => select.filter(price_history::Column::Usd.is_not_null()),
            Some(Currency::Inr) => select.filter(price_history::Column::Inr.is_not_null()),
            None => select,
        };

        select = select.order_by(price_history::Column::Date, Order::Desc);

        if let Some(limit) = filter.limit.as_option() {
            select = select.limit(limit);
        }

        select.all(&self.db).await
    }

    /// Points of any asset stored on one of `dates`, in insertion order.
    ///
    /// Repeated dates match once. Long date lists are split across several
    /// queries.
    pub async fn find_by_dates(
        &self,
        dates: &[NaiveDate],
    ) -> Result<Vec<price_history::Model>, DbErr> {
        let mut unique = dates.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut rows = Vec::new();
        for chunk in unique.chunks(LOOKUP_CHUNK_SIZE) {
            let found = PriceHistory::find()
                .filter(price_history::Column::Date.is_in(chunk.iter().copied()))
                .order_by(price_history::Column::Id, Order::Asc)
                .all(&self.db)
                .await?;
            rows.extend(found);
        }

        // Chunks come back grouped by date range
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    pub async fn count_for_asset(&self, asset: &str) -> Result<u64, DbErr> {
        PriceHistory::find()
            .filter(price_history::Column::Asset.eq(asset))
            .count(&self.db)
            .await
    }
}
