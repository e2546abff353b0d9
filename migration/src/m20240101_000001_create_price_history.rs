use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PriceHistory::Date).date().not_null())
                    .col(ColumnDef::new(PriceHistory::Asset).string_len(32).not_null())
                    .col(ColumnDef::new(PriceHistory::Usd).double().not_null())
                    .col(ColumnDef::new(PriceHistory::Inr).double().not_null())
                    .to_owned(),
            )
            .await?;

        // Natural key: one close per asset per day. Upserts target this index.
        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_date_asset_unique")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::Date)
                    .col(PriceHistory::Asset)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Range reads filter on asset and sort by date desc
        manager
            .create_index(
                Index::create()
                    .name("idx_price_history_asset_date")
                    .table(PriceHistory::Table)
                    .col(PriceHistory::Asset)
                    .col((PriceHistory::Date, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PriceHistory {
    Table,
    Id,
    Date,
    Asset,
    Usd,
    Inr,
}
