use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Create offers table
        manager
            .create_table(
                Table::create()
                    .table(Offers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Offers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Offers::Price).big_integer().not_null())
                    .col(ColumnDef::new(Offers::ItemsInStock).integer().not_null())
                    .col(ColumnDef::new(Offers::ProductId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offers_product")
                            .from(Offers::Table, Offers::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create fetches table (one row per synchronization snapshot)
        manager
            .create_table(
                Table::create()
                    .table(Fetches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Fetches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Fetches::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Fetches::Time).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fetches_product")
                            .from(Fetches::Table, Fetches::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for range queries: (product_id, time DESC)
        manager
            .create_index(
                Index::create()
                    .name("idx_fetches_product_time")
                    .table(Fetches::Table)
                    .col(Fetches::ProductId)
                    .col((Fetches::Time, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Create offer_fetch link table. Offers are shared across fetches by
        // reference; the auto-increment link id preserves insertion order.
        manager
            .create_table(
                Table::create()
                    .table(OfferFetch::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OfferFetch::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OfferFetch::OfferId).uuid().not_null())
                    .col(ColumnDef::new(OfferFetch::FetchId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_fetch_offer")
                            .from(OfferFetch::Table, OfferFetch::OfferId)
                            .to(Offers::Table, Offers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_fetch_fetch")
                            .from(OfferFetch::Table, OfferFetch::FetchId)
                            .to(Fetches::Table, Fetches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offer_fetch_fetch")
                    .table(OfferFetch::Table)
                    .col(OfferFetch::FetchId)
                    .to_owned(),
            )
            .await?;

        // Create offer_summaries table (memoized per-fetch statistics)
        manager
            .create_table(
                Table::create()
                    .table(OfferSummaries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OfferSummaries::FetchId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OfferSummaries::MinPrice).double().not_null())
                    .col(ColumnDef::new(OfferSummaries::MaxPrice).double().not_null())
                    .col(ColumnDef::new(OfferSummaries::AvgPrice).double().not_null())
                    .col(
                        ColumnDef::new(OfferSummaries::MedianPrice)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OfferSummaries::OfferCount)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_summaries_fetch")
                            .from(OfferSummaries::Table, OfferSummaries::FetchId)
                            .to(Fetches::Table, Fetches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OfferSummaries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OfferFetch::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Fetches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Offers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Offers {
    Table,
    Id,
    Price,
    ItemsInStock,
    ProductId,
}

#[derive(DeriveIden)]
enum Fetches {
    Table,
    Id,
    ProductId,
    Time,
}

#[derive(DeriveIden)]
enum OfferFetch {
    Table,
    Id,
    OfferId,
    FetchId,
}

#[derive(DeriveIden)]
enum OfferSummaries {
    Table,
    FetchId,
    MinPrice,
    MaxPrice,
    AvgPrice,
    MedianPrice,
    OfferCount,
}
