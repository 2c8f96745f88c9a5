use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per position; history arrays are JSON documents
        manager
            .create_table(
                Table::create()
                    .table(Positions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Positions::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(Positions::Pair).string_len(32).not_null())
                    .col(ColumnDef::new(Positions::Frequency).string_len(8).not_null())
                    .col(ColumnDef::new(Positions::Strategy).string_len(64).not_null())
                    .col(ColumnDef::new(Positions::Status).string_len(16).not_null().default("OPEN"))
                    .col(ColumnDef::new(Positions::StartTime).timestamp().not_null())
                    .col(ColumnDef::new(Positions::EndTime).timestamp().null())
                    .col(ColumnDef::new(Positions::DurationSecs).big_integer().null())
                    .col(ColumnDef::new(Positions::StopLossPct).double().not_null())
                    .col(ColumnDef::new(Positions::PctGain).decimal_len(20, 8).null())
                    .col(ColumnDef::new(Positions::PctNetGain).decimal_len(20, 8).null())
                    .col(ColumnDef::new(Positions::Snapshots).json().not_null())
                    .col(ColumnDef::new(Positions::Orders).json().not_null())
                    .col(ColumnDef::new(Positions::Details).json().not_null())
                    .col(ColumnDef::new(Positions::Stats).json().null())
                    .col(ColumnDef::new(Positions::CreatedAt).timestamp().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Positions::UpdatedAt).timestamp().default(Expr::cust("CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("idx_pair_frequency_status")
                            .table(Positions::Table)
                            .col(Positions::Pair)
                            .col(Positions::Frequency)
                            .col(Positions::Status)
                    )
                    .index(
                        Index::create()
                            .name("idx_strategy_status")
                            .table(Positions::Table)
                            .col(Positions::Strategy)
                            .col(Positions::Status)
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_end_time")
                    .table(Positions::Table)
                    .col(Positions::EndTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Positions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Positions {
    Table,
    Id,
    Pair,
    Frequency,
    Strategy,
    Status,
    StartTime,
    EndTime,
    DurationSecs,
    StopLossPct,
    PctGain,
    PctNetGain,
    Snapshots,
    Orders,
    Details,
    Stats,
    CreatedAt,
    UpdatedAt,
}
