use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Databases created before price snapshots lack these columns.
        // Fresh databases get them from the entity-derived initial table.
        if !manager.has_column("orders", "unit_price").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Orders::Table)
                        .add_column(ColumnDef::new(Orders::UnitPrice).double().null())
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("orders", "line_total").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Orders::Table)
                        .add_column(ColumnDef::new(Orders::LineTotal).double().null())
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("orders", "user_id").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(Orders::Table)
                        .add_column(ColumnDef::new(Orders::UserId).integer().null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for column in [Orders::UnitPrice, Orders::LineTotal, Orders::UserId] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Orders::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    UnitPrice,
    LineTotal,
    UserId,
}
