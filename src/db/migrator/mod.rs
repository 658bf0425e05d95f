use sea_orm_migration::prelude::*;

mod m20250315_initial;
mod m20250510_add_price_snapshots;
mod m20250618_add_revoked_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250315_initial::Migration),
            Box::new(m20250510_add_price_snapshots::Migration),
            Box::new(m20250618_add_revoked_tokens::Migration),
        ]
    }
}
