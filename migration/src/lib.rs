pub use sea_orm_migration::prelude::*;

mod m20260825_000001_create_offer_tables;
mod m20260825_000002_create_auth_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260825_000001_create_offer_tables::Migration),
            Box::new(m20260825_000002_create_auth_tokens::Migration),
        ]
    }
}
