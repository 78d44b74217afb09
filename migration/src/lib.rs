pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_movie;
mod m20250301_000002_create_movie_cast;
mod m20250301_000003_create_rating;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_movie::Migration),
            Box::new(m20250301_000002_create_movie_cast::Migration),
            Box::new(m20250301_000003_create_rating::Migration),
        ]
    }
}
