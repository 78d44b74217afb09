use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MovieCast::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieCast::Id))
                    .col(integer(MovieCast::MovieId))
                    .col(integer(MovieCast::Position))
                    .col(string(MovieCast::Name))
                    .col(string_null(MovieCast::Character))
                    .col(string_null(MovieCast::ProfileUrl))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_cast_movie")
                            .from(MovieCast::Table, MovieCast::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_cast_movie_position")
                    .table(MovieCast::Table)
                    .col(MovieCast::MovieId)
                    .col(MovieCast::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieCast::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum MovieCast {
    Table,
    Id,
    MovieId,
    Position,
    Name,
    Character,
    ProfileUrl,
}
