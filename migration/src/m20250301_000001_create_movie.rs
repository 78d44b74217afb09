use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string(Movie::Title))
                    .col(string_null(Movie::OriginalTitle))
                    .col(string_null(Movie::ReleaseDate))
                    .col(integer_null(Movie::ReleaseYear))
                    .col(integer_null(Movie::Runtime))
                    .col(string_null(Movie::Genres))
                    .col(text_null(Movie::Overview))
                    .col(big_integer_null(Movie::Budget))
                    .col(big_integer_null(Movie::Revenue))
                    .col(string_null(Movie::MpaRating))
                    .col(string_null(Movie::Country))
                    .col(string_null(Movie::Collection))
                    .col(text_null(Movie::Studios))
                    .col(text_null(Movie::Producers))
                    .col(text_null(Movie::Directors))
                    .col(text_null(Movie::StudioLogos))
                    .col(text_null(Movie::StudioCountries))
                    .col(string_null(Movie::PosterUrl))
                    .col(string_null(Movie::BackdropUrl))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_release_date")
                    .table(Movie::Table)
                    .col(Movie::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_release_year")
                    .table(Movie::Table)
                    .col(Movie::ReleaseYear)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    OriginalTitle,
    ReleaseDate,
    ReleaseYear,
    Runtime,
    Genres,
    Overview,
    Budget,
    Revenue,
    MpaRating,
    Country,
    Collection,
    Studios,
    Producers,
    Directors,
    StudioLogos,
    StudioCountries,
    PosterUrl,
    BackdropUrl,
}
