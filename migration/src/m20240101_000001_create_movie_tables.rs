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
                    .col(integer(Movie::Id).primary_key())
                    .col(boolean_null(Movie::Adult))
                    .col(big_integer_null(Movie::Budget))
                    .col(text_null(Movie::Homepage))
                    .col(text_null(Movie::ImdbId))
                    .col(text_null(Movie::OriginalLanguage))
                    .col(text_null(Movie::OriginalTitle))
                    .col(text_null(Movie::Overview))
                    .col(double_null(Movie::Popularity))
                    .col(date_null(Movie::ReleaseDate))
                    .col(big_integer_null(Movie::Revenue))
                    .col(integer_null(Movie::Runtime))
                    .col(text_null(Movie::Title))
                    .col(double_null(Movie::VoteAverage))
                    .col(integer_null(Movie::VoteCount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(integer(Genre::Id).primary_key())
                    .col(text_null(Genre::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(integer(MovieGenre::MovieId))
                    .col(integer(MovieGenre::GenreId))
                    .primary_key(Index::create().col(MovieGenre::MovieId).col(MovieGenre::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_movie")
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_genre")
                            .from(MovieGenre::Table, MovieGenre::GenreId)
                            .to(Genre::Table, Genre::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductionCompany::Table)
                    .if_not_exists()
                    .col(integer(ProductionCompany::Id).primary_key())
                    .col(text_null(ProductionCompany::Name))
                    .col(text_null(ProductionCompany::OriginCountry))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProductionCompany::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Adult,
    Budget,
    Homepage,
    ImdbId,
    OriginalLanguage,
    OriginalTitle,
    Overview,
    Popularity,
    ReleaseDate,
    Revenue,
    Runtime,
    Title,
    VoteAverage,
    VoteCount,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum ProductionCompany {
    Table,
    Id,
    Name,
    OriginCountry,
}
