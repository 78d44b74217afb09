use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    Order, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info};

use crate::{
    entities::{movie, movie_cast, rating},
    error::{AppError, AppResult},
    filter::MovieFilter,
    models::{CastMember, Movie, MovieChanges, NewMovie, NewRating, Rating},
    normalize::extract_year,
    pagination::Pagination,
    stats::{self, Dimension, StatsData},
};

/// Reads and writes movies, their cast and their ratings.
#[derive(Clone)]
pub struct MovieService {
    db: DatabaseConnection,
}

impl MovieService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// One page of movies matching `filter`, newest release first.
    ///
    /// Movies without a recognizable release year (no date, or free text such
    /// as "TBA") sort after all dated ones; ties break on id so paging is
    /// stable.
    pub async fn list(&self, filter: &MovieFilter, page: Pagination) -> AppResult<Vec<Movie>> {
        debug!(
            filter = %filter.describe(),
            page = page.page,
            page_size = page.page_size,
            "listing movies"
        );

        let rows = movie::Entity::find()
            .filter(filter.condition())
            .order_by_asc(Expr::col((movie::Entity, movie::Column::ReleaseYear)).is_null())
            .order_by_desc(movie::Column::ReleaseYear)
            .order_by_desc(movie::Column::ReleaseDate)
            .order_by_asc(movie::Column::Id)
            .limit(page.page_size)
            .offset(page.offset())
            .all(&self.db)
            .await?;

        with_cast(&self.db, rows).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Movie> {
        load(&self.db, id).await?.ok_or(AppError::MovieNotFound(id))
    }

    /// Up to `limit` distinct movies in random order.
    pub async fn random(&self, limit: u64) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(limit)
            .all(&self.db)
            .await?;

        with_cast(&self.db, rows).await
    }

    pub async fn stats(&self, dimension: Dimension) -> AppResult<StatsData> {
        stats::compute(&self.db, dimension).await
    }

    pub async fn create(&self, new: NewMovie) -> AppResult<Movie> {
        let txn = self.db.begin().await?;

        let (active, cast) = movie_columns(ActiveValue::NotSet, new);
        let model = active.insert(&txn).await?;
        let cast = insert_cast(&txn, model.id, cast).await?;

        txn.commit().await?;

        info!(id = model.id, title = %model.title, "created movie");
        Ok(Movie::from_parts(model, cast))
    }

    /// Overwrites every column and the cast of an existing movie.
    pub async fn replace(&self, id: i32, new: NewMovie) -> AppResult<Movie> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(AppError::MovieNotFound(id));
        }

        let (active, cast) = movie_columns(ActiveValue::Unchanged(id), new);
        let model = active.update(&txn).await?;
        let cast = replace_cast(&txn, id, cast).await?;

        txn.commit().await?;

        info!(id, "replaced movie");
        Ok(Movie::from_parts(model, cast))
    }

    /// Applies only the provided changes. Unmentioned columns and the cast
    /// stay as they are.
    pub async fn patch(&self, id: i32, changes: MovieChanges) -> AppResult<Movie> {
        let txn = self.db.begin().await?;

        let Some(existing) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::MovieNotFound(id));
        };

        let mut active: movie::ActiveModel = existing.clone().into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(release_date) = changes.release_date {
            active.release_year = Set(release_date.as_deref().and_then(extract_year));
            active.release_date = Set(release_date);
        }
        set_if(&mut active.original_title, changes.original_title);
        set_if(&mut active.runtime, changes.runtime);
        set_if(&mut active.genres, changes.genres);
        set_if(&mut active.overview, changes.overview);
        set_if(&mut active.budget, changes.budget);
        set_if(&mut active.revenue, changes.revenue);
        set_if(&mut active.mpa_rating, changes.mpa_rating);
        set_if(&mut active.country, changes.country);
        set_if(&mut active.collection, changes.collection);
        set_if(&mut active.studios, changes.studios);
        set_if(&mut active.producers, changes.producers);
        set_if(&mut active.directors, changes.directors);
        set_if(&mut active.studio_logos, changes.studio_logos);
        set_if(&mut active.studio_countries, changes.studio_countries);
        set_if(&mut active.poster_url, changes.poster_url);
        set_if(&mut active.backdrop_url, changes.backdrop_url);

        let model = if active.is_changed() { active.update(&txn).await? } else { existing };

        let cast = match changes.cast {
            Some(cast) => replace_cast(&txn, id, cast).await?,
            None => {
                movie_cast::Entity::find()
                    .filter(movie_cast::Column::MovieId.eq(id))
                    .all(&txn)
                    .await?
            },
        };

        txn.commit().await?;

        info!(id, "patched movie");
        Ok(Movie::from_parts(model, cast))
    }

    /// Removes a movie together with its cast and ratings.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(AppError::MovieNotFound(id));
        }

        let ratings = rating::Entity::delete_many()
            .filter(rating::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        let cast = movie_cast::Entity::delete_many()
            .filter(movie_cast::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            id,
            ratings = ratings.rows_affected,
            cast = cast.rows_affected,
            "deleted movie"
        );
        Ok(())
    }

    pub async fn add_rating(&self, movie_id: i32, new: NewRating) -> AppResult<Rating> {
        if movie::Entity::find_by_id(movie_id).one(&self.db).await?.is_none() {
            return Err(AppError::MovieNotFound(movie_id));
        }

        let model = rating::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            rating: Set(new.rating),
            user_id: Set(new.user_id),
            created_at: Set(jiff::Timestamp::now().as_second()),
        }
        .insert(&self.db)
        .await?;

        info!(movie_id, rating = model.rating, "recorded rating");
        Rating::from_model(model)
    }
}

fn set_if<T>(slot: &mut ActiveValue<T>, change: Option<T>)
where
    T: Into<sea_orm::Value>,
{
    if let Some(value) = change {
        *slot = Set(value);
    }
}

fn movie_columns(id: ActiveValue<i32>, new: NewMovie) -> (movie::ActiveModel, Vec<CastMember>) {
    let release_year = new.release_date.as_deref().and_then(extract_year);
    let active = movie::ActiveModel {
        id,
        title: Set(new.title),
        original_title: Set(new.original_title),
        release_date: Set(new.release_date),
        release_year: Set(release_year),
        runtime: Set(new.runtime),
        genres: Set(new.genres),
        overview: Set(new.overview),
        budget: Set(new.budget),
        revenue: Set(new.revenue),
        mpa_rating: Set(new.mpa_rating),
        country: Set(new.country),
        collection: Set(new.collection),
        studios: Set(new.studios),
        producers: Set(new.producers),
        directors: Set(new.directors),
        studio_logos: Set(new.studio_logos),
        studio_countries: Set(new.studio_countries),
        poster_url: Set(new.poster_url),
        backdrop_url: Set(new.backdrop_url),
    };
    (active, new.cast)
}

async fn load<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<Option<Movie>> {
    let Some(model) = movie::Entity::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let cast = movie_cast::Entity::find()
        .filter(movie_cast::Column::MovieId.eq(id))
        .all(conn)
        .await?;
    Ok(Some(Movie::from_parts(model, cast)))
}

/// Attaches cast to a batch of movies with a single extra query.
async fn with_cast<C: ConnectionTrait>(conn: &C, rows: Vec<movie::Model>) -> AppResult<Vec<Movie>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|m| m.id).collect();
    let cast = movie_cast::Entity::find()
        .filter(movie_cast::Column::MovieId.is_in(ids))
        .all(conn)
        .await?;

    let mut by_movie: HashMap<i32, Vec<movie_cast::Model>> = HashMap::new();
    for member in cast {
        by_movie.entry(member.movie_id).or_default().push(member);
    }

    Ok(rows
        .into_iter()
        .map(|m| {
            let cast = by_movie.remove(&m.id).unwrap_or_default();
            Movie::from_parts(m, cast)
        })
        .collect())
}

async fn insert_cast<C: ConnectionTrait>(
    conn: &C,
    movie_id: i32,
    cast: Vec<CastMember>,
) -> AppResult<Vec<movie_cast::Model>> {
    let mut rows = Vec::with_capacity(cast.len());
    for (position, member) in (1..).zip(cast) {
        let model = movie_cast::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            position: Set(position),
            name: Set(member.name),
            character: Set(member.character),
            profile_url: Set(member.profile_url),
        };
        rows.push(model.insert(conn).await?);
    }
    Ok(rows)
}

async fn replace_cast<C: ConnectionTrait>(
    conn: &C,
    movie_id: i32,
    cast: Vec<CastMember>,
) -> AppResult<Vec<movie_cast::Model>> {
    movie_cast::Entity::delete_many()
        .filter(movie_cast::Column::MovieId.eq(movie_id))
        .exec(conn)
        .await?;
    insert_cast(conn, movie_id, cast).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::connect_in_memory, stats::GroupKey};

    fn heat() -> NewMovie {
        NewMovie {
            title: "Heat".into(),
            release_date: Some("1995-12-15".into()),
            runtime: Some(170),
            genres: Some("Action;Crime;Drama".into()),
            budget: Some(60_000_000),
            mpa_rating: Some("R".into()),
            directors: Some("Michael Mann".into()),
            cast: vec![
                CastMember {
                    name: "Al Pacino".into(),
                    character: Some("Vincent Hanna".into()),
                    profile_url: None,
                },
                CastMember {
                    name: "Robert De Niro".into(),
                    character: Some("Neil McCauley".into()),
                    profile_url: None,
                },
            ],
            ..Default::default()
        }
    }

    fn titled(title: &str, release_date: Option<&str>, genres: &str) -> NewMovie {
        NewMovie {
            title: title.into(),
            release_date: release_date.map(str::to_string),
            genres: Some(genres.into()),
            ..Default::default()
        }
    }

    async fn service() -> MovieService {
        MovieService::new(connect_in_memory().await)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.release_year, Some(1995));
        assert_eq!(created.genres, vec!["Action", "Crime", "Drama"]);

        let fetched = movies.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.cast[1].name, "Robert De Niro");
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let movies = service().await;
        assert!(matches!(movies.get(999).await, Err(AppError::MovieNotFound(999))));
        assert!(matches!(
            movies.patch(999, MovieChanges::default()).await,
            Err(AppError::MovieNotFound(999))
        ));
        assert!(matches!(movies.delete(999).await, Err(AppError::MovieNotFound(999))));
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_undated_last() {
        let movies = service().await;
        movies.create(titled("Old", Some("1980-01-01"), "Drama")).await.unwrap();
        movies.create(titled("Undated", None, "Drama")).await.unwrap();
        movies.create(titled("New", Some("2020-06-01"), "Drama")).await.unwrap();

        let page = movies.list(&MovieFilter::default(), Pagination::default()).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
    }

    #[tokio::test]
    async fn free_text_release_dates_sort_as_undated() {
        let movies = service().await;
        movies.create(titled("Unknown", Some("TBA"), "Drama")).await.unwrap();
        movies.create(titled("Dated", Some("2020-01-01"), "Drama")).await.unwrap();
        movies.create(titled("Undated", None, "Drama")).await.unwrap();

        let page = movies.list(&MovieFilter::default(), Pagination::default()).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles[0], "Dated");
        assert_eq!(page[0].release_year, Some(2020));
        assert!(page[1..].iter().all(|m| m.release_year.is_none()));
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let movies = service().await;
        movies.create(heat()).await.unwrap();

        let page = Pagination::from_raw(Some("100000000000000000"), Some("100"));
        assert!(movies.list(&MovieFilter::default(), page).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_do_not_overlap() {
        let movies = service().await;
        for year in 2001..=2005 {
            let date = format!("{year}-01-01");
            movies.create(titled(&format!("M{year}"), Some(date.as_str()), "Drama")).await.unwrap();
        }

        let first = movies
            .list(&MovieFilter::default(), Pagination { page: 1, page_size: 2 })
            .await
            .unwrap();
        let second = movies
            .list(&MovieFilter::default(), Pagination { page: 2, page_size: 2 })
            .await
            .unwrap();
        let third = movies
            .list(&MovieFilter::default(), Pagination { page: 3, page_size: 2 })
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);
        assert!(first.iter().all(|a| second.iter().all(|b| a.id != b.id)));
    }

    #[tokio::test]
    async fn filters_narrow_results() {
        let movies = service().await;
        movies.create(heat()).await.unwrap();
        movies.create(titled("Amélie", Some("2001-04-25"), "Comedy;Romance")).await.unwrap();

        let by_genre = MovieFilter { genre: Some("crime".into()), ..Default::default() };
        let found = movies.list(&by_genre, Pagination::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Heat");

        // membership is exact, not substring
        let partial = MovieFilter { genre: Some("Rom".into()), ..Default::default() };
        assert!(movies.list(&partial, Pagination::default()).await.unwrap().is_empty());

        let by_actor = MovieFilter { actor: Some("niro".into()), ..Default::default() };
        assert_eq!(movies.list(&by_actor, Pagination::default()).await.unwrap().len(), 1);

        let by_year = MovieFilter { year_start: Some(2000), ..Default::default() };
        let found = movies.list(&by_year, Pagination::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Amélie");

        let by_rating = MovieFilter { mpa_rating: Some("r".into()), ..Default::default() };
        assert_eq!(movies.list(&by_rating, Pagination::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn random_returns_distinct_movies_within_limit() {
        let movies = service().await;
        for i in 0..5 {
            movies.create(titled(&format!("M{i}"), None, "Drama")).await.unwrap();
        }

        let sample = movies.random(3).await.unwrap();
        assert_eq!(sample.len(), 3);
        let mut ids: Vec<i32> = sample.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        assert_eq!(movies.random(50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn patch_touches_only_given_fields() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();

        let changes = MovieChanges {
            runtime: Some(Some(171)),
            overview: Some(Some("A heist crew and a detective.".into())),
            ..Default::default()
        };
        let patched = movies.patch(created.id, changes).await.unwrap();

        assert_eq!(patched.runtime, Some(171));
        assert_eq!(patched.overview.as_deref(), Some("A heist crew and a detective."));
        assert_eq!(patched.title, created.title);
        assert_eq!(patched.genres, created.genres);
        assert_eq!(patched.cast, created.cast);
    }

    #[tokio::test]
    async fn patch_release_date_updates_year_and_null_clears() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();

        let changes = MovieChanges {
            release_date: Some(Some("2001-09-01".into())),
            budget: Some(None),
            cast: Some(Vec::new()),
            ..Default::default()
        };
        let patched = movies.patch(created.id, changes).await.unwrap();

        assert_eq!(patched.release_year, Some(2001));
        assert_eq!(patched.budget, None);
        assert!(patched.cast.is_empty());
    }

    #[tokio::test]
    async fn replace_overwrites_everything() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();

        let replaced = movies
            .replace(created.id, titled("Heat (1995)", None, "Thriller"))
            .await
            .unwrap();

        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.title, "Heat (1995)");
        assert_eq!(replaced.release_year, None);
        assert_eq!(replaced.runtime, None);
        assert!(replaced.cast.is_empty());
        assert_eq!(movies.get(created.id).await.unwrap(), replaced);
    }

    #[tokio::test]
    async fn delete_cascades_to_cast_and_ratings() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();
        movies
            .add_rating(created.id, NewRating { rating: 8.5, user_id: Some("u1".into()) })
            .await
            .unwrap();

        movies.delete(created.id).await.unwrap();

        assert!(matches!(movies.get(created.id).await, Err(AppError::MovieNotFound(_))));
        let orphans = movie_cast::Entity::find().all(movies.db()).await.unwrap();
        assert!(orphans.is_empty());
        let ratings = rating::Entity::find().all(movies.db()).await.unwrap();
        assert!(ratings.is_empty());
    }

    #[tokio::test]
    async fn ratings_require_an_existing_movie() {
        let movies = service().await;
        let created = movies.create(heat()).await.unwrap();

        let rating = movies
            .add_rating(created.id, NewRating { rating: 7.0, user_id: None })
            .await
            .unwrap();
        assert_eq!(rating.movie_id, created.id);
        assert_eq!(rating.rating, 7.0);

        assert!(matches!(
            movies.add_rating(404, NewRating { rating: 7.0, user_id: None }).await,
            Err(AppError::MovieNotFound(404))
        ));
    }

    #[tokio::test]
    async fn stats_group_across_the_table() {
        let movies = service().await;
        movies.create(titled("A", Some("2010-07-16"), "Action;Drama")).await.unwrap();
        movies.create(titled("B", Some("2010-03-01"), "Action")).await.unwrap();

        let StatsData::Groups(genres) = movies.stats(Dimension::Genre).await.unwrap() else {
            panic!("expected groups");
        };
        assert_eq!(genres[0].key, GroupKey::Text("Action".into()));
        assert_eq!(genres[0].count, 2);
        assert_eq!(genres[1].count, 1);

        let StatsData::Groups(years) = movies.stats(Dimension::Year).await.unwrap() else {
            panic!("expected groups");
        };
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].key, GroupKey::Year(2010));
        assert_eq!(years[0].count, 2);
    }

    #[tokio::test]
    async fn single_valued_groups_cover_every_row() {
        let movies = service().await;
        movies.create(heat()).await.unwrap();
        movies.create(titled("Unrated", None, "Drama")).await.unwrap();
        movies
            .create(NewMovie { mpa_rating: Some("R".into()), ..titled("Also R", None, "Crime") })
            .await
            .unwrap();

        let StatsData::Groups(ratings) = movies.stats(Dimension::MpaRating).await.unwrap() else {
            panic!("expected groups");
        };
        let total: u64 = ratings.iter().map(|g| g.count).sum();
        assert_eq!(total, 3);
        assert_eq!(ratings[0].key, GroupKey::Text("R".into()));
        assert_eq!(ratings[0].count, 2);
        assert_eq!(ratings[1].key, GroupKey::Missing);
        assert_eq!(ratings[1].count, 1);
    }

    #[tokio::test]
    async fn case_folding_matches_sqlite_for_non_ascii_text() {
        let movies = service().await;
        movies.create(titled("Nouvelle Vague", None, "CINÉ;Drama")).await.unwrap();

        let exact = MovieFilter { genre: Some("CINÉ".into()), ..Default::default() };
        assert_eq!(movies.list(&exact, Pagination::default()).await.unwrap().len(), 1);

        let ascii_case = MovieFilter { genre: Some("ciNÉ".into()), ..Default::default() };
        assert_eq!(movies.list(&ascii_case, Pagination::default()).await.unwrap().len(), 1);

        let title = MovieFilter { title: Some("VAGUE".into()), ..Default::default() };
        assert_eq!(movies.list(&title, Pagination::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn numeric_stats_skip_missing_values() {
        let movies = service().await;
        movies.create(heat()).await.unwrap();
        movies.create(titled("No budget", None, "Drama")).await.unwrap();

        let StatsData::Summary(summary) = movies.stats(Dimension::Budget).await.unwrap() else {
            panic!("expected summary");
        };
        assert_eq!(summary.count, 1);
        assert_eq!(summary.sum, 60_000_000);
    }
}
