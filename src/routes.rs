use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    middleware,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    filter::{FilterParams, MovieFilter},
    middleware::{enforce_timeout, require_api_key},
    models::{Movie, MovieInput, Rating, RatingInput},
    pagination::{Pagination, sample_size},
    response::{ApiResponse, OffsetPageResponse, PageResponse, StatsResponse},
    stats::Dimension,
    validation::{validate_create, validate_patch, validate_rating, validate_replace},
};

const DEFAULT_RANDOM_SAMPLE: u64 = 10;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query-string extractor whose rejections use the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/movies", post(create_movie))
        .route("/movies/{id}", put(replace_movie).patch(patch_movie).delete(delete_movie))
        .route("/movies/{id}/rating", post(rate_movie))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/movies", get(list_movies))
        .route("/movies/page", get(page_movies))
        .route("/movies/stats", get(movie_stats))
        .route("/movies/random", get(random_movies))
        .route("/movies/{id}", get(get_movie))
        .merge(protected)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
                .layer(middleware::from_fn_with_state(state.clone(), enforce_timeout)),
        )
        .with_state(state)
}

fn parse_id(raw: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidId(raw.to_string()))
}

pub async fn index() -> ApiResponse<Value> {
    ApiResponse::ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "database connectivity check",
            "GET /movies": "list movies (page, pageSize, year, title, genre)",
            "GET /movies/page": "filtered list (page, limit and every filter incl. actor)",
            "GET /movies/stats": "grouped counts or numeric summary (by)",
            "GET /movies/random": "random sample (limit)",
            "GET /movies/{id}": "one movie",
            "POST /movies": "create (API key)",
            "PUT /movies/{id}": "replace (API key)",
            "PATCH /movies/{id}": "partial update (API key)",
            "DELETE /movies/{id}": "delete with cast and ratings (API key)",
            "POST /movies/{id}/rating": "add a rating (API key)",
        },
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> AppResult<ApiResponse<Value>> {
    state.movies.db().ping().await?;
    Ok(ApiResponse::ok(json!({ "status": "ok", "database": "ok" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
    year: Option<String>,
    title: Option<String>,
    genre: Option<String>,
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    AppQuery(q): AppQuery<ListQuery>,
) -> AppResult<PageResponse<Movie>> {
    let page = Pagination::from_raw(q.page.as_deref(), q.page_size.as_deref());
    let filter = MovieFilter::from(&FilterParams {
        year: q.year,
        title: q.title,
        genre: q.genre,
        ..Default::default()
    });

    let movies = state.movies.list(&filter, page).await?;
    Ok(PageResponse::new(page, movies))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
    #[serde(flatten)]
    filters: FilterParams,
}

pub async fn page_movies(
    State(state): State<Arc<AppState>>,
    AppQuery(q): AppQuery<PageQuery>,
) -> AppResult<OffsetPageResponse<Movie>> {
    let page = Pagination::from_raw(q.page.as_deref(), q.limit.as_deref());
    let filter = MovieFilter::from(&q.filters);

    let movies = state.movies.list(&filter, page).await?;
    Ok(OffsetPageResponse::new(page, movies))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    by: Option<String>,
}

pub async fn movie_stats(
    State(state): State<Arc<AppState>>,
    AppQuery(q): AppQuery<StatsQuery>,
) -> AppResult<StatsResponse> {
    let dimension = Dimension::parse(q.by.as_deref())?;
    let data = state.movies.stats(dimension).await?;
    Ok(StatsResponse::new(dimension.name(), data))
}

#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    limit: Option<String>,
}

pub async fn random_movies(
    State(state): State<Arc<AppState>>,
    AppQuery(q): AppQuery<RandomQuery>,
) -> AppResult<ApiResponse<Vec<Movie>>> {
    let limit = sample_size(q.limit.as_deref(), DEFAULT_RANDOM_SAMPLE);
    Ok(ApiResponse::ok(state.movies.random(limit).await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Movie>> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::ok(state.movies.get(id).await?))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<MovieInput>,
) -> AppResult<ApiResponse<Movie>> {
    let new = validate_create(input)?;
    let movie = state.movies.create(new).await?;
    Ok(ApiResponse::created(movie).with_message("Movie created successfully"))
}

pub async fn replace_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(input): AppJson<MovieInput>,
) -> AppResult<ApiResponse<Movie>> {
    let id = parse_id(&id)?;
    let new = validate_replace(input)?;
    let movie = state.movies.replace(id, new).await?;
    Ok(ApiResponse::ok(movie).with_message("Movie updated successfully"))
}

pub async fn patch_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(input): AppJson<MovieInput>,
) -> AppResult<ApiResponse<Movie>> {
    let id = parse_id(&id)?;
    let changes = validate_patch(input)?;
    let movie = state.movies.patch(id, changes).await?;
    Ok(ApiResponse::ok(movie).with_message("Movie updated successfully"))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    let id = parse_id(&id)?;
    state.movies.delete(id).await?;
    Ok(ApiResponse::message("Movie deleted successfully"))
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(input): AppJson<RatingInput>,
) -> AppResult<ApiResponse<Rating>> {
    let id = parse_id(&id)?;
    let new = validate_rating(input)?;
    let rating = state.movies.add_rating(id, new).await?;
    Ok(ApiResponse::created(rating).with_message("Rating added successfully"))
}

pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
