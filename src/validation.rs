//! Request-body validation.
//!
//! Everything that reaches [`crate::movies::MovieService`] has passed through
//! here: strings are trimmed, blanks become `None`, delimited lists are joined
//! with the canonical separator, and every bound is checked. All violations
//! are reported together.

use crate::{
    error::{AppError, AppResult, FieldError},
    models::{
        CastInput, CastMember, ListValue, MAX_CAST, MovieChanges, MovieInput, NewMovie,
        NewRating, RatingInput,
    },
    normalize::{SEPARATOR, clean_text, join_delimited, normalize_release_date, split_request_list},
};

const MAX_TITLE_LEN: usize = 500;
const MAX_TEXT_LEN: usize = 255;
const MAX_OVERVIEW_LEN: usize = 5_000;
const MAX_URL_LEN: usize = 2_048;
const MAX_RUNTIME: i64 = 1_000;
const MAX_LIST_ITEMS: usize = 50;
const MAX_RATING: f64 = 10.0;
const MAX_RATING_CODE_LEN: usize = 16;

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn reject(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> AppResult<T> {
        if self.errors.is_empty() { Ok(value) } else { Err(AppError::Validation(self.errors)) }
    }

    fn title(&mut self, value: Option<String>) -> String {
        match clean_text(value.as_deref()) {
            Some(title) => {
                self.max_len("title", &title, MAX_TITLE_LEN);
                title
            },
            None => {
                self.reject("title", "title is required and must not be empty");
                String::new()
            },
        }
    }

    fn text(&mut self, field: &str, value: Option<String>, max: usize) -> Option<String> {
        let value = clean_text(value.as_deref())?;
        self.max_len(field, &value, max);
        Some(value)
    }

    fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.reject(field, format!("must be at most {max} characters"));
        }
    }

    fn release_date(&mut self, value: Option<String>) -> Option<String> {
        let value = self.text("release_date", value, MAX_TEXT_LEN)?;
        normalize_release_date(&value)
    }

    fn runtime(&mut self, value: Option<i64>) -> Option<i32> {
        let value = value?;
        if !(0..=MAX_RUNTIME).contains(&value) {
            self.reject("runtime", format!("must be between 0 and {MAX_RUNTIME} minutes"));
            return None;
        }
        i32::try_from(value).ok()
    }

    fn amount(&mut self, field: &str, value: Option<i64>) -> Option<i64> {
        let value = value?;
        if value < 0 {
            self.reject(field, "must not be negative");
        }
        Some(value)
    }

    fn list(&mut self, field: &str, value: Option<ListValue>) -> Option<String> {
        let items = match value? {
            ListValue::Items(items) => items,
            ListValue::Text(text) => split_request_list(&text),
        };
        let items: Vec<String> =
            items.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();

        if items.len() > MAX_LIST_ITEMS {
            self.reject(field, format!("must have at most {MAX_LIST_ITEMS} entries"));
        }
        for (i, item) in items.iter().enumerate() {
            if item.contains(SEPARATOR) {
                self.reject(format!("{field}[{i}]"), format!("must not contain '{SEPARATOR}'"));
            }
            self.max_len(&format!("{field}[{i}]"), item, MAX_TEXT_LEN);
        }
        join_delimited(&items)
    }

    fn cast(&mut self, value: Option<Vec<CastInput>>) -> Vec<CastMember> {
        let value = value.unwrap_or_default();
        if value.len() > MAX_CAST {
            self.reject("cast", format!("must have at most {MAX_CAST} members"));
        }
        value
            .into_iter()
            .enumerate()
            .filter_map(|(i, member)| {
                let name = clean_text(member.name.as_deref());
                let Some(name) = name else {
                    self.reject(format!("cast[{i}].name"), "name is required");
                    return None;
                };
                self.max_len(&format!("cast[{i}].name"), &name, MAX_TEXT_LEN);
                Some(CastMember {
                    name,
                    character: self.text(
                        &format!("cast[{i}].character"),
                        member.character,
                        MAX_TEXT_LEN,
                    ),
                    profile_url: self.text(
                        &format!("cast[{i}].profile_url"),
                        member.profile_url,
                        MAX_URL_LEN,
                    ),
                })
            })
            .collect()
    }
}

fn new_movie(c: &mut Checker, input: MovieInput) -> NewMovie {
    NewMovie {
        title: c.title(input.title.flatten()),
        original_title: c.text("original_title", input.original_title.flatten(), MAX_TITLE_LEN),
        release_date: c.release_date(input.release_date.flatten()),
        runtime: c.runtime(input.runtime.flatten()),
        genres: c.list("genres", input.genres.flatten()),
        overview: c.text("overview", input.overview.flatten(), MAX_OVERVIEW_LEN),
        budget: c.amount("budget", input.budget.flatten()),
        revenue: c.amount("revenue", input.revenue.flatten()),
        mpa_rating: c.text("mpa_rating", input.mpa_rating.flatten(), MAX_RATING_CODE_LEN),
        country: c.text("country", input.country.flatten(), MAX_TEXT_LEN),
        collection: c.text("collection", input.collection.flatten(), MAX_TEXT_LEN),
        studios: c.list("studios", input.studios.flatten()),
        producers: c.list("producers", input.producers.flatten()),
        directors: c.list("directors", input.directors.flatten()),
        studio_logos: c.list("studio_logos", input.studio_logos.flatten()),
        studio_countries: c.list("studio_countries", input.studio_countries.flatten()),
        poster_url: c.text("poster_url", input.poster_url.flatten(), MAX_URL_LEN),
        backdrop_url: c.text("backdrop_url", input.backdrop_url.flatten(), MAX_URL_LEN),
        cast: c.cast(input.cast.flatten()),
    }
}

/// Keys of `input` that were not sent at all.
fn missing_fields(input: &MovieInput) -> Vec<&'static str> {
    let present = [
        ("title", input.title.is_some()),
        ("original_title", input.original_title.is_some()),
        ("release_date", input.release_date.is_some()),
        ("runtime", input.runtime.is_some()),
        ("genres", input.genres.is_some()),
        ("overview", input.overview.is_some()),
        ("budget", input.budget.is_some()),
        ("revenue", input.revenue.is_some()),
        ("mpa_rating", input.mpa_rating.is_some()),
        ("country", input.country.is_some()),
        ("collection", input.collection.is_some()),
        ("studios", input.studios.is_some()),
        ("producers", input.producers.is_some()),
        ("directors", input.directors.is_some()),
        ("studio_logos", input.studio_logos.is_some()),
        ("studio_countries", input.studio_countries.is_some()),
        ("poster_url", input.poster_url.is_some()),
        ("backdrop_url", input.backdrop_url.is_some()),
        ("cast", input.cast.is_some()),
    ];
    present.into_iter().filter(|(_, sent)| !sent).map(|(name, _)| name).collect()
}

pub fn validate_create(input: MovieInput) -> AppResult<NewMovie> {
    let mut c = Checker::default();
    let movie = new_movie(&mut c, input);
    c.finish(movie)
}

/// A full replace needs every key; `null` is accepted to clear a field.
pub fn validate_replace(input: MovieInput) -> AppResult<NewMovie> {
    let mut c = Checker::default();
    for field in missing_fields(&input) {
        if field != "title" {
            c.reject(field, "is required for a full update (send null to clear it)");
        }
    }
    let movie = new_movie(&mut c, input);
    c.finish(movie)
}

pub fn validate_patch(input: MovieInput) -> AppResult<MovieChanges> {
    if input == MovieInput::default() {
        return Err(AppError::NoFieldsProvided);
    }

    let mut c = Checker::default();
    let changes = MovieChanges {
        title: input.title.map(|v| c.title(v)),
        original_title: input.original_title.map(|v| c.text("original_title", v, MAX_TITLE_LEN)),
        release_date: input.release_date.map(|v| c.release_date(v)),
        runtime: input.runtime.map(|v| c.runtime(v)),
        genres: input.genres.map(|v| c.list("genres", v)),
        overview: input.overview.map(|v| c.text("overview", v, MAX_OVERVIEW_LEN)),
        budget: input.budget.map(|v| c.amount("budget", v)),
        revenue: input.revenue.map(|v| c.amount("revenue", v)),
        mpa_rating: input.mpa_rating.map(|v| c.text("mpa_rating", v, MAX_RATING_CODE_LEN)),
        country: input.country.map(|v| c.text("country", v, MAX_TEXT_LEN)),
        collection: input.collection.map(|v| c.text("collection", v, MAX_TEXT_LEN)),
        studios: input.studios.map(|v| c.list("studios", v)),
        producers: input.producers.map(|v| c.list("producers", v)),
        directors: input.directors.map(|v| c.list("directors", v)),
        studio_logos: input.studio_logos.map(|v| c.list("studio_logos", v)),
        studio_countries: input.studio_countries.map(|v| c.list("studio_countries", v)),
        poster_url: input.poster_url.map(|v| c.text("poster_url", v, MAX_URL_LEN)),
        backdrop_url: input.backdrop_url.map(|v| c.text("backdrop_url", v, MAX_URL_LEN)),
        cast: input.cast.map(|v| c.cast(v)),
    };
    c.finish(changes)
}

pub fn validate_rating(input: RatingInput) -> AppResult<NewRating> {
    let mut c = Checker::default();
    let rating = match input.rating {
        Some(r) if r.is_finite() && (0.0..=MAX_RATING).contains(&r) => r,
        Some(_) => {
            c.reject("rating", format!("must be between 0 and {MAX_RATING}"));
            0.0
        },
        None => {
            c.reject("rating", "rating is required");
            0.0
        },
    };
    let user_id = c.text("user_id", input.user_id, MAX_TEXT_LEN);
    c.finish(NewRating { rating, user_id })
}
