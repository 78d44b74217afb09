use serde::{Deserialize, Serialize};

use crate::{
    entities::{movie, movie_cast, rating},
    error::AppResult,
    normalize::split_delimited,
};

pub const MAX_CAST: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_url: Option<String>,
}

/// A movie as returned by the API, with delimited columns split into lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub mpa_rating: Option<String>,
    pub country: Option<String>,
    pub collection: Option<String>,
    pub studios: Vec<String>,
    pub producers: Vec<String>,
    pub directors: Vec<String>,
    pub studio_logos: Vec<String>,
    pub studio_countries: Vec<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub cast: Vec<CastMember>,
}

impl Movie {
    pub fn from_parts(m: movie::Model, mut cast: Vec<movie_cast::Model>) -> Self {
        cast.sort_by_key(|c| c.position);
        Self {
            id: m.id,
            genres: split_delimited(m.genres.as_deref()),
            studios: split_delimited(m.studios.as_deref()),
            producers: split_delimited(m.producers.as_deref()),
            directors: split_delimited(m.directors.as_deref()),
            studio_logos: split_delimited(m.studio_logos.as_deref()),
            studio_countries: split_delimited(m.studio_countries.as_deref()),
            title: m.title,
            original_title: m.original_title,
            release_date: m.release_date,
            release_year: m.release_year,
            runtime: m.runtime,
            overview: m.overview,
            budget: m.budget,
            revenue: m.revenue,
            mpa_rating: m.mpa_rating,
            country: m.country,
            collection: m.collection,
            poster_url: m.poster_url,
            backdrop_url: m.backdrop_url,
            cast: cast
                .into_iter()
                .map(|c| CastMember {
                    name: c.name,
                    character: c.character,
                    profile_url: c.profile_url,
                })
                .collect(),
        }
    }
}

/// A multi-valued field in a request body: a JSON array or a delimited string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListValue {
    Items(Vec<String>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CastInput {
    pub name: Option<String>,
    pub character: Option<String>,
    pub profile_url: Option<String>,
}

/// Request body for create, replace and patch.
///
/// The outer `Option` records whether the key was present at all, the inner
/// one whether it was `null`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovieInput {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub original_title: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub release_date: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub runtime: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub genres: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub overview: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub budget: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub revenue: Option<Option<i64>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub mpa_rating: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub country: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub collection: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub studios: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub producers: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub directors: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub studio_logos: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub studio_countries: Option<Option<ListValue>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub poster_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub backdrop_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub cast: Option<Option<Vec<CastInput>>>,
}

/// A validated, normalized set of movie columns used by create and replace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub genres: Option<String>,
    pub overview: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub mpa_rating: Option<String>,
    pub country: Option<String>,
    pub collection: Option<String>,
    pub studios: Option<String>,
    pub producers: Option<String>,
    pub directors: Option<String>,
    pub studio_logos: Option<String>,
    pub studio_countries: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub cast: Vec<CastMember>,
}

/// A validated partial update. `None` leaves the column untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub original_title: Option<Option<String>>,
    pub release_date: Option<Option<String>>,
    pub runtime: Option<Option<i32>>,
    pub genres: Option<Option<String>>,
    pub overview: Option<Option<String>>,
    pub budget: Option<Option<i64>>,
    pub revenue: Option<Option<i64>>,
    pub mpa_rating: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub collection: Option<Option<String>>,
    pub studios: Option<Option<String>>,
    pub producers: Option<Option<String>>,
    pub directors: Option<Option<String>>,
    pub studio_logos: Option<Option<String>>,
    pub studio_countries: Option<Option<String>>,
    pub poster_url: Option<Option<String>>,
    pub backdrop_url: Option<Option<String>>,
    pub cast: Option<Vec<CastMember>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingInput {
    pub rating: Option<f64>,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewRating {
    pub rating: f64,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rating {
    pub id: i32,
    pub movie_id: i32,
    pub rating: f64,
    pub user_id: Option<String>,
    pub created_at: jiff::Timestamp,
}

impl Rating {
    pub fn from_model(m: rating::Model) -> AppResult<Self> {
        Ok(Self {
            id: m.id,
            movie_id: m.movie_id,
            rating: m.rating,
            user_id: m.user_id,
            created_at: jiff::Timestamp::from_second(m.created_at)?,
        })
    }
}
