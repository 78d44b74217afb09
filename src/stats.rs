use std::collections::HashMap;

use sea_orm::{DatabaseConnection, EntityTrait, QuerySelect};
use serde::{Serialize, Serializer, ser::SerializeMap};
use tracing::debug;

use crate::{
    entities::movie,
    error::{AppError, AppResult},
    normalize::{clean_text, extract_year, split_delimited},
};

pub const ALLOWED_DIMENSIONS: &[&str] = &[
    "genre",
    "year",
    "mpa_rating",
    "producer",
    "director",
    "studio",
    "collection",
    "runtime",
    "budget",
    "revenue",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Genre,
    Year,
    MpaRating,
    Producer,
    Director,
    Studio,
    Collection,
    Runtime,
    Budget,
    Revenue,
}

enum Kind {
    /// One group per element of a delimited column.
    Multi,
    Single,
    Year,
    Numeric,
}

impl Dimension {
    /// Parses the `by` parameter. A missing value groups by year.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        let Some(raw) = clean_text(raw) else {
            return Ok(Self::Year);
        };
        let dimension = match raw.to_ascii_lowercase().as_str() {
            "genre" | "genres" => Self::Genre,
            "year" => Self::Year,
            "mpa_rating" | "mparating" => Self::MpaRating,
            "producer" | "producers" => Self::Producer,
            "director" | "directors" => Self::Director,
            "studio" | "studios" => Self::Studio,
            "collection" => Self::Collection,
            "runtime" => Self::Runtime,
            "budget" => Self::Budget,
            "revenue" => Self::Revenue,
            _ => {
                return Err(AppError::UnsupportedParameter {
                    parameter: "by",
                    value: raw,
                    allowed: ALLOWED_DIMENSIONS,
                });
            },
        };
        Ok(dimension)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Genre => "genre",
            Self::Year => "year",
            Self::MpaRating => "mpa_rating",
            Self::Producer => "producer",
            Self::Director => "director",
            Self::Studio => "studio",
            Self::Collection => "collection",
            Self::Runtime => "runtime",
            Self::Budget => "budget",
            Self::Revenue => "revenue",
        }
    }

    fn column(self) -> movie::Column {
        match self {
            Self::Genre => movie::Column::Genres,
            Self::Year => movie::Column::ReleaseDate,
            Self::MpaRating => movie::Column::MpaRating,
            Self::Producer => movie::Column::Producers,
            Self::Director => movie::Column::Directors,
            Self::Studio => movie::Column::Studios,
            Self::Collection => movie::Column::Collection,
            Self::Runtime => movie::Column::Runtime,
            Self::Budget => movie::Column::Budget,
            Self::Revenue => movie::Column::Revenue,
        }
    }

    fn kind(self) -> Kind {
        match self {
            Self::Genre | Self::Producer | Self::Director | Self::Studio => Kind::Multi,
            Self::MpaRating | Self::Collection => Kind::Single,
            Self::Year => Kind::Year,
            Self::Runtime | Self::Budget | Self::Revenue => Kind::Numeric,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Year(i32),
    Text(String),
    /// Rows with no value for a single-valued dimension. Serializes as `null`.
    Missing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupCount {
    pub dimension: Dimension,
    pub key: GroupKey,
    pub count: u64,
}

impl Serialize for GroupCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.dimension.name(), &self.key)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: u64,
    pub average: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub sum: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsData {
    Groups(Vec<GroupCount>),
    Summary(NumericSummary),
}

impl StatsData {
    pub fn group_count(&self) -> Option<usize> {
        match self {
            Self::Groups(groups) => Some(groups.len()),
            Self::Summary(_) => None,
        }
    }
}

/// Aggregates the whole table by `dimension`.
pub async fn compute(db: &DatabaseConnection, dimension: Dimension) -> AppResult<StatsData> {
    let data = match dimension.kind() {
        Kind::Numeric => {
            let values: Vec<Option<i64>> = movie::Entity::find()
                .select_only()
                .column(dimension.column())
                .into_tuple()
                .all(db)
                .await?;
            StatsData::Summary(summarize(values))
        },
        kind => {
            let values: Vec<Option<String>> = movie::Entity::find()
                .select_only()
                .column(dimension.column())
                .into_tuple()
                .all(db)
                .await?;
            let keys: Vec<GroupKey> = match kind {
                Kind::Multi => values
                    .iter()
                    .flat_map(|v| split_delimited(v.as_deref()))
                    .map(GroupKey::Text)
                    .collect(),
                Kind::Year => values
                    .iter()
                    .filter_map(|v| v.as_deref().and_then(extract_year))
                    .map(GroupKey::Year)
                    .collect(),
                _ => values
                    .iter()
                    .map(|v| clean_text(v.as_deref()).map_or(GroupKey::Missing, GroupKey::Text))
                    .collect(),
            };
            StatsData::Groups(tally(dimension, keys))
        },
    };

    debug!(dimension = dimension.name(), groups = ?data.group_count(), "computed stats");
    Ok(data)
}

/// Counts keys, ordered by count descending then key ascending.
pub fn tally(dimension: Dimension, keys: impl IntoIterator<Item = GroupKey>) -> Vec<GroupCount> {
    let mut counts: HashMap<GroupKey, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut groups: Vec<GroupCount> =
        counts.into_iter().map(|(key, count)| GroupCount { dimension, key, count }).collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// Summary over present, positive values only.
pub fn summarize(values: impl IntoIterator<Item = Option<i64>>) -> NumericSummary {
    let present: Vec<i64> = values.into_iter().flatten().filter(|v| *v > 0).collect();
    let sum = present.iter().fold(0_i64, |acc, v| acc.saturating_add(*v));
    let count = present.len() as u64;
    NumericSummary {
        count,
        average: (count > 0).then(|| sum as f64 / count as f64),
        min: present.iter().copied().min(),
        max: present.iter().copied().max(),
        sum,
    }
}
