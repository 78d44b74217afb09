use std::fmt;

use sea_orm::{
    ColumnTrait, Condition, IdenStatic,
    sea_query::{Alias, Expr, Func, Query, SimpleExpr},
};
use serde::Deserialize;

use crate::{
    entities::{movie, movie_cast},
    normalize::clean_text,
};

/// Raw filter query parameters, exactly as they arrive on the URL.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub year: Option<String>,
    pub year_start: Option<String>,
    pub year_end: Option<String>,
    pub budget_low: Option<String>,
    pub budget_high: Option<String>,
    pub revenue_low: Option<String>,
    pub revenue_high: Option<String>,
    pub runtime_low: Option<String>,
    pub runtime_high: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub mpa_rating: Option<String>,
    pub studio: Option<String>,
    pub producer: Option<String>,
    pub director: Option<String>,
    pub collection: Option<String>,
    pub actor: Option<String>,
}

/// Optional movie criteria. Every `None` means "no filter" for that criterion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub year: Option<i64>,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub budget_low: Option<i64>,
    pub budget_high: Option<i64>,
    pub revenue_low: Option<i64>,
    pub revenue_high: Option<i64>,
    pub runtime_low: Option<i64>,
    pub runtime_high: Option<i64>,
    pub title: Option<String>,
    pub collection: Option<String>,
    pub actor: Option<String>,
    pub genre: Option<String>,
    pub studio: Option<String>,
    pub producer: Option<String>,
    pub director: Option<String>,
    pub mpa_rating: Option<String>,
}

impl From<&FilterParams> for MovieFilter {
    fn from(p: &FilterParams) -> Self {
        Self {
            year: number(p.year.as_deref()),
            year_start: number(p.year_start.as_deref()),
            year_end: number(p.year_end.as_deref()),
            budget_low: number(p.budget_low.as_deref()),
            budget_high: number(p.budget_high.as_deref()),
            revenue_low: number(p.revenue_low.as_deref()),
            revenue_high: number(p.revenue_high.as_deref()),
            runtime_low: number(p.runtime_low.as_deref()),
            runtime_high: number(p.runtime_high.as_deref()),
            title: clean_text(p.title.as_deref()),
            collection: clean_text(p.collection.as_deref()),
            actor: clean_text(p.actor.as_deref()),
            genre: clean_text(p.genre.as_deref()),
            studio: clean_text(p.studio.as_deref()),
            producer: clean_text(p.producer.as_deref()),
            director: clean_text(p.director.as_deref()),
            mpa_rating: clean_text(p.mpa_rating.as_deref()),
        }
    }
}

/// Lenient integer parsing for query strings: anything unparseable is absent.
pub fn number(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim).and_then(|s| s.parse().ok())
}

/// One condition of the overall conjunction, carrying its bound value.
#[derive(Clone, Debug)]
pub enum Predicate {
    Equals { column: movie::Column, value: i64 },
    EqualsIgnoreCase { column: movie::Column, value: String },
    AtLeast { column: movie::Column, value: i64 },
    AtMost { column: movie::Column, value: i64 },
    /// Case-insensitive substring of a single-valued text column.
    Contains { column: movie::Column, needle: String },
    /// Case-insensitive exact match of one element of a delimited column.
    HasMember { column: movie::Column, member: String },
    /// Case-insensitive substring of any cast member's name.
    CastNameContains { needle: String },
}

impl Predicate {
    pub fn into_expr(self) -> SimpleExpr {
        match self {
            Self::Equals { column, value } => column.eq(value),
            Self::EqualsIgnoreCase { column, value } => {
                Expr::expr(Func::upper(Expr::col((movie::Entity, column)))).eq(value)
            },
            Self::AtLeast { column, value } => column.gte(value),
            Self::AtMost { column, value } => column.lte(value),
            Self::Contains { column, needle } => {
                instr_lower(Expr::col((movie::Entity, column)), needle)
            },
            Self::HasMember { column, member } => Expr::cust_with_values(
                format!(r#"instr(';' || lower("movie"."{}") || ';', $1) > 0"#, column.as_str()),
                [format!(";{member};")],
            ),
            Self::CastNameContains { needle } => Expr::exists(
                Query::select()
                    .expr(Expr::val(1))
                    .from(movie_cast::Entity)
                    .and_where(
                        Expr::col((movie_cast::Entity, movie_cast::Column::MovieId))
                            .equals((movie::Entity, movie::Column::Id)),
                    )
                    .and_where(instr_lower(
                        Expr::col((movie_cast::Entity, movie_cast::Column::Name)),
                        needle,
                    ))
                    .to_owned(),
            ),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { column, value } => write!(f, "{} = {value}", column.as_str()),
            Self::EqualsIgnoreCase { column, value } => {
                write!(f, "{} = {value:?} (any case)", column.as_str())
            },
            Self::AtLeast { column, value } => write!(f, "{} >= {value}", column.as_str()),
            Self::AtMost { column, value } => write!(f, "{} <= {value}", column.as_str()),
            Self::Contains { column, needle } => {
                write!(f, "{} contains {needle:?}", column.as_str())
            },
            Self::HasMember { column, member } => write!(f, "{} has {member:?}", column.as_str()),
            Self::CastNameContains { needle } => write!(f, "cast contains {needle:?}"),
        }
    }
}

fn instr_lower(col: Expr, needle: String) -> SimpleExpr {
    Expr::expr(Func::cust(Alias::new("instr")).arg(Func::lower(col)).arg(needle)).gt(0)
}

impl MovieFilter {
    /// Text needles are folded with ASCII rules only, matching SQLite's
    /// built-in `lower()`/`upper()`. Non-ASCII letters compare exactly.
    pub fn predicates(&self) -> Vec<Predicate> {
        use movie::Column as C;

        let mut out = Vec::new();

        if let Some(value) = self.year {
            out.push(Predicate::Equals { column: C::ReleaseYear, value });
        }

        let ranges = [
            (C::ReleaseYear, self.year_start, self.year_end),
            (C::Budget, self.budget_low, self.budget_high),
            (C::Revenue, self.revenue_low, self.revenue_high),
            (C::Runtime, self.runtime_low, self.runtime_high),
        ];
        for (column, low, high) in ranges {
            if let Some(value) = low {
                out.push(Predicate::AtLeast { column, value });
            }
            if let Some(value) = high {
                out.push(Predicate::AtMost { column, value });
            }
        }

        for (column, needle) in [(C::Title, &self.title), (C::Collection, &self.collection)] {
            if let Some(needle) = needle {
                out.push(Predicate::Contains { column, needle: needle.to_ascii_lowercase() });
            }
        }

        let members = [
            (C::Genres, &self.genre),
            (C::Studios, &self.studio),
            (C::Producers, &self.producer),
            (C::Directors, &self.director),
        ];
        for (column, member) in members {
            if let Some(member) = member {
                out.push(Predicate::HasMember { column, member: member.to_ascii_lowercase() });
            }
        }

        if let Some(rating) = &self.mpa_rating {
            out.push(Predicate::EqualsIgnoreCase {
                column: C::MpaRating,
                value: rating.to_ascii_uppercase(),
            });
        }

        if let Some(needle) = &self.actor {
            out.push(Predicate::CastNameContains { needle: needle.to_ascii_lowercase() });
        }

        out
    }

    pub fn condition(&self) -> Condition {
        self.predicates()
            .into_iter()
            .fold(Condition::all(), |cond, predicate| cond.add(predicate.into_expr()))
    }

    pub fn describe(&self) -> String {
        self.predicates().iter().map(ToString::to_string).collect::<Vec<_>>().join(" AND ")
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait, Value};

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let query = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let uri: axum::http::Uri = format!("/movies/page?{query}").parse().unwrap();
        axum::extract::Query::<FilterParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn absent_blank_and_unparseable_values_add_no_predicate() {
        let filter = MovieFilter::from(&params(&[
            ("title", "%20%20"),
            ("genre", ""),
            ("budgetLow", "lots"),
            ("runtimeHigh", "12x"),
        ]));
        assert_eq!(filter, MovieFilter::default());
        assert!(filter.predicates().is_empty());
    }

    #[test]
    fn each_criterion_contributes_one_predicate() {
        let filter = MovieFilter::from(&params(&[
            ("yearStart", "2010"),
            ("yearEnd", "2020"),
            ("budgetLow", "1000000"),
            ("genre", "Action"),
            ("mpaRating", "pg-13"),
            ("title", "Dark"),
            ("director", "Christopher%20Nolan"),
            ("actor", "Bale"),
        ]));
        let rendered: Vec<String> = filter.predicates().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec![
            "release_year >= 2010",
            "release_year <= 2020",
            "budget >= 1000000",
            r#"title contains "dark""#,
            r#"genres has "action""#,
            r#"directors has "christopher nolan""#,
            r#"mpa_rating = "PG-13" (any case)"#,
            r#"cast contains "bale""#,
        ]);
    }

    #[test]
    fn only_ascii_letters_are_folded() {
        let filter = MovieFilter {
            genre: Some("CINÉ".into()),
            actor: Some("ÉMILE".into()),
            mpa_rating: Some("pg-é".into()),
            ..Default::default()
        };
        let rendered: Vec<String> = filter.predicates().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec![
            r#"genres has "cinÉ""#,
            r#"mpa_rating = "PG-é" (any case)"#,
            r#"cast contains "Émile""#,
        ]);
    }

    #[test]
    fn user_values_are_bound_not_inlined() {
        let filter = MovieFilter {
            title: Some("Robert'); DROP TABLE movie;--".into()),
            genre: Some("Drama".into()),
            ..Default::default()
        };
        let stmt = movie::Entity::find().filter(filter.condition()).build(DbBackend::Sqlite);

        assert!(!stmt.sql.contains("DROP TABLE"));
        assert!(!stmt.sql.contains("drama"));
        let values = stmt.values.expect("bound values").0;
        assert!(values.contains(&Value::from("robert'); drop table movie;--")));
        assert!(values.contains(&Value::from(";drama;")));
    }
}
