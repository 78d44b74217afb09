use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movie")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub overview: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub mpa_rating: Option<String>,
    pub country: Option<String>,
    pub collection: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub studios: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub producers: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub directors: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub studio_logos: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub studio_countries: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
