pub mod movie;
pub mod movie_cast;
pub mod rating;
