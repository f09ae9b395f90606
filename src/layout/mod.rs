pub mod fonts;
pub mod paginate;
pub mod style;
