//! SeaORM entities, one module per table.

pub mod answer;
pub mod question;
pub mod survey;
pub mod user;
