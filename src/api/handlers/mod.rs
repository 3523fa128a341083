pub mod admin;
pub mod companies;
pub mod health;
pub mod not_found;
pub mod profile;
