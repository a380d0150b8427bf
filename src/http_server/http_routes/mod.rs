pub mod admin;
pub mod artists;
pub mod auth;
pub mod events;
pub mod health;
pub mod settings;
pub mod videos;
