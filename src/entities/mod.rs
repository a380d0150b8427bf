pub mod admin;
pub mod artist;
pub mod event;
pub mod event_lineup;
pub mod site_settings;
pub mod video;
