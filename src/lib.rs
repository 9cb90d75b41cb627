pub mod config;
pub mod mapbox;
