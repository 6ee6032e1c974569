//! CaleSync API server: HTTP bootstrap, MongoDB connector and the user model.

pub mod app;
pub mod config;
pub mod db;
pub mod state;
pub mod users;
