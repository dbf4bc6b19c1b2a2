//! Login-gated spreadsheet viewer back end: a bcrypt/argon2 credential store
//! with registration, authentication and admin bootstrap.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod state;
