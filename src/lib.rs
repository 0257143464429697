pub mod app;
pub mod auth;
pub mod cards;
pub mod config;
pub mod db;
pub mod error;
pub mod products;
pub mod purchases;
pub mod state;
