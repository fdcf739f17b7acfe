pub mod analytics;
pub mod api;
pub mod app_error;
pub mod app_state;
pub mod auth;
pub mod bootstrap;
pub mod cart;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod export;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod pricing;
pub mod review_stats;
pub mod routes;
pub mod schema;
pub mod whatsapp;
