// Library exports for postcraft
// This allows integration tests to build the router and drive the services

pub mod ai;
pub mod compositor;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
