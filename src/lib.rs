#![doc = "The `pmhub` library crate."]
#![doc = ""]
#![doc = "Projects, tasks, comments and notifications behind a REST API and a GraphQL schema,"]
#![doc = "with a read-through cache, a Redis-backed task priority queue, per-IP rate limiting,"]
#![doc = "live notifications over WebSockets and full-text search. The binary (`main.rs`)"]
#![doc = "wires these modules into an actix-web server."]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod graphql;
pub mod models;
pub mod notifications;
pub mod priority;
pub mod rate_limit;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;

pub use crate::error::AppError;
pub use crate::state::AppState;
