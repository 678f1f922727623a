//! Domain operations shared by the REST routes and the GraphQL resolvers.
//!
//! Each function takes the [`AppState`](crate::state::AppState) and, for guarded
//! operations, the caller's [`Claims`](crate::auth::Claims). Role and ownership rules are
//! enforced here so both surfaces behave the same way.

pub mod auth;
pub mod comments;
pub mod projects;
pub mod tasks;
pub mod users;
