//! HTTP server assembly: shared state, router, middleware.

mod health;
mod middleware;
mod routes;
mod state;

pub use middleware::PanicResponder;
pub use routes::build_router;
pub use state::AppState;
