pub mod route_guard;
pub mod routes;

pub use route_guard::{GuardDecision, Redirect, RouteGuard, DEFAULT_SIGN_IN_PATH};
pub use routes::{Route, RouteTable};
