pub mod configuration;
pub use configuration::Config;

pub mod controller;
pub use controller::{Command, Controller};

pub mod error_handling;
pub mod identity;
pub mod network;
pub mod notification;

pub mod routing;
pub use routing::{GuardDecision, RouteGuard};

pub mod session_management;
pub use session_management::{SessionManager, SessionState};

pub mod storage;
pub mod validation;

#[cfg(test)]
mod testing;
