//! Session management core module.
//!
//! This module provides the types and submodules that bridge identity-provider
//! sign-in state to an application session: the state machine, the reactive
//! store, the exchanger that drives it, and the manager owning their lifecycle.

/// Submodule for the session record.
pub mod session;
/// Submodule for the exchanger turning identity changes into session state.
pub mod session_exchanger;
/// Submodule for session manager implementation.
pub mod session_manager;
/// Submodule for the session state machine.
pub mod session_state;
/// Submodule for the reactive state store.
pub mod session_store;


pub use session::Session;
pub use session_exchanger::SessionExchanger;
pub use session_manager::SessionManager;
pub use session_state::{transition, SessionEvent, SessionState, Transition};
pub use session_store::SessionStore;
