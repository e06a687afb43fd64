//! Terminal client for the course-management API

pub mod actions;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod views;

pub use api::{CourseApi, HttpApi};
pub use bootstrap::{bootstrap, BootstrapOutcome, BootstrapPhase, Bootstrapper};
pub use state::{Session, SessionState};
pub use storage::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
