pub mod auth;

pub use auth::Actor;
