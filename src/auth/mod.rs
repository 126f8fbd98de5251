mod oauth;
mod provider;
mod tokens;

pub use provider::{GoogleService, TokenProvider};
