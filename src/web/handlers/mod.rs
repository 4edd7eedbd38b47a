//! Request handlers for the Web API.

mod auth;

pub use auth::{
    login, logout, me, refresh, register, AppState, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH,
};
