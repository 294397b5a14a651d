//! Mini OS Helper: live system metrics, shortcut launching and persisted
//! notes/settings for a small desktop utility. The presentation layer binds
//! to [`app::App`].

pub mod actions;
pub mod app;
pub mod clock;
pub mod logging;
pub mod model;
pub mod provider;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod store;
