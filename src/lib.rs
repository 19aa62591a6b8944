pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod form;
pub mod msg;
pub mod picker;
pub mod source;
pub mod tui;
pub mod vehicle;
