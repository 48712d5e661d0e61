pub mod app;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod describe;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod host;
pub mod inputs;
pub mod notify;
pub mod output;
pub mod patch;
pub mod render;
pub mod save;
pub mod tui;
