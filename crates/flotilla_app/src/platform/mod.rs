mod app;
mod cli;
mod config;
mod logging;
mod output;
mod ui;

pub use app::run_app;
