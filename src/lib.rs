pub mod app;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod gateway;
pub mod model;
pub mod output;
pub mod session;
pub mod shell;
pub mod view;

#[cfg(test)]
mod tests;
