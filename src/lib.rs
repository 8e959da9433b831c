pub mod args;
pub mod cli;
pub mod config;
pub mod export;
pub mod import;
pub mod ir;
pub mod ofx;
pub mod operations;
mod terminal;
