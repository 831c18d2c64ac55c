pub mod banner;
pub mod config;
pub mod consts;
pub mod error;
pub mod model;
pub mod repl;
pub mod runner;
pub mod spinner;
pub mod startup;
pub mod web;
