pub mod cli;
pub mod configuration;
pub mod domain;
pub mod error;
pub mod services;
pub mod startup;
