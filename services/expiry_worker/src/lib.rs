pub mod adapters;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod web;

#[cfg(test)]
mod testing;
