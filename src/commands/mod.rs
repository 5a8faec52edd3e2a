//! Command implementations for the bpm CLI

pub mod add;
pub mod build;
pub mod completions;
pub mod fetch;
pub mod helpers;
pub mod list;
pub mod remove;
