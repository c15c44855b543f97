// ABOUTME: Library root for capstan - atomic symlink-switching release deploys.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod output;
pub mod scm;
pub mod types;
