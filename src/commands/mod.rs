// ABOUTME: Command module aggregator for the capstan CLI.
// ABOUTME: Re-exports deploy and status command handlers.

mod deploy;
mod status;

pub use deploy::deploy;
pub use status::status;
