pub mod output;
pub mod runtime;

pub use runtime::{Cli, Commands, DataArgs};
