mod args;
mod driver;
mod read;
mod write;

pub use args::*;
pub use driver::{Command, MZFragIso, MZFragIsoError};
