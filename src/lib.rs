#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use error::{Error, Result};
pub use model::{Action, Removal, VoteGraph};
