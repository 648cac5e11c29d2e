mod asset;
mod auth;
mod common;
mod datasync;
mod document;
mod invoice;
mod lending;
mod log;
mod maintenance;
mod people;
mod term;
mod verification;

pub use asset::*;
pub use auth::*;
pub use common::*;
pub use datasync::*;
pub use document::*;
pub use invoice::*;
pub use lending::*;
pub use log::*;
pub use maintenance::*;
pub use people::*;
pub use term::*;
pub use verification::*;
