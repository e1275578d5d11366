//! Data models

mod api;
mod enterprise;
mod membership;
mod usage;

pub use api::*;
pub use enterprise::*;
pub use membership::*;
pub use usage::*;
