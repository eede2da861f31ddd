#[macro_use]
extern crate serde;

mod cache;
mod confirm;
mod context;
mod error;
mod extract;
mod group;
mod hash;
mod payload;
mod recovery;
mod resolver;
mod serde_hex;
mod store;
mod util;

pub use cache::*;
pub use confirm::*;
pub use context::*;
pub use error::*;
pub use extract::*;
pub use group::*;
pub use hash::*;
pub use payload::*;
pub use recovery::*;
pub use resolver::*;
pub use serde_hex::*;
pub use store::*;
pub use util::*;
