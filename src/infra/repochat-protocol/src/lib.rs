mod api;
mod message;

pub use api::*;
pub use message::*;
