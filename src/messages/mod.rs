mod attachment;
mod from_prior;
mod message;

pub use attachment::*;
pub use from_prior::*;
pub use message::*;
