mod detect;
mod jwe;
mod jws;

pub use detect::*;
pub use jwe::*;
pub use jws::*;
