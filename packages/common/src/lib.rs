pub mod error;
pub mod hash;
pub mod result;

pub use error::*;
pub use hash::*;
pub use result::*;
