//! Core types for adclient

mod account;
mod attribute;
mod object;
mod scope;

pub use account::*;
pub use attribute::*;
pub use object::*;
pub use scope::*;
