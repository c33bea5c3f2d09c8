pub mod channel;
pub mod container;
pub mod error;
pub mod property;

pub use channel::*;
pub use container::*;
pub use error::*;
pub use property::*;
