// Application layer: the balance and transfer use cases over any AccountStore.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
