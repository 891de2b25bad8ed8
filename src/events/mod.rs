pub mod chain;
pub mod io;
pub mod types;

pub use chain::EventChain;
pub use types::{Field, Row, Shape};
