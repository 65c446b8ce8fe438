pub mod lifecycle;
pub mod provider;
pub mod registry;

pub use lifecycle::*;
pub use provider::*;
pub use registry::*;
