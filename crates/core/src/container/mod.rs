#[allow(clippy::module_inception)]
pub mod container;
pub mod registry;

pub use container::Container;
pub use registry::{ServiceEntry, ServiceRegistry};
