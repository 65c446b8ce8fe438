pub mod lifecycle;

pub use lifecycle::{LifecycleManager, LifecycleState};
