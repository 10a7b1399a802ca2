pub mod engine;
pub mod evaluate;
pub mod features;
pub mod metrics;
pub mod seasonal;

pub use engine::*;
pub use evaluate::*;
pub use features::*;
pub use metrics::*;
pub use seasonal::*;
