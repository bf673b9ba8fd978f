pub mod accumulator;
pub mod distribution;
pub mod summary;

pub use accumulator::{Accumulator, Frozen, Unfrozen};
pub use distribution::{distribution, DistBucket};
pub use summary::StatsSummary;
