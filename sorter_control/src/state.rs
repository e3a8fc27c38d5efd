//! Pipeline state machines.
//!
//! Three machines share one tick thread: the feeder pushes pieces onto the
//! carousel, classification tracks and identifies them, distribution routes
//! them into bins. [`machine`] holds the transition plumbing they share.

pub mod classification;
pub mod distribution;
pub mod feeder;
pub mod machine;
