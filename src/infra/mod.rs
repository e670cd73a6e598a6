pub mod cache;
pub mod distance;
pub mod matrix;

pub use cache::DistanceCache;
pub use distance::{
    DistanceLookup, DistanceOutcome, DistanceResolver, DistanceSource, LookupError, RouteLookup,
};
pub use matrix::DistanceMatrixClient;
