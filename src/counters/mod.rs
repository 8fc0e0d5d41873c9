//! Result accumulators. Workers write into their own private instance of
//! these; [`crate::simulation::merge`] folds worker instances into the
//! shared global state under the timed mutex.

pub mod direction;
pub mod histogram;
pub mod hitcache;
pub mod profile;
pub mod texture;

pub use direction::{DirectionAccumulator, DirectionCell};
pub use histogram::FacetHistograms;
pub use hitcache::{HitCache, HitCacheEntry, LeakCache, LeakCacheEntry};
pub use profile::ProfileAccumulator;
pub use texture::TextureAccumulator;
