//! QR acquisition pipeline
//!
//! local file → cache → remote download with retry → local fallback generation

pub mod cache;
pub mod generator;
pub mod identifier;
pub mod prefetch;
pub mod provenance;
pub mod resolver;
pub mod source;

pub use cache::{clean_cache, CacheError, CacheTier, FsQrCache, QrStore};
pub use generator::QrGenerator;
pub use identifier::QrIdentifier;
pub use prefetch::{PrefetchCoordinator, PrefetchReport};
pub use provenance::{QrProvenance, ResolvedQr};
pub use resolver::QrResolver;
pub use source::{FetchError, HttpQrSource, QrSource};
