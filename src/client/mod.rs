//! The caching DevSocial client.
//!
//! [`CachedClient`] owns the response cache and the in-flight registry and
//! applies [`InvalidationTable`] rules after mutations. Construct it through
//! [`DevSocial::builder()`].

mod builder;
mod cached;
mod invalidation;

pub use builder::{DEFAULT_PUBLIC_PREFIXES, DevSocial, DevSocialBuilder};
pub use cached::{CachedClient, DEFAULT_REQUEST_TIMEOUT};
pub use invalidation::{InvalidationRule, InvalidationTable, RoutePattern};
