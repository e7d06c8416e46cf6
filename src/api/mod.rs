pub mod cache;
pub mod error;
pub mod esi;
pub mod transport;
pub mod types;

pub use cache::{CacheKey, RevalidationCache};
pub use error::ApiError;
pub use esi::{Endpoint, EsiClient};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
pub use types::*;
