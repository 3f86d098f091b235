mod profile_cache_mem;
mod token_blacklist_mem;
mod user_store_mem;

pub use profile_cache_mem::*;
pub use token_blacklist_mem::*;
pub use user_store_mem::*;
