// store

mod profile_cache;
mod token_blacklist;

pub use profile_cache::*;
pub use token_blacklist::*;

// repo

mod user_store;

pub use user_store::*;
