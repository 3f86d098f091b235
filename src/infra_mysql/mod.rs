mod user_store_mysql;

pub use user_store_mysql::*;

mod util;
