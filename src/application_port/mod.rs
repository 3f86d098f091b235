mod profile_service;
mod session_service;

pub use profile_service::*;
pub use session_service::*;
