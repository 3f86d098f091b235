mod password_hasher;
mod profile_service_impl;
mod session_service_impl;
mod token_codec_jwt;
mod validation;

pub use password_hasher::*;
pub use profile_service_impl::*;
pub use session_service_impl::*;
pub use token_codec_jwt::*;
pub use validation::*;
