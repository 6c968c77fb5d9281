//! HTTP 服务层

pub mod redirect;
pub mod token;
pub mod verify;

pub use redirect::{RedirectService, redirect_routes};
pub use token::VerificationTokenService;
pub use verify::{VerifyService, verify_routes};
