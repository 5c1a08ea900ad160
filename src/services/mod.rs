pub mod credentials;
pub use credentials::{CredentialError, Credentials};

pub mod identity;
pub use identity::{Identity, IdentityError, LOG_PAGE_SIZE};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, SignupRequest};
pub use auth_service_impl::SeaOrmAuthService;
