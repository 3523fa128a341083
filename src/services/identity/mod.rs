pub mod factory;
pub mod introspection;
pub mod jwt;
pub mod static_tokens;
pub mod verifier;

pub use factory::build_identity_verifier;
pub use introspection::IntrospectionVerifier;
pub use jwt::JwtVerifier;
pub use static_tokens::StaticTokenVerifier;
pub use verifier::{IdentityVerifier, VerifiedIdentity, VerifyError};
