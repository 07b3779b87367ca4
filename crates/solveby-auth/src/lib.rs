//! solveby.ai Authentication Layer
//!
//! Agents authenticate with a single opaque API key issued at registration:
//!
//! - **Issuance**: `solveby_` plus 32 random alphanumerics, stored as SHA-256 hex
//! - **Gate**: [`AuthLayer`] resolves `Authorization: Bearer <key>` on every call
//! - **Extractors**: [`RequireAgent`] / [`OptionalAgent`] hand the caller to handlers
//!
//! There are no sessions; every call is authenticated on its own.
//!
//! ```text
//! Request → AuthLayer ──(no header)──────────────→ Handler
//!              │                                    ▲
//!              ├──(bad/unknown key)──→ 401          │
//!              └──(match)──→ AuthenticatedAgent ────┘
//! ```

pub mod api_key;
pub mod error;
pub mod middleware;
pub mod types;

pub use api_key::{generate_api_key, hash_api_key, ApiKeyService, IssuedKey};
pub use error::{AuthError, AuthResult, ErrorResponse, UNAUTHORIZED_HINT};
pub use middleware::{auth_error_response, AuthLayer, AuthMiddleware, OptionalAgent, RequireAgent};
pub use types::AuthenticatedAgent;
