//! Authentication: password hashing, bearer tokens, access levels.

mod password;
mod service;
mod token;

pub use password::{hash_password, verify_password};
pub use service::{hash_for_storage, Account, AuthService};
pub use token::{Claims, TokenKeys, TokenResponse};
