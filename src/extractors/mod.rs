//! Request extractors.

mod account;
mod bearer;
mod credentials;

pub use account::CurrentAccount;
pub use bearer::BearerToken;
pub use credentials::Credentials;
