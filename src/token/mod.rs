pub mod jwt;
mod pair;
mod policy;
mod store;

pub use pair::TokenPair;
pub use policy::RefreshPolicy;
pub use store::{CredentialStore, MemoryCredentialStore};
