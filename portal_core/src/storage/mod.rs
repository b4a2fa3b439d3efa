pub mod errors;
pub mod ipv4;
pub mod profile;
pub mod store;

pub use errors::StoreError;
pub use ipv4::{parse_ipv4, validate_ipv4};
pub use profile::{ConnectionProfile, KeyKind, ProfileEdit, UnknownKeyKind};
pub use store::{Mutation, ProfileStore};
