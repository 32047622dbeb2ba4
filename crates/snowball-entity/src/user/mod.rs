//! Platform user entities.

pub mod contact_list;
pub mod model;

pub use contact_list::ContactList;
pub use model::{DigestFrequency, User, UserMetadata};
