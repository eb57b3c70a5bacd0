//! Clients for the services a Huddle session depends on.
//!
//! Huddle talks to four external collaborators, each behind a trait:
//!
//! | Trait              | Typed client            | Purpose                         |
//! |--------------------|-------------------------|---------------------------------|
//! | [`AuthProvider`]   | [`IdentitySession`]     | who the local participant is    |
//! | [`RoomDirectory`]  | [`RoomDirectoryClient`] | room records and membership     |
//! | [`RelayAllocator`] | [`RelayBroker`]         | relay capacity and join codes   |
//! | [`ProfileStore`]   | (used directly)         | saved display names             |
//!
//! The [`memory`] module implements all four in-process.
//!
//! Trait methods return `Send` futures so generic callers can move them
//! into spawned tasks.

mod auth;
mod directory;
mod error;
pub mod memory;
mod profile;
mod relay;

pub use auth::{AuthProvider, IdentitySession};
pub use directory::{
    CreateOptions, MAX_ROOM_NAME_LEN, QueryOptions, RoomDirectory, RoomDirectoryClient,
};
pub use error::{AuthError, DirectoryError, ProfileError, RelayError};
pub use profile::ProfileStore;
pub use relay::{Allocation, RelayAllocator, RelayBroker};
