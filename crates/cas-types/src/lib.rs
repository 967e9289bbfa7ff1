//! Foundation types for the content-addressed blob engine.
//!
//! Every chunk in the system is named by a fixed-size [`Key`]. Most keys are
//! content hashes, but a small reserved sub-range of the 64-byte key space
//! carries out-of-band states:
//!
//! - [`Key::Empty`] -- the key of zero-length content (all-zero bytes)
//! - [`Key::Invalid`] -- anything in the reserved range that is not a
//!   recognized sentinel
//! - [`Key::Private`] -- an in-memory-only handle for a staged chunk that has
//!   not been persisted yet
//!
//! The enum is converted to and from the 64-byte wire layout at the
//! serialization boundary; see [`Key::from_bytes`] and [`Key::to_bytes`].

pub mod error;
pub mod key;

pub use error::KeyError;
pub use key::{ContentHash, Key, KEY_SIZE};
