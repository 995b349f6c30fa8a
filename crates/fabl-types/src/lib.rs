//! Foundation types for fabl.
//!
//! Every other fabl crate depends on `fabl-types`. The types here are plain
//! values: they carry no storage or transport concerns.
//!
//! # Key Types
//!
//! - [`ItemId`] -- 128-bit identifier whose byte order matches creation time
//! - [`AccountId`] -- UUID naming an account
//! - [`ContentSum`] -- SHA-256 digest keying a stored blob

pub mod account;
pub mod error;
pub mod item;
pub mod sum;

pub use account::AccountId;
pub use error::TypeError;
pub use item::ItemId;
pub use sum::ContentSum;
