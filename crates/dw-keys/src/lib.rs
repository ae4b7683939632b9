//! dw-keys - Surrogate-key resolution for dwflow
//!
//! A [`KeyMap`] pairs each dimension row's surrogate key with its
//! concatenated natural key and is persisted in the keymap layer. Fact
//! datasets staged with [`FactDataset`] have each foreign key resolved
//! against the referenced dimension's key map; rows without a match get
//! the sentinel key `-1`, and no row is ever dropped.

pub mod dataset;
pub mod error;
pub mod keymap;
pub mod resolve;

pub use dataset::FactDataset;
pub use error::{KeyError, KeyResult};
pub use keymap::{discard_key_maps, KeyMap};
pub use resolve::{resolve_foreign_key, ResolveStats};

#[cfg(test)]
mod test_support;
