//! Hash collections used throughout the workspace.
//!
//! FxHash is a deterministic non-cryptographic hasher; tenant partitions
//! are small and rebuilt every cycle.

pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
