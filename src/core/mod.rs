//! # Core Module
//!
//! Fundamental resource types shared across the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking,
//!   used as the shared handle for live chunks
//! - `SlotKey`: Identity of a streaming slot, stored by the chunk it watches
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod mt_resource;
pub mod slot_key;

pub use mt_resource::MtResource;
pub use slot_key::SlotKey;
