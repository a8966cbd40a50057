//! Hierarchical, field-addressed layer store.
//!
//! A [`Layer`] maps [`Path`]s to specs ([`SpecData`]), each holding a set of
//! named [`Value`] fields. The layer is the document that undo/redo records
//! against:
//!
//! - [`Path`] — absolute address of a prim (`/World/Cube`) or property (`/World/Cube.size`)
//! - [`Value`] — opaque, comparable field value (including time samples)
//! - [`LayerData`] — the raw spec map with point queries
//! - [`LayerStateDelegate`] — the hook every mutation is routed through
//! - [`LayerHandle`] / [`WeakLayer`] — shared single-threaded handles
//! - [`ChangeBlock`] — batches change notices across a set of layers
//!
//! # Mutation routing
//!
//! The primitive mutators on [`Layer`] (`set_field`, `create_spec`,
//! `push_child`, ...) never touch the data themselves: they call the
//! installed delegate, which performs the change. Swapping the delegate is
//! how a recorder observes every edit without the call sites knowing.
//!
//! Primitive mutations on invalid targets are silent no-ops. The editing API
//! (`create_prim`, `remove_spec`, `move_prim`) validates up front and
//! returns [`LayerError`].

mod data;
mod delegate;
mod error;
mod layer;
pub mod path;
mod value;

pub use data::{LayerData, SpecData, SpecType, fields};
pub use delegate::{DelegateId, LayerStateDelegate, SimpleStateDelegate};
pub use error::{LayerError, PathError};
pub use layer::{ChangeBlock, Layer, LayerHandle, LayerNotice, WeakLayer};
pub use path::Path;
pub use value::{TimeCode, TimeSampleMap, Value};
