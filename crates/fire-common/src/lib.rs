//! Common types and utilities shared across the wildfire map services.

pub mod error;
pub mod event;
pub mod location;
pub mod tile;
pub mod viewport;

pub use error::{FireError, FireResult};
pub use event::{FireEvent, IdentityKey};
pub use location::Location;
pub use tile::{latlon_to_tile, tile_to_viewport, tiles_covering, TileCoord, MAX_ZOOM};
pub use viewport::{Viewport, ViewportParseError};
