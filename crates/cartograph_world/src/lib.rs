//! # Cartograph World
//!
//! Reads a voxel world's on-disk region storage into a queryable model.
//!
//! ## Design Principles
//!
//! 1. **Degrade, never abort**: a corrupt chunk becomes the empty chunk, a
//!    missing region becomes the empty region
//! 2. **Lazy**: region files load on first access, chunks decode on first query
//! 3. **Bounded**: the region cache is capped by count and age
//! 4. **Bit-exact**: biome smoothing matches the game for every seed
//!
//! ## Core Components
//!
//! - `nbt`: depth-bounded tagged-binary reader and writer
//! - `Region`: 32x32 chunk container with lazily decoded slots
//! - `Chunk`: block, biome, light and surface queries across three schemas
//! - `BiomeSampler`: seed-dependent biome zoom
//! - `RegionStore`: size- and time-bounded region cache
//! - `World`: configuration plus the above, the renderer's query surface
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cartograph_world::{BlockRegistry, CacheConfig, World, WorldConfig};
//!
//! let world = World::new(WorldConfig::default(), Arc::new(BlockRegistry::new()), &CacheConfig::default());
//! let chunk = world.chunk(0, 0);
//! let surface = chunk.surface(0, 0);
//! let biome = world.biome_at(None, 0, 64, 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod biome_sampler;
pub mod block;
pub mod chunk;
pub mod compression;
pub mod error;
pub mod nbt;
pub mod noise;
pub mod packed;
pub mod region;
pub mod region_store;
pub mod schema;
pub mod section;
pub mod world;

pub use biome::{Biome, BiomeId, BiomeRegistry, GrassModifier};
pub use biome_sampler::BiomeSampler;
pub use block::{BlockId, BlockInfo, BlockRegistry, BlockState};
pub use chunk::{Chunk, ChunkPos, ChunkSettings, ColumnSurface, LegacyBiomes, SurfacePoint};
pub use compression::Compression;
pub use error::{WorldError, WorldResult};
pub use packed::{PackedArray, Packing};
pub use region::{list_regions, DecodeStatsSnapshot, Region, RegionContext, RegionFileBuilder, RegionPos};
pub use region_store::{CacheConfig, RegionStore};
pub use schema::Schema;
pub use section::Section;
pub use world::{hash_seed, World, WorldConfig};
