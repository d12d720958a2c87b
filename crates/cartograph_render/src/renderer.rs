//! # Renderer Boundary
//!
//! The scheduler decodes regions and hands them to a [`RegionRenderer`].
//! Chunks returned by [`Region::chunk`] are always populated, so a renderer
//! can read column surfaces straight away.

use std::sync::Arc;

use cartograph_world::{Region, World};

use crate::error::RenderResult;

/// Turns one decoded region into output tiles.
///
/// Called concurrently from every worker thread, never twice at once for
/// the same region.
pub trait RegionRenderer: Send + Sync {
    /// Renders a region.
    ///
    /// # Errors
    ///
    /// A failed region is logged and reported; its tracker entry is left
    /// untouched so the next pass retries it.
    fn render_region(&self, world: &World, region: &Arc<Region>) -> RenderResult<()>;
}

impl<F> RegionRenderer for F
where
    F: Fn(&World, &Arc<Region>) -> RenderResult<()> + Send + Sync,
{
    fn render_region(&self, world: &World, region: &Arc<Region>) -> RenderResult<()> {
        self(world, region)
    }
}
