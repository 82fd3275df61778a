//! Persistence for places.
//!
//! The engine only sees [`PlaceStore`]; [`PgStore`] keeps places in PostGIS and
//! [`MemoryStore`] keeps them in process.
//!
//! Duplicate coordinates are rejected by validating against [`PlaceStore::list_coordinates`]
//! before writing. That read and the following write are not atomic, so two concurrent
//! writers can both pass validation with the same coordinate. A store closes this gap only
//! if it enforces uniqueness itself: [`PgStore`] always does (unique index), [`MemoryStore`]
//! only when built with [`MemoryStore::with_unique_constraint`].

mod memory;
mod postgres;

use async_trait::async_trait;
use geo_types::Point;
use uuid::Uuid;

use crate::entities::{Place, PlaceRecord};
use crate::error::Error;
use crate::geometry::find_nearest;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// All places, in insertion order.
    async fn list_places(&self) -> Result<Vec<Place>, Error>;

    /// Coordinates of all places, optionally leaving out one place.
    async fn list_coordinates(&self, exclude: Option<Uuid>) -> Result<Vec<Point<f64>>, Error>;

    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, Error>;

    async fn insert_place(&self, record: PlaceRecord) -> Result<Place, Error>;

    /// Replaces the stored fields of `id`. `None` if there is no such place.
    async fn update_place(&self, id: Uuid, record: PlaceRecord) -> Result<Option<Place>, Error>;

    /// `false` if there was no such place.
    async fn delete_place(&self, id: Uuid) -> Result<bool, Error>;

    /// The place closest to `point`. Stores with a native distance ordering should override
    /// this scan.
    async fn nearest_place(&self, point: Point<f64>) -> Result<Option<Place>, Error> {
        let places = self.list_places().await?;

        Ok(find_nearest(&point, &places).cloned())
    }
}
