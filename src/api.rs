use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Place, PlaceParams};
use crate::error::Error;

#[async_trait]
pub trait PlaceAPI {
    async fn list_places(&self) -> Result<Vec<Place>, Error>;

    /// Requires `name` and `geom`; `description` defaults to empty.
    async fn create_place(&self, params: PlaceParams) -> Result<Place, Error>;

    async fn find_place(&self, id: Uuid) -> Result<Place, Error>;

    /// Full update: same requirements as [`PlaceAPI::create_place`].
    async fn update_place(&self, id: Uuid, params: PlaceParams) -> Result<Place, Error>;

    /// Changes only the supplied fields.
    async fn partial_update_place(&self, id: Uuid, params: PlaceParams) -> Result<Place, Error>;

    async fn delete_place(&self, id: Uuid) -> Result<(), Error>;

    async fn find_nearest_place(&self, longitude: f64, latitude: f64) -> Result<Place, Error>;
}

pub trait API: PlaceAPI {}
