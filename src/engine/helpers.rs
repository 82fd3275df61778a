use geo_types::Point;
use uuid::Uuid;

use crate::{
    db::PlaceStore,
    entities::Place,
    error::Error,
    geometry::{validate, GeometryInput},
};

#[tracing::instrument(skip(store))]
pub async fn fetch_place(store: &dyn PlaceStore, id: &Uuid) -> Result<Place, Error> {
    store
        .find_place(*id)
        .await?
        .ok_or_else(|| Error::not_found_error())
}

/// Validates `input` against every stored coordinate except the one belonging to `exclude`,
/// so a place may keep its own coordinate on update.
#[tracing::instrument(skip(store))]
pub async fn validate_geom(
    store: &dyn PlaceStore,
    input: &GeometryInput,
    exclude: Option<Uuid>,
) -> Result<Point<f64>, Error> {
    let existing = store.list_coordinates(exclude).await?;

    match validate(input, &existing) {
        Ok(validated) => Ok(validated.point),
        Err(err) => {
            tracing::info!("rejected geometry: {}", err);
            Err(err.into())
        }
    }
}
