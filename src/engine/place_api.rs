use super::helpers::{fetch_place, validate_geom};
use super::Engine;

use async_trait::async_trait;
use geo_types::Point;
use uuid::Uuid;

use crate::{
    api::PlaceAPI,
    entities::{validate_name, Place, PlaceParams, PlaceRecord},
    error::Error,
    geometry::check_range,
};

impl Engine {
    /// Builds a complete record from `params`, as for create and full update.
    async fn record_from_params(
        &self,
        params: PlaceParams,
        exclude: Option<Uuid>,
    ) -> Result<PlaceRecord, Error> {
        let name = params
            .name
            .as_deref()
            .ok_or_else(|| Error::missing_field_error("name"))?;
        let name = validate_name(name)?;

        let input = params
            .geom
            .ok_or_else(|| Error::missing_field_error("geom"))?;
        let geom = validate_geom(self.store.as_ref(), &input, exclude).await?;

        Ok(PlaceRecord {
            name,
            description: params.description.unwrap_or_default(),
            geom,
        })
    }
}

#[async_trait]
impl PlaceAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_places(&self) -> Result<Vec<Place>, Error> {
        self.store.list_places().await
    }

    #[tracing::instrument(skip(self))]
    async fn create_place(&self, params: PlaceParams) -> Result<Place, Error> {
        let record = self.record_from_params(params, None).await?;

        let place = self.store.insert_place(record).await?;
        tracing::info!("created place {}", place.id);

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: Uuid) -> Result<Place, Error> {
        fetch_place(self.store.as_ref(), &id).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_place(&self, id: Uuid, params: PlaceParams) -> Result<Place, Error> {
        fetch_place(self.store.as_ref(), &id).await?;

        let record = self.record_from_params(params, Some(id)).await?;

        // the place may have been deleted since it was fetched
        self.store
            .update_place(id, record)
            .await?
            .ok_or_else(|| Error::not_found_error())
    }

    #[tracing::instrument(skip(self))]
    async fn partial_update_place(&self, id: Uuid, params: PlaceParams) -> Result<Place, Error> {
        let place = fetch_place(self.store.as_ref(), &id).await?;

        let name = match params.name.as_deref() {
            Some(name) => validate_name(name)?,
            None => place.name,
        };

        let geom = match &params.geom {
            Some(input) => validate_geom(self.store.as_ref(), input, Some(id)).await?,
            None => place.geom,
        };

        let record = PlaceRecord {
            name,
            description: params.description.unwrap_or(place.description),
            geom,
        };

        self.store
            .update_place(id, record)
            .await?
            .ok_or_else(|| Error::not_found_error())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, id: Uuid) -> Result<(), Error> {
        if !self.store.delete_place(id).await? {
            return Err(Error::not_found_error());
        }

        tracing::info!("deleted place {}", id);

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_nearest_place(&self, longitude: f64, latitude: f64) -> Result<Place, Error> {
        let query = Point::new(longitude, latitude);
        check_range(&query)?;

        self.store
            .nearest_place(query)
            .await?
            .ok_or_else(|| Error::no_places_error())
    }
}

#[cfg(test)]
fn setup() -> (Engine, Place) {
    use crate::db::MemoryStore;
    use tokio_test::block_on;

    let engine = Engine::new(MemoryStore::new());
    let place = block_on(engine.create_place(params(
        "Existing Place",
        "This is an existing place",
        "POINT (30 40)",
    )))
    .unwrap();

    (engine, place)
}

#[cfg(test)]
fn params(name: &str, description: &str, geom: &str) -> PlaceParams {
    PlaceParams {
        name: Some(name.into()),
        description: Some(description.into()),
        geom: Some(geom.into()),
    }
}

#[test]
fn create_place() {
    use tokio_test::block_on;

    let (engine, _) = setup();

    let place = block_on(engine.create_place(params(
        "Test Place",
        "This is a test place",
        "POINT (10 20)",
    )))
    .unwrap();

    assert_eq!(place.name, "Test Place");
    assert_eq!(place.geom, Point::new(10.0, 20.0));
    assert_eq!(block_on(engine.find_place(place.id)).unwrap(), place);
    assert_eq!(block_on(engine.list_places()).unwrap().len(), 2);
}

#[test]
fn create_place_requires_name_and_geom() {
    use tokio_test::block_on;

    let (engine, _) = setup();

    let err = block_on(engine.create_place(params("", "blank", "POINT (10 20)"))).unwrap_err();
    assert_eq!(err.code, 105);

    let missing_name = PlaceParams {
        name: None,
        ..params("x", "no name", "POINT (10 20)")
    };
    assert_eq!(block_on(engine.create_place(missing_name)).unwrap_err().code, 105);

    let missing_geom = PlaceParams {
        geom: None,
        ..params("x", "no geom", "POINT (10 20)")
    };
    assert_eq!(block_on(engine.create_place(missing_geom)).unwrap_err().code, 105);

    assert_eq!(block_on(engine.list_places()).unwrap().len(), 1);
}

#[test]
fn create_place_without_description() {
    use tokio_test::block_on;

    let (engine, _) = setup();

    let place = block_on(engine.create_place(PlaceParams {
        description: None,
        ..params("Quiet", "", "POINT (1 1)")
    }))
    .unwrap();
    assert_eq!(place.description, "");
}

#[test]
fn create_place_rejects_invalid_geometry() {
    use tokio_test::block_on;

    let (engine, _) = setup();

    let cases = [
        ("POLYGON ((0 0, 1 1, 2 2, 0 0))", 102),
        ("POINT (200 50)", 103),
        ("POINT (-200 50)", 103),
        ("POINT (30 40)", 104),
        ("POINT(30   40)", 104),
        ("not a geometry", 101),
        ("POINT (1 2) junk", 101),
        (
            r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}}"#,
            101,
        ),
    ];

    for (geom, code) in cases {
        let err = block_on(engine.create_place(params("Invalid Place", "", geom))).unwrap_err();
        assert_eq!(err.code, code, "{}", geom);
    }

    assert_eq!(block_on(engine.list_places()).unwrap().len(), 1);
}

#[test]
fn update_place() {
    use tokio_test::block_on;

    let (engine, place) = setup();

    let updated = block_on(engine.update_place(
        place.id,
        params("Updated Place", "This is an updated place", "POINT (50 60)"),
    ))
    .unwrap();

    assert_eq!(updated.id, place.id);
    assert_eq!(updated.name, "Updated Place");
    assert_eq!(updated.geom, Point::new(50.0, 60.0));
    assert_eq!(block_on(engine.find_place(place.id)).unwrap(), updated);
}

#[test]
fn update_place_may_keep_its_coordinate() {
    use tokio_test::block_on;

    let (engine, place) = setup();

    let updated = block_on(engine.update_place(
        place.id,
        params("Renamed", "same spot", "POINT (30 40)"),
    ))
    .unwrap();
    assert_eq!(updated.geom, place.geom);
}

#[test]
fn update_place_with_invalid_data() {
    use tokio_test::block_on;

    let (engine, place) = setup();
    let other = block_on(engine.create_place(params("Other", "", "POINT (1 2)"))).unwrap();

    let err = block_on(engine.update_place(
        place.id,
        params("", "This is an updated place", "POINT (50 60)"),
    ))
    .unwrap_err();
    assert_eq!(err.code, 105);

    let err = block_on(engine.update_place(place.id, params("Clash", "", "POINT (1 2)")))
        .unwrap_err();
    assert_eq!(err.code, 104);

    assert_eq!(block_on(engine.find_place(place.id)).unwrap(), place);
    assert_eq!(block_on(engine.find_place(other.id)).unwrap(), other);
}

#[test]
fn partial_update_place() {
    use tokio_test::block_on;

    let (engine, place) = setup();

    let updated = block_on(engine.partial_update_place(
        place.id,
        PlaceParams {
            description: Some("This is an updated description".into()),
            ..PlaceParams::default()
        },
    ))
    .unwrap();

    assert_eq!(updated.name, place.name);
    assert_eq!(updated.description, "This is an updated description");
    assert_eq!(updated.geom, place.geom);

    let moved = block_on(engine.partial_update_place(
        place.id,
        PlaceParams {
            geom: Some("POINT (31 41)".into()),
            ..PlaceParams::default()
        },
    ))
    .unwrap();
    assert_eq!(moved.geom, Point::new(31.0, 41.0));
    assert_eq!(moved.description, "This is an updated description");

    let err = block_on(engine.partial_update_place(
        place.id,
        PlaceParams {
            geom: Some("POINT (31 95)".into()),
            ..PlaceParams::default()
        },
    ))
    .unwrap_err();
    assert_eq!(err.code, 103);
}

#[test]
fn unknown_places_are_not_found() {
    use tokio_test::block_on;

    let (engine, _) = setup();
    let id = Uuid::new_v4();

    assert!(block_on(engine.find_place(id))
        .unwrap_err()
        .is_not_found_error());
    assert!(block_on(engine.update_place(id, params("x", "", "POINT (5 5)")))
        .unwrap_err()
        .is_not_found_error());
    assert!(block_on(engine.partial_update_place(id, PlaceParams::default()))
        .unwrap_err()
        .is_not_found_error());
    assert!(block_on(engine.delete_place(id))
        .unwrap_err()
        .is_not_found_error());
}

#[test]
fn delete_place() {
    use tokio_test::block_on;

    let (engine, place) = setup();

    block_on(engine.delete_place(place.id)).unwrap();
    assert!(block_on(engine.find_place(place.id)).is_err());
    assert!(block_on(engine.list_places()).unwrap().is_empty());
}

#[test]
fn find_nearest_place() {
    use tokio_test::block_on;

    let (engine, place) = setup();

    let nearest = block_on(engine.find_nearest_place(2.5241, 6.4474)).unwrap();
    assert_eq!(nearest, place);

    let closer = block_on(engine.create_place(params("Closer", "", "POINT (10 20)"))).unwrap();
    let nearest = block_on(engine.find_nearest_place(0.0, 0.0)).unwrap();
    assert_eq!(nearest, closer);
}

#[test]
fn find_nearest_place_in_empty_store() {
    use crate::db::MemoryStore;
    use tokio_test::block_on;

    let engine = Engine::new(MemoryStore::new());

    let err = block_on(engine.find_nearest_place(0.0, 0.0)).unwrap_err();
    assert_eq!(err.code, 201);
}

#[test]
fn find_nearest_place_rejects_out_of_range_query() {
    use tokio_test::block_on;

    let (engine, _) = setup();

    assert_eq!(
        block_on(engine.find_nearest_place(181.0, 0.0))
            .unwrap_err()
            .code,
        103
    );
    assert_eq!(
        block_on(engine.find_nearest_place(0.0, f64::INFINITY))
            .unwrap_err()
            .code,
        101
    );
}
