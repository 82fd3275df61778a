use async_trait::async_trait;
use geo_types::Point;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::PlaceStore;
use crate::entities::{Place, PlaceRecord};
use crate::error::Error;
use crate::geometry::ValidationError;

/// Keeps places in process, in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    places: Mutex<Vec<Place>>,
    unique_coordinates: bool,
}

impl MemoryStore {
    /// A store without a uniqueness constraint: duplicate coordinates are only caught by
    /// validation, which races with concurrent writers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to hold two places with the same coordinate.
    pub fn with_unique_constraint() -> Self {
        Self {
            places: Mutex::new(vec![]),
            unique_coordinates: true,
        }
    }

    fn check_unique(
        &self,
        places: &[Place],
        geom: &Point<f64>,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        if !self.unique_coordinates {
            return Ok(());
        }

        let taken = places
            .iter()
            .filter(|place| Some(place.id) != exclude)
            .any(|place| place.geom.x_y() == geom.x_y());

        if taken {
            tracing::warn!("duplicate coordinate rejected by store constraint");
            return Err(ValidationError::Duplicate.into());
        }

        Ok(())
    }
}

#[async_trait]
impl PlaceStore for MemoryStore {
    async fn list_places(&self) -> Result<Vec<Place>, Error> {
        Ok(self.places.lock().await.clone())
    }

    async fn list_coordinates(&self, exclude: Option<Uuid>) -> Result<Vec<Point<f64>>, Error> {
        let places = self.places.lock().await;

        Ok(places
            .iter()
            .filter(|place| Some(place.id) != exclude)
            .map(|place| place.geom)
            .collect())
    }

    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, Error> {
        let places = self.places.lock().await;

        Ok(places.iter().find(|place| place.id == id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_place(&self, record: PlaceRecord) -> Result<Place, Error> {
        let mut places = self.places.lock().await;

        self.check_unique(&places, &record.geom, None)?;

        let place = record.into_place(Uuid::new_v4());
        places.push(place.clone());

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn update_place(&self, id: Uuid, record: PlaceRecord) -> Result<Option<Place>, Error> {
        let mut places = self.places.lock().await;

        self.check_unique(&places, &record.geom, Some(id))?;

        let maybe_place = places.iter_mut().find(|place| place.id == id);

        Ok(maybe_place.map(|place| {
            *place = record.into_place(id);
            place.clone()
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, id: Uuid) -> Result<bool, Error> {
        let mut places = self.places.lock().await;

        let before = places.len();
        places.retain(|place| place.id != id);

        Ok(places.len() < before)
    }
}

#[cfg(test)]
fn record(name: &str, x: f64, y: f64) -> PlaceRecord {
    PlaceRecord {
        name: name.into(),
        description: "".into(),
        geom: Point::new(x, y),
    }
}

#[test]
fn crud_round_trip() {
    use tokio_test::block_on;

    let store = MemoryStore::new();

    let place = block_on(store.insert_place(record("Harbour", 10.0, 20.0))).unwrap();
    assert_eq!(block_on(store.find_place(place.id)).unwrap(), Some(place.clone()));

    let updated = block_on(store.update_place(place.id, record("Pier", 11.0, 21.0)))
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, place.id);
    assert_eq!(updated.name, "Pier");
    assert_eq!(updated.geom, Point::new(11.0, 21.0));

    assert!(block_on(store.update_place(Uuid::new_v4(), record("Ghost", 0.0, 0.0)))
        .unwrap()
        .is_none());

    assert!(block_on(store.delete_place(place.id)).unwrap());
    assert!(!block_on(store.delete_place(place.id)).unwrap());
    assert!(block_on(store.list_places()).unwrap().is_empty());
}

#[test]
fn coordinates_can_exclude_a_place() {
    use tokio_test::block_on;

    let store = MemoryStore::new();
    let a = block_on(store.insert_place(record("A", 1.0, 2.0))).unwrap();
    block_on(store.insert_place(record("B", 3.0, 4.0))).unwrap();

    let all = block_on(store.list_coordinates(None)).unwrap();
    assert_eq!(all, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);

    let others = block_on(store.list_coordinates(Some(a.id))).unwrap();
    assert_eq!(others, vec![Point::new(3.0, 4.0)]);
}

#[test]
fn nearest_scan_uses_insertion_order_for_ties() {
    use tokio_test::block_on;

    let store = MemoryStore::new();
    assert!(block_on(store.nearest_place(Point::new(0.0, 0.0)))
        .unwrap()
        .is_none());

    let east = block_on(store.insert_place(record("East", 1.0, 0.0))).unwrap();
    block_on(store.insert_place(record("West", -1.0, 0.0))).unwrap();
    block_on(store.insert_place(record("Far", 50.0, 50.0))).unwrap();

    let nearest = block_on(store.nearest_place(Point::new(0.0, 0.0)))
        .unwrap()
        .unwrap();
    assert_eq!(nearest.id, east.id);
}

#[test]
fn validation_races_without_store_constraint() {
    use crate::geometry::validate;
    use tokio_test::block_on;

    let store = MemoryStore::new();

    // two writers validate against the same snapshot before either inserts
    let snapshot = block_on(store.list_coordinates(None)).unwrap();
    let first = validate(&"POINT (10 20)".into(), &snapshot).unwrap();
    let second = validate(&"POINT (10.0 20.0)".into(), &snapshot).unwrap();

    block_on(store.insert_place(record("First", first.x(), first.y()))).unwrap();
    block_on(store.insert_place(record("Second", second.x(), second.y()))).unwrap();

    let coordinates = block_on(store.list_coordinates(None)).unwrap();
    assert_eq!(
        coordinates,
        vec![Point::new(10.0, 20.0), Point::new(10.0, 20.0)]
    );
}

#[test]
fn unique_constraint_closes_the_race() {
    use crate::geometry::validate;
    use tokio_test::block_on;

    let store = MemoryStore::with_unique_constraint();

    let snapshot = block_on(store.list_coordinates(None)).unwrap();
    let first = validate(&"POINT (10 20)".into(), &snapshot).unwrap();
    let second = validate(&"POINT (10.0 20.0)".into(), &snapshot).unwrap();

    let place = block_on(store.insert_place(record("First", first.x(), first.y()))).unwrap();
    let err = block_on(store.insert_place(record("Second", second.x(), second.y()))).unwrap_err();
    assert_eq!(err.code, 104);

    // a place keeping its own coordinate is not a duplicate of itself
    assert!(block_on(store.update_place(place.id, record("First", 10.0, 20.0)))
        .unwrap()
        .is_some());
}
