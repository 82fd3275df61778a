use axum::extract::{rejection::JsonRejection, Extension, Json, Path, Query};
use axum::http::StatusCode;
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Place, PlaceParams};
use crate::error::Error;
use crate::server::DynAPI;

/// Raw query parameters; parsed here so non-numeric values get the service error body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NearestParams {
    latitude: Option<String>,
    longitude: Option<String>,
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Vec<Place>>, Error> {
    let places = api.list_places().await?;

    Ok(places.into())
}

#[debug_handler]
pub async fn create(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<PlaceParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Place>), Error> {
    let Json(params) = payload?;
    let place = api.create_place(params).await?;

    Ok((StatusCode::CREATED, place.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<Place>, Error> {
    let place = api.find_place(parse_id(&id)?).await?;

    Ok(place.into())
}

#[debug_handler]
pub async fn update(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    payload: Result<Json<PlaceParams>, JsonRejection>,
) -> Result<Json<Place>, Error> {
    let id = parse_id(&id)?;
    let Json(params) = payload?;
    let place = api.update_place(id, params).await?;

    Ok(place.into())
}

pub async fn partial_update(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    payload: Result<Json<PlaceParams>, JsonRejection>,
) -> Result<Json<Place>, Error> {
    let id = parse_id(&id)?;
    let Json(params) = payload?;
    let place = api.partial_update_place(id, params).await?;

    Ok(place.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    api.delete_place(parse_id(&id)?).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn nearest(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<NearestParams>,
) -> Result<Json<Place>, Error> {
    let latitude = parse_coordinate(params.latitude.as_deref())?;
    let longitude = parse_coordinate(params.longitude.as_deref())?;

    let place = api.find_nearest_place(longitude, latitude).await?;

    Ok(place.into())
}

// identifiers that cannot exist are simply unknown
fn parse_id(id: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(id).map_err(|_| Error::not_found_error())
}

fn parse_coordinate(value: Option<&str>) -> Result<f64, Error> {
    value
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| Error::invalid_coordinates_error())
}

#[test]
fn coordinates_must_be_finite_numbers() {
    assert_eq!(parse_coordinate(Some("6.4474")).unwrap(), 6.4474);
    assert_eq!(parse_coordinate(Some(" -2 ")).unwrap(), -2.0);

    for value in [None, Some(""), Some("invalid"), Some("NaN"), Some("inf")] {
        assert_eq!(parse_coordinate(value).unwrap_err().code, 106);
    }
}

#[test]
fn malformed_ids_are_not_found() {
    assert!(parse_id("9999").unwrap_err().is_not_found_error());
    assert!(parse_id(&Uuid::nil().to_string()).is_ok());
}

#[test]
fn handlers_report_statuses() {
    use std::sync::Arc;
    use tokio_test::block_on;

    use crate::db::MemoryStore;
    use crate::engine::Engine;

    let api: DynAPI = Arc::new(Engine::new(MemoryStore::new()));

    let params: PlaceParams = serde_json::from_value(serde_json::json!({
        "name": "Test Place",
        "description": "This is a test place",
        "geom": "POINT (10 20)",
    }))
    .unwrap();

    let (status, Json(place)) =
        block_on(create(Extension(api.clone()), Ok(Json(params)))).unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let status = block_on(delete(Extension(api.clone()), Path(place.id.to_string()))).unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = block_on(find(Extension(api), Path(place.id.to_string()))).unwrap_err();
    assert!(err.is_not_found_error());
}
