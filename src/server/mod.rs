mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};

use crate::api::API;
use crate::error::Error;
use crate::server::handlers::places;

pub type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/places/", get(places::list).post(places::create))
        .route("/places/nearest/", get(places::nearest))
        .route(
            "/places/:id/",
            get(places::find)
                .put(places::update)
                .patch(places::partial_update)
                .delete(places::delete),
        )
        .route("/nearest-place/", get(places::nearest))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(api));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(Error::server_error)
}

#[cfg(test)]
async fn test_app() -> (Router, crate::entities::Place) {
    use crate::api::PlaceAPI;
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use crate::entities::PlaceParams;

    let engine = Engine::new(MemoryStore::new());
    let place = engine
        .create_place(PlaceParams {
            name: Some("Existing Place".into()),
            description: Some("This is an existing place".into()),
            geom: Some("POINT (30 40)".into()),
        })
        .await
        .unwrap();

    (router(Arc::new(engine)), place)
}

#[cfg(test)]
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

#[test]
fn list_places() {
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let (app, place) = test_app().await;

        let (status, body) = send(&app, "GET", "/places/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": place.id.to_string(),
                "name": "Existing Place",
                "description": "This is an existing place",
                "geom": "POINT (30 40)",
            }])
        );
    });
}

#[test]
fn create_place_renders_canonical_wkt() {
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let (app, _) = test_app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/places/",
            Some(json!({
                "name": "Test Place",
                "description": "This is a test place",
                "geom": {"longitude": 10.0, "latitude": 20.0},
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["geom"], "POINT (10 20)");

        let uri = format!("/places/{}/", body["id"].as_str().unwrap());
        let (status, fetched) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, body);

        let (status, body) = send(
            &app,
            "POST",
            "/places/",
            Some(json!({
                "name": "Spaced",
                "geom": "SRID=4326;POINT(  1.50   -2.0 )",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["geom"], "POINT (1.5 -2)");
        assert_eq!(body["description"], "");
    });
}

#[test]
fn create_place_with_invalid_data() {
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let (app, _) = test_app().await;

        let cases = [
            (json!({"name": "", "geom": "POINT (10 20)"}), 105),
            (json!({"name": "Invalid Place", "geom": "POLYGON ((0 0, 1 1, 2 2, 0 0))"}), 102),
            (json!({"name": "Invalid Place", "geom": "POINT (200 50)"}), 103),
            (json!({"name": "Duplicate", "geom": "POINT (30 40)"}), 104),
            (json!({"name": "Garbage", "geom": "POINT (ten twenty)"}), 101),
        ];

        for (payload, code) in cases {
            let (status, body) = send(&app, "POST", "/places/", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], code);
        }

        let (status, _) = send(&app, "GET", "/places/", None).await;
        assert_eq!(status, StatusCode::OK);
    });
}

#[test]
fn malformed_body_is_bad_request() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use tokio_test::block_on;

    block_on(async {
        let (app, _) = test_app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/places/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[test]
fn update_and_partial_update_place() {
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio_test::block_on;

    block_on(async {
        let (app, place) = test_app().await;
        let uri = format!("/places/{}/", place.id);

        let (status, body) = send(
            &app,
            "PUT",
            &uri,
            Some(json!({
                "name": "Updated Place",
                "description": "This is an updated place",
                "geom": "POINT (50 60)",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Updated Place");
        assert_eq!(body["geom"], "POINT (50 60)");

        let (status, body) = send(
            &app,
            "PATCH",
            &uri,
            Some(json!({"description": "This is an updated description"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Updated Place");
        assert_eq!(body["description"], "This is an updated description");
        assert_eq!(body["geom"], "POINT (50 60)");

        let (status, _) = send(&app, "PUT", &uri, Some(json!({"name": "", "geom": "POINT (50 60)"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(body["name"], "Updated Place");
    });
}

#[test]
fn delete_place() {
    use axum::http::StatusCode;
    use tokio_test::block_on;

    block_on(async {
        let (app, place) = test_app().await;
        let uri = format!("/places/{}/", place.id);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, serde_json::Value::Null);

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/places/9999/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    });
}

#[test]
fn get_nearest_place() {
    use axum::http::StatusCode;
    use tokio_test::block_on;

    block_on(async {
        let (app, place) = test_app().await;

        for uri in [
            "/places/nearest/?latitude=6.4474&longitude=2.5241",
            "/nearest-place/?latitude=6.4474&longitude=2.5241",
        ] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["id"], place.id.to_string());
            assert_eq!(body["name"], "Existing Place");
            assert_eq!(body["description"], "This is an existing place");
            assert_eq!(body["geom"], "POINT (30 40)");
        }
    });
}

#[test]
fn get_nearest_place_with_invalid_coordinates() {
    use axum::http::StatusCode;
    use tokio_test::block_on;

    block_on(async {
        let (app, _) = test_app().await;

        for uri in [
            "/places/nearest/?latitude=invalid&longitude=coordinates",
            "/places/nearest/?latitude=6.4474",
            "/places/nearest/",
        ] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], 106);
        }

        let (status, body) = send(&app, "GET", "/places/nearest/?latitude=95&longitude=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 103);
    });
}

#[test]
fn get_nearest_place_without_places() {
    use axum::http::StatusCode;
    use tokio_test::block_on;

    use crate::db::MemoryStore;
    use crate::engine::Engine;

    block_on(async {
        let app = router(Arc::new(Engine::new(MemoryStore::new())));

        let (status, body) = send(&app, "GET", "/places/nearest/?latitude=0&longitude=0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 201);
    });
}
