use geo::GeodesicDistance;
use geo_types::Point;

/// Anything with a WGS84 position.
pub trait Located {
    fn location(&self) -> Point<f64>;
}

impl Located for Point<f64> {
    fn location(&self) -> Point<f64> {
        *self
    }
}

/// Returns the candidate with the smallest geodesic (WGS84 ellipsoid) distance to `query`.
///
/// Ties resolve to the first candidate in iteration order. `None` when there are no candidates.
pub fn find_nearest<'a, T: Located>(query: &Point<f64>, candidates: &'a [T]) -> Option<&'a T> {
    candidates
        .iter()
        .map(|candidate| (candidate, query.geodesic_distance(&candidate.location())))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate)
}

#[test]
fn empty_candidates_find_nothing() {
    let candidates: Vec<Point<f64>> = vec![];
    assert!(find_nearest(&Point::new(0.0, 0.0), &candidates).is_none());
}

#[test]
fn picks_smaller_geodesic_distance() {
    let candidates = vec![Point::new(30.0, 40.0), Point::new(10.0, 20.0)];

    let nearest = find_nearest(&Point::new(0.0, 0.0), &candidates).unwrap();
    assert_eq!(*nearest, Point::new(10.0, 20.0));
}

#[test]
fn single_candidate_is_nearest() {
    let candidates = vec![Point::new(30.0, 40.0)];

    let nearest = find_nearest(&Point::new(2.5241, 6.4474), &candidates).unwrap();
    assert_eq!(*nearest, Point::new(30.0, 40.0));
}

#[test]
fn longitude_degrees_shrink_towards_poles() {
    // 10 degrees of longitude at 60N (~558km) is closer than 6 degrees of latitude (~668km),
    // even though a planar metric on raw degrees says otherwise
    let candidates = vec![Point::new(0.0, 54.0), Point::new(10.0, 60.0)];

    let nearest = find_nearest(&Point::new(0.0, 60.0), &candidates).unwrap();
    assert_eq!(*nearest, Point::new(10.0, 60.0));
}

#[test]
fn crosses_the_antimeridian() {
    let candidates = vec![Point::new(170.0, 0.0), Point::new(-179.0, 0.0)];

    let nearest = find_nearest(&Point::new(179.5, 0.0), &candidates).unwrap();
    assert_eq!(*nearest, Point::new(-179.0, 0.0));
}

#[test]
fn ties_resolve_to_first_candidate() {
    struct Named(&'static str, Point<f64>);

    impl Located for Named {
        fn location(&self) -> Point<f64> {
            self.1
        }
    }

    let candidates = vec![
        Named("east", Point::new(1.0, 0.0)),
        Named("west", Point::new(-1.0, 0.0)),
    ];

    let nearest = find_nearest(&Point::new(0.0, 0.0), &candidates).unwrap();
    assert_eq!(nearest.0, "east");

    let reversed = vec![
        Named("west", Point::new(-1.0, 0.0)),
        Named("east", Point::new(1.0, 0.0)),
    ];
    let nearest = find_nearest(&Point::new(0.0, 0.0), &reversed).unwrap();
    assert_eq!(nearest.0, "west");
}
