mod helpers;
mod place_api;

use crate::{api::API, db::PlaceStore};

pub struct Engine {
    store: Box<dyn PlaceStore>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new<S: PlaceStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }
}

impl API for Engine {}
