use crate::service::Predictor;
use std::sync::Arc;

/// Only constructible from a loaded model, so a router holding it is ready.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
        }
    }
}
