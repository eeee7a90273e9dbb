pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::services::{
    activation_service::ActivationService, quiz_service::QuizService,
    result_service::ResultService, session_service::SessionService,
    violation_service::ViolationService,
};
use crate::session::{Clock, DisplayMode};
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub activation_service: ActivationService,
    pub result_service: ResultService,
    pub violation_service: ViolationService,
    pub session_service: SessionService,
}

impl AppState {
    pub fn new(
        stores: Stores,
        display: Arc<dyn DisplayMode>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let quiz_service = QuizService::new(stores.quizzes.clone(), clock.clone());
        let activation_service = ActivationService::new(
            stores.activations.clone(),
            stores.quizzes.clone(),
            clock.clone(),
        );
        let result_service = ResultService::new(stores.results.clone(), clock.clone());
        let violation_service = ViolationService::new(stores.violations.clone());
        let session_service = SessionService::new(stores, display, clock, settings);

        Self {
            quiz_service,
            activation_service,
            result_service,
            violation_service,
            session_service,
        }
    }
}
