use crate::database::Database;

pub mod history;

pub use history::{
    HistoryError, HistoryStats, NewPrediction, PredictionHistoryRepository, PredictionRecord,
};

pub struct Repositories {
    pub history: PredictionHistoryRepository,
}

impl Repositories {
    pub fn new(db: &Database) -> Self {
        Self {
            history: PredictionHistoryRepository::new(db.pool().clone()),
        }
    }
}
