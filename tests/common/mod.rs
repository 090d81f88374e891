use journey_canvas::model::JourneyPayload;
use journey_canvas::persist::{PersistError, Persistence};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCall {
    ReorderPhases(String, Vec<String>),
    ReorderSteps(String, Vec<String>),
    ReorderCards(String, Vec<String>),
    MoveStep(String, String),
    MoveCard(String, String),
}

/// Records every persistence call; optionally fails them all to exercise
/// the fire-and-forget path.
#[derive(Debug, Default)]
pub struct RecordingPersistence {
    pub calls: Vec<PersistCall>,
    pub fail_all: bool,
}

impl RecordingPersistence {
    fn outcome(&self) -> Result<(), PersistError> {
        if self.fail_all {
            Err(PersistError::Network("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

impl Persistence for RecordingPersistence {
    fn reorder_phases(&mut self, journey_id: &str, ids: &[String]) -> Result<(), PersistError> {
        self.calls
            .push(PersistCall::ReorderPhases(journey_id.into(), ids.to_vec()));
        self.outcome()
    }

    fn reorder_steps(&mut self, phase_id: &str, ids: &[String]) -> Result<(), PersistError> {
        self.calls
            .push(PersistCall::ReorderSteps(phase_id.into(), ids.to_vec()));
        self.outcome()
    }

    fn reorder_cards(&mut self, step_id: &str, ids: &[String]) -> Result<(), PersistError> {
        self.calls
            .push(PersistCall::ReorderCards(step_id.into(), ids.to_vec()));
        self.outcome()
    }

    fn move_step_to_phase(&mut self, step_id: &str, phase_id: &str) -> Result<(), PersistError> {
        self.calls
            .push(PersistCall::MoveStep(step_id.into(), phase_id.into()));
        self.outcome()
    }

    fn move_card_to_step(&mut self, card_id: &str, step_id: &str) -> Result<(), PersistError> {
        self.calls
            .push(PersistCall::MoveCard(card_id.into(), step_id.into()));
        self.outcome()
    }
}

pub fn load_fixture(name: &str) -> JourneyPayload {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("fixture {name} missing: {err}"));
    serde_json::from_str(&contents).unwrap_or_else(|err| panic!("fixture {name} invalid: {err}"))
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
