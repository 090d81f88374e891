use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend identifier (uuid on the wire).
pub type EntityId = String;

/// Which kind of ordered collection a scope is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Phases ordered within a journey.
    Phases,
    /// Steps ordered within a phase.
    Steps,
    /// Cards ordered within a step.
    Cards,
}

impl ScopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Phases => "phases",
            ScopeKind::Steps => "steps",
            ScopeKind::Cards => "cards",
        }
    }
}

/// The container an entity currently belongs to: a journey for phases, a
/// phase for steps, a step for cards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId {
    pub kind: ScopeKind,
    /// Id of the owning journey, phase or step.
    pub owner: EntityId,
}

impl ScopeId {
    pub fn phases(journey_id: &str) -> Self {
        Self {
            kind: ScopeKind::Phases,
            owner: journey_id.to_string(),
        }
    }

    pub fn steps(phase_id: &str) -> Self {
        Self {
            kind: ScopeKind::Steps,
            owner: phase_id.to_string(),
        }
    }

    pub fn cards(step_id: &str) -> Self {
        Self {
            kind: ScopeKind::Cards,
            owner: step_id.to_string(),
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.owner)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardData {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sequence_order: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepData {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sequence_order: u32,
    #[serde(default)]
    pub cards: Vec<CardData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhaseData {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sequence_order: u32,
    #[serde(default)]
    pub steps: Vec<StepData>,
}

/// One journey with full structure as the backend returns it, including the
/// sub-journeys anchored to its steps. Sub-journeys nest recursively.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JourneyPayload {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_subjourney: bool,
    #[serde(default)]
    pub parent_step_id: Option<EntityId>,
    #[serde(default)]
    pub phases: Vec<PhaseData>,
    #[serde(default)]
    pub subjourneys: Vec<JourneyPayload>,
}

impl JourneyPayload {
    /// All journeys in the tree, preorder, starting with `self`.
    pub fn journeys(&self) -> Vec<&JourneyPayload> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(journey) = stack.pop() {
            out.push(journey);
            for sub in journey.subjourneys.iter().rev() {
                stack.push(sub);
            }
        }
        out
    }

    pub fn find(&self, journey_id: &str) -> Option<&JourneyPayload> {
        self.journeys().into_iter().find(|j| j.id == journey_id)
    }

    /// The journey whose steps contain `step_id`, if any.
    pub fn journey_owning_step(&self, step_id: &str) -> Option<&JourneyPayload> {
        self.journeys().into_iter().find(|journey| {
            journey
                .phases
                .iter()
                .any(|phase| phase.steps.iter().any(|step| step.id == step_id))
        })
    }

    /// The parent journey of `journey_id`: the one owning its anchor step.
    pub fn parent_of(&self, journey_id: &str) -> Option<&JourneyPayload> {
        let child = self.find(journey_id)?;
        let anchor = child.parent_step_id.as_deref()?;
        self.journey_owning_step(anchor)
    }
}
