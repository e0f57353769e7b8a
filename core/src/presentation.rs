//! Presentation Controller: the two prompt slots the UI renders.
//!
//! One modal slot and one banner slot, independent of each other.
//! Nothing queues: activating into an occupied slot drops the prompt.

use crate::{
    registry::{MilestoneDefinition, PromptPayload},
    types::{MilestoneId, PresentationType},
};
use serde::Serialize;

/// A prompt the UI is currently showing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Prompt {
    pub milestone_id: MilestoneId,
    pub presentation: PresentationType,
    pub payload:      PromptPayload,
}

impl From<&MilestoneDefinition> for Prompt {
    fn from(def: &MilestoneDefinition) -> Self {
        Self {
            milestone_id: def.id.clone(),
            presentation: def.presentation,
            payload:      def.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresentationController {
    active_modal:  Option<Prompt>,
    active_banner: Option<Prompt>,
}

impl PresentationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_modal(&self) -> Option<&Prompt> {
        self.active_modal.as_ref()
    }

    pub fn active_banner(&self) -> Option<&Prompt> {
        self.active_banner.as_ref()
    }

    /// Fill the matching slot if it is empty. Returns false when the
    /// prompt was dropped (slot occupied, or a silent milestone).
    pub fn activate(&mut self, def: &MilestoneDefinition) -> bool {
        let slot = match def.presentation {
            PresentationType::Modal  => &mut self.active_modal,
            PresentationType::Banner => &mut self.active_banner,
            PresentationType::Silent => return false,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(Prompt::from(def));
        true
    }

    /// Clear the modal slot, returning what was showing.
    pub fn close_modal(&mut self) -> Option<Prompt> {
        self.active_modal.take()
    }

    pub fn close_banner(&mut self) -> Option<Prompt> {
        self.active_banner.take()
    }
}
