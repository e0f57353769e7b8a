//! Everything the engine decided, reported back to the host.
//!
//! `tick()` and the close operations return these so the host can
//! forward them to analytics or just log them. The engine never acts on
//! its own events.

use crate::{
    frequency::SuppressionReason,
    types::{MilestoneId, PresentationType},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MilestoneEvent {
    // ── Evaluation ─────────────────────────────────
    PromptActivated {
        milestone_id: MilestoneId,
        presentation: PresentationType,
    },
    /// Won the pass but its slot was already occupied.
    PromptDropped {
        milestone_id: MilestoneId,
        presentation: PresentationType,
    },
    ModalSuppressed {
        milestone_id: MilestoneId,
        reason:       SuppressionReason,
    },
    SilentMilestoneReached {
        milestone_id: MilestoneId,
    },

    // ── UI close calls ─────────────────────────────
    ModalClosed {
        milestone_id: MilestoneId,
        dismissed:    bool,
    },
    BannerClosed {
        milestone_id: MilestoneId,
    },

    // ── Housekeeping ───────────────────────────────
    DailyCountersReset {
        date: NaiveDate,
    },
}
