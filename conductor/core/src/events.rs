//! Surface Events
//!
//! Events sent from UI surfaces to the Conductor. Surfaces report what the
//! user did; the Conductor decides what it means and answers with
//! [`ConductorMessage`](crate::ConductorMessage)s.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Events from UI Surface to Conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// User submitted a message
    UserMessage {
        /// The message content, untrimmed
        content: String,
    },

    /// User picked a model
    SelectModel {
        /// Model identifier; must be one of the configured models
        model: String,
    },

    /// User picked a scenario
    SelectScenario {
        /// Scenario name; must exist in the catalogue
        scenario: String,
    },

    /// User asked for the next model in the list
    CycleModel,

    /// User asked for the next scenario in the list
    CycleScenario,

    /// User switched continuation mode
    SetContinuation {
        /// New value
        enabled: bool,
    },

    /// User chose where chat logs are written
    SetLogDir {
        /// Directory; must exist
        path: PathBuf,
    },

    /// User requested quit
    QuitRequested,
}

impl SurfaceEvent {
    /// Convenience constructor for a user message
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }
}
