//! Messages the wizard engine asks the presentation layer to render.
//!
//! These carry data only; wording and keyboards live in
//! `presentation::render`.

use kbuilder_types::build::{BuildConfiguration, BuildField};
use kbuilder_types::dispatch::DispatchRecord;
use kbuilder_types::error::ValidationError;
use kbuilder_types::session::WizardStep;

/// One outbound message for the session that sent the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Welcome,
    Help,
    /// A slash command the bot does not know.
    UnknownCommand(String),
    /// Ask for the field of a `Collect*` step.
    Prompt(Prompt),
    /// Show the finished draft and ask for confirm / edit / cancel.
    Summary {
        config: BuildConfiguration,
        /// Set when the previous answer was not one of the three choices.
        unrecognized: Option<String>,
    },
    /// The wizard was aborted and the session cleared.
    Cancelled,
    /// Input arrived while no wizard is running.
    NoActiveBuild,
    /// Terminal outcome of a wizard run.
    Dispatched(DispatchRecord),
    Status(StatusReport),
}

/// A request for one configuration field.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub step: WizardStep,
    /// Value currently in the draft, offered as the `default` answer.
    pub current: String,
    /// The field and value accepted on the previous step, if any.
    pub accepted: Option<(BuildField, String)>,
    /// Why the last answer for this step was rejected.
    pub error: Option<ValidationError>,
    /// Set when `/build` was sent while this wizard was already running.
    pub resumed: bool,
}

impl Prompt {
    pub fn new(step: WizardStep, current: impl Into<String>) -> Self {
        Self {
            step,
            current: current.into(),
            accepted: None,
            error: None,
            resumed: false,
        }
    }
}

/// Answer to a `/status` query.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Step of the running wizard, or `None` when no build is active.
    pub active_step: Option<WizardStep>,
    pub last_dispatch: Option<DispatchRecord>,
}
