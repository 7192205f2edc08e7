// The three interactive funnels, built as step functions over the shared
// wizard engine. Steps talk to the outside world only through the
// `FlowContext` collaborators, which is what makes the flows testable
// end to end with a scripted prompter and a mock backend.

pub mod check;
pub mod lotto;
pub mod vaccination;

use serde::{Deserialize, Serialize};

use crate::api::CatalogClient;
use crate::ui::{Presenter, Prompter};

/// Everything a step may touch: the catalog client plus the two terminal
/// collaborators (selection prompts in, structured results out).
pub struct FlowContext<'a> {
    pub api: &'a mut CatalogClient,
    pub prompt: &'a mut dyn Prompter,
    pub present: &'a mut dyn Presenter,
}

/// A display label paired with the opaque identifier it stands for.
/// Labels are the user-facing key, so they must be unique within one
/// step's choice set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub label: String,
    pub id: String,
}

pub(crate) fn labels(choices: &[Choice]) -> Vec<String> {
    choices.iter().map(|c| c.label.clone()).collect()
}

/// 11-digit Georgian personal ID.
pub const PERSONAL_NUMBER_LEN: usize = 11;
/// 6-digit booking reference.
pub const BOOKING_NUMBER_LEN: usize = 6;
