use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::classifier::DomainClassifier;
use crate::types::{decide, HostClassification, LookupResult, RedirectDecision};

/// Lifecycle of the custom-domain check for one page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    Loading,
    Deciding { host: String },
    Redirecting { location: Url },
    NotFoundDisplay,
    Inactive,
}

impl ControllerState {
    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Deciding { .. } => "deciding",
            Self::Redirecting { .. } => "redirecting",
            Self::NotFoundDisplay => "not_found_display",
            Self::Inactive => "inactive",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Redirecting { .. } | Self::NotFoundDisplay | Self::Inactive
        )
    }

    /// What the page renders while in this state.
    pub fn view(&self) -> View {
        match self {
            Self::Loading | Self::Deciding { .. } => View::Placeholder,
            Self::NotFoundDisplay => View::NotFound,
            Self::Redirecting { .. } | Self::Inactive => View::Nothing,
        }
    }
}

/// Rendering contract of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Placeholder,
    NotFound,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} while {from}")]
    Invalid {
        from: &'static str,
        event: &'static str,
    },
}

/// State machine deciding whether a custom domain redirects to the admin panel.
///
/// Built fresh for every page load. The caller drives it: [`begin`] with the
/// current host, then, for tenant domains only, [`complete`] with the lookup
/// outcome.
///
/// [`begin`]: RedirectController::begin
/// [`complete`]: RedirectController::complete
#[derive(Debug, Clone)]
pub struct RedirectController {
    classifier: DomainClassifier,
    canonical_origin: Url,
    state: ControllerState,
    classification: Option<HostClassification>,
}

impl RedirectController {
    pub fn new(classifier: DomainClassifier, canonical_origin: Url) -> Self {
        Self {
            classifier,
            canonical_origin,
            state: ControllerState::Loading,
            classification: None,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn classification(&self) -> Option<HostClassification> {
        self.classification
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn view(&self) -> View {
        self.state.view()
    }

    /// Classifies `host`. Platform hosts finish immediately as `Inactive`;
    /// tenant hosts move to `Deciding` and need a lookup.
    pub fn begin(&mut self, host: &str) -> Result<HostClassification, TransitionError> {
        if self.state != ControllerState::Loading {
            return Err(self.invalid("begin"));
        }

        let classification = self.classifier.classify(host);
        self.classification = Some(classification);
        self.state = match classification {
            HostClassification::Platform => ControllerState::Inactive,
            HostClassification::TenantCustomDomain => ControllerState::Deciding {
                host: host.to_string(),
            },
        };
        Ok(classification)
    }

    /// Applies the lookup outcome. A `Pending` result leaves the controller
    /// in `Deciding`.
    pub fn complete(
        &mut self,
        current_origin: &Url,
        lookup: LookupResult,
    ) -> Result<&ControllerState, TransitionError> {
        if !matches!(self.state, ControllerState::Deciding { .. }) {
            return Err(self.invalid("complete lookup"));
        }
        if !lookup.is_terminal() {
            return Ok(&self.state);
        }

        let decision = decide(
            HostClassification::TenantCustomDomain,
            &lookup,
            current_origin,
            &self.canonical_origin,
        );
        self.state = match decision {
            RedirectDecision::RedirectTo(location) => ControllerState::Redirecting { location },
            RedirectDecision::ShowNotFound => ControllerState::NotFoundDisplay,
            RedirectDecision::NoAction => ControllerState::Inactive,
        };
        Ok(&self.state)
    }

    fn invalid(&self, event: &'static str) -> TransitionError {
        TransitionError::Invalid {
            from: self.state.as_str(),
            event,
        }
    }
}
