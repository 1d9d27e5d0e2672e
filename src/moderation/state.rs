// Moderation state machine for a single comment submission.
//
// `transition` is pure: it takes the current state and an event and returns
// the next state plus the side effect the caller must perform. The only
// effect is appending to the ledger, and it is only ever emitted on entry to
// `Published`. Terminal states accept no events, so a session can publish at
// most once.

use serde::Serialize;

use crate::error::ModerationError;

/// Shown when a comment is held back for review.
pub const FLAG_WARNING: &str =
    "Your comment may be considered toxic. Edit it and check again, submit it anyway, or cancel.";

/// How a comment reached `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// Non-toxic on first check
    Clean,
    /// Flagged, then edited into something non-toxic
    Rechecked,
    /// Flagged and submitted anyway
    Overridden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub text: String,
    pub is_toxic: bool,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModerationState {
    Draft { text: String },
    Checked { text: String, is_toxic: bool },
    Flagged { text: String },
    Published(Publication),
    Cancelled,
}

impl ModerationState {
    /// Start a submission. Whitespace-only text is rejected.
    pub fn draft(text: impl Into<String>) -> Result<Self, ModerationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ModerationError::EmptyComment);
        }
        Ok(Self::Draft { text })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft { .. } => "draft",
            Self::Checked { .. } => "checked",
            Self::Flagged { .. } => "flagged",
            Self::Published(_) => "published",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published(_) | Self::Cancelled)
    }

    /// The text currently under consideration, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Draft { text } | Self::Checked { text, .. } | Self::Flagged { text } => {
                Some(text)
            }
            Self::Published(p) => Some(&p.text),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationEvent {
    /// The draft text was classified
    Classified { is_toxic: bool },
    /// Act on the classification: publish clean text or flag toxic text
    Resolve,
    /// Edited text was classified while flagged
    Recheck { text: String, is_toxic: bool },
    /// Publish the flagged text as known-toxic
    Override,
    Cancel,
}

impl ModerationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classified { .. } => "classified",
            Self::Resolve => "resolve",
            Self::Recheck { .. } => "recheck",
            Self::Override => "override",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    AppendToLedger { text: String, is_toxic: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: ModerationState,
    pub effect: Effect,
}

impl Transition {
    fn to(next: ModerationState) -> Self {
        Self {
            next,
            effect: Effect::None,
        }
    }

    fn publish(text: &str, is_toxic: bool, route: Route) -> Self {
        Self {
            next: ModerationState::Published(Publication {
                text: text.to_string(),
                is_toxic,
                route,
            }),
            effect: Effect::AppendToLedger {
                text: text.to_string(),
                is_toxic,
            },
        }
    }
}

pub fn transition(
    state: &ModerationState,
    event: ModerationEvent,
) -> Result<Transition, ModerationError> {
    use ModerationEvent as E;
    use ModerationState as S;

    match (state, event) {
        (S::Draft { text }, E::Classified { is_toxic }) => {
            if text.trim().is_empty() {
                return Err(ModerationError::EmptyComment);
            }
            Ok(Transition::to(S::Checked {
                text: text.clone(),
                is_toxic,
            }))
        }

        (S::Checked { text, is_toxic: false }, E::Resolve) => {
            Ok(Transition::publish(text, false, Route::Clean))
        }
        (S::Checked { text, is_toxic: true }, E::Resolve) => {
            Ok(Transition::to(S::Flagged { text: text.clone() }))
        }

        (S::Flagged { .. }, E::Recheck { text, is_toxic }) => {
            if text.trim().is_empty() {
                return Err(ModerationError::EmptyComment);
            }
            if is_toxic {
                Ok(Transition::to(S::Flagged { text }))
            } else {
                Ok(Transition::publish(&text, false, Route::Rechecked))
            }
        }

        (S::Flagged { text }, E::Override) => Ok(Transition::publish(text, true, Route::Overridden)),

        (S::Draft { .. } | S::Flagged { .. }, E::Cancel) => Ok(Transition::to(S::Cancelled)),

        (state, event) => Err(ModerationError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(text: &str) -> ModerationState {
        ModerationState::Flagged {
            text: text.to_string(),
        }
    }

    fn checked(text: &str, is_toxic: bool) -> ModerationState {
        ModerationState::Checked {
            text: text.to_string(),
            is_toxic,
        }
    }

    #[test]
    fn test_draft_rejects_blank_text() {
        assert!(matches!(
            ModerationState::draft("   \n"),
            Err(ModerationError::EmptyComment)
        ));
        assert_eq!(ModerationState::draft("hi").unwrap().name(), "draft");
    }

    #[test]
    fn test_classified_draft_becomes_checked() {
        let draft = ModerationState::draft("hello").unwrap();
        let t = transition(&draft, ModerationEvent::Classified { is_toxic: true }).unwrap();
        assert_eq!(t.next, checked("hello", true));
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_clean_comment_publishes_with_append() {
        let t = transition(&checked("hello", false), ModerationEvent::Resolve).unwrap();
        assert_eq!(
            t.effect,
            Effect::AppendToLedger {
                text: "hello".to_string(),
                is_toxic: false
            }
        );
        match t.next {
            ModerationState::Published(p) => assert_eq!(p.route, Route::Clean),
            other => panic!("expected published, got {other:?}"),
        }
    }

    #[test]
    fn test_toxic_comment_is_flagged_without_write() {
        let t = transition(&checked("idiot comment", true), ModerationEvent::Resolve).unwrap();
        assert_eq!(t.next, flagged("idiot comment"));
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_toxic_recheck_substitutes_text() {
        let t = transition(
            &flagged("idiot comment"),
            ModerationEvent::Recheck {
                text: "still an idiot".to_string(),
                is_toxic: true,
            },
        )
        .unwrap();
        assert_eq!(t.next, flagged("still an idiot"));
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_clean_recheck_publishes_edited_text() {
        let t = transition(
            &flagged("idiot comment"),
            ModerationEvent::Recheck {
                text: "nice comment".to_string(),
                is_toxic: false,
            },
        )
        .unwrap();
        assert_eq!(
            t.effect,
            Effect::AppendToLedger {
                text: "nice comment".to_string(),
                is_toxic: false
            }
        );
        assert!(t.next.is_terminal());
    }

    #[test]
    fn test_override_forces_toxic_label() {
        let t = transition(&flagged("idiot comment"), ModerationEvent::Override).unwrap();
        assert_eq!(
            t.effect,
            Effect::AppendToLedger {
                text: "idiot comment".to_string(),
                is_toxic: true
            }
        );
        match t.next {
            ModerationState::Published(p) => {
                assert_eq!(p.route, Route::Overridden);
                assert!(p.is_toxic);
            }
            other => panic!("expected published, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_writes_nothing() {
        for state in [ModerationState::draft("x").unwrap(), flagged("x")] {
            let t = transition(&state, ModerationEvent::Cancel).unwrap();
            assert_eq!(t.next, ModerationState::Cancelled);
            assert_eq!(t.effect, Effect::None);
        }
    }

    #[test]
    fn test_blank_recheck_is_rejected() {
        let err = transition(
            &flagged("idiot"),
            ModerationEvent::Recheck {
                text: "  ".to_string(),
                is_toxic: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ModerationError::EmptyComment));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let published = transition(&checked("hi", false), ModerationEvent::Resolve)
            .unwrap()
            .next;
        let events = [
            ModerationEvent::Classified { is_toxic: false },
            ModerationEvent::Resolve,
            ModerationEvent::Override,
            ModerationEvent::Cancel,
            ModerationEvent::Recheck {
                text: "again".to_string(),
                is_toxic: false,
            },
        ];
        for state in [published, ModerationState::Cancelled] {
            for event in events.clone() {
                assert!(matches!(
                    transition(&state, event),
                    Err(ModerationError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_override_only_from_flagged() {
        let err = transition(&checked("hi", false), ModerationEvent::Override).unwrap_err();
        match err {
            ModerationError::InvalidTransition { state, event } => {
                assert_eq!(state, "checked");
                assert_eq!(event, "override");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
