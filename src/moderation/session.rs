// ModerationSession: drives one submission through the state machine.
//
// The session owns its classifier handle for its whole lifetime, so the model
// is read at most once per session. Ledger appends happen before the new
// state is committed: if the write fails the session stays where it was and
// the caller may retry.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::state::{
    transition, Effect, ModerationEvent, ModerationState, FLAG_WARNING,
};
use crate::classifier::traits::ToxicityClassifier;
use crate::error::ModerationError;
use crate::ledger::{Author, Comment, CommentLedger, NewComment};
use crate::output::truncate_chars;

/// What the caller should show after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Written to the ledger; the session is finished
    Published(Comment),
    /// Held back; the user may re-check, override or cancel
    Flagged { text: String, warning: &'static str },
    Cancelled,
}

pub struct ModerationSession {
    classifier: Arc<dyn ToxicityClassifier>,
    ledger: Arc<dyn CommentLedger>,
    author: Author,
    state: ModerationState,
}

impl ModerationSession {
    pub fn new(
        text: impl Into<String>,
        author: Author,
        classifier: Arc<dyn ToxicityClassifier>,
        ledger: Arc<dyn CommentLedger>,
    ) -> Result<Self> {
        Ok(Self {
            classifier,
            ledger,
            author,
            state: ModerationState::draft(text)?,
        })
    }

    pub fn state(&self) -> &ModerationState {
        &self.state
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Classify the draft and either publish it or flag it.
    ///
    /// After a failed ledger write this can be called again; the text is not
    /// classified a second time.
    pub async fn submit(&mut self) -> Result<SessionOutcome> {
        if let ModerationState::Draft { text } = &self.state {
            let is_toxic = self
                .classifier
                .is_toxic(text)
                .context("Failed to classify comment")?;
            self.apply(ModerationEvent::Classified { is_toxic }).await?;
        }
        let published = self.apply(ModerationEvent::Resolve).await?;
        self.outcome(published)
    }

    /// Classify edited text for a flagged comment.
    pub async fn recheck(&mut self, edited: &str) -> Result<SessionOutcome> {
        if edited.trim().is_empty() {
            return Err(ModerationError::EmptyComment.into());
        }
        if !matches!(self.state, ModerationState::Flagged { .. }) {
            return Err(ModerationError::InvalidTransition {
                state: self.state.name(),
                event: "recheck",
            }
            .into());
        }

        let is_toxic = self
            .classifier
            .is_toxic(edited)
            .context("Failed to classify edited comment")?;
        let published = self
            .apply(ModerationEvent::Recheck {
                text: edited.to_string(),
                is_toxic,
            })
            .await?;
        self.outcome(published)
    }

    /// Publish the flagged text, recorded as toxic.
    pub async fn submit_anyway(&mut self) -> Result<SessionOutcome> {
        let published = self.apply(ModerationEvent::Override).await?;
        self.outcome(published)
    }

    pub async fn cancel(&mut self) -> Result<SessionOutcome> {
        let published = self.apply(ModerationEvent::Cancel).await?;
        self.outcome(published)
    }

    async fn apply(&mut self, event: ModerationEvent) -> Result<Option<Comment>> {
        let event_name = event.name();
        let step = transition(&self.state, event)?;

        let published = match step.effect {
            Effect::None => None,
            Effect::AppendToLedger { text, is_toxic } => {
                let comment = self
                    .ledger
                    .append(NewComment {
                        text,
                        author: self.author.clone(),
                        is_toxic,
                    })
                    .await
                    .context("Failed to record comment")?;
                Some(comment)
            }
        };

        match &step.next {
            ModerationState::Flagged { text } => {
                warn!(event = event_name, text = %truncate_chars(text, 60), "Comment flagged as toxic");
            }
            ModerationState::Published(p) => {
                info!(route = ?p.route, is_toxic = p.is_toxic, "Comment published");
            }
            ModerationState::Cancelled => info!("Submission cancelled"),
            _ => {}
        }

        self.state = step.next;
        Ok(published)
    }

    fn outcome(&self, published: Option<Comment>) -> Result<SessionOutcome> {
        match (&self.state, published) {
            (ModerationState::Published(_), Some(comment)) => Ok(SessionOutcome::Published(comment)),
            (ModerationState::Flagged { text }, _) => Ok(SessionOutcome::Flagged {
                text: text.clone(),
                warning: FLAG_WARNING,
            }),
            (ModerationState::Cancelled, _) => Ok(SessionOutcome::Cancelled),
            (state, _) => anyhow::bail!("session stopped in unexpected state {}", state.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::state::Route;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct KeywordClassifier {
        calls: AtomicUsize,
    }

    impl ToxicityClassifier for KeywordClassifier {
        fn is_toxic(&self, text: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.contains("idiot"))
        }
    }

    struct MissingModel;

    impl ToxicityClassifier for MissingModel {
        fn is_toxic(&self, _text: &str) -> Result<bool> {
            Err(ModerationError::ArtifactMissing {
                path: "models/CURRENT".into(),
            }
            .into())
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        rows: Mutex<Vec<Comment>>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl CommentLedger for MemoryLedger {
        async fn append(&self, comment: NewComment) -> Result<Comment> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            let stored = Comment {
                text: comment.text,
                author: comment.author,
                submitted_at: None,
                is_toxic: comment.is_toxic,
            };
            self.rows.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn load_all(&self, _classifier: &dyn ToxicityClassifier) -> Result<Vec<Comment>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.rows.lock().unwrap().len())
        }
    }

    fn author() -> Author {
        Author {
            display_name: "Tech Explorer".to_string(),
            color: "rgb(150,150,150)".to_string(),
            avatar: String::new(),
        }
    }

    fn session(text: &str) -> (ModerationSession, Arc<KeywordClassifier>, Arc<MemoryLedger>) {
        let classifier = Arc::new(KeywordClassifier {
            calls: AtomicUsize::new(0),
        });
        let ledger = Arc::new(MemoryLedger::default());
        let s = ModerationSession::new(text, author(), classifier.clone(), ledger.clone()).unwrap();
        (s, classifier, ledger)
    }

    fn rows(ledger: &MemoryLedger) -> Vec<Comment> {
        ledger.rows.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_clean_comment_published_once() {
        let (mut s, _, ledger) = session("have a nice day");
        let outcome = s.submit().await.unwrap();

        assert!(matches!(outcome, SessionOutcome::Published(ref c) if !c.is_toxic));
        assert_eq!(rows(&ledger).len(), 1);
        assert!(s.state().is_terminal());

        // A second submit is rejected and writes nothing more
        assert!(s.submit().await.is_err());
        assert_eq!(rows(&ledger).len(), 1);
    }

    #[tokio::test]
    async fn test_override_records_flagged_text_as_toxic() {
        let (mut s, _, ledger) = session("idiot comment");
        let outcome = s.submit().await.unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Flagged {
                text: "idiot comment".to_string(),
                warning: FLAG_WARNING
            }
        );
        assert!(rows(&ledger).is_empty());

        s.submit_anyway().await.unwrap();
        let stored = rows(&ledger);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "idiot comment");
        assert!(stored[0].is_toxic);
    }

    #[tokio::test]
    async fn test_recheck_publishes_only_edited_text() {
        let (mut s, _, ledger) = session("idiot comment");
        s.submit().await.unwrap();

        let outcome = s.recheck("still an idiot").await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Flagged { ref text, .. } if text == "still an idiot"));

        s.recheck("nice comment").await.unwrap();
        let stored = rows(&ledger);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "nice comment");
        assert!(!stored[0].is_toxic);
        match s.state() {
            ModerationState::Published(p) => assert_eq!(p.route, Route::Rechecked),
            other => panic!("expected published, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_from_flagged_writes_nothing() {
        let (mut s, _, ledger) = session("idiot comment");
        s.submit().await.unwrap();
        assert_eq!(s.cancel().await.unwrap(), SessionOutcome::Cancelled);
        assert!(rows(&ledger).is_empty());
        assert!(s.submit_anyway().await.is_err());
        assert!(rows(&ledger).is_empty());
    }

    #[tokio::test]
    async fn test_blank_recheck_keeps_state() {
        let (mut s, classifier, _) = session("idiot comment");
        s.submit().await.unwrap();
        let err = s.recheck("   ").await.unwrap_err();
        assert!(crate::error::is_kind(&err, |e| matches!(e, ModerationError::EmptyComment)));
        assert_eq!(s.state().name(), "flagged");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_model_halts_without_guessing() {
        let ledger = Arc::new(MemoryLedger::default());
        let mut s =
            ModerationSession::new("hello", author(), Arc::new(MissingModel), ledger.clone())
                .unwrap();
        let err = s.submit().await.unwrap_err();

        assert!(crate::error::is_kind(&err, |e| matches!(
            e,
            ModerationError::ArtifactMissing { .. }
        )));
        assert_eq!(s.state().name(), "draft");
        assert!(rows(&ledger).is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_can_be_retried() {
        let (mut s, classifier, ledger) = session("lovely weather");
        ledger.fail_next.store(true, Ordering::SeqCst);

        assert!(s.submit().await.is_err());
        assert_eq!(s.state().name(), "checked");

        s.submit().await.unwrap();
        assert_eq!(rows(&ledger).len(), 1);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_draft_rejected() {
        let err = ModerationSession::new(
            "",
            author(),
            Arc::new(MissingModel),
            Arc::new(MemoryLedger::default()),
        )
        .err()
        .unwrap();
        assert!(crate::error::is_kind(&err, |e| matches!(e, ModerationError::EmptyComment)));
    }
}
