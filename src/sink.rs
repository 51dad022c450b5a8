//! Result sink: where finished flashcards go.
//!
//! The pipeline itself never stores anything. A caller hands its
//! [`FlashcardCandidate`]s to [`save_flashcards`], which stamps each one
//! with a fresh id and creation time, passes the batch to a [`CardSink`],
//! and then asks the sink to refresh any cached view of its collection.
//!
//! Two sinks ship with the crate: [`MemorySink`] for embedding and tests,
//! and [`JsonDeckSink`], which appends to a JSON array on disk and is what
//! the CLI's `--output` uses.

use crate::error::Img2CardsError;
use crate::pipeline::synthesis::FlashcardCandidate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A persisted flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Stamp `candidate` with a new v4 id and the current time.
    pub fn from_candidate(candidate: FlashcardCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            front: candidate.front,
            back: candidate.back,
            created_at: Utc::now(),
        }
    }
}

/// Durable destination for generated cards.
#[async_trait]
pub trait CardSink: Send + Sync {
    /// Persist `cards` as new records, in order.
    async fn save(&self, cards: &[Card]) -> Result<(), Img2CardsError>;

    /// Invalidate any cached view of the collection. Called once after
    /// every successful `save`.
    async fn refresh(&self) {}
}

/// Persist `candidates` through `sink` and trigger a refresh.
///
/// Returns the stored cards with their generated ids. An empty slice still
/// triggers the refresh so views settle after a run that produced nothing.
pub async fn save_flashcards(
    sink: &dyn CardSink,
    candidates: Vec<FlashcardCandidate>,
) -> Result<Vec<Card>, Img2CardsError> {
    let cards: Vec<Card> = candidates.into_iter().map(Card::from_candidate).collect();
    sink.save(&cards).await?;
    sink.refresh().await;
    debug!("Saved {} cards", cards.len());
    Ok(cards)
}

/// Keeps cards in memory. Counts refreshes.
#[derive(Debug, Default)]
pub struct MemorySink {
    cards: Mutex<Vec<Card>>,
    refreshes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything saved so far.
    pub fn cards(&self) -> Vec<Card> {
        self.cards
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardSink for MemorySink {
    async fn save(&self, cards: &[Card]) -> Result<(), Img2CardsError> {
        let mut guard = self
            .cards
            .lock()
            .map_err(|_| Img2CardsError::Internal("memory sink lock poisoned".into()))?;
        guard.extend_from_slice(cards);
        Ok(())
    }

    async fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Appends cards to a JSON array file.
///
/// Every save rewrites the file through a temporary sibling and a rename, so
/// a crash never leaves a half-written deck. Saves from one process are
/// serialised by an internal lock.
#[derive(Debug)]
pub struct JsonDeckSink {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonDeckSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current deck. A missing file is an empty deck.
    pub async fn load(&self) -> Result<Vec<Card>, Img2CardsError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| Img2CardsError::CorruptDeck {
                    path: self.path.clone(),
                    detail: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.write_error(e)),
        }
    }

    fn write_error(&self, source: std::io::Error) -> Img2CardsError {
        Img2CardsError::DeckWriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CardSink for JsonDeckSink {
    async fn save(&self, cards: &[Card]) -> Result<(), Img2CardsError> {
        let _guard = self.write_lock.lock().await;

        let mut deck = self.load().await?;
        deck.extend_from_slice(cards);

        let json = serde_json::to_vec_pretty(&deck)
            .map_err(|e| Img2CardsError::Internal(format!("serialise deck: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        info!(
            "Deck {} now holds {} cards (+{})",
            self.path.display(),
            deck.len(),
            cards.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<FlashcardCandidate> {
        vec![
            FlashcardCandidate::new("Q1", "A1"),
            FlashcardCandidate::new("Q2", "A2"),
        ]
    }

    #[tokio::test]
    async fn memory_sink_keeps_order_and_refreshes_once() {
        let sink = MemorySink::new();
        let saved = save_flashcards(&sink, candidates()).await.unwrap();

        assert_eq!(saved.len(), 2);
        assert_ne!(saved[0].id, saved[1].id);
        assert!(saved[0].created_at <= saved[1].created_at);

        let stored = sink.cards();
        assert_eq!(stored, saved);
        assert_eq!(stored[0].front, "Q1");
        assert_eq!(sink.refresh_count(), 1);
    }

    #[tokio::test]
    async fn empty_save_still_refreshes() {
        let sink = MemorySink::new();
        save_flashcards(&sink, Vec::new()).await.unwrap();
        assert!(sink.cards().is_empty());
        assert_eq!(sink.refresh_count(), 1);
    }

    #[tokio::test]
    async fn json_deck_appends_across_saves() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDeckSink::new(dir.path().join("decks/biology.json"));

        save_flashcards(&sink, candidates()).await.unwrap();
        save_flashcards(&sink, vec![FlashcardCandidate::new("Q3", "A3")])
            .await
            .unwrap();

        let deck = sink.load().await.unwrap();
        let fronts: Vec<&str> = deck.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, ["Q1", "Q2", "Q3"]);
        assert!(!dir.path().join("decks/biology.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_deck_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        std::fs::write(&path, r#"{"not":"a deck"}"#).unwrap();

        let sink = JsonDeckSink::new(&path);
        let err = save_flashcards(&sink, candidates()).await.unwrap_err();
        assert!(matches!(err, Img2CardsError::CorruptDeck { .. }), "got: {err}");
        // untouched
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"not":"a deck"}"#);
    }

    #[tokio::test]
    async fn missing_deck_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDeckSink::new(dir.path().join("none.json"));
        assert!(sink.load().await.unwrap().is_empty());
    }
}
