use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use storage::repository::SnapshotRepository;
use storage::sqlite::SqliteRepository;
use storage::writer::{DEFAULT_DEBOUNCE, SnapshotWriter, persist};
use tutor_core::model::{
    AchievementId, LessonId, LessonPatch, LessonProgress, ProgressPatch, SettingsPatch, UiPatch,
};
use tutor_core::reducer::{AppAction, reduce};
use tutor_core::{AppState, Clock};

use crate::error::{ProgressStoreError, StoreInitError};
use crate::view::{ProgressOverview, past_errors_summary};

//
// ─── PROGRESS STORE ────────────────────────────────────────────────────────────
//

/// The application's single state container.
///
/// Explicitly constructed and dependency-injected (repository + clock) so
/// tests can run isolated instances. All mutations funnel through the pure
/// reducer; every new state is published on a `watch` channel, where the
/// debounced snapshot writer is simply the first subscriber.
///
/// Accessors and selectors must not be used until [`hydrate`] has run the
/// startup load; doing so is a programmer error and panics.
///
/// [`hydrate`]: ProgressStore::hydrate
pub struct ProgressStore {
    state: watch::Sender<AppState>,
    clock: Clock,
    repo: Arc<dyn SnapshotRepository>,
    writer: SnapshotWriter,
    hydrated: AtomicBool,
}

impl ProgressStore {
    /// Build a store with the default debounce window. Must be called from
    /// within a tokio runtime; the writer task spawns immediately.
    #[must_use]
    pub fn new(repo: Arc<dyn SnapshotRepository>, clock: Clock) -> Self {
        Self::with_debounce(repo, clock, DEFAULT_DEBOUNCE)
    }

    #[must_use]
    pub fn with_debounce(
        repo: Arc<dyn SnapshotRepository>,
        clock: Clock,
        window: Duration,
    ) -> Self {
        let (state, states) = watch::channel(AppState::initial());
        let writer = SnapshotWriter::attach(Arc::clone(&repo), states, window);
        Self {
            state,
            clock,
            repo,
            writer,
            hydrated: AtomicBool::new(false),
        }
    }

    /// Build a store backed by `SQLite`, already hydrated.
    ///
    /// # Errors
    ///
    /// Returns `StoreInitError` if the database cannot be opened or
    /// migrated. A *readable but corrupt* snapshot is not an error; it
    /// falls back to the initial state.
    pub async fn open_sqlite(db_url: &str, clock: Clock) -> Result<Self, StoreInitError> {
        let repo = SqliteRepository::open(db_url).await?;
        let store = Self::new(repo, clock);
        store.hydrate().await;
        Ok(store)
    }

    /// Run the startup load → decode → seed sequence, then clear the
    /// loading flag. Any load or decode failure counts as "no saved
    /// state": it is logged and the initial value stands.
    pub async fn hydrate(&self) {
        if self.hydrated.load(Ordering::SeqCst) {
            warn!("hydrate() called twice; ignoring");
            return;
        }

        let snapshot = match self.repo.load().await {
            Ok(Some(raw)) => match storage::decode_str(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(error = %err, "persisted state is corrupt, starting fresh");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "persisted state could not be loaded, starting fresh");
                None
            }
        };

        if let Some(snapshot) = snapshot {
            let (progress, settings, ui) = snapshot.into_parts();
            self.dispatch(AppAction::UpdateProgress(ProgressPatch::from_full(progress)));
            self.dispatch(AppAction::UpdateSettings(SettingsPatch::from_full(settings)));
            self.dispatch(AppAction::UpdateUi(UiPatch::from_full(ui)));
        }

        self.dispatch(AppAction::SetLoading(false));
        self.hydrated.store(true, Ordering::SeqCst);
    }

    fn dispatch(&self, action: AppAction) {
        self.state.send_modify(|state| {
            let next = reduce(state, action);
            *state = next;
        });
    }

    fn assert_ready(&self) {
        assert!(
            self.hydrated.load(Ordering::SeqCst),
            "ProgressStore used before hydrate(); run the startup load first"
        );
    }

    // ─── Actions ───────────────────────────────────────────────────────────────

    /// Record a full lesson completion with its final score and time.
    pub fn complete_lesson(&self, lesson_id: LessonId, score: u32, time_spent: u32) {
        self.assert_ready();
        self.dispatch(AppAction::CompleteLesson {
            lesson_id,
            score,
            time_spent,
            at: self.clock.now(),
        });
    }

    /// Record the first incorrect attempt on a question.
    pub fn add_mistake(
        &self,
        lesson_id: LessonId,
        question: impl Into<String>,
        error_description: impl Into<String>,
    ) {
        self.assert_ready();
        self.dispatch(AppAction::AddMistake {
            lesson_id,
            question: question.into(),
            error_description: error_description.into(),
            at: self.clock.now(),
        });
    }

    /// Add points to a lesson's local score. The aggregate `total_score`
    /// does not move here; only `complete_lesson` touches it.
    pub fn update_score(&self, lesson_id: LessonId, points: u32) {
        self.assert_ready();
        self.dispatch(AppAction::UpdateScore {
            lesson_id,
            points,
            at: self.clock.now(),
        });
    }

    /// Flag a lesson completed without touching score or time, for flows
    /// that score incrementally via `update_score`.
    pub fn mark_as_completed(&self, lesson_id: LessonId) {
        self.assert_ready();
        self.dispatch(AppAction::MarkAsCompleted {
            lesson_id,
            at: self.clock.now(),
        });
    }

    /// Upsert a lesson-progress record with defaults, merging the patch.
    pub fn update_lesson_progress(&self, lesson_id: LessonId, patch: LessonPatch) {
        self.assert_ready();
        let at = self.clock.now();
        let mut lessons = self.state.borrow().progress.lesson_progress.clone();
        let lesson = lessons
            .entry(lesson_id.clone())
            .or_insert_with(|| LessonProgress::new(lesson_id, at));
        patch.apply_to(lesson, at);
        self.dispatch(AppAction::UpdateProgress(ProgressPatch {
            lesson_progress: Some(lessons),
            ..ProgressPatch::new()
        }));
    }

    /// Add an achievement. Inserting an already-held achievement is a
    /// no-op (set semantics).
    pub fn unlock_achievement(&self, achievement_id: AchievementId) {
        self.assert_ready();
        let mut achievements = self.state.borrow().progress.achievements.clone();
        achievements.insert(achievement_id);
        self.dispatch(AppAction::UpdateProgress(ProgressPatch {
            achievements: Some(achievements),
            ..ProgressPatch::new()
        }));
    }

    pub fn set_current_lesson(&self, lesson_id: Option<LessonId>) {
        self.assert_ready();
        self.dispatch(AppAction::SetCurrentLesson(lesson_id));
    }

    pub fn update_settings(&self, patch: SettingsPatch) {
        self.assert_ready();
        self.dispatch(AppAction::UpdateSettings(patch));
    }

    pub fn update_ui(&self, patch: UiPatch) {
        self.assert_ready();
        self.dispatch(AppAction::UpdateUi(patch));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.assert_ready();
        self.dispatch(AppAction::SetError(error));
    }

    /// Replace the state with the initial value and purge persisted
    /// storage, keeping the store usable afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the purge fails; the in-memory
    /// reset has already happened by then.
    pub async fn reset(&self) -> Result<(), ProgressStoreError> {
        self.assert_ready();
        self.dispatch(AppAction::ResetApp);
        // The initial value carries the loading flag; a live store is past
        // loading, so clear it again.
        self.dispatch(AppAction::SetLoading(false));
        self.repo.clear().await?;
        Ok(())
    }

    // ─── Selectors ─────────────────────────────────────────────────────────────

    /// A clone of the current state.
    #[must_use]
    pub fn current_state(&self) -> AppState {
        self.assert_ready();
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn lesson_progress(&self, lesson_id: &LessonId) -> Option<LessonProgress> {
        self.assert_ready();
        self.state
            .borrow()
            .progress
            .lesson_progress
            .get(lesson_id)
            .cloned()
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: &LessonId) -> bool {
        self.assert_ready();
        self.state
            .borrow()
            .progress
            .completed_lessons
            .contains(lesson_id)
    }

    /// Percentage of the catalog completed, `0.0` for an empty catalog.
    #[must_use]
    pub fn overall_progress(&self, total_lessons: usize) -> f64 {
        self.assert_ready();
        if total_lessons == 0 {
            return 0.0;
        }
        let completed = self.state.borrow().progress.completed_lessons.len();
        completed as f64 / total_lessons as f64 * 100.0
    }

    /// Human-readable summary of the lesson's most recent mistakes, or a
    /// fixed sentinel when there are none.
    #[must_use]
    pub fn past_errors(&self, lesson_id: &LessonId) -> String {
        self.assert_ready();
        let state = self.state.borrow();
        let mistakes = state
            .progress
            .lesson_progress
            .get(lesson_id)
            .map(|lesson| lesson.mistakes.as_slice())
            .unwrap_or_default();
        past_errors_summary(mistakes)
    }

    #[must_use]
    pub fn overview(&self, total_lessons: usize) -> ProgressOverview {
        self.assert_ready();
        ProgressOverview::from_state(&self.state.borrow(), total_lessons)
    }

    /// Observe every state transition. Useful for shells that re-render on
    /// change; the snapshot writer consumes the same channel.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────────

    /// Write the current state immediately, bypassing the debounce window.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if encoding or the write fails.
    pub async fn flush(&self) -> Result<(), ProgressStoreError> {
        self.assert_ready();
        let state = self.state.borrow().clone();
        persist(self.repo.as_ref(), &state).await?;
        Ok(())
    }

    /// Tear the store down, draining any pending debounced write.
    pub async fn shutdown(self) {
        let Self { state, writer, .. } = self;
        drop(state);
        writer.drained().await;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemorySnapshots;
    use tutor_core::time::fixed_clock;

    async fn fresh_store() -> ProgressStore {
        let store = ProgressStore::new(Arc::new(InMemorySnapshots::new()), fixed_clock());
        store.hydrate().await;
        store
    }

    #[tokio::test]
    async fn hydrating_an_empty_repo_yields_the_initial_state() {
        let store = fresh_store().await;
        let state = store.current_state();
        assert!(!state.is_loading);
        assert_eq!(state.progress.total_score, 0);
    }

    #[tokio::test]
    #[should_panic(expected = "before hydrate()")]
    async fn accessors_panic_before_hydrate() {
        let store = ProgressStore::new(Arc::new(InMemorySnapshots::new()), fixed_clock());
        store.update_score(LessonId::new("patterns"), 10);
    }

    #[tokio::test]
    #[should_panic(expected = "before hydrate()")]
    async fn selectors_panic_before_hydrate() {
        let store = ProgressStore::new(Arc::new(InMemorySnapshots::new()), fixed_clock());
        let _ = store.is_lesson_completed(&LessonId::new("patterns"));
    }

    #[tokio::test]
    async fn overall_progress_handles_an_empty_catalog() {
        let store = fresh_store().await;
        assert_eq!(store.overall_progress(0), 0.0);
    }

    #[tokio::test]
    async fn overall_progress_counts_completions() {
        let store = fresh_store().await;
        store.complete_lesson(LessonId::new("fractions"), 30, 120);
        store.mark_as_completed(LessonId::new("patterns"));

        let percent = store.overall_progress(8);
        assert!((percent - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn past_errors_returns_the_sentinel_without_mistakes() {
        // Scenario D: untouched lesson, no exception, fixed sentinel.
        let store = fresh_store().await;
        assert_eq!(
            store.past_errors(&LessonId::new("algebra")),
            crate::view::NO_ERRORS_SENTINEL
        );
    }

    #[tokio::test]
    async fn past_errors_reports_the_last_three() {
        let store = fresh_store().await;
        let lesson = LessonId::new("algebra");
        for n in 1..=4 {
            store.add_mistake(lesson.clone(), format!("q{n}"), "slipped");
        }

        let summary = store.past_errors(&lesson);
        assert!(!summary.contains("q1"));
        assert!(summary.contains("q2"));
        assert!(summary.contains("q3"));
        assert!(summary.contains("q4"));
    }

    #[tokio::test]
    async fn update_lesson_progress_upserts_with_defaults() {
        let store = fresh_store().await;
        let lesson = LessonId::new("geometry");
        let patch = LessonPatch {
            current_section: Some(2),
            ..LessonPatch::new()
        };
        store.update_lesson_progress(lesson.clone(), patch);

        let progress = store.lesson_progress(&lesson).unwrap();
        assert_eq!(progress.current_section, 2);
        assert_eq!(progress.score, 0);
        assert!(!progress.is_completed);
    }

    #[tokio::test]
    async fn unlock_achievement_dedups() {
        let store = fresh_store().await;
        store.unlock_achievement(AchievementId::new("first-lesson"));
        store.unlock_achievement(AchievementId::new("first-lesson"));

        assert_eq!(store.current_state().progress.achievements.len(), 1);
    }

    #[tokio::test]
    async fn reset_restores_the_initial_value_and_stays_usable() {
        let store = fresh_store().await;
        store.complete_lesson(LessonId::new("fractions"), 30, 120);
        store.reset().await.unwrap();

        let state = store.current_state();
        assert!(!state.is_loading);
        assert_eq!(state.progress.total_score, 0);

        // Still dispatching after reset.
        store.update_score(LessonId::new("patterns"), 5);
        assert_eq!(
            store
                .lesson_progress(&LessonId::new("patterns"))
                .unwrap()
                .score,
            5
        );
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let store = fresh_store().await;
        let mut updates = store.subscribe();

        store.complete_lesson(LessonId::new("fractions"), 30, 120);
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().progress.total_score, 30);
    }
}
