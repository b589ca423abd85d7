use crate::command::{catch_task_panic, Command, Dispatcher};
use crate::deferred::{AsyncOperationStatus, Deferred};
use crate::hn::{Category, FetchError, ItemId, StoryItem, StorySource};
pub use crate::hn::MAX_STORIES;
use futures::future::BoxFuture;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;

// ============================================================================
// State
// ============================================================================

/// Outcome of one story detail fetch. Errors are kept as display messages.
pub type StoryResult = Result<StoryItem, String>;

/// Per-story fetch status, keyed by the ids of the latest successful index.
pub type StoryItems = BTreeMap<ItemId, Deferred<StoryResult>>;

/// Sequence number of an index fetch. Replies carry the load they belong to.
pub type LoadId = u64;

/// Snapshot of everything the reader knows about the story list.
///
/// `items` tracks the index fetch; the map inside a successful index tracks
/// each story's detail fetch. The map only exists once the index resolved
/// successfully, and is thrown away wholesale whenever a new index fetch
/// starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    pub current_category: Category,
    pub items: Deferred<Result<StoryItems, String>>,
    /// Bumped every time a new index fetch starts.
    pub load: LoadId,
}

/// Outcome of an index fetch, tagged with the load it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResult {
    pub load: LoadId,
    pub category: Category,
    pub ids: Result<Vec<ItemId>, String>,
}

/// Everything that can happen to [`State`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Index fetch lifecycle for the current category.
    LoadStoryIds(AsyncOperationStatus<IndexResult>),
    /// A story detail fetch issued by the given load finished.
    LoadStoryItem(LoadId, ItemId, StoryResult),
    /// The user picked another listing.
    ChangeCategory(Category),
    /// The user asked to reload the current listing.
    Refresh,
}

impl State {
    pub fn new(category: Category) -> Self {
        Self {
            current_category: category,
            items: Deferred::NotStarted,
            load: 0,
        }
    }

    /// Initial state plus the command that kicks off the first index fetch.
    pub fn init(category: Category) -> (Self, Command<Event>) {
        (
            Self::new(category),
            Command::of_msg(Event::LoadStoryIds(AsyncOperationStatus::Started)),
        )
    }

    /// Apply one event, producing the next snapshot and the follow-up work.
    ///
    /// Never blocks and never awaits. Fetches are only described here; they
    /// start when the returned command is dispatched.
    pub fn update(self, event: Event, source: &dyn StorySource) -> (State, Command<Event>) {
        match event {
            Event::LoadStoryIds(AsyncOperationStatus::Started) | Event::Refresh => {
                let category = self.current_category;
                self.start_loading(category, source)
            }
            Event::ChangeCategory(category) => {
                tracing::info!(from = %self.current_category, to = %category, "Switching category");
                self.start_loading(category, source)
            }
            Event::LoadStoryIds(AsyncOperationStatus::Finished(result)) => {
                self.apply_story_ids(result, source)
            }
            Event::LoadStoryItem(load, id, result) => {
                (self.apply_story_item(load, id, result), Command::none())
            }
        }
    }

    /// Replace the whole listing with a pending index fetch for `category`.
    fn start_loading(self, category: Category, source: &dyn StorySource) -> (State, Command<Event>) {
        let load = self.load.wrapping_add(1);
        tracing::debug!(category = %category, load, "Loading story index");
        let state = State {
            current_category: category,
            items: Deferred::InProgress,
            load,
        };
        (state, fetch_story_ids(load, category, source))
    }

    fn apply_story_ids(self, result: IndexResult, source: &dyn StorySource) -> (State, Command<Event>) {
        if result.load != self.load || !self.items.is_in_progress() {
            tracing::warn!(
                category = %result.category,
                load = result.load,
                current = self.load,
                "Dropping stale story index"
            );
            return (self, Command::none());
        }

        match result.ids {
            Ok(ids) => {
                let items: StoryItems = ids
                    .into_iter()
                    .take(MAX_STORIES)
                    .map(|id| (id, Deferred::InProgress))
                    .collect();
                tracing::info!(category = %self.current_category, count = items.len(), "Story index loaded");
                tracing::debug!(load = self.load, ids = ?items.keys().collect::<Vec<_>>(), "Seeding story map");

                let load = self.load;
                let cmd = Command::batch(items.keys().map(|&id| fetch_story_item(load, id, source)));
                let state = State {
                    current_category: self.current_category,
                    items: Deferred::Resolved(Ok(items)),
                    load,
                };
                (state, cmd)
            }
            Err(error) => {
                tracing::warn!(category = %self.current_category, error = %error, "Story index failed");
                let state = State {
                    current_category: self.current_category,
                    items: Deferred::Resolved(Err(error)),
                    load: self.load,
                };
                (state, Command::none())
            }
        }
    }

    /// Point update of one story slot. Any other key is left untouched.
    ///
    /// Replies from an earlier load are dropped even when the same id is in
    /// the current map.
    fn apply_story_item(self, reply_load: LoadId, id: ItemId, result: StoryResult) -> State {
        if reply_load != self.load {
            tracing::warn!(id, load = reply_load, current = self.load, "Dropping story from an earlier load");
            return self;
        }

        let State {
            current_category,
            items,
            load,
        } = self;

        let items = match items {
            Deferred::Resolved(Ok(mut map)) => {
                match map.get_mut(&id) {
                    Some(slot) => {
                        match &result {
                            Ok(_) => tracing::debug!(id, "Story loaded"),
                            Err(error) => tracing::warn!(id, error = %error, "Story fetch failed"),
                        }
                        *slot = Deferred::Resolved(result);
                    }
                    None => tracing::warn!(id, "Dropping story for a listing that is gone"),
                }
                Deferred::Resolved(Ok(map))
            }
            other => {
                tracing::warn!(id, "Dropping story, no listing loaded");
                other
            }
        };

        State {
            current_category,
            items,
            load,
        }
    }

    /// The per-story map, if the index resolved successfully.
    pub fn stories(&self) -> Option<&StoryItems> {
        match &self.items {
            Deferred::Resolved(Ok(map)) => Some(map),
            _ => None,
        }
    }

    /// Stories in display order, recomputed from the current map.
    ///
    /// Pending stories come first, then failed ones, then loaded stories
    /// newest first. Ties keep ascending id order.
    pub fn sorted_items(&self) -> Vec<(ItemId, &Deferred<StoryResult>)> {
        let Some(map) = self.stories() else {
            return Vec::new();
        };

        let mut rows: Vec<_> = map.iter().map(|(&id, status)| (id, status)).collect();
        rows.sort_by_key(|(_, status)| display_rank(status));
        rows
    }

    /// `(finished, total)` story fetches for the current listing.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.stories()
            .map(|map| (map.values().filter(|s| s.is_resolved()).count(), map.len()))
    }
}

fn display_rank(status: &Deferred<StoryResult>) -> (u8, Reverse<i64>) {
    match status {
        Deferred::NotStarted | Deferred::InProgress => (0, Reverse(0)),
        Deferred::Resolved(Err(_)) => (1, Reverse(0)),
        Deferred::Resolved(Ok(item)) => (2, Reverse(item.time)),
    }
}

// ============================================================================
// Fetch commands
// ============================================================================

fn fetch_story_ids(load: LoadId, category: Category, source: &dyn StorySource) -> Command<Event> {
    let op = source.story_ids(category);
    Command::from_async(async move {
        let ids = guarded(op).await;
        Event::LoadStoryIds(AsyncOperationStatus::Finished(IndexResult { load, category, ids }))
    })
}

fn fetch_story_item(load: LoadId, id: ItemId, source: &dyn StorySource) -> Command<Event> {
    let op = source.story_item(id);
    Command::from_async(async move { Event::LoadStoryItem(load, id, guarded(op).await) })
}

/// Run a fetch, turning panics and errors into modeled failure messages.
async fn guarded<T>(op: BoxFuture<'static, Result<T, FetchError>>) -> Result<T, String> {
    catch_task_panic(op)
        .await
        .unwrap_or_else(|panic| Err(FetchError::TaskPanicked(panic)))
        .map_err(|e| e.to_string())
}

// ============================================================================
// App
// ============================================================================

/// The running application: the current snapshot, the view state layered on
/// top of it, and the plumbing that executes commands.
pub struct App {
    pub state: State,
    /// Index into `state.sorted_items()`.
    pub selected: usize,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// Loading animation frame, advanced by the UI tick.
    pub spinner_frame: usize,
    source: Arc<dyn StorySource>,
    dispatcher: Dispatcher<Event>,
}

impl App {
    pub fn new(category: Category, source: Arc<dyn StorySource>, dispatcher: Dispatcher<Event>) -> Self {
        Self {
            state: State::new(category),
            selected: 0,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            source,
            dispatcher,
        }
    }

    /// Dispatch the startup command.
    pub fn start(&mut self) {
        let (state, cmd) = State::init(self.state.current_category);
        self.state = state;
        self.dispatcher.dispatch(cmd);
    }

    /// Fold one event into the state and dispatch whatever it asks for.
    pub fn handle_event(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        let (state, cmd) = state.update(event, self.source.as_ref());
        self.state = state;
        self.clamp_selection();
        self.needs_redraw = true;
        self.dispatcher.dispatch(cmd);
    }

    pub fn change_category(&mut self, category: Category) {
        self.selected = 0;
        self.handle_event(Event::ChangeCategory(category));
    }

    pub fn refresh(&mut self) {
        self.selected = 0;
        self.handle_event(Event::Refresh);
    }

    /// True while the index or any story fetch is still outstanding.
    pub fn is_loading(&self) -> bool {
        match &self.state.items {
            Deferred::NotStarted | Deferred::InProgress => true,
            Deferred::Resolved(Ok(map)) => map.values().any(|s| !s.is_resolved()),
            Deferred::Resolved(Err(_)) => false,
        }
    }

    /// Story under the cursor, if it has loaded.
    pub fn selected_story(&self) -> Option<&StoryItem> {
        let rows = self.state.sorted_items();
        let (_, status) = *rows.get(self.selected)?;
        match status.as_resolved() {
            Some(Ok(item)) => Some(item),
            _ => None,
        }
    }

    pub fn select_next(&mut self) {
        let len = self.state.sorted_items().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.state.sorted_items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}
