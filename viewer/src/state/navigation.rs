// Two-level navigation: the list screen is the root, opening a fakeout pushes
// its detail screen, going back pops it. The list's ViewController lives
// outside the navigator, so opening or leaving a detail never touches it.
use shared::models::{Candle, Fakeout};
use tracing::debug;

use crate::components::detail::{ContextRequest, DetailAssembler, DetailTicket, DetailView};
use crate::error::ViewerError;
use crate::services::{ContextKey, DataSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen<'a> {
    List,
    Detail(&'a DetailView),
}

#[derive(Debug, Default)]
pub struct Navigator {
    detail: DetailAssembler,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Screen<'_> {
        match self.detail.view() {
            Some(view) => Screen::Detail(view),
            None => Screen::List,
        }
    }

    pub fn depth(&self) -> usize {
        match self.current() {
            Screen::List => 1,
            Screen::Detail(_) => 2,
        }
    }

    /// Pushes the detail screen for `fakeout`, replacing any detail already
    /// shown. Returns the context fetch to run, if the timeframe has one.
    pub fn open(&mut self, fakeout: Fakeout) -> Option<ContextRequest> {
        debug!(id = fakeout.id, "Opening detail screen");
        self.detail.open(fakeout)
    }

    pub fn resolve(&mut self, ticket: DetailTicket, result: Result<Vec<Candle>, ViewerError>) -> bool {
        self.detail.complete(ticket, result)
    }

    /// Pops back to the list. A no-op on the list itself.
    pub fn back(&mut self) {
        if matches!(self.current(), Screen::List) {
            return;
        }
        debug!("Back to list");
        self.detail.close();
    }

    /// Resolves the fakeout by id first, for callers that only know the key.
    pub async fn open_by_key(&mut self, source: &dyn DataSource, key: &ContextKey) -> Result<Screen<'_>, ViewerError> {
        let fakeout = source.fetch_fakeout(key).await?;
        Ok(self.open_and_fetch(source, fakeout).await)
    }

    pub async fn open_and_fetch(&mut self, source: &dyn DataSource, fakeout: Fakeout) -> Screen<'_> {
        match self.detail.assemble(source, fakeout).await {
            Some(view) => Screen::Detail(view),
            None => Screen::List,
        }
    }
}
