//! Consumer side of a search: a cold stream of its events.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::ActiveSearches;
use super::events::{SearchEvent, SearchId, SearchSummary};
use super::supervisor::SearchRun;
use crate::errors::SearchError;

/// Events of one search, in protocol order.
///
/// The search starts on first poll. Dropping the stream cancels it and
/// releases every permit its providers held.
pub struct SearchEventStream {
    search_id: SearchId,
    pending: Option<SearchRun>,
    receiver: mpsc::Receiver<SearchEvent>,
    token: CancellationToken,
    active: ActiveSearches,
    finished: bool,
}

impl SearchEventStream {
    pub(crate) fn new(
        run: SearchRun,
        receiver: mpsc::Receiver<SearchEvent>,
        token: CancellationToken,
        active: ActiveSearches,
    ) -> Self {
        Self {
            search_id: run.search_id,
            pending: Some(run),
            receiver,
            token,
            active,
            finished: false,
        }
    }

    pub fn search_id(&self) -> SearchId {
        self.search_id
    }

    /// Stops the search; the stream then ends with `Error(Cancelled)`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drains the stream and returns the terminal outcome.
    ///
    /// # Errors
    /// - The `SearchError` carried by a terminal `Error` event
    /// - `SearchError::Cancelled` - Stream ended without a terminal event
    pub async fn into_summary(mut self) -> Result<SearchSummary, SearchError> {
        while let Some(event) = self.next().await {
            match event {
                SearchEvent::Completed(summary) => return Ok(summary),
                SearchEvent::Error { error, .. } => return Err(error),
                _ => {}
            }
        }
        Err(SearchError::Cancelled)
    }

    fn start(&mut self) {
        if let Some(run) = self.pending.take() {
            let span = tracing::info_span!("search", search_id = %self.search_id);
            tokio::spawn(run.execute().instrument(span));
        }
    }
}

impl Stream for SearchEventStream {
    type Item = SearchEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        this.start();

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SearchEventStream {
    fn drop(&mut self) {
        self.token.cancel();
        self.active.remove(self.search_id);
    }
}

impl std::fmt::Debug for SearchEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEventStream")
            .field("search_id", &self.search_id)
            .field("started", &self.pending.is_none())
            .field("finished", &self.finished)
            .finish()
    }
}
