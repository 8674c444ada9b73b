//! Batch-streaming access to the results of an AQL query.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::client::database::Database;
use crate::errors::RequestError;
use crate::network::{HostRef, Method, Request, Response, DIRTY_READ_HEADER};

/// Body of a cursor response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBatch {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    extra: Option<CursorExtraBody>,
}

#[derive(Deserialize)]
struct CursorExtraBody {
    #[serde(default)]
    warnings: Vec<Value>,
    #[serde(default)]
    stats: Option<Value>,
    #[serde(default)]
    plan: Option<Value>,
    #[serde(default)]
    profile: Option<Value>,
}

/// Extra information the server reported about a query.
///
/// Warnings accumulate across batches. Statistics, plan and profile are
/// those of the latest batch that carried them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CursorExtras {
    warnings: Vec<Value>,
    stats: Option<Value>,
    plan: Option<Value>,
    profile: Option<Value>,
}

impl CursorExtras {
    /// Warnings raised by the query.
    pub fn warnings(&self) -> &[Value] {
        &self.warnings
    }

    /// Execution statistics, such as `writesExecuted` or `fullCount`.
    pub fn stats(&self) -> Option<&Value> {
        self.stats.as_ref()
    }

    /// Execution plan, if requested.
    pub fn plan(&self) -> Option<&Value> {
        self.plan.as_ref()
    }

    /// Query profile, if requested.
    pub fn profile(&self) -> Option<&Value> {
        self.profile.as_ref()
    }

    fn absorb(&mut self, extra: CursorExtraBody) {
        self.warnings.extend(extra.warnings);
        if extra.stats.is_some() {
            self.stats = extra.stats;
        }
        if extra.plan.is_some() {
            self.plan = extra.plan;
        }
        if extra.profile.is_some() {
            self.profile = extra.profile;
        }
    }
}

/// Results of an AQL query, fetched from the server batch by batch.
///
/// The cursor holds one batch in memory. Crossing a batch boundary fetches
/// exactly one follow-up batch, from the host that created the cursor.
/// Cursors are forward-only: once exhausted, or after [`kill`](Cursor::kill),
/// [`next`](Cursor::next) keeps returning `Ok(None)`.
///
/// Items are deserialized into `T` as they are returned, use
/// [`typed`](Cursor::typed) to change the item type.
pub struct Cursor<T = Value> {
    db: Database,
    id: Option<String>,
    host: HostRef,
    transaction_id: Option<String>,
    allow_dirty_read: bool,
    timeout: Option<Duration>,
    batch: VecDeque<Value>,
    has_more: bool,
    count: Option<u64>,
    extra: CursorExtras,
    killed: bool,
    _item: PhantomData<fn() -> T>,
}

pub(crate) struct CursorConfig {
    pub(crate) transaction_id: Option<String>,
    pub(crate) allow_dirty_read: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) is_stream: bool,
}

impl Cursor<Value> {
    pub(crate) fn new(
        db: Database,
        response: Response,
        config: CursorConfig,
    ) -> Result<Self, RequestError> {
        let batch: CursorBatch = response.json()?;
        let mut extra = CursorExtras::default();
        if let Some(body) = batch.extra {
            extra.absorb(body);
        }
        let has_more = batch.has_more && batch.id.is_some();
        debug!(
            cursor_id = ?batch.id,
            host = %response.host().url(),
            batch_len = batch.result.len(),
            has_more,
            "Cursor created"
        );

        Ok(Cursor {
            db,
            id: batch.id,
            host: response.host().clone(),
            transaction_id: config.transaction_id,
            allow_dirty_read: config.allow_dirty_read,
            timeout: config.timeout,
            batch: batch.result.into(),
            has_more,
            count: if config.is_stream { None } else { batch.count },
            extra,
            killed: false,
            _item: PhantomData,
        })
    }
}

impl<T> Cursor<T> {
    /// Changes the type items are deserialized into.
    pub fn typed<U: DeserializeOwned>(self) -> Cursor<U> {
        Cursor {
            db: self.db,
            id: self.id,
            host: self.host,
            transaction_id: self.transaction_id,
            allow_dirty_read: self.allow_dirty_read,
            timeout: self.timeout,
            batch: self.batch,
            has_more: self.has_more,
            count: self.count,
            extra: self.extra,
            killed: self.killed,
            _item: PhantomData,
        }
    }

    /// Server-side id of the cursor. `None` if all results fit in the first batch.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The host all follow-up requests of this cursor go to.
    pub fn host(&self) -> &HostRef {
        &self.host
    }

    /// Total number of results, if counting was requested.
    /// Always `None` for stream queries.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// Returns `true` if the server holds more batches.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Returns `true` if items remain, either in memory or on the server.
    pub fn has_next(&self) -> bool {
        !self.batch.is_empty() || self.has_more
    }

    /// Extra information reported by the server so far.
    pub fn extra(&self) -> &CursorExtras {
        &self.extra
    }

    fn id_for_request(&self) -> String {
        self.id.clone().unwrap_or_default()
    }

    fn follow_up(&self, method: Method) -> Request {
        let mut request = Request::new(method, format!("/_api/cursor/{}", self.id_for_request()))
            .pinned_to(self.host.clone())
            .detached();
        if let Some(id) = &self.transaction_id {
            request = request.transaction_id(id.clone());
        }
        if self.allow_dirty_read {
            request = request.header(DIRTY_READ_HEADER, "true");
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn fetch_batch(&mut self) -> Result<(), RequestError> {
        trace!(cursor_id = ?self.id, host = %self.host.url(), "Fetching next batch");
        let response = self.db.request(self.follow_up(Method::PUT)).await?;
        let batch: CursorBatch = response.json()?;

        self.has_more = batch.has_more;
        self.batch.extend(batch.result);
        if let Some(body) = batch.extra {
            self.extra.absorb(body);
        }
        if !self.has_more {
            debug!(cursor_id = ?self.id, "Cursor exhausted");
        }
        Ok(())
    }

    /// Ensures the in-memory batch is not empty, unless the cursor is done.
    async fn fill(&mut self) -> Result<(), RequestError> {
        while self.batch.is_empty() && self.has_more && !self.killed {
            self.fetch_batch().await?;
        }
        Ok(())
    }

    /// Kills the cursor on the server and discards the remaining results.
    ///
    /// Succeeds without contacting the server if it holds no more batches.
    /// A cursor the server no longer knows about counts as killed.
    pub async fn kill(&mut self) -> Result<(), RequestError> {
        if self.has_more && !self.killed {
            match self.db.request(self.follow_up(Method::DELETE)).await {
                Ok(_) => {}
                Err(RequestError::Application(err)) if err.is_cursor_not_found() => {
                    trace!(cursor_id = ?self.id, "Cursor already gone on the server");
                }
                Err(err) => return Err(err),
            }
            debug!(cursor_id = ?self.id, "Cursor killed");
        }
        self.batch.clear();
        self.has_more = false;
        self.killed = true;
        Ok(())
    }
}

impl<T: DeserializeOwned> Cursor<T> {
    fn decode(value: Value) -> Result<T, RequestError> {
        serde_json::from_value(value).map_err(|err| RequestError::ResponseDeserialization(err.into()))
    }

    /// Returns the next item, or `Ok(None)` once all items were returned.
    pub async fn next(&mut self) -> Result<Option<T>, RequestError> {
        self.fill().await?;
        match self.batch.pop_front() {
            Some(value) => Self::decode(value).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the rest of the current batch, fetching a new one if it is
    /// empty, or `Ok(None)` once all items were returned.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<T>>, RequestError> {
        self.fill().await?;
        if self.batch.is_empty() {
            return Ok(None);
        }
        self.batch
            .drain(..)
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Fetches and returns all remaining items.
    pub async fn all(&mut self) -> Result<Vec<T>, RequestError> {
        let mut items = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            items.extend(batch);
        }
        Ok(items)
    }

    /// Passes items to `visitor` in order until it returns `false`.
    ///
    /// Returns `true` if every item was visited. Batches are fetched only
    /// when the visitor asks for an item beyond the current one.
    pub async fn for_each(
        &mut self,
        mut visitor: impl FnMut(T) -> bool,
    ) -> Result<bool, RequestError> {
        while let Some(item) = self.next().await? {
            if !visitor(item) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Turns the cursor into a stream of items.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, RequestError>> + Send
    where
        T: Send,
    {
        futures::stream::try_unfold(self, |mut cursor| async move {
            Ok(cursor.next().await?.map(|item| (item, cursor)))
        })
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("buffered", &self.batch.len())
            .field("has_more", &self.has_more)
            .field("count", &self.count)
            .field("killed", &self.killed)
            .finish()
    }
}
