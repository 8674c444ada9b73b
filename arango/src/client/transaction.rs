//! Stream transactions.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

use arango_aql::AsNamedReference;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::database::Database;
use crate::errors::{RequestError, TransactionStatusError};
use crate::network::{HostRef, Method, Request};

tokio::task_local! {
    static TRANSACTION_SCOPE: TransactionScope;
}

/// Transaction every request issued in the current task belongs to.
#[derive(Clone, Debug)]
pub(crate) struct TransactionScope {
    pub(crate) id: String,
    pub(crate) host: Option<HostRef>,
}

impl TransactionScope {
    /// Returns the scope of the innermost running [`Transaction::step`], if any.
    pub(crate) fn current() -> Option<TransactionScope> {
        TRANSACTION_SCOPE.try_with(Clone::clone).ok()
    }

    /// Makes `request` part of the transaction, unless it already names one
    /// or is detached from transaction steps.
    pub(crate) fn apply(&self, mut request: Request) -> Request {
        if request.transaction_id.is_none() && !request.detached {
            request.transaction_id = Some(self.id.clone());
            if request.host.is_none() {
                request.host = self.host.clone();
            }
        }
        request
    }
}

/// Status of a stream transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TransactionStatus {
    /// The transaction accepts operations.
    Running = 0,
    /// The transaction was committed.
    Committed = 1,
    /// The transaction was aborted.
    Aborted = 2,
}

impl TransactionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TransactionStatus::Running,
            1 => TransactionStatus::Committed,
            _ => TransactionStatus::Aborted,
        }
    }

    /// Returns `true` for committed and aborted transactions.
    pub fn is_terminal(self) -> bool {
        self != TransactionStatus::Running
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionStatus::Running => "running",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
        })
    }
}

/// Id and status of a transaction, as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TransactionState {
    /// Transaction id.
    pub id: String,
    /// Status on the server.
    pub status: TransactionStatus,
}

/// Entry of [`Database::list_transactions`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TransactionInfo {
    /// Transaction id.
    pub id: String,
    /// Status on the server.
    pub state: TransactionStatus,
}

#[derive(Deserialize)]
pub(crate) struct TransactionStateBody {
    pub(crate) result: TransactionState,
}

/// Collections a transaction declares up front.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransactionCollections {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    read: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    write: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclusive: Vec<String>,
}

impl TransactionCollections {
    /// Declares no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection the transaction reads from.
    pub fn read(mut self, collection: &impl AsNamedReference) -> Self {
        self.read
            .push(collection.named_reference().name().to_owned());
        self
    }

    /// Adds a collection the transaction writes to.
    pub fn write(mut self, collection: &impl AsNamedReference) -> Self {
        self.write
            .push(collection.named_reference().name().to_owned());
        self
    }

    /// Adds a collection the transaction locks exclusively.
    pub fn exclusive(mut self, collection: &impl AsNamedReference) -> Self {
        self.exclusive
            .push(collection.named_reference().name().to_owned());
        self
    }
}

/// Options of [`Database::begin_transaction`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct TransactionOptions {
    /// Allow reading from collections not declared up front.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_implicit: Option<bool>,
    /// Seconds to wait for collection locks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_timeout: Option<u64>,
    /// Maximum size of the transaction, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transaction_size: Option<u64>,
    /// Wait for the commit to be synced to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_sync: Option<bool>,
}

impl TransactionOptions {
    /// Creates options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows reading from collections not declared up front.
    pub fn allow_implicit(mut self, allow_implicit: bool) -> Self {
        self.allow_implicit = Some(allow_implicit);
        self
    }

    /// Sets the number of seconds to wait for collection locks.
    pub fn lock_timeout(mut self, seconds: u64) -> Self {
        self.lock_timeout = Some(seconds);
        self
    }

    /// Sets the maximum size of the transaction, in bytes.
    pub fn max_transaction_size(mut self, bytes: u64) -> Self {
        self.max_transaction_size = Some(bytes);
        self
    }

    /// Waits for the commit to be synced to disk.
    pub fn wait_for_sync(mut self, wait_for_sync: bool) -> Self {
        self.wait_for_sync = Some(wait_for_sync);
        self
    }
}

#[derive(Serialize)]
pub(crate) struct BeginTransactionBody<'a> {
    pub(crate) collections: &'a TransactionCollections,
    #[serde(flatten)]
    pub(crate) options: &'a TransactionOptions,
}

/// Handle of a stream transaction.
///
/// The handle caches the status it last observed through
/// [`commit`](Transaction::commit) or [`abort`](Transaction::abort), and
/// refuses further use locally once that status is terminal. Handles created
/// with [`Database::transaction`] start as running.
pub struct Transaction {
    db: Database,
    id: String,
    status: AtomicU8,
    host: Option<HostRef>,
}

impl Transaction {
    pub(crate) fn new(
        db: Database,
        id: String,
        status: TransactionStatus,
        host: Option<HostRef>,
    ) -> Self {
        Transaction {
            db,
            id,
            status: AtomicU8::new(status as u8),
            host,
        }
    }

    /// Id of the transaction.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The status this handle last observed.
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// The host that started the transaction, if known.
    pub fn host(&self) -> Option<&HostRef> {
        self.host.as_ref()
    }

    fn ensure_running(&self) -> Result<(), TransactionStatusError> {
        let status = self.status();
        if status.is_terminal() {
            return Err(TransactionStatusError::new(self.id.clone(), status));
        }
        Ok(())
    }

    fn request(&self, method: Method) -> Request {
        let request = Request::new(method, format!("/_api/transaction/{}", self.id)).detached();
        match &self.host {
            Some(host) => request.pinned_to(host.clone()),
            None => request,
        }
    }

    /// Runs `operation` as part of the transaction.
    ///
    /// Every request issued by the operation, in this task, carries the
    /// transaction id and goes to the host that started the transaction.
    /// Fails without contacting the server once the transaction was
    /// committed or aborted through this handle.
    pub async fn step<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionStatusError>,
    {
        self.ensure_running()?;
        let scope = TransactionScope {
            id: self.id.clone(),
            host: self.host.clone(),
        };
        TRANSACTION_SCOPE.scope(scope, operation()).await
    }

    /// Returns the status of the transaction on the server.
    ///
    /// Does not change the status cached by this handle.
    pub async fn get(&self) -> Result<TransactionState, RequestError> {
        let response = self.db.request(self.request(Method::GET)).await?;
        Ok(response.json::<TransactionStateBody>()?.result)
    }

    /// Commits the transaction.
    pub async fn commit(&self) -> Result<TransactionState, RequestError> {
        self.finish(Method::PUT).await
    }

    /// Aborts the transaction, discarding the writes of its steps.
    pub async fn abort(&self) -> Result<TransactionState, RequestError> {
        self.finish(Method::DELETE).await
    }

    async fn finish(&self, method: Method) -> Result<TransactionState, RequestError> {
        self.ensure_running()?;
        let response = self.db.request(self.request(method)).await?;
        let state = response.json::<TransactionStateBody>()?.result;
        self.status.store(state.status as u8, Ordering::Release);
        debug!(transaction_id = %self.id, status = %state.status, "Transaction finished");
        Ok(state)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("host", &self.host)
            .finish()
    }
}
