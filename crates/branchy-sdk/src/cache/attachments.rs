//! Attachment cache
//!
//! One lazily created [`AttachmentCell`] per unit hash. A cell fetches the
//! unit's attachment list on first use and keeps the result until told to
//! reload; nothing refreshes it behind the caller's back.
//!
//! ## Request Coalescing
//!
//! A cell never has more than one fetch in flight. The fetch is stored as a
//! [`Shared`] future: callers arriving while it runs clone and await the same
//! future, and once it completes the stored future keeps handing out its
//! result. The port call itself runs on a spawned task, so it completes even
//! if every waiter goes away.

use crate::error::{BranchyError, Result};
use crate::port::RemotePort;
use branchy_types::{Attachment, AttachmentInput, UnitHash};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Attachment list shared by every reader of a cell
pub type Attachments = Arc<Vec<Attachment>>;

type SharedFetch = Shared<BoxFuture<'static, Result<Attachments>>>;

/// Non-blocking view of a cell's state
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncStatus<T> {
    /// Never loaded
    Idle,
    /// A fetch is in flight
    Pending,
    Complete(T),
    Error(BranchyError),
}

/// Reloadable, single-flight attachment list of one unit
pub struct AttachmentCell {
    key: UnitHash,
    port: Arc<dyn RemotePort>,
    current: Mutex<Option<SharedFetch>>,
    fetches: AtomicUsize,
}

impl AttachmentCell {
    fn new(key: UnitHash, port: Arc<dyn RemotePort>) -> Self {
        Self {
            key,
            port,
            current: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn key(&self) -> &UnitHash {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, Option<SharedFetch>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) -> SharedFetch {
        let port = Arc::clone(&self.port);
        let key = self.key.clone();
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(hash = %key, fetch = n, "Fetching attachments");

        let task = tokio::spawn(async move { port.get_attachments(&key).await });
        async move {
            match task.await {
                Ok(result) => result.map(Arc::new),
                Err(e) => Err(BranchyError::transport(format!("attachment fetch aborted: {}", e))),
            }
        }
        .boxed()
        .shared()
    }

    /// The cached list, the in-flight fetch, or a first fetch, in that order
    /// of preference.
    pub async fn load(&self) -> Result<Attachments> {
        let fetch = {
            let mut current = self.lock();
            match current.clone() {
                Some(fetch) => fetch,
                None => {
                    let fetch = self.start();
                    *current = Some(fetch.clone());
                    fetch
                }
            }
        };
        fetch.await
    }

    /// Fetch again. Joins the in-flight fetch instead when there is one.
    pub async fn reload(&self) -> Result<Attachments> {
        let fetch = {
            let mut current = self.lock();
            match current.clone() {
                Some(fetch) if fetch.peek().is_none() => fetch,
                _ => {
                    let fetch = self.start();
                    *current = Some(fetch.clone());
                    fetch
                }
            }
        };
        fetch.await
    }

    /// Wait out any in-flight fetch, then fetch again, so the result reflects
    /// every write completed before this call.
    pub async fn refresh(&self) -> Result<Attachments> {
        let pending = self.lock().as_ref().filter(|f| f.peek().is_none()).cloned();
        if let Some(pending) = pending {
            let _ = pending.await;
        }
        self.reload().await
    }

    pub fn status(&self) -> AsyncStatus<Attachments> {
        match self.lock().as_ref() {
            None => AsyncStatus::Idle,
            Some(fetch) => match fetch.peek() {
                None => AsyncStatus::Pending,
                Some(Ok(list)) => AsyncStatus::Complete(Arc::clone(list)),
                Some(Err(e)) => AsyncStatus::Error(e.clone()),
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_none()
    }

    /// Number of fetches this cell has started
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// Per-unit attachment cells plus the mutations that affect them
pub struct AttachmentCache {
    port: Arc<dyn RemotePort>,
    cells: Mutex<HashMap<UnitHash, Arc<AttachmentCell>>>,
    self_invalidate: bool,
}

impl AttachmentCache {
    pub fn new(port: Arc<dyn RemotePort>, self_invalidate: bool) -> Self {
        Self {
            port,
            cells: Mutex::new(HashMap::new()),
            self_invalidate,
        }
    }

    fn cells(&self) -> MutexGuard<'_, HashMap<UnitHash, Arc<AttachmentCell>>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cell for `hash`, created on first access. Creating a cell does not
    /// fetch anything.
    pub fn get(&self, hash: &UnitHash) -> Arc<AttachmentCell> {
        let mut cells = self.cells();
        Arc::clone(cells.entry(hash.clone()).or_insert_with(|| {
            Arc::new(AttachmentCell::new(hash.clone(), Arc::clone(&self.port)))
        }))
    }

    /// The cell for `hash` if one was ever requested
    pub fn peek(&self, hash: &UnitHash) -> Option<Arc<AttachmentCell>> {
        self.cells().get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refresh the cell for `hash` if it has been loaded before. Returns the
    /// fresh result, or `None` when there was nothing to refresh.
    pub async fn invalidate(&self, hash: &UnitHash) -> Option<Result<Attachments>> {
        let cell = self.peek(hash).filter(|c| !c.is_idle())?;
        Some(cell.refresh().await)
    }

    pub async fn add(&self, hash: &UnitHash, attachment: Attachment) -> Result<()> {
        self.port
            .add_attachment(AttachmentInput {
                unit_hash: hash.clone(),
                attachment,
            })
            .await?;
        self.after_write(hash).await;
        Ok(())
    }

    pub async fn remove(&self, hash: &UnitHash, attachment: Attachment) -> Result<()> {
        self.port
            .remove_attachment(AttachmentInput {
                unit_hash: hash.clone(),
                attachment,
            })
            .await?;
        self.after_write(hash).await;
        Ok(())
    }

    async fn after_write(&self, hash: &UnitHash) {
        if !self.self_invalidate {
            return;
        }
        // The write succeeded; a failed refresh stays visible in the cell.
        if let Some(Err(e)) = self.invalidate(hash).await {
            debug!(hash = %hash, error = %e, "Attachment refresh after write failed");
        }
    }
}
