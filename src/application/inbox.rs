//! # Inbox
//!
//! Transports hand every inbound event to the inbox. Each session gets its own worker
//! task so events of one conversation are dispatched strictly in arrival order while
//! different conversations proceed concurrently.
//!
//! Router errors end here: they are logged and turned into a fallback view for the user.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::application::context::InboundEvent;
use crate::application::render::{self, RenderMode};
use crate::application::router::{CommandRouter, Dispatch};
use crate::domain::error::RouterError;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{View, ViewOption};
use crate::strings::messages;

const QUEUE_DEPTH: usize = 32;

type Job = (Arc<dyn ChatProvider>, InboundEvent);
type Workers = Arc<Mutex<HashMap<String, Worker>>>;

struct Worker {
    id: u64,
    tx: mpsc::Sender<Job>,
    handle: JoinHandle<()>,
}

pub struct Inbox {
    router: Arc<CommandRouter>,
    workers: Workers,
    idle: Duration,
    next_id: AtomicU64,
}

impl Inbox {
    /// `idle` is how long a session worker waits for its next event before exiting.
    pub fn new(router: Arc<CommandRouter>, idle: Duration) -> Self {
        Self {
            router,
            workers: Arc::new(Mutex::new(HashMap::new())),
            idle,
            next_id: AtomicU64::new(0),
        }
    }

    /// Queues `event` behind earlier events of the same session.
    pub async fn submit(&self, chat: Arc<dyn ChatProvider>, event: InboundEvent) -> Result<()> {
        let session = event.session_id.clone();
        let mut job = (chat, event);

        // A worker may go idle between the lookup and the send; the second
        // attempt then lands on a fresh worker.
        for _ in 0..2 {
            let tx = self.sender(&session).await;
            match tx.send(job).await {
                Ok(()) => return Ok(()),
                Err(SendError(returned)) => job = returned,
            }
        }
        anyhow::bail!("Worker for session {} is gone", session)
    }

    async fn sender(&self, session: &str) -> mpsc::Sender<Job> {
        let mut workers = self.workers.lock().await;

        // A closed worker may still be draining; its successor waits for it.
        let predecessor = match workers.remove(session) {
            Some(worker) if worker.tx.is_closed() => Some(worker.handle),
            Some(worker) => {
                let tx = worker.tx.clone();
                workers.insert(session.to_string(), worker);
                return tx;
            }
            None => None,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let worker = spawn_worker(
            self.router.clone(),
            self.workers.clone(),
            session.to_string(),
            id,
            self.idle,
            predecessor,
        );
        let tx = worker.tx.clone();
        workers.insert(session.to_string(), worker);
        tx
    }

    /// Closes every queue and waits for queued events to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .await
            .drain()
            .map(|(_, worker)| worker.handle)
            .collect();
        tracing::info!("Draining {} session queues", handles.len());
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Session worker panicked: {}", e);
            }
        }
    }
}

fn spawn_worker(
    router: Arc<CommandRouter>,
    workers: Workers,
    session: String,
    id: u64,
    idle: Duration,
    predecessor: Option<JoinHandle<()>>,
) -> Worker {
    let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
    let handle = tokio::spawn(async move {
        if let Some(previous) = predecessor
            && let Err(e) = previous.await
        {
            tracing::error!("Previous worker for session {} panicked: {}", session, e);
        }
        tracing::debug!("Worker started for session {}", session);

        loop {
            match tokio::time::timeout(idle, rx.recv()).await {
                Ok(Some((chat, event))) => {
                    process(&router, chat.as_ref(), event).await;
                }
                Ok(None) => break,
                Err(_) => {
                    // Refuse new events, then finish what slipped in before the close.
                    rx.close();
                    while let Some((chat, event)) = rx.recv().await {
                        process(&router, chat.as_ref(), event).await;
                    }
                    tracing::debug!("Worker for session {} idle for {:?}, exiting", session, idle);
                    break;
                }
            }
        }

        let mut workers = workers.lock().await;
        if workers.get(&session).is_some_and(|w| w.id == id) {
            workers.remove(&session);
        }
        tracing::debug!("Worker for session {} finished", session);
    });
    Worker { id, tx, handle }
}

/// Dispatches one event and shows a fallback view when the router fails.
pub async fn process(router: &CommandRouter, chat: &dyn ChatProvider, event: InboundEvent) -> Option<Dispatch> {
    match router.handle(chat, event.clone()).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            let Some(view) = fallback_view(&e) else {
                tracing::error!("Dispatch of '{}' failed, nothing to show: {}", event.text, e);
                return None;
            };
            tracing::warn!("Dispatch of '{}' failed: {}", event.text, e);
            if let Err(render_err) = render::deliver(chat, &event, &view, &RenderMode::New).await {
                tracing::error!("Failed to show fallback message: {}", render_err);
            }
            None
        }
    }
}

fn menu_option() -> ViewOption {
    ViewOption::link(messages::MENU_LABEL, "/")
}

/// What the user sees for a failed dispatch. Render failures have no fallback: the
/// transport is what failed.
pub fn fallback_view(err: &RouterError) -> Option<View> {
    let view = match err {
        RouterError::RouteNotFound(_) => View::new("", messages::UNKNOWN_COMMAND).option(menu_option()),
        RouterError::NoActiveForm(_) => View::new("", messages::FORM_EXPIRED).option(menu_option()),
        RouterError::Render(_) => return None,
        _ => View::new(messages::ERROR_TITLE, messages::GENERIC_ERROR).option(menu_option()),
    };
    Some(view)
}
