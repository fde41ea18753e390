//! The compilation context: one thread that owns the [Session] and works
//! through requests in arrival order.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::{
    protocol::{Request, Response},
    session::Session,
    Error,
};

/// Identifies one request and the caller waiting on it.
pub type RequestToken = u64;

type Reply = Result<Response, Error>;
type Pending = Arc<Mutex<HashMap<RequestToken, Sender<Reply>>>>;

enum Envelope {
    Request { token: RequestToken, request: Request },
    Stop,
}

/// A handle for sending requests; clones share the worker.
#[derive(Clone)]
pub struct Client {
    queue: Sender<Envelope>,
    pending: Pending,
    next_token: Arc<AtomicU64>,
}

impl Client {
    /// Send `request` and wait for its response.
    pub fn send(&self, request: Request) -> Result<Response, Error> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = crossbeam_channel::bounded(1);
        self.pending.lock().insert(token, reply);
        debug!("Request {token}: {}", request.kind());
        if self.queue.send(Envelope::Request { token, request }).is_err() {
            self.pending.lock().remove(&token);
            return Err(Error::WorkerGone);
        }
        response.recv().map_err(|_| Error::WorkerGone)?
    }

    /// Send a raw JSON message; messages of unknown type are dropped and
    /// answered with `None`.
    pub fn post(&self, message: &str) -> Result<Option<Response>, Error> {
        match Request::decode(message)? {
            Some(request) => self.send(request).map(Some),
            None => Ok(None),
        }
    }
}

pub struct CompilationWorker {
    client: Client,
    thread: Option<JoinHandle<()>>,
}

impl CompilationWorker {
    pub fn spawn(session: Session) -> Result<CompilationWorker, Error> {
        let (queue, requests) = crossbeam_channel::unbounded();
        let pending: Pending = Default::default();
        let worker_pending = pending.clone();
        let thread = thread::Builder::new()
            .name("ptfc-worker".to_string())
            .spawn(move || run(session, requests, worker_pending))
            .map_err(Error::Spawn)?;
        Ok(CompilationWorker {
            client: Client {
                queue,
                pending,
                next_token: Default::default(),
            },
            thread: Some(thread),
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl Drop for CompilationWorker {
    fn drop(&mut self) {
        // requests already queued are answered first
        let _ = self.client.queue.send(Envelope::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("The compilation worker panicked");
            }
        }
    }
}

fn run(mut session: Session, requests: Receiver<Envelope>, pending: Pending) {
    while let Ok(envelope) = requests.recv() {
        let (token, request) = match envelope {
            Envelope::Request { token, request } => (token, request),
            Envelope::Stop => break,
        };
        let reply = session.handle(request);
        if let Err(e) = &reply {
            warn!("Request {token} failed: {e}");
        }
        let Some(caller) = pending.lock().remove(&token) else {
            warn!("Nobody is waiting for request {token}");
            continue;
        };
        if caller.send(reply).is_err() {
            debug!("The caller of request {token} went away");
        }
    }
    debug!("Compilation worker stopped");
}
