//! Composition of the student store, the signal bus and the workflow watcher.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use shared::protocol::Signal;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::{
    store::{StudentListState, StudentStore},
    workflow::{enroll_flow, load_flow, FlowContext, FlowReport},
    LogNavigator, LogNotifier, MissingServiceInvoker, Navigator, Notifier, ServiceInvoker,
    Settings,
};

type TriggerSenders = Arc<Mutex<Vec<mpsc::UnboundedSender<Signal>>>>;

/// Reduces a signal into the store, then broadcasts it to every subscriber.
///
/// Observers share a bounded broadcast channel and may lag. Workflow triggers
/// additionally go to every trigger subscriber over an unbounded queue, so a
/// watcher never loses one.
#[derive(Clone)]
pub struct Dispatcher {
    store: StudentStore,
    signals: broadcast::Sender<Signal>,
    triggers: TriggerSenders,
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        let (signals, _) = broadcast::channel(capacity.max(1));
        Self {
            store: StudentStore::new(),
            signals,
            triggers: Arc::default(),
        }
    }

    pub fn dispatch(&self, signal: Signal) {
        let changed = self.store.apply(&signal);
        debug!(signal = signal.name(), changed, "dispatch");
        if signal.is_trigger() {
            self.triggers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|tx| tx.send(signal.clone()).is_ok());
        }
        // No subscribers is fine; the store already saw the signal.
        let _ = self.signals.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Lossless feed of ENROLL_STUDENT and LOAD_STUDENTS signals dispatched
    /// after this call.
    pub fn subscribe_triggers(&self) -> mpsc::UnboundedReceiver<Signal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.triggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn store(&self) -> &StudentStore {
        &self.store
    }
}

pub struct StudentRuntime {
    ctx: FlowContext,
}

impl StudentRuntime {
    pub fn new(settings: Settings) -> Arc<Self> {
        Self::new_with_dependencies(
            settings,
            Arc::new(MissingServiceInvoker),
            Arc::new(LogNotifier),
            Arc::new(LogNavigator),
        )
    }

    pub fn new_with_dependencies(
        settings: Settings,
        services: Arc<dyn ServiceInvoker>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        let dispatcher = Dispatcher::new(settings.signal_capacity);
        Arc::new(Self {
            ctx: FlowContext {
                dispatcher,
                services,
                notifier,
                navigator,
                settings: Arc::new(settings),
            },
        })
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    pub fn dispatch(&self, signal: Signal) {
        self.ctx.dispatcher.dispatch(signal);
    }

    pub fn state(&self) -> Arc<StudentListState> {
        self.ctx.dispatcher.store().snapshot()
    }

    pub fn watch_state(&self) -> watch::Receiver<Arc<StudentListState>> {
        self.ctx.dispatcher.store().subscribe()
    }

    pub fn subscribe_signals(&self) -> broadcast::Receiver<Signal> {
        self.ctx.dispatcher.subscribe()
    }

    /// Starts a workflow instance when `signal` is a trigger. Every trigger
    /// gets its own task; duplicates are neither merged nor cancelled.
    pub fn spawn_flow(&self, signal: &Signal) -> Option<JoinHandle<FlowReport>> {
        let ctx = self.ctx.clone();
        match signal {
            Signal::EnrollStudent(form) => Some(tokio::spawn(enroll_flow(ctx, form.clone()))),
            Signal::LoadStudents(filter) => Some(tokio::spawn(load_flow(ctx, filter.clone()))),
            _ => None,
        }
    }

    /// Spawns a workflow for every ENROLL_STUDENT and LOAD_STUDENTS signal.
    /// The subscription is taken before this returns, so any trigger
    /// dispatched afterwards is seen. Runs until the handle is aborted.
    pub fn spawn_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let mut triggers =
            UnboundedReceiverStream::new(self.ctx.dispatcher.subscribe_triggers());
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = triggers.next().await {
                if runtime.spawn_flow(&signal).is_some() {
                    debug!(signal = signal.name(), "workflow spawned");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
