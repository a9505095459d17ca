use crate::{
    error::DataError,
    subscription::{StreamCallback, SubscriptionSpec},
};
use chrono::Utc;
use futures::{FutureExt, SinkExt, StreamExt};
use marketwire_instrument::Venue;
use marketwire_integration::{
    error::SocketError,
    protocol::websocket::{WsMessage, WsSink, WsStream, connect, is_websocket_disconnected},
};
use serde_json::Value;
use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

/// Venue protocol binding trait and inbound frame classification.
pub mod binding;

pub use binding::{FrameOutcome, VenueBinding};

/// Lifecycle state of a [`WsSession`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, derive_more::Display)]
pub enum SessionState {
    Idle,
    Running,
    Connecting,
    Streaming,
    Reconnecting,
    Stopping,
}

/// Single-connection, topic-scoped, resilient streaming session.
///
/// The session owns its transport, inbound queue and worker pool exclusively, and holds an
/// immutable reference to the venue [`VenueBinding`] that derives its protocol payloads.
/// Inbound frames are decoded, pushed onto a bounded queue and consumed by `worker_count`
/// workers invoking the caller's async callback.
///
/// Reconnection is unbounded - every fault tears the connection epoch down, waits
/// `reconnect_delay` and re-subscribes from scratch. The only terminal fault is queue
/// saturation, which stops the session because the callback is slower than the stream.
pub struct WsSession {
    spec: Arc<SubscriptionSpec>,
    binding: &'static dyn VenueBinding,
    callback: StreamCallback,
    shared: Arc<Shared>,
    runtime: parking_lot::Mutex<Option<Runtime>>,
}

/// State shared between the connect loop, periodic tasks and workers.
struct Shared {
    state: parking_lot::Mutex<SessionState>,
    active: AtomicBool,
    /// Unix ms of the most recent inbound frame; seeded at every (re)connect.
    last_message_ms: AtomicI64,
    stop_tx: watch::Sender<bool>,
    fault: parking_lot::Mutex<Option<DataError>>,
}

struct Runtime {
    connect_task: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    /// Held to observe queue depth during drain; also keeps the queue open until teardown.
    queue_tx: mpsc::Sender<Value>,
}

impl WsSession {
    pub fn new(
        spec: SubscriptionSpec,
        binding: &'static dyn VenueBinding,
        callback: StreamCallback,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            spec: Arc::new(spec),
            binding,
            callback,
            shared: Arc::new(Shared {
                state: parking_lot::Mutex::new(SessionState::Idle),
                active: AtomicBool::new(false),
                last_message_ms: AtomicI64::new(0),
                stop_tx,
                fault: parking_lot::Mutex::new(None),
            }),
            runtime: parking_lot::Mutex::new(None),
        }
    }

    /// Immutable parameters this session was constructed with.
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    /// The fault that escalated into a session stop, if any.
    pub fn last_fault(&self) -> Option<DataError> {
        self.shared.fault.lock().clone()
    }

    /// Spawn the worker pool and the connect loop.
    ///
    /// Fails with [`DataError::AlreadyRunning`] unless the session is `Idle`. Returns once the
    /// background tasks are running; the session streams until [`Self::stop`].
    pub fn start(&self) -> Result<(), DataError> {
        {
            let mut state = self.shared.state.lock();
            if *state != SessionState::Idle {
                return Err(DataError::AlreadyRunning);
            }
            *state = SessionState::Running;
        }
        self.shared.active.store(true, Ordering::SeqCst);
        let _ = self.shared.stop_tx.send(false);
        *self.shared.fault.lock() = None;

        let bound = self.spec.options.queue_bound.max(1);
        let (queue_tx, queue_rx) = mpsc::channel::<Value>(bound);
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));

        let workers = (0..self.spec.options.worker_count.max(1))
            .map(|index| {
                tokio::spawn(worker(
                    index,
                    Arc::clone(&self.spec),
                    Arc::clone(&self.shared),
                    Arc::clone(&queue_rx),
                    queue_tx.clone(),
                    Arc::clone(&self.callback),
                ))
            })
            .collect();

        let connect_task = tokio::spawn(connect_loop(
            Arc::clone(&self.spec),
            self.binding,
            Arc::clone(&self.shared),
            queue_tx.clone(),
        ));

        info!(spec = %self.spec, "session started");
        *self.runtime.lock() = Some(Runtime {
            connect_task,
            workers,
            queue_tx,
        });
        Ok(())
    }

    /// Stop the session: clear the active flag, drain the inbound queue, cancel the workers
    /// and the periodic tasks. Idempotent; never fails on normal shutdown.
    pub async fn stop(&self) {
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };
        self.shared.set_state(SessionState::Stopping);
        self.shared.active.store(false, Ordering::SeqCst);
        let _ = self.shared.stop_tx.send(true);

        // The connect loop observes the stop signal at every suspension point
        let _ = runtime.connect_task.await;

        // Workers keep consuming until the queue is empty. After a terminal fault the pool
        // has already unwound, so there is nothing left to drain the queue with.
        if self.shared.fault.lock().is_none() {
            while queue_depth(&runtime.queue_tx) > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        for worker in &runtime.workers {
            worker.abort();
        }
        for worker in runtime.workers {
            let _ = worker.await;
        }

        self.shared.set_state(SessionState::Idle);
        info!(spec = %self.spec, "session stopped");
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("spec", &self.spec)
            .field("venue", &self.binding.venue())
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.last_message_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    fn escalate(&self, fault: DataError) {
        *self.fault.lock() = Some(fault);
        self.set_state(SessionState::Stopping);
        self.active.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
    }
}

fn queue_depth(queue_tx: &mpsc::Sender<Value>) -> usize {
    queue_tx.max_capacity() - queue_tx.capacity()
}

/// Resolve once the session stop signal fires.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// The session connect loop. Each epoch: derive the URI, connect, seed the liveness clock,
/// subscribe, then run the reader plus the optional ping and liveness tasks until one of them
/// returns. Faults sleep `reconnect_delay` before the next epoch.
async fn connect_loop(
    spec: Arc<SubscriptionSpec>,
    binding: &'static dyn VenueBinding,
    shared: Arc<Shared>,
    queue_tx: mpsc::Sender<Value>,
) {
    let mut stop_rx = shared.subscribe_stop();

    while shared.is_active() {
        shared.set_state(SessionState::Connecting);
        info!(%spec, "starting connection");

        let fault = run_epoch(&spec, binding, &shared, &queue_tx, &mut stop_rx).await;

        if !shared.is_active() {
            break;
        }

        if let Err(fault) = fault {
            if fault.is_terminal() {
                error!(%spec, %fault, "terminal fault - stopping session");
                shared.escalate(fault);
                break;
            }
            error!(
                %spec,
                %fault,
                delay_secs = spec.options.reconnect_delay.as_secs(),
                "connection fault - reconnecting after delay"
            );
        } else {
            warn!(%spec, "stream ended - reconnecting after delay");
        }

        shared.set_state(SessionState::Reconnecting);
        tokio::select! {
            _ = tokio::time::sleep(spec.options.reconnect_delay) => {}
            _ = stopped(&mut stop_rx) => {}
        }
    }
}

/// One connection epoch: everything between a successful dial and the first task fault.
async fn run_epoch(
    spec: &Arc<SubscriptionSpec>,
    binding: &'static dyn VenueBinding,
    shared: &Arc<Shared>,
    queue_tx: &mpsc::Sender<Value>,
    stop_rx: &mut watch::Receiver<bool>,
) -> Result<(), DataError> {
    let uri = binding.connection_uri(spec)?;
    debug!(%spec, %uri, "establishing connection");

    let mut websocket = connect(uri.as_str()).await.map_err(DataError::from)?;
    debug!(%spec, %uri, "connected");

    // Seed the liveness clock for this epoch
    shared.touch();

    // Send each subscription payload as a separate frame
    for payload in binding.subscribe_payloads(spec)? {
        debug!(%spec, %payload, "sending subscribe payload");
        websocket
            .send(payload)
            .await
            .map_err(|error| DataError::from(SocketError::from(error)))?;
    }

    shared.set_state(SessionState::Streaming);

    let (ws_sink, mut ws_stream) = websocket.split();
    let (sink_tx, sink_rx) = mpsc::unbounded_channel();
    let sink_task = tokio::spawn(distribute_messages_to_venue(
        spec.venue, ws_sink, sink_rx,
    ));

    // Custom application-level pings, only for venues whose binding defines a payload
    let ping_task = binding.ping_payload(spec).map(|_| {
        tokio::spawn(schedule_pings_to_venue(
            Arc::clone(spec),
            binding,
            sink_tx.clone(),
        ))
    });

    let result = tokio::select! {
        result = read_frames(spec, binding, shared, &mut ws_stream, queue_tx, &sink_tx) => result,
        result = liveness_watchdog(shared, spec.options.no_message_timeout) => result,
        _ = stopped(stop_rx) => Ok(()),
    };

    // Cancel the remainder of this epoch's tasks
    if let Some(ping_task) = ping_task {
        ping_task.abort();
    }
    sink_task.abort();

    result
}

/// Reader: decode each inbound frame via the binding and push payloads onto the inbound queue.
/// Decode failures are logged and skipped; transport faults return and trigger reconnection.
async fn read_frames(
    spec: &Arc<SubscriptionSpec>,
    binding: &'static dyn VenueBinding,
    shared: &Arc<Shared>,
    ws_stream: &mut WsStream,
    queue_tx: &mpsc::Sender<Value>,
    sink_tx: &mpsc::UnboundedSender<WsMessage>,
) -> Result<(), DataError> {
    loop {
        let Some(message) = ws_stream.next().await else {
            return Err(DataError::Socket("stream ended".to_string()));
        };
        let message = message.map_err(SocketError::from)?;
        shared.touch();
        trace!(%spec, ?message, "received message");

        match binding.decode_frame(spec, message) {
            Ok(FrameOutcome::Payload(payload)) => {
                // Bounded send applies TCP-level backpressure upstream when the queue is full
                if queue_tx.send(payload).await.is_err() {
                    return Ok(());
                }
            }
            Ok(FrameOutcome::Heartbeat) => {
                debug!(%spec, "received heartbeat message");
            }
            Ok(FrameOutcome::Reply(frame)) => {
                debug!(%spec, %frame, "answering application-level ping");
                let _ = sink_tx.send(frame);
            }
            Ok(FrameOutcome::Ignore) => {}
            Ok(FrameOutcome::Disconnect(reason)) => {
                return Err(DataError::Socket(reason));
            }
            Err(error) => {
                error!(%spec, %error, "failed to decode inbound frame");
            }
        }
    }
}

/// Raise [`DataError::Liveness`] once no message has arrived for `no_message_timeout`. This is
/// the mechanism that catches silent connection death.
async fn liveness_watchdog(shared: &Arc<Shared>, timeout: Duration) -> Result<(), DataError> {
    if timeout.is_zero() {
        return std::future::pending().await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let idle_ms =
            Utc::now().timestamp_millis() - shared.last_message_ms.load(Ordering::SeqCst);
        if idle_ms > timeout.as_millis() as i64 {
            return Err(DataError::Liveness {
                idle_secs: (idle_ms / 1000) as u64,
            });
        }
    }
}

/// Transmit [`WsMessage`]s (custom pings, application-level pongs) to the venue via the
/// [`WsSink`].
async fn distribute_messages_to_venue(
    venue: Venue,
    mut ws_sink: WsSink,
    mut ws_sink_rx: mpsc::UnboundedReceiver<WsMessage>,
) {
    while let Some(message) = ws_sink_rx.recv().await {
        if let Err(error) = ws_sink.send(message).await {
            if is_websocket_disconnected(&error) {
                break;
            }

            // Log error only if WsMessage failed to send over a connected WebSocket
            error!(
                %venue,
                %error,
                "failed to send output message to the venue via WsSink"
            );
        }
    }
}

/// Schedule the sending of custom application-level ping [`WsMessage`]s to the venue.
///
/// The payload is regenerated at every tick so time-stamped pings stay fresh. Send errors are
/// logged by the sink distributor and the loop continues.
async fn schedule_pings_to_venue(
    spec: Arc<SubscriptionSpec>,
    binding: &'static dyn VenueBinding,
    ws_sink_tx: mpsc::UnboundedSender<WsMessage>,
) {
    let mut interval = tokio::time::interval(spec.options.ping_interval);
    loop {
        interval.tick().await;

        let Some(payload) = binding.ping_payload(&spec) else {
            break;
        };
        debug!(%spec, %payload, "sending custom application-level ping to venue");

        if ws_sink_tx.send(payload).is_err() {
            break;
        }
    }
}

/// Worker: pop decoded frames off the inbound queue and invoke the caller's callback. Callback
/// panics are logged and do not terminate the worker. Observing queue depth at the bound after
/// a callback escalates [`DataError::QueueOverflow`] - the callback is slower than the stream.
async fn worker(
    index: usize,
    spec: Arc<SubscriptionSpec>,
    shared: Arc<Shared>,
    queue_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Value>>>,
    depth_probe: mpsc::Sender<Value>,
    callback: StreamCallback,
) {
    let bound = spec.options.queue_bound.max(1);
    loop {
        let message = { queue_rx.lock().await.recv().await };
        let Some(message) = message else {
            break;
        };

        if let Err(panic) = AssertUnwindSafe((callback)(message)).catch_unwind().await {
            error!(%spec, worker = index, ?panic, "callback panicked while processing message");
        }

        let depth = queue_depth(&depth_probe);
        if depth >= bound {
            let fault = DataError::QueueOverflow { depth, bound };
            error!(%spec, worker = index, %fault, "inbound queue saturated - stopping session");
            shared.escalate(fault);
            break;
        }
    }
}
