//! Inbound callback listener.
//!
//! The simulator reports progress by POSTing to this listener; the address
//! is handed over in the `connect` call. Each payload is converted into a
//! [`SimEvent`] and forwarded on the session's event channel. `/stop`
//! closes the listener itself.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use gatescope_protocol::{ClockPayload, StopPayload, ValuePayload};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::events::{SimEvent, StopCause};

/// Handle to the running callback listener.
pub struct CallbackServer {
    addr: SocketAddr,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct CallbackState {
    events: mpsc::UnboundedSender<SimEvent>,
    shutdown: Arc<Notify>,
}

impl CallbackState {
    fn forward(&self, event: SimEvent) {
        if self.events.send(event).is_err() {
            debug!("callback event dropped, consumer is gone");
        }
    }
}

impl CallbackServer {
    /// Bind an ephemeral port and start serving the push endpoints.
    pub async fn spawn(events: mpsc::UnboundedSender<SimEvent>) -> Result<Self> {
        let listener = TcpListener::bind("0.0.0.0:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = Arc::new(Notify::new());

        let state = CallbackState {
            events,
            shutdown: shutdown.clone(),
        };
        let app = router(state);

        let stop_signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop_signal.notified().await });
            if let Err(err) = serve.await {
                error!(error = %err, "callback listener failed");
            }
        });

        info!(%addr, "callback listener started");
        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop the listener and wait for the serve task to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }
}

fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/status/breakpoint", post(on_breakpoint))
        .route("/status/step", post(on_step))
        .route("/status/exception", post(on_exception))
        .route("/status/clock", post(on_clock))
        .route("/value", post(on_value))
        .route("/status/synch", post(on_synch))
        .route("/stop", post(on_stop))
        .with_state(state)
}

async fn on_breakpoint(
    State(state): State<CallbackState>,
    Json(payload): Json<StopPayload>,
) -> StatusCode {
    debug!(instance = payload.instance_id, line = payload.line_num, "breakpoint push");
    state.forward(SimEvent::Stopped {
        cause: StopCause::Breakpoint,
        payload,
    });
    StatusCode::OK
}

async fn on_step(
    State(state): State<CallbackState>,
    Json(payload): Json<StopPayload>,
) -> StatusCode {
    state.forward(SimEvent::Stopped {
        cause: StopCause::Step,
        payload,
    });
    StatusCode::OK
}

async fn on_exception(
    State(state): State<CallbackState>,
    Json(payload): Json<StopPayload>,
) -> StatusCode {
    state.forward(SimEvent::Stopped {
        cause: StopCause::Exception,
        payload,
    });
    StatusCode::OK
}

async fn on_clock(
    State(state): State<CallbackState>,
    Json(payload): Json<ClockPayload>,
) -> StatusCode {
    state.forward(SimEvent::ClockPaused(payload));
    StatusCode::OK
}

async fn on_value(
    State(state): State<CallbackState>,
    Json(payload): Json<ValuePayload>,
) -> StatusCode {
    state.forward(SimEvent::Value(payload));
    StatusCode::OK
}

async fn on_synch(State(state): State<CallbackState>) -> StatusCode {
    state.forward(SimEvent::Synchronized);
    StatusCode::OK
}

async fn on_stop(State(state): State<CallbackState>) -> StatusCode {
    info!("simulator requested session end");
    state.forward(SimEvent::Terminated);
    state.shutdown.notify_one();
    StatusCode::OK
}
