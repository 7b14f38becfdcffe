//! Gateway listener, accept-time screening and connection lifecycle

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{
        header::{HOST, ORIGIN},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use termgate_pty::PtyEvent;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{GatewayConfig, AUTH_TIMEOUT};
use crate::error::{GatewayError, RejectReason, Result};
use crate::policy::AccessPolicy;
use crate::protocol::{self, close_code, ClientMessage, ServerMessage};
use crate::session::{Session, SessionDefaults};
use crate::slot::{ConnectionInfo, ConnectionSlot, ConnectionState, SlotGuard};
use crate::token::SessionToken;

/// How long `stop` waits for the listener and the active session to wind down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Counters for accept-time and session outcomes
#[derive(Debug, Default)]
pub struct GatewayStats {
    accepted: AtomicU64,
    rejected_busy: AtomicU64,
    rejected_policy: AtomicU64,
    auth_failures: AtomicU64,
    processes_spawned: AtomicU64,
}

/// Point-in-time copy of [`GatewayStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub rejected_busy: u64,
    pub rejected_policy: u64,
    pub auth_failures: u64,
    pub processes_spawned: u64,
}

impl GatewayStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_busy: self.rejected_busy.load(Ordering::Relaxed),
            rejected_policy: self.rejected_policy.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            processes_spawned: self.processes_spawned.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every request handler
struct Shared {
    token: SessionToken,
    policy: AccessPolicy,
    slot: ConnectionSlot,
    stats: GatewayStats,
    defaults: SessionDefaults,
    shutdown: CancellationToken,
}

/// A configured, not yet listening gateway. Owns the session token.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    token: SessionToken,
}

impl Gateway {
    /// Validate the config and generate the session token
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            token: SessionToken::generate(),
        })
    }

    /// Session token clients must present
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Bind the listener and start serving
    pub async fn start(self) -> Result<RunningGateway> {
        let listener = TcpListener::bind((self.config.bind, self.config.port)).await?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            token: self.token,
            policy: AccessPolicy::new(local_addr.port(), self.config.trusted_schemes.iter().cloned()),
            slot: ConnectionSlot::new(),
            stats: GatewayStats::default(),
            defaults: SessionDefaults::from(&self.config),
            shutdown: CancellationToken::new(),
        });

        let app = Router::new()
            .route("/terminal", get(terminal_upgrade))
            .route("/version", get(version))
            .with_state(Arc::clone(&shared));

        let shutdown = shared.shutdown.clone();
        let server = tokio::spawn(async move {
            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

            if let Err(e) = result {
                error!(error = %e, "Gateway listener failed");
            }
        });

        info!(addr = %local_addr, "Terminal gateway listening");

        Ok(RunningGateway {
            local_addr,
            shared,
            server: Some(server),
        })
    }
}

/// A listening gateway. Dropping it stops accepting and closes the session.
pub struct RunningGateway {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    server: Option<JoinHandle<()>>,
}

impl RunningGateway {
    /// Bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL of the terminal endpoint
    pub fn url(&self) -> String {
        format!("ws://{}/terminal", self.local_addr)
    }

    /// Session token clients must present
    pub fn token(&self) -> &SessionToken {
        &self.shared.token
    }

    /// State of the connection holding the slot, if any
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.shared.slot.state()
    }

    /// Snapshot of the connection holding the slot, if any
    pub fn connection(&self) -> Option<ConnectionInfo> {
        self.shared.slot.current()
    }

    /// Accept and session counters
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Stop accepting, close the active session with "going away" and wait
    /// (bounded) for both to finish
    pub async fn stop(mut self) {
        self.shared.shutdown.cancel();

        if let Some(server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
                warn!("Gateway listener did not stop in time");
            }
        }

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.shared.slot.is_occupied() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        info!(addr = %self.local_addr, "Terminal gateway stopped");
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for RunningGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningGateway")
            .field("local_addr", &self.local_addr)
            .field("connection_state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({
        "name": "termgate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn header_value(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    // Non-ASCII header bytes become "", which no policy entry matches.
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

/// Screen an attempt before upgrading: peer, slot, then Origin/Host
async fn terminal_upgrade(
    State(shared): State<Arc<Shared>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !peer.ip().is_loopback() {
        GatewayStats::bump(&shared.stats.rejected_policy);
        warn!(peer = %peer, "Rejected non-loopback peer");
        return GatewayError::ConnectionRejected(RejectReason::Peer).into_response();
    }

    if shared.slot.is_occupied() {
        GatewayStats::bump(&shared.stats.rejected_busy);
        warn!(peer = %peer, "Rejected connection: session already active");
        return GatewayError::ConnectionRejected(RejectReason::Busy).into_response();
    }

    let origin = header_value(&headers, ORIGIN);
    let host = header_value(&headers, HOST);

    if let Err(reason) = shared.policy.check(origin.as_deref(), host.as_deref()) {
        GatewayStats::bump(&shared.stats.rejected_policy);
        warn!(
            peer = %peer,
            origin = ?origin,
            host = ?host,
            reason = %reason,
            "Rejected connection at accept"
        );
        return GatewayError::ConnectionRejected(reason).into_response();
    }

    // A concurrent attempt may have claimed the slot since the check above.
    let Some(guard) = shared.slot.try_acquire(origin, host, peer) else {
        GatewayStats::bump(&shared.stats.rejected_busy);
        warn!(peer = %peer, "Rejected connection: session already active");
        return GatewayError::ConnectionRejected(RejectReason::Busy).into_response();
    };
    GatewayStats::bump(&shared.stats.accepted);
    debug!(connection_id = %guard.id(), peer = %peer, "Connection accepted");

    // The guard moves into the upgrade callback; a failed upgrade drops it.
    ws.on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_connection(socket, shared, guard))
}

async fn handle_connection(mut socket: WebSocket, shared: Arc<Shared>, guard: SlotGuard) {
    let connection_id = guard.id();
    let deadline = Instant::now() + AUTH_TIMEOUT;
    let wall_deadline = chrono::Utc::now()
        + chrono::Duration::milliseconds(AUTH_TIMEOUT.as_millis() as i64);
    guard.begin_auth(wall_deadline);

    if let Err(e) = authenticate(&mut socket, &shared, deadline).await {
        if !matches!(e, GatewayError::ClientClosed | GatewayError::Shutdown) {
            GatewayStats::bump(&shared.stats.auth_failures);
        }
        warn!(connection_id = %connection_id, error = %e, "Handshake failed");
        close_socket(&mut socket, e.close_code(), e.close_reason()).await;
        guard.close();
        return;
    }

    guard.authenticated();
    let mut session = Session::new(shared.defaults.clone());
    guard.transition(ConnectionState::Active);
    info!(connection_id = %connection_id, session_id = %session.id(), "Session active");

    let (cols, rows) = session.geometry();
    let ready = ServerMessage::Ready {
        session_id: session.id(),
        cols,
        rows,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let (code, reason) = if send_json(&mut socket, &ready).await {
        relay(&mut socket, &mut session, &shared).await
    } else {
        (close_code::NORMAL, "client closed")
    };

    close_socket(&mut socket, code, reason).await;
    // Process first, then the slot.
    drop(session);
    guard.close();
    info!(connection_id = %connection_id, code, reason, "Connection closed");
}

/// Wait for a valid handshake until `deadline`
async fn authenticate(socket: &mut WebSocket, shared: &Shared, deadline: Instant) -> Result<()> {
    loop {
        let next = tokio::select! {
            _ = shared.shutdown.cancelled() => return Err(GatewayError::Shutdown),
            next = tokio::time::timeout_at(deadline, socket.recv()) => next,
        };

        let message = match next {
            Err(_) => return Err(GatewayError::AuthenticationTimeout),
            Ok(None) => return Err(GatewayError::ClientClosed),
            Ok(Some(Err(e))) => return Err(GatewayError::Transport(e.to_string())),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => return protocol::verify_handshake(&text, &shared.token),
            Message::Binary(_) => {
                return Err(GatewayError::MalformedHandshake(
                    "binary handshake".to_string(),
                ))
            }
            Message::Close(_) => return Err(GatewayError::ClientClosed),
            Message::Ping(_) | Message::Pong(_) => continue,
        }
    }
}

/// Relay until either side ends the session. Returns the close code and reason.
async fn relay(
    socket: &mut WebSocket,
    session: &mut Session,
    shared: &Shared,
) -> (u16, &'static str) {
    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => {
                let _ = session.terminate();
                return (close_code::GOING_AWAY, "gateway shutting down");
            }
            inbound = socket.recv() => {
                let message = match inbound {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        return (close_code::NORMAL, "client closed");
                    }
                    None => return (close_code::NORMAL, "client closed"),
                };

                match message {
                    Message::Binary(bytes) => {
                        if let Err(e) = session.write(&bytes) {
                            report(socket, e).await;
                        }
                    }
                    Message::Text(text) => {
                        let control = match protocol::parse_client_message(&text) {
                            Ok(control) => control,
                            Err(e) => {
                                warn!(session_id = %session.id(), error = %e, "Closing on protocol violation");
                                return (e.close_code(), e.close_reason());
                            }
                        };
                        if let ControlFlow::Close(code, reason) =
                            handle_control(socket, session, shared, control).await
                        {
                            return (code, reason);
                        }
                    }
                    Message::Close(_) => return (close_code::NORMAL, "client closed"),
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            event = session.next_event() => {
                match event {
                    Some(PtyEvent::Output(bytes)) => {
                        if socket.send(Message::Binary(bytes)).await.is_err() {
                            return (close_code::NORMAL, "client closed");
                        }
                    }
                    Some(PtyEvent::Exit(code)) => {
                        debug!(session_id = %session.id(), code = ?code, "Session process exited");
                        send_json(socket, &ServerMessage::Exit { code }).await;
                        return (close_code::NORMAL, "process exited");
                    }
                    None => return (close_code::NORMAL, "process exited"),
                }
            }
        }
    }
}

enum ControlFlow {
    Continue,
    Close(u16, &'static str),
}

async fn handle_control(
    socket: &mut WebSocket,
    session: &mut Session,
    shared: &Shared,
    control: ClientMessage,
) -> ControlFlow {
    debug!(session_id = %session.id(), capability = %control.capability(), "Control message");

    let result = match control {
        ClientMessage::Execute(request) => match session.execute(request) {
            Ok((pid, cols, rows)) => {
                GatewayStats::bump(&shared.stats.processes_spawned);
                send_json(socket, &ServerMessage::Spawned { pid, cols, rows }).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        ClientMessage::Write { data } => session.write(data.as_bytes()),
        ClientMessage::Resize { cols, rows } => session.resize(cols, rows),
        ClientMessage::Kill => {
            if let Err(e) = session.terminate() {
                warn!(session_id = %session.id(), error = %e, "Failed to terminate process");
            }
            return ControlFlow::Close(close_code::NORMAL, "terminated");
        }
    };

    if let Err(e) = result {
        report(socket, e).await;
    }
    ControlFlow::Continue
}

/// Report an operational error in-band; the connection stays open
async fn report(socket: &mut WebSocket, error: GatewayError) {
    debug!(error = %error, "Session operation failed");
    let Some(kind) = error.error_kind() else {
        return;
    };
    send_json(
        socket,
        &ServerMessage::Error {
            kind,
            message: error.to_string(),
        },
    )
    .await;
}

async fn send_json(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            error!(error = %e, "Failed to encode server message");
            false
        }
    }
}

async fn close_socket(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not delivered");
    }
}
