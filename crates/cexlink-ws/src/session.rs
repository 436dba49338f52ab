//! Streaming session.
//!
//! One background task owns the socket. It connects, replays every tracked
//! subscription, then processes frames strictly in arrival order until the
//! connection drops, waits a fixed delay and starts over. Only `shutdown()`
//! ends the loop.

use crate::error::{WsError, WsResult};
use crate::message::{self, Inbound};
use crate::subscription::{SubscriptionKey, SubscriptionRegistry, DEFAULT_BATCH_LIMIT};
use cexlink_core::{Channel, ExchangeVariant, StreamEvent};
use cexlink_feed::MarketDispatcher;
use cexlink_telemetry::Metrics;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Close code reported when the stream ends without a Close frame.
const ABNORMAL_CLOSE: u16 = 1006;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL.
    pub url: String,
    pub variant: ExchangeVariant,
    /// Fixed wait between a drop and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Book ticker subscription kept present on every open.
    pub default_book_symbol: Option<String>,
    /// Maximum pairs per subscribe message.
    pub batch_limit: usize,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>, variant: ExchangeVariant) -> Self {
        Self {
            url: url.into(),
            variant,
            reconnect_delay: Duration::from_secs(2),
            default_book_symbol: None,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

/// Result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Every pair was already tracked; nothing sent.
    AlreadySubscribed,
    /// New pairs recorded; they go out on the next open.
    Deferred(usize),
    /// New pairs recorded and one subscribe message queued.
    Sent(usize),
}

/// Long-lived streaming session.
pub struct StreamingSession {
    config: SessionConfig,
    state: RwLock<SessionState>,
    registry: SubscriptionRegistry,
    dispatcher: MarketDispatcher,
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Held by the connection task for the lifetime of each connection.
    outbound_rx: TokioMutex<mpsc::UnboundedReceiver<String>>,
    /// Serializes subscription changes against the open transition.
    gate: Mutex<()>,
    shutdown_token: CancellationToken,
}

impl StreamingSession {
    pub fn new(config: SessionConfig, dispatcher: MarketDispatcher) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            registry: SubscriptionRegistry::new(config.batch_limit),
            config,
            state: RwLock::new(SessionState::Disconnected),
            dispatcher,
            outbound_tx,
            outbound_rx: TokioMutex::new(outbound_rx),
            gate: Mutex::new(()),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &MarketDispatcher {
        &self.dispatcher
    }

    /// Run the session loop on a new task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.run().await })
    }

    /// Stop reconnecting and close the current connection.
    pub fn shutdown(&self) {
        info!("Streaming session shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Subscribe `symbols` on `channel`.
    ///
    /// Only pairs not tracked yet are sent, in a single message. While the
    /// session is not open they are recorded and go out on the next open.
    ///
    /// # Errors
    /// `SubscriptionBatchTooLarge` if more new pairs than the batch limit
    /// were requested. Nothing is recorded in that case.
    pub fn subscribe<I, S>(&self, symbols: I, channel: Channel) -> WsResult<SubscribeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _gate = self.gate.lock();

        let added = match self.registry.add_new(symbols, channel) {
            Ok(added) => added,
            Err(e) => {
                warn!(%channel, error = %e, "Subscription rejected");
                return Err(e);
            }
        };
        if added.is_empty() {
            debug!(%channel, "Already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        Metrics::subscriptions_set(self.registry.len());

        if self.state() != SessionState::Open {
            debug!(%channel, pairs = added.len(), "Session not open, subscription deferred");
            return Ok(SubscribeOutcome::Deferred(added.len()));
        }

        let id = self.registry.next_request_id();
        self.enqueue(message::subscription_request(self.config.variant, id, &added, true))?;
        info!(%channel, pairs = added.len(), id, "Subscribe sent");
        Ok(SubscribeOutcome::Sent(added.len()))
    }

    /// Stop tracking `symbols` on `channel`. Returns how many were tracked.
    ///
    /// An unsubscribe message is sent only while open.
    pub fn unsubscribe<I, S>(&self, symbols: I, channel: Channel) -> WsResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _gate = self.gate.lock();

        let removed = self.registry.remove(symbols, channel);
        if removed.is_empty() {
            return Ok(0);
        }
        Metrics::subscriptions_set(self.registry.len());

        if self.state() == SessionState::Open {
            for batch in removed.chunks(self.registry.batch_limit()) {
                let id = self.registry.next_request_id();
                self.enqueue(message::subscription_request(self.config.variant, id, batch, false))?;
            }
            info!(%channel, pairs = removed.len(), "Unsubscribe sent");
        }
        Ok(removed.len())
    }

    /// Send a raw control message on the current connection.
    ///
    /// # Errors
    /// `NotConnected` unless the session is open.
    pub fn send(&self, message: &Value) -> WsResult<()> {
        if self.state() != SessionState::Open {
            return Err(WsError::NotConnected);
        }
        self.enqueue(message.to_string())
    }

    /// Process one inbound text frame and return the events it carried.
    ///
    /// Events are dispatched in frame order. Heartbeats are answered,
    /// control frames are ignored and malformed frames are skipped.
    pub fn on_message(&self, text: &str) -> Vec<StreamEvent> {
        let inbound = match message::classify(self.config.variant, text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, frame = %truncate(text), "Skipping malformed frame");
                Metrics::stream_message("invalid");
                return Vec::new();
            }
        };

        match inbound {
            Inbound::Events(events) => {
                for event in &events {
                    Metrics::stream_message(event.channel().as_str());
                    self.dispatcher.dispatch(event);
                }
                events
            }
            Inbound::Heartbeat(reply) => {
                debug!("Heartbeat received, replying");
                Metrics::stream_message("heartbeat");
                if let Err(e) = self.enqueue(reply.to_string()) {
                    warn!(error = %e, "Failed to queue heartbeat reply");
                }
                Vec::new()
            }
            Inbound::Control => {
                debug!(frame = %truncate(text), "Control frame ignored");
                Metrics::stream_message("control");
                Vec::new()
            }
        }
    }

    /// Connect and reconnect until shutdown.
    pub async fn run(&self) {
        loop {
            if self.is_shutdown() {
                break;
            }

            self.set_state(SessionState::Connecting);

            match self.try_connect().await {
                Ok(()) => {}
                Err(WsError::ConnectionClosed { code, reason }) => {
                    warn!(code, %reason, "WebSocket closed");
                    self.set_state(SessionState::Closed);
                    Metrics::stream_reconnect("closed");
                }
                Err(e) => {
                    error!(error = %e, "WebSocket connection error");
                    self.set_state(SessionState::Errored);
                    Metrics::stream_reconnect("error");
                }
            }
            Metrics::stream_disconnected();

            if self.is_shutdown() {
                break;
            }

            let delay = self.config.reconnect_delay;
            warn!(delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => break,
            }
        }

        self.set_state(SessionState::Disconnected);
        Metrics::stream_disconnected();
        info!("Streaming session stopped");
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, variant = %self.config.variant, "Connecting to WebSocket");

        let (ws_stream, _response) = tokio::select! {
            result = connect_async_tls_with_config(&self.config.url, None, true, None) => result?,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let (mut write, mut read) = ws_stream.split();

        let mut outbound = self.outbound_rx.lock().await;
        self.open(&mut outbound)?;

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.on_message(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            return Err(WsError::ConnectionClosed {
                                code: ABNORMAL_CLOSE,
                                reason: "Stream ended".to_string(),
                            });
                        }
                    }
                }

                outbound_msg = outbound.recv() => {
                    if let Some(text) = outbound_msg {
                        write.send(Message::Text(text)).await?;
                    }
                }
            }
        }
    }

    /// Transition to `Open`: drop stale queued messages, then queue the
    /// full subscription set.
    fn open(&self, outbound: &mut mpsc::UnboundedReceiver<String>) -> WsResult<()> {
        let _gate = self.gate.lock();

        let mut stale = 0usize;
        while outbound.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "Discarded stale outbound messages");
        }

        if let Some(symbol) = &self.config.default_book_symbol {
            self.registry
                .ensure(SubscriptionKey::new(symbol.clone(), Channel::BookTicker));
        }

        let batches = self.registry.batches();
        for batch in &batches {
            let id = self.registry.next_request_id();
            self.enqueue(message::subscription_request(self.config.variant, id, batch, true))?;
        }

        self.set_state(SessionState::Open);
        Metrics::stream_connected();
        Metrics::subscriptions_set(self.registry.len());
        info!(
            pairs = self.registry.len(),
            messages = batches.len(),
            "WebSocket open, subscriptions restored"
        );
        Ok(())
    }

    fn enqueue(&self, text: String) -> WsResult<()> {
        self.outbound_tx
            .send(text)
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
        Metrics::stream_state_set(state.as_str());
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
