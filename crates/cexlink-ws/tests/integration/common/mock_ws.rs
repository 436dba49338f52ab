//! Mock WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and count them
//! - Record received text messages
//! - Ack subscribe requests the way the alternate variant does
//! - Push frames to, or drop, every live connection on demand

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Instruction for a live connection.
#[derive(Debug, Clone)]
enum Command {
    Push(String),
    Drop,
}

type Peers = Arc<Mutex<Vec<mpsc::UnboundedSender<Command>>>>;

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    peers: Peers,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let peers: Peers = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let peers_clone = peers.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let (command_tx, command_rx) = mpsc::unbounded_channel();
                        peers_clone.lock().await.push(command_tx);
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            connections_clone.clone(),
                            command_rx,
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            peers,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Received messages parsed as JSON.
    pub async fn received_json(&self) -> Vec<serde_json::Value> {
        self.received_messages()
            .await
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect()
    }

    /// Send a text frame to every live connection.
    pub async fn push(&self, text: impl Into<String>) {
        let text = text.into();
        let mut peers = self.peers.lock().await;
        peers.retain(|peer| peer.send(Command::Push(text.clone())).is_ok());
    }

    /// Close every live connection from the server side.
    pub async fn drop_connections(&self) {
        let mut peers = self.peers.lock().await;
        for peer in peers.drain(..) {
            let _ = peer.send(Command::Drop);
        }
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        self.drop_connections().await;
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    // Counted after the handshake so a connection is usable once counted
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        {
                            let mut msgs = messages.lock().await;
                            msgs.push_back(text.clone());
                        }

                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
                            if parsed.get("method") == Some(&serde_json::json!("SUBSCRIBE")) {
                                let response = serde_json::json!({
                                    "result": null,
                                    "id": parsed.get("id").cloned().unwrap_or_default(),
                                });
                                let _ = write.send(Message::Text(response.to_string())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            command = commands.recv() => {
                match command {
                    Some(Command::Push(text)) => {
                        let _ = write.send(Message::Text(text)).await;
                    }
                    Some(Command::Drop) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
