use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::{atomic, Arc};
use tokio::select;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::app::AppState;
use crate::auth::Session;

/// One attached websocket observer.
pub struct WebsocketConnection {
    pub app_state: AppState,
    /// token the socket was opened with; actions sent over it run as this session
    pub token: String,
    pub session: Session,

    pub sender: UnboundedSender<Message>,
    pub addr: SocketAddr,
}

impl WebsocketConnection {
    fn new(
        app_state: AppState,
        token: String,
        session: Session,
        sender: UnboundedSender<Message>,
        addr: SocketAddr,
    ) -> WebsocketConnection {
        WebsocketConnection {
            app_state,
            token,
            session,
            sender,
            addr,
        }
    }
}

impl WebsocketConnection {
    pub fn weak_send(weak_sender: WeakUnboundedSender<Message>, data: Message) {
        if let Some(sender) = weak_sender.upgrade() {
            if let Err(msg) = sender.send(data) {
                debug!("could not send message due to ws sender dropped: {}", msg);
            }
        } else {
            debug!(
                "could not send message due to ws sender dropped: {:#?}",
                data
            );
        }
    }
}

pub struct WsConnManager {
    id: AtomicUsize,
    connections: scc::HashMap<usize, Arc<WebsocketConnection>, ahash::RandomState>,
}

impl Default for WsConnManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConnManager {
    pub fn new() -> Self {
        Self {
            id: AtomicUsize::new(0),
            connections: scc::HashMap::default(),
        }
    }
}

impl WsConnManager {
    fn add(&self, conn: Arc<WebsocketConnection>) -> usize {
        let id = self.id.fetch_add(1, atomic::Ordering::Relaxed);
        let _ = self.connections.insert(id, conn);
        id
    }

    /// Pumps one socket: action frames in, responses and broadcast events out.
    pub async fn serve_connection(
        &self,
        ws: WebSocket,
        token: String,
        session: Session,
        app_state: AppState,
        peer_addr: SocketAddr,
    ) -> anyhow::Result<()> {
        let (mut outgoing, mut incoming) = ws.split();

        let (outgoing_tx, mut outgoing_rx) = unbounded_channel();

        let ws_conn = Arc::new(WebsocketConnection::new(
            app_state.clone(),
            token,
            session,
            outgoing_tx,
            peer_addr,
        ));

        let cancel_token = app_state.stop_notify.clone();
        let broadcaster = app_state.supervisor.broadcaster().clone();
        // the replay is queued before anything published after this point
        let mut observer = app_state.supervisor.attach_observer().await;
        let observer_id = observer.id();

        let ws_conn_clone = ws_conn.clone();

        let connection_loop = || async move {
            loop {
                select! {
                    // read
                    msg = incoming.next() => {
                        if let Some(Ok(m)) = msg {
                            if ws_conn_clone.handle_received(m) {
                                break;
                            }
                        }
                        else {
                            break;
                        }
                    }

                    // broadcast
                    payload = observer.recv() => {
                        match payload {
                            Some(payload) => {
                                outgoing.send(Message::Text(Utf8Bytes::from(payload.to_string()))).await?
                            }
                            None => break,
                        }
                    }

                    // write
                    msg = outgoing_rx.recv() => {
                        if let Some(m) = msg {
                            outgoing.send(m).await?;
                        }
                        else {
                            break;
                        }
                    }

                    // cancel
                    _ = cancel_token.notified() => {
                        outgoing.send(Message::Close(Some(CloseFrame{
                            code: close_code::NORMAL,
                            reason: "daemon closed".into()
                        }))).await?;
                        info!("websocket connection from {} closed", peer_addr);
                        break;
                    }
                }
            }
            anyhow::Ok(())
        };
        let id = self.add(ws_conn);
        let rv = tokio::spawn(connection_loop()).await;
        broadcaster.detach(observer_id);
        self.connections.remove(&id);
        rv?
    }
}
