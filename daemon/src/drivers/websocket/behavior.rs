use crate::app::AppState;
use crate::auth::Session;
use crate::drivers::websocket::WebsocketConnection;
use crate::protocols::Protocol;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use log::{debug, info};
use std::collections::HashMap;
use warden_protocol::user::Role;

impl WebsocketConnection {
    /// Handles one inbound frame; `true` once the peer closed the socket.
    pub fn handle_received(&self, data: Message) -> bool {
        match data {
            Message::Text(text) => {
                debug!("received text from {}: {}", self.addr, text);

                let v1 = self.app_state.protocol_v1.clone();
                let sender = self.sender.downgrade();
                let token = self.token.clone();

                tokio::spawn(async move {
                    let response = v1.process_text(Some(token.as_str()), text.as_str()).await;
                    Self::weak_send(sender, Message::Text(Utf8Bytes::from(response)));
                });
            }
            Message::Binary(_) => {
                debug!("ignoring binary frame from {}", self.addr);
            }
            Message::Close(close) => {
                self.handle_closing(close.as_ref());
                return true;
            }
            _ => {}
        }
        false
    }

    pub fn handle_closing(&self, msg: Option<&CloseFrame>) {
        info!(
            "websocket close from {}({}), with reason: {}",
            self.session.username,
            self.addr,
            msg.map(|f| f.reason.as_str().to_string()).unwrap_or_default()
        );
    }
}

impl WebsocketConnection {
    /// Only signed-in users may observe the console and telemetry.
    pub async fn verify_connection(
        app_state: &AppState,
        query: &HashMap<String, String>,
    ) -> Result<(String, Session), String> {
        let token = query
            .get("token")
            .ok_or_else(|| "Missing required query field: `token`".to_string())?;

        app_state
            .router
            .authorize(Some(token.as_str()), Role::User)
            .await
            .map(|session| (token.trim().to_string(), session))
            .map_err(|err| err.to_string())
    }
}
