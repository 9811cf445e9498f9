//////////////////////////
// server.rs
//////////////////////////

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::{Message, WebSocket, Ws};
use warp::Filter;

use crate::config::ServerConfig;
use crate::dispatcher::{Dispatcher, Flow};
use crate::error::SessionError;
use crate::types::ServerMessage;

/// One task per connection: frames from the socket are handled in order,
/// while a separate writer task drains the connection's outbox.
pub async fn handle_connection(ws: WebSocket, dispatcher: Arc<Dispatcher>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let conn = Uuid::new_v4();
    tracing::info!(%conn, "client connected");

    let (outbox, mut queue) = mpsc::unbounded_channel::<ServerMessage>();
    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(%conn, error = %e, "could not encode message");
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::text(text)).await {
                tracing::debug!(%conn, error = %e, "send failed, stopping writer");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(result) = ws_rx.next().await {
        let msg = match result {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%conn, error = %e, "websocket error");
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if msg.is_binary() {
            let err = SessionError::Protocol("expected a text frame".to_string());
            let _ = outbox.send(ServerMessage::error(&err));
            continue;
        }
        // Ping and pong frames carry no command
        let text = match msg.to_str() {
            Ok(s) => s,
            Err(_) => continue,
        };
        if dispatcher.handle(conn, &outbox, text).await == Flow::Close {
            break;
        }
    }

    dispatcher.disconnect(conn);
    tracing::info!(%conn, "client disconnected");
}

/// The websocket route at `/<ws_path>` plus a `/health` probe.
pub fn routes(
    ws_path: &str,
    dispatcher: Arc<Dispatcher>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let dispatcher = warp::any().map(move || dispatcher.clone());

    let ws_route = warp::path(ws_path.to_string())
        .and(warp::path::end())
        .and(warp::ws())
        .and(dispatcher)
        .map(|ws: Ws, dispatcher: Arc<Dispatcher>| {
            ws.on_upgrade(move |socket| handle_connection(socket, dispatcher))
        });

    let health = warp::path("health").and(warp::path::end()).map(|| "ok");

    ws_route.or(health)
}

pub async fn start_server(
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), warp::Error> {
    let routes = routes(&config.ws_path, dispatcher);

    let (addr, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(config.bind, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for ctrl-c");
            }
            tracing::info!("shutdown requested");
        })?;

    tracing::info!(%addr, path = %config.ws_path, "server started on ws://{}/{}", addr, config.ws_path);
    server.await;
    tracing::info!("server stopped");
    Ok(())
}
