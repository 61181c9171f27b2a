use std::{net::{IpAddr, SocketAddr}, sync::Arc};

use axum::{
    debug_handler,
    extract::{ws::{Message as WsMessage, WebSocket}, ConnectInfo, State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::{config::Config, error::GameError, identity};

use super::{router::OUTBOX_CAPACITY, Coordinator};

#[debug_handler(state = crate::AppState)]
pub async fn socket(
    State(coordinator): State<Coordinator>,
    State(config): State<Arc<Config>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let addr = identity::peer_ip(peer, &headers, config.trust_forwarded_for);

    ws.on_upgrade(move |stream| serve(coordinator, addr, stream))
}

async fn serve(coordinator: Coordinator, addr: IpAddr, stream: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let mut session = coordinator.connect(addr, tx);
    let (mut sender, mut receiver) = stream.split();

    let mut forward_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut forward_task => break,
            frame = receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => coordinator.receive(&mut session, text.as_str()).await,
                Some(Ok(WsMessage::Binary(_))) => {
                    coordinator.reject(&session, None, &GameError::Invalid("binary frames are not supported"));
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                // ping/pong
                Some(Ok(_)) => {}
            },
        }
    }

    coordinator.disconnect(&mut session).await;
    forward_task.abort();
}
