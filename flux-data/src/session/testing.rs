use super::WsMessage;
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

/// Serve a single local WebSocket connection: receive the subscribe request, send the
/// scripted messages in order, then keep reading until the client goes away.
///
/// The handle resolves to the subscribe request the client sent.
pub(crate) async fn serve(script: Vec<WsMessage>) -> (Url, JoinHandle<Option<WsMessage>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}", listener.local_addr().unwrap())).unwrap();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut websocket = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let request = websocket.next().await.and_then(Result::ok);
        for message in script {
            if websocket.send(message).await.is_err() {
                return request;
            }
        }

        while let Some(Ok(_)) = websocket.next().await {}
        request
    });

    (url, handle)
}
