use serde_json::{json, Value};
use std::sync::Arc;

use live_chess::{routes, Color, Dispatcher, GameId, MemoryStore, SessionRegistry};

struct Fixture {
    dispatcher: Arc<Dispatcher>,
    game_id: GameId,
    white: String,
    black: String,
    watcher: String,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let white = store.register("alice").unwrap();
    let black = store.register("bob").unwrap();
    let watcher = store.register("carol").unwrap();
    let game_id = store.create_game("over the wire").unwrap();
    store.join_game(game_id, Color::White, "alice").unwrap();
    store.join_game(game_id, Color::Black, "bob").unwrap();

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        store,
        Arc::new(SessionRegistry::new()),
    ));
    Fixture {
        dispatcher,
        game_id,
        white,
        black,
        watcher,
    }
}

async fn recv_json(client: &mut warp::test::WsClient) -> Value {
    let msg = client.recv().await.expect("frame");
    serde_json::from_str(msg.to_str().expect("text frame")).expect("json frame")
}

fn command(kind: &str, token: &str, game_id: GameId) -> String {
    json!({"commandType": kind, "authToken": token, "gameID": game_id}).to_string()
}

#[tokio::test]
async fn connect_returns_the_game_snapshot() {
    let f = fixture();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(routes("ws", f.dispatcher.clone()))
        .await
        .expect("handshake");

    client.send_text(command("CONNECT", &f.white, f.game_id)).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["serverMessageType"], "LOAD_GAME");
    assert_eq!(reply["game"]["gameID"], f.game_id);
    assert_eq!(reply["game"]["whiteUsername"], "alice");
    assert_eq!(reply["game"]["game"]["turn"], "WHITE");
}

#[tokio::test]
async fn moves_reach_the_other_socket() {
    let f = fixture();
    let filter = routes("ws", f.dispatcher.clone());
    let mut white = warp::test::ws()
        .path("/ws")
        .handshake(filter.clone())
        .await
        .expect("handshake");
    let mut black = warp::test::ws()
        .path("/ws")
        .handshake(filter)
        .await
        .expect("handshake");

    white.send_text(command("CONNECT", &f.white, f.game_id)).await;
    assert_eq!(recv_json(&mut white).await["serverMessageType"], "LOAD_GAME");
    black.send_text(command("CONNECT", &f.black, f.game_id)).await;
    assert_eq!(recv_json(&mut black).await["serverMessageType"], "LOAD_GAME");

    let joined = recv_json(&mut white).await;
    assert_eq!(joined["serverMessageType"], "NOTIFICATION");
    assert_eq!(joined["message"], "bob joined as black");

    let mv = json!({
        "commandType": "MAKE_MOVE",
        "authToken": f.white,
        "gameID": f.game_id,
        "move": {"startPosition": {"row": 2, "column": 5}, "endPosition": {"row": 4, "column": 5}}
    });
    white.send_text(mv.to_string()).await;

    let snapshot = recv_json(&mut black).await;
    assert_eq!(snapshot["serverMessageType"], "LOAD_GAME");
    assert_eq!(snapshot["game"]["game"]["turn"], "BLACK");
    let notice = recv_json(&mut black).await;
    assert_eq!(notice["message"], "alice moved e2 to e4");

    assert_eq!(recv_json(&mut white).await["serverMessageType"], "LOAD_GAME");
}

#[tokio::test]
async fn errors_go_back_as_error_frames() {
    let f = fixture();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(routes("ws", f.dispatcher.clone()))
        .await
        .expect("handshake");

    client.send_text("hello?").await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["serverMessageType"], "ERROR");
    let text = reply["errorMessage"].as_str().unwrap();
    assert!(text.starts_with("Error: "), "{text}");

    client.send_text(command("CONNECT", &f.watcher, 404)).await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["serverMessageType"], "ERROR");
    assert!(reply["errorMessage"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn leave_closes_the_socket() {
    let f = fixture();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(routes("ws", f.dispatcher.clone()))
        .await
        .expect("handshake");

    client.send_text(command("CONNECT", &f.watcher, f.game_id)).await;
    assert_eq!(recv_json(&mut client).await["serverMessageType"], "LOAD_GAME");

    client.send_text(command("LEAVE", &f.watcher, f.game_id)).await;
    client.recv_closed().await.expect("closed");
    assert!(!f.dispatcher.registry().has_room(f.game_id));
}

#[tokio::test]
async fn health_probe_answers_ok() {
    let f = fixture();
    let res = warp::test::request()
        .path("/health")
        .reply(&routes("ws", f.dispatcher))
        .await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body(), "ok");
}

#[tokio::test]
async fn custom_path_is_honoured() {
    let f = fixture();
    let filter = routes("play", f.dispatcher);
    assert!(warp::test::ws().path("/ws").handshake(filter.clone()).await.is_err());
    assert!(warp::test::ws().path("/play").handshake(filter).await.is_ok());
}

#[tokio::test]
async fn binary_frames_get_an_error_reply() {
    let f = fixture();
    let mut client = warp::test::ws()
        .path("/ws")
        .handshake(routes("ws", f.dispatcher.clone()))
        .await
        .expect("handshake");

    client
        .send(warp::ws::Message::binary(b"{}".to_vec()))
        .await;
    let reply = recv_json(&mut client).await;
    assert_eq!(reply["serverMessageType"], "ERROR");
    assert!(reply["errorMessage"]
        .as_str()
        .unwrap()
        .contains("expected a text frame"));

    client.send_text(command("CONNECT", &f.white, f.game_id)).await;
    assert_eq!(recv_json(&mut client).await["serverMessageType"], "LOAD_GAME");
}
