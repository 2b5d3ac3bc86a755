//! Integration tests for the broker, driven over real HTTP and WebSocket connections.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 投稿 → キュー → dispatch → claim → ルーム → リレーの一連の流れ
//!
//! ### なぜこのテストが必要か
//! - 各ユースケースの単体テストでは、WebSocket のフレームとしてクライアントに
//!   何がどの順序で届くかまでは確認できない
//!
//! ### どのような状況を想定しているか
//! - 2 エージェントの同時 claim
//! - join 前に送られたメッセージの履歴での受信
//! - 再接続後のリプレイ（重複なし）
//! - キャンセル後の claim、必須フィールド欠落、同じ identity の再接続

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use kakehashi_server::{Application, BrokerConfig};
use kakehashi_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// In-process broker on an ephemeral port
struct TestServer {
    addr: std::net::SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let config = BrokerConfig {
            dispatch_retry_millis: 10,
            ..BrokerConfig::default()
        };
        let app = Application::build(config, Arc::new(SystemClock)).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            app.serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        TestServer {
            addr,
            shutdown: Some(tx),
            handle: Some(handle),
            http: reqwest::Client::new(),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn ws_url(&self, identity: &str, role: &str) -> String {
        format!("ws://{}/ws?identity={}&role={}", self.addr, identity, role)
    }

    async fn post(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let response = self
            .http
            .post(self.http_url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let response = self.http.get(self.http_url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    /// Submit a ticket over HTTP and wait until the dispatch loop has recorded it
    async fn submit_and_wait(&self, requester: &str, issue: &str) -> String {
        let (status, body) = self
            .post(
                "/api/tickets",
                json!({"requesterIdentity": requester, "issue": issue}),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
        let ticket_id = body["ticketId"].as_str().unwrap().to_string();

        tokio::time::timeout(EVENT_TIMEOUT, async {
            loop {
                let (status, _) = self.get(&format!("/api/tickets/{ticket_id}")).await;
                if status == reqwest::StatusCode::OK {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        ticket_id
    }

    /// Wait until the room history holds `count` messages (room.send has no reply)
    async fn wait_for_history(&self, room_id: &str, identity: &str, count: usize) {
        tokio::time::timeout(EVENT_TIMEOUT, async {
            loop {
                let (_, body) = self
                    .get(&format!("/api/rooms/{room_id}/messages?identity={identity}"))
                    .await;
                if body["history"].as_array().map(Vec::len) == Some(count) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = tokio::time::timeout(EVENT_TIMEOUT, handle).await;
        }
    }
}

/// WebSocket client speaking the broker's JSON frames
struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the `session.connected` greeting
    async fn connect(server: &TestServer, identity: &str, role: &str) -> Self {
        let (stream, _) = connect_async(server.ws_url(identity, role)).await.unwrap();
        let mut client = TestClient { stream };
        let greeting = client.next_event().await;
        assert_eq!(greeting["type"], "session.connected");
        assert_eq!(greeting["identity"], identity);
        if role == "agent" {
            let open_list = client.next_event().await;
            assert_eq!(open_list["type"], "ticket.open_list");
        }
        client
    }

    async fn send(&mut self, command: Value) {
        self.stream
            .send(Message::text(command.to_string()))
            .await
            .unwrap();
    }

    /// Next text frame as JSON (None when the socket closes)
    async fn try_next_event(&mut self) -> Option<Value> {
        tokio::time::timeout(EVENT_TIMEOUT, async {
            while let Some(frame) = self.stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        return Some(serde_json::from_str(text.as_str()).unwrap());
                    }
                    Ok(Message::Close(_)) | Err(_) => return None,
                    Ok(_) => {}
                }
            }
            None
        })
        .await
        .unwrap()
    }

    async fn next_event(&mut self) -> Value {
        self.try_next_event().await.unwrap()
    }

    /// Skip events until one of the given types arrives
    async fn wait_for(&mut self, types: &[&str]) -> Value {
        loop {
            let event = self.next_event().await;
            if types.iter().any(|t| event["type"] == *t) {
                return event;
            }
        }
    }

    async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

fn bodies(history: &Value) -> Vec<String> {
    history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_two_agents_racing_for_one_ticket() {
    // テスト項目: 同時 claim でちょうど 1 人が勝ち、もう 1 人は ticket.rejected を受け取る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut agent_a = TestClient::connect(&server, "agent-a", "agent").await;
    let mut agent_b = TestClient::connect(&server, "agent-b", "agent").await;
    let ticket_id = server.submit_and_wait("alice", "cannot pay").await;
    for agent in [&mut agent_a, &mut agent_b] {
        let incoming = agent.wait_for(&["ticket.incoming"]).await;
        assert_eq!(incoming["ticket"]["ticketId"], ticket_id.as_str());
    }

    // when (操作):
    let claim = json!({"type": "ticket.claim", "ticketId": ticket_id});
    agent_a.send(claim.clone()).await;
    agent_b.send(claim).await;
    let result_a = agent_a
        .wait_for(&["ticket.claimed", "ticket.rejected"])
        .await;
    let result_b = agent_b
        .wait_for(&["ticket.claimed", "ticket.rejected"])
        .await;

    // then (期待する結果):
    let mut outcomes = vec![
        result_a["type"].as_str().unwrap().to_string(),
        result_b["type"].as_str().unwrap().to_string(),
    ];
    outcomes.sort();
    assert_eq!(outcomes, vec!["ticket.claimed", "ticket.rejected"]);

    let (winner, rejected) = if result_a["type"] == "ticket.claimed" {
        ("agent-a", &result_b)
    } else {
        ("agent-b", &result_a)
    };
    assert_eq!(rejected["claimedBy"], winner);
    assert_eq!(rejected["rejected"], true);

    let (_, ticket) = server.get(&format!("/api/tickets/{ticket_id}")).await;
    assert_eq!(ticket["state"], "active");
    assert_eq!(ticket["claimedBy"], winner);

    agent_a.close().await;
    agent_b.close().await;
    server.stop().await;
}

#[tokio::test]
async fn test_message_before_join_and_reconnect_replay() {
    // テスト項目: join 前の "hello" が履歴の先頭で届き、再接続後も重複なくリプレイされる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut user = TestClient::connect(&server, "alice", "user").await;
    let ticket_id = server.submit_and_wait("alice", "refund").await;
    let (status, claimed) = server
        .post(
            &format!("/api/tickets/{ticket_id}/claim"),
            json!({"agentIdentity": "agent-a"}),
        )
        .await;
    assert_eq!(status, reqwest::StatusCode::OK);
    let room_id = claimed["roomId"].as_str().unwrap().to_string();
    let notified = user.wait_for(&["ticket.claimed"]).await;
    assert_eq!(notified["roomId"], room_id.as_str());

    // when (操作):
    user.send(json!({"type": "room.send", "roomId": room_id, "body": "hello"}))
        .await;
    server.wait_for_history(&room_id, "alice", 1).await;
    let mut agent = TestClient::connect(&server, "agent-a", "agent").await;
    agent
        .send(json!({"type": "room.join", "roomId": room_id}))
        .await;
    let first_history = agent.wait_for(&["room.history"]).await;

    agent.close().await;
    user.send(json!({"type": "room.send", "roomId": room_id, "body": "while away"}))
        .await;
    server.wait_for_history(&room_id, "alice", 2).await;
    let mut agent = TestClient::connect(&server, "agent-a", "agent").await;
    agent
        .send(json!({"type": "room.join", "roomId": room_id}))
        .await;
    let second_history = agent.wait_for(&["room.history"]).await;
    user.send(json!({"type": "room.send", "roomId": room_id, "body": "after join"}))
        .await;
    let live = agent.wait_for(&["room.message"]).await;

    // then (期待する結果):
    assert_eq!(bodies(&first_history["history"]), vec!["hello"]);
    assert_eq!(
        bodies(&second_history["history"]),
        vec!["hello", "while away"]
    );
    assert_eq!(live["message"]["body"], "after join");
    assert_eq!(live["message"]["id"], 3);

    let (status, history) = server
        .get(&format!("/api/rooms/{room_id}/messages?identity=agent-a"))
        .await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(
        bodies(&history["history"]),
        vec!["hello", "while away", "after join"]
    );

    user.close().await;
    agent.close().await;
    server.stop().await;
}

#[tokio::test]
async fn test_claim_after_cancel_is_conflict() {
    // テスト項目: キャンセル済みチケットの claim は 409 invalid_transition
    // given (前提条件):
    let server = TestServer::start().await;
    let ticket_id = server.submit_and_wait("alice", "wrong size").await;
    let (status, cancelled) = server
        .post(&format!("/api/tickets/{ticket_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(cancelled["state"], "cancelled");

    // when (操作):
    let (status, body) = server
        .post(
            &format!("/api/tickets/{ticket_id}/claim"),
            json!({"agentIdentity": "agent-a"}),
        )
        .await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(body["retryable"], false);

    server.stop().await;
}

#[tokio::test]
async fn test_submit_with_missing_fields_is_rejected() {
    // テスト項目: 必須フィールドが欠けた投稿は 400 で、欠けたフィールド名が返る
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let (status, body) = server.post("/api/tickets", json!({"issue": ""})).await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required fields: requesterIdentity, issue"
    );
    let (_, open) = server.get("/api/tickets").await;
    assert_eq!(open, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn test_reconnect_supersedes_old_connection() {
    // テスト項目: 同じ identity で接続し直すと古い接続に session.superseded が届き、閉じられる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut old = TestClient::connect(&server, "alice", "user").await;

    // when (操作):
    let new = TestClient::connect(&server, "alice", "user").await;

    // then (期待する結果):
    let event = old.next_event().await;
    assert_eq!(event["type"], "session.superseded");
    assert!(old.try_next_event().await.is_none());

    new.close().await;
    server.stop().await;
}

#[tokio::test]
async fn test_malformed_command_yields_bad_request() {
    // テスト項目: 解釈できないコマンドには bad_request の error イベントが返り、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut user = TestClient::connect(&server, "alice", "user").await;

    // when (操作):
    user.send(json!({"type": "ticket.teleport"})).await;
    let error = user.next_event().await;
    user.send(json!({"type": "ticket.submit", "issue": "still here"}))
        .await;
    let submitted = user.next_event().await;

    // then (期待する結果):
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "bad_request");
    assert_eq!(submitted["type"], "ticket.submitted");

    user.close().await;
    server.stop().await;
}
