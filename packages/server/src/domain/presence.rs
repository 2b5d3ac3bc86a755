//! プレゼンスと配信のインターフェース
//!
//! - `PresenceRegistry`: identity ごとのライブ接続を管理する
//! - `MessagePusher`: identity / 接続を指定して通知を届ける
//! - `MessageRelay`: ルームの排他区間の中からメッセージを配信する

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    Attachment, BrokerEvent, ChatMessage, ConnectionId, Identity, MessagePushError, Participant,
    Role, Room, RoomId, Timestamp,
};

/// 接続へメッセージを送るためのチャンネル（ワイヤ形式の文字列を流す）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// ライブ接続のハンドル
#[derive(Debug, Clone)]
pub struct LiveHandle {
    pub connection_id: ConnectionId,
    pub role: Role,
    pub channel: PusherChannel,
}

/// `connect` の結果
#[derive(Debug)]
pub struct ConnectOutcome {
    pub participant: Participant,
    pub connection_id: ConnectionId,
    /// 置き換えられた古い接続のチャンネル。呼び出し側が通知してから破棄する。
    pub superseded: Option<PusherChannel>,
}

/// Presence Registry
///
/// identity ごとに 1 本だけライブ接続を持つ。identity ごとに直列化される。
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// ライブ接続を登録する。既存の接続があれば置き換える。
    async fn connect(
        &self,
        identity: Identity,
        role: Role,
        channel: PusherChannel,
        at: Timestamp,
    ) -> ConnectOutcome;

    /// ライブ接続を解除する
    ///
    /// `connection_id` が現在の接続と一致する場合のみ解除し、解除後の参加者を返す。
    /// 既に置き換えられた接続の切断は何もせず `None` を返す。
    async fn disconnect(
        &self,
        identity: &Identity,
        connection_id: ConnectionId,
        at: Timestamp,
    ) -> Option<Participant>;

    /// ライブ接続を取得
    async fn lookup(&self, identity: &Identity) -> Option<LiveHandle>;

    /// 参加者レコードを取得（切断中でも返る）
    async fn participant(&self, identity: &Identity) -> Option<Participant>;

    /// 参加者が現在いるルームを記録
    async fn set_current_room(&self, identity: &Identity, room_id: RoomId);

    /// 指定ロールで接続中の identity
    async fn connected(&self, role: Role) -> Vec<Identity>;
}

/// メッセージ送信（通知）のインターフェース
///
/// 配信はベストエフォートで、オフラインの相手のためにキューイングはしない。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// identity の現在の接続へ通知する
    async fn push_to(&self, target: &Identity, event: &BrokerEvent)
    -> Result<(), MessagePushError>;

    /// 指定した接続がまだ現在の接続である場合だけ通知する
    async fn push_to_connection(
        &self,
        target: &Identity,
        connection_id: ConnectionId,
        event: &BrokerEvent,
    ) -> Result<(), MessagePushError>;

    /// エンコード済みのペイロードを指定した接続へ送る（リクエストへの応答用）
    async fn push_text(
        &self,
        target: &Identity,
        connection_id: ConnectionId,
        text: String,
    ) -> Result<(), MessagePushError>;

    /// Presence から外れたチャンネルへ直接通知する（置き換えられた接続向け）
    async fn push_to_channel(
        &self,
        channel: &PusherChannel,
        event: &BrokerEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の identity に通知する。一部の失敗は許容する。
    async fn broadcast(&self, targets: Vec<Identity>, event: &BrokerEvent);
}

/// ルームのメッセージ配信
///
/// Room Store がルームの排他区間の中から呼ぶ。ネットワーク I/O を待ってはならない。
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// join した接続へ履歴のスナップショットを送る
    async fn replay(&self, room: &Room, attachment: &Attachment);

    /// 追加されたメッセージを join 済みの接続へ送る
    async fn relay(&self, message: &ChatMessage, recipients: Vec<Attachment>);
}
