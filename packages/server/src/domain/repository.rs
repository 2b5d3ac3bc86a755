//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 排他の粒度
//!
//! 実装はキー単位（チケットごと・ルームごと）で変更を直列化しなければならない。
//! 全チケット・全ルームをまたぐ単一ロックで直列化してはならない。

use async_trait::async_trait;

use super::{
    ChatMessage, ConnectionId, Identity, Member, MessageBody, MessageRelay, Room, RoomError,
    RoomId, Ticket, TicketError, TicketId, TicketTransition, Timestamp,
};

/// チケットの作成・遷移結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUpdate {
    pub ticket: Ticket,
    /// 作成・遷移によって状態が変化したか（冪等な再実行では false）
    pub changed: bool,
}

/// Ticket Registry
///
/// チケットレコードを排他的に所有し、状態遷移を 1 か所で適用する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// チケットを作成する。同じ ID が既に存在すれば既存レコードを返す（changed = false）。
    async fn create(&self, ticket: Ticket) -> Result<TicketUpdate, TicketError>;

    /// チケットを取得
    async fn get(&self, ticket_id: &TicketId) -> Result<Ticket, TicketError>;

    /// チケットごとの排他区間の中で状態遷移を適用する
    ///
    /// 同じチケットへの同時 claim はちょうど 1 つだけが成功し、
    /// 残りは `TicketError::AlreadyClaimed` を受け取る。
    async fn transition(
        &self,
        ticket_id: &TicketId,
        transition: TicketTransition,
    ) -> Result<TicketUpdate, TicketError>;

    /// open 状態のチケット（作成日時の古い順）
    async fn list_open(&self) -> Result<Vec<Ticket>, TicketError>;
}

/// Room Store
///
/// ルームとメッセージを排他的に所有する。メンバーシップ変更・メッセージ追加・
/// join はルームごとに直列化される。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルームがなければ作成し、メンバーを追加して返す
    async fn ensure_room(
        &self,
        room_id: RoomId,
        ticket_id: Option<TicketId>,
        members: Vec<Member>,
        created_at: Timestamp,
    ) -> Result<Room, RoomError>;

    /// ルームを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RoomError>;

    /// 全ルームを取得（作成日時の古い順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// identity がメンバーになっているクローズ前のルーム（作成日時の古い順）
    async fn open_rooms_of(&self, identity: &Identity) -> Vec<Room>;

    /// 接続をルームに紐付け、その時点のスナップショット（履歴を含む）を返す
    ///
    /// 履歴は同じ排他区間の中で `relay.replay` に渡されるため、以降のライブ配信より
    /// 先に接続へ届く。
    async fn attach(
        &self,
        room_id: &RoomId,
        identity: &Identity,
        connection_id: ConnectionId,
        relay: &dyn MessageRelay,
    ) -> Result<Room, RoomError>;

    /// メッセージを追加し、同じ排他区間の中で `relay` に配信させる
    async fn append_message(
        &self,
        room_id: &RoomId,
        sender: &Identity,
        body: MessageBody,
        timestamp: Timestamp,
        relay: &dyn MessageRelay,
    ) -> Result<ChatMessage, RoomError>;

    /// メンバーとして履歴を参照する（接続の紐付けは行わない）
    async fn history(
        &self,
        room_id: &RoomId,
        identity: &Identity,
    ) -> Result<Vec<ChatMessage>, RoomError>;

    /// ルームをクローズする。既にクローズ済みなら `Ok(false)`。
    async fn close_room(&self, room_id: &RoomId, at: Timestamp) -> Result<bool, RoomError>;

    /// クローズ後の保持期間を過ぎたルームを削除し、その ID を返す
    async fn evict_expired(&self, now: Timestamp, retention_millis: i64) -> Vec<RoomId>;
}
