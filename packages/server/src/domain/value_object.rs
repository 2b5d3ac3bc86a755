//! 値オブジェクト定義
//!
//! 境界で受け取った文字列は必ずここで検証してからドメインに入れる。

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::error::ValueObjectError;

/// Identity の最大長（メールアドレスの上限に合わせる）
pub const MAX_IDENTITY_LENGTH: usize = 254;
/// 問い合わせ内容の最大長
pub const MAX_ISSUE_LENGTH: usize = 2000;
/// チャットメッセージ本文の最大長
pub const MAX_MESSAGE_BODY_LENGTH: usize = 4000;
/// TicketId の最大長
pub const MAX_TICKET_ID_LENGTH: usize = 64;
/// RoomId の最大長（2 者間ルーム ID は identity 2 つ分になる）
pub const MAX_ROOM_ID_LENGTH: usize = 5 + MAX_TICKET_ID_LENGTH;

fn validate_text(
    field: &'static str,
    value: String,
    max: usize,
) -> Result<String, ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(ValueObjectError::TooLong { field, max });
    }
    Ok(value)
}

macro_rules! string_value_object {
    ($(#[$meta:meta])* $name:ident, $field:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                validate_text($field, value, $max).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_value_object!(
    /// 参加者の識別子（メールアドレスやエージェント ID など、中身は不透明）
    Identity,
    "identity",
    MAX_IDENTITY_LENGTH
);

string_value_object!(
    /// チケット ID
    TicketId,
    "ticketId",
    MAX_TICKET_ID_LENGTH
);

string_value_object!(
    /// ルーム ID
    RoomId,
    "roomId",
    MAX_ROOM_ID_LENGTH
);

string_value_object!(
    /// 問い合わせ内容（自由記述）
    Issue,
    "issue",
    MAX_ISSUE_LENGTH
);

string_value_object!(
    /// チャットメッセージ本文
    MessageBody,
    "body",
    MAX_MESSAGE_BODY_LENGTH
);

impl TicketId {
    /// 生成済みの値から作成する（形式は生成側が保証する）
    pub(crate) fn from_generated(value: String) -> Self {
        Self(value)
    }
}

impl RoomId {
    /// チケット起点のルーム ID。同じチケットからは常に同じ ID が得られる。
    pub fn for_ticket(ticket_id: &TicketId) -> Self {
        Self(format!("room-{}", ticket_id.as_str()))
    }
}

/// 参加者の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

impl FromStr for Role {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "agent" => Ok(Role::Agent),
            other => Err(ValueObjectError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ライブ接続 1 本ごとの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ルーム内で単調増加するメッセージ ID（1 始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
