//! ID 生成

use uuid::Uuid;

use super::value_object::TicketId;

/// TicketId の生成
pub struct TicketIdFactory;

impl TicketIdFactory {
    /// `tkt-<uuid v4>` 形式の TicketId を生成
    pub fn generate() -> TicketId {
        TicketId::from_generated(format!("tkt-{}", Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ticket_ids() {
        // テスト項目: 生成される TicketId は一意で接頭辞を持つ
        // given (前提条件):

        // when (操作):
        let first = TicketIdFactory::generate();
        let second = TicketIdFactory::generate();

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("tkt-"));
    }
}
