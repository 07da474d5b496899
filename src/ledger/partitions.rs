/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `deliveries`: delivery:{entry_id} -> DeliveryLogEntry (JSON)
/// - `alerts`: alert:{alert_id} -> Alert (JSON)
/// - `threads`: thread:{message_id} -> Thread (JSON)
/// - `settings`: notification:{record_id} -> NotificationConfig (JSON)
///
/// Delivery and alert ids are UUIDv7 strings, so lexicographic key order is
/// creation order and a reverse scan yields newest first.

pub const DELIVERY_PREFIX: &str = "delivery:";
pub const ALERT_PREFIX: &str = "alert:";
pub const THREAD_PREFIX: &str = "thread:";
pub const NOTIFICATION_PREFIX: &str = "notification:";

/// Encode a delivery key: delivery:{entry_id}
pub fn encode_delivery_key(entry_id: &str) -> Vec<u8> {
    format!("{DELIVERY_PREFIX}{entry_id}").into_bytes()
}

/// Encode an alert key: alert:{alert_id}
pub fn encode_alert_key(alert_id: &str) -> Vec<u8> {
    format!("{ALERT_PREFIX}{alert_id}").into_bytes()
}

/// Encode a thread key: thread:{message_id}
pub fn encode_thread_key(thread_id: &str) -> Vec<u8> {
    format!("{THREAD_PREFIX}{thread_id}").into_bytes()
}

/// Encode a notification config key: notification:{record_id}
pub fn encode_notification_key(record_id: &str) -> Vec<u8> {
    format!("{NOTIFICATION_PREFIX}{record_id}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_key_encoding() {
        let key = encode_delivery_key("0190c3a0-0000-7000-8000-000000000001");
        assert_eq!(key, b"delivery:0190c3a0-0000-7000-8000-000000000001");
    }

    #[test]
    fn test_alert_key_encoding() {
        assert_eq!(encode_alert_key("abc"), b"alert:abc");
    }

    #[test]
    fn test_thread_key_keeps_dotted_ts() {
        let key = encode_thread_key("1712345678.123456");
        assert_eq!(key, b"thread:1712345678.123456");
    }

    #[test]
    fn test_notification_key_encoding() {
        assert_eq!(encode_notification_key("r1"), b"notification:r1");
    }
}
