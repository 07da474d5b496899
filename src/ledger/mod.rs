/// Fjall-based persistence for the delivery log, alerts, threads and the
/// notification config singleton
///
/// Everything the process must remember across restarts lives here. The
/// webhook registry is deliberately not stored; see `crate::registry`.
///
/// ## Partitions
///
/// - `deliveries`: one entry per capture attempt, success or failure
/// - `alerts`: synthesized or manually created alerts
/// - `threads`: conversations keyed by the external root message id
/// - `settings`: the notification config (replaced as a whole on save)
///
/// Consumers depend on the [`Ledger`] trait so that tests can substitute a
/// store that fails on demand.
///
/// ## Usage
///
/// ```rust,ignore
/// use hookrelay::ledger::{FjallStore, Ledger};
///
/// let store = FjallStore::open("data/ledger")?;
/// store.insert_alert(&alert)?;
/// let recent = store.list_alerts(50)?;
/// ```

pub mod error;
pub mod partitions;
pub mod records;
pub mod store;
pub mod traits;

pub use error::{LedgerError, Result};
pub use records::{
    Alert, AlertLevel, DeliveryLogEntry, DeliveryPage, DeliveryQuery, DeliveryStatus,
    NotificationConfig, Thread, ThreadReply,
};
pub use store::{FjallStore, StoreStats};
pub use traits::Ledger;
