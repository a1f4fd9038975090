use chrono::{DateTime, Utc};

/// A fact recorded by an aggregate.
///
/// Event type names are dotted `<crate>.<aggregate>.<change>` strings and stay
/// stable once published; payload changes bump `version`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable type name, e.g. `"exchange.record.fulfilled"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Business time of the change.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// `"<event_type>@v<version>"`, used as a log and storage key.
    fn schema(&self) -> String {
        format!("{}@v{}", self.event_type(), self.version())
    }
}
