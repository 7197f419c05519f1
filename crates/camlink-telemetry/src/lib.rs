pub mod providers;
pub mod sink;

pub use providers::{ConsoleSink, WebhookConfig, WebhookSink};
pub use sink::{EventSeverity, TelemetrySink};
