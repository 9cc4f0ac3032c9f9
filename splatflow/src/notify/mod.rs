//! Terminal-state notification.
//!
//! Exactly one [`NotificationPayload`] leaves the controller per accepted
//! run. Early-stopped runs report through the same success shape as full
//! completions.

mod payload;
mod sink;

pub use payload::NotificationPayload;
pub use sink::{
    CollectingNotificationSink, NoOpNotificationSink, NotificationSink, TracingNotificationSink,
};
