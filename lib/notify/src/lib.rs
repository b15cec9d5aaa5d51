//! Notifications for the folio publication engine.
//!
//! When content enters a state, the members of the roles configured for
//! that state are told about it. Delivery is best-effort and decoupled from
//! the transition itself: the executor emits a `TransitionEvent` onto a
//! bounded queue and a worker task runs the `NotificationDispatcher`.
//!
//! # Example
//!
//! ```
//! use folio_notify::NotificationRules;
//!
//! let rules = NotificationRules::new()
//!     .with_rule("review", ["reviewer"])
//!     .with_rule("published", ["editor"]);
//! assert_eq!(rules.roles_for(&"review".into()).len(), 1);
//! ```

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod queue;
pub mod rule;
pub mod template;
pub mod transport;

pub use dispatcher::{
    DeliveryFailure, DispatchReport, DispatchStats, DispatcherTimeouts, NotificationDispatcher,
    StatsSnapshot,
};
pub use error::{EmitError, TransportError};
pub use event::TransitionEvent;
pub use queue::{NotificationQueue, NotificationSender, NotificationWorker};
pub use rule::NotificationRules;
pub use template::{RenderedMessage, Template, TemplateSet};
pub use transport::{LogTransport, NotificationTransport};
