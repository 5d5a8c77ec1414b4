//! Style injection and body visibility for the rendering runtime.
//!
//! [`StyleInserter`] installs CSS under a [`StyleRoot`] (the document head or a
//! shadow root), deduplicating runtime and extension stylesheets by their
//! logical [`StyleKey`] and keeping them in cascade order. The
//! [`StyleReadinessPoller`] reports when an inserted sheet is active, and the
//! [`VisibilityCoordinator`] reveals the body of a window once it is ready.
//!
//! Everything here is single-threaded: waits are spawned with
//! `tokio::task::spawn_local` and must run inside a `LocalSet`.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod inserter;
pub mod key;
pub mod readiness;
pub mod registry;
pub mod root;
pub mod services;
pub mod transform;
pub mod visibility;

pub use config::InjectorConfig;
pub use diagnostics::{BestEffort, Diagnostics};
pub use error::{InstallError, ServiceError, VisibilityError};
pub use inserter::{ReadyCallback, StyleInserter, StyleRequest};
pub use key::StyleKey;
pub use readiness::{PollHandle, PollOutcome, StyleReadinessPoller};
pub use registry::StyleRegistry;
pub use root::StyleRoot;
pub use services::{
    Performance, RenderDelayingServices, Resources, ServiceId, ServiceLocator, ServiceRegistry,
};
pub use transform::CssTransformHook;
pub use visibility::{BODY_VISIBLE_MARK, VISIBLE_BODY_STYLES, VisibilityCoordinator};
