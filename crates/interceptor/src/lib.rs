mod error;
pub mod builder;
pub mod channel;
pub mod classifier;
pub mod clock;
pub mod context;
pub mod entropy;
pub mod event;
pub mod quarantine;
pub mod resolver;
pub mod telemetry;
pub mod text;

pub use builder::{EventBuilder, Operation};
pub use channel::DeliveryChannel;
pub use context::{Disposition, FilterContext};
pub use error::Error;
pub use event::{EventKind, EventRecord};
