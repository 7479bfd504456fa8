pub mod engine;
pub mod error;
pub mod events;
pub mod protocol;
pub mod store;
pub mod transport;

pub use engine::orchestrator::{Orchestrator, Phase};
pub use engine::populate::populate;
pub use engine::slow_read::slow_fetch;
pub use error::{ConnectionError, FlushError, RunError, WriteError};
pub use events::{EventSink, RunEvent, TracingSink};
pub use slowdrip_common::{key_for, ConfigurationError, RunConfig};
pub use store::{RedisStore, StoreClient};
pub use transport::{Dialer, TcpDialer};
