pub mod dialer;
pub mod stream;
pub mod tls;

pub use dialer::{check_endpoint, Dialer, TcpDialer};
pub use stream::EndpointStream;
