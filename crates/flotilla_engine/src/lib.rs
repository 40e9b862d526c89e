//! Flotilla engine: fans one request out to every target and reports progress live.
mod connect;
mod discovery;
mod dispatch;
mod error;
mod progress;
mod request;
mod tap;
mod transport;
mod tunnel;
mod types;

pub use connect::{
    Connection, ConnectionStrategy, DirectStrategy, FallbackStrategy, ReleaseAction,
    TunneledStrategy,
};
pub use discovery::{Discovery, GroupMember, StaticDiscovery};
pub use dispatch::{dispatch, DispatchReport, DisplayConfig};
pub use error::{
    BuildError, ConnectionError, DiscoveryError, DispatchError, RenderError, TargetFailure,
    TransportError,
};
pub use progress::{DisplayReport, ProgressEngine, Renderer, RowHandle, RunningDisplay, UserInput};
pub use request::{default_port_for_scheme, RequestTemplate};
pub use tap::{progress_fraction, LengthTap};
pub use transport::{BodyStream, ReqwestTransport, Transport, TransportResponse, TransportSettings};
pub use tunnel::{ConnectDialer, DuplexStream, Tunnel, TunnelDialer, UpgradeDialer};
pub use types::{Outcome, PortMapping, RequestDescriptor, Target, TargetResponse};

pub use flotilla_core::{Phase, ProgressView, RowStatus, RowView};
