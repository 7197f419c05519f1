pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod motion;
pub mod publisher;
pub mod session;

pub use config::{AdapterConfig, ConfigProvider, ConfigStore};
pub use device::{CameraSession, CameraTransport, MediaProfile};
pub use dispatcher::CommandDispatcher;
pub use error::{AdapterError, Result};
pub use motion::{
    ButtonInput, ControlAxes, ControlChannel, ControlEvent, MotionAxis, MotionCommand, Velocity,
    CONTINUOUS_MOVE_TIMEOUT,
};
pub use publisher::{StatePublisher, PUBLISH_INTERVAL};
pub use session::{ConnectivityState, SessionManager, Transition};
