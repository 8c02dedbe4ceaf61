//! Running a node: the listener, the dispatcher and the process around them.
pub mod bootstrap;
mod dispatcher;
pub mod node;
mod server;
pub mod settings;
mod shutdown;

pub use bootstrap::IpSource;
pub use dispatcher::*;
pub use node::NodeHandle;
pub use server::*;
pub use settings::*;
pub use shutdown::*;
