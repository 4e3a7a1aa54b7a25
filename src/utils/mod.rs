pub mod error;
pub mod host;
pub mod logging;

pub use error::AppError;
pub use host::HostInfo;
