pub mod fan_in;
pub mod http;
pub mod models;
pub mod traits;

pub use fan_in::fetch_snapshot;
pub use http::{Endpoints, HttpDataSource};
pub use traits::DataSource;
