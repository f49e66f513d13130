pub mod authorizenet;
pub mod metrics;
pub mod repository;

pub use authorizenet::AuthorizeNetClient;
pub use metrics::{get_metrics, init_metrics};
pub use repository::OrderRepository;
