//! Service authentication for the REST API.
//!
//! Every API call identifies its service with the `service_id` and `token`
//! request headers. The pair is checked against the `services` table and
//! the matching service becomes the owner scope of the request.

pub mod middleware;

pub use middleware::{RequireService, ServiceRejection};
