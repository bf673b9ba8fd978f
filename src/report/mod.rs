pub mod aggregate;
pub mod endpoint;
pub mod key;
pub mod map;

pub use aggregate::AggregateReport;
pub use endpoint::EndpointReport;
pub use key::{normalize, EndpointKey};
pub use map::{EndpointView, ReportMap, ReportOrigin};
