pub mod driver_store;
pub mod resolver;

pub use driver_store::DriverStore;
pub use resolver::{ExtractEntry, ExtractionPlan, MissingReport, PackageResolver, PlannedLink};
