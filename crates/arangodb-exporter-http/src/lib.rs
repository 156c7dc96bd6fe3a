pub mod handlers;
pub mod router;

pub use router::{ExportMode, ExporterState, exporter_router};
