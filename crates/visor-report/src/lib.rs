//! # visor-report — Report Collaborators
//!
//! Everything the Visor service needs once a credential has been accepted:
//!
//! - [`model`]: the report row and its listing summary.
//! - [`store`]: the [`ReportStore`] lookup interface and an in-memory backend.
//! - [`format`]: cleanup of RTF-laden text exported by the pathology system.
//! - [`render`]: the [`DocumentRenderer`] interface and the bundled HTML renderer.
//! - [`barcode`]: the Code128 SVG embedded in each rendered report.
//!
//! Nothing here knows about credentials. Callers hand in a subject and, for
//! documents, a document reference that were already authorized.

pub mod barcode;
pub mod error;
pub mod format;
pub mod model;
pub mod render;
pub mod store;

pub use error::ReportError;
pub use model::{Report, ReportSummary};
pub use render::{DocumentRenderer, HtmlRenderer, RenderedDocument};
pub use store::{InMemoryReportStore, ReportStore};
