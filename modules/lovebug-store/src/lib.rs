pub mod client;
pub mod reader;
pub mod writer;

pub use client::StoreClient;
pub use reader::{ReportFilter, ReportReader, SearchParams};
pub use writer::ReportWriter;
