//! Fetch the Embrapa Vitibrasil statistics and reshape them from one column
//! per year into records with an ordered year/value series.
//!
//! ```no_run
//! # async fn demo() -> Result<(), vitiscraper::error::PipelineError> {
//! use vitiscraper::{DatasetCatalog, Pipeline, Settings};
//!
//! let pipeline = Pipeline::new(DatasetCatalog::builtin(), Settings::default());
//! let records = pipeline.run("production").await?;
//! println!("{}", serde_json::to_string(&records).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod process;
pub mod reshape;

pub use catalog::{DatasetCatalog, DatasetConfig};
pub use config::Settings;
pub use pipeline::Pipeline;
pub use process::{CellValue, RawTable};
pub use reshape::{Record, YearValue};
