//! Input boundary: picking up recordings from the capture process.
//!
//! The external capture process drops finished recordings into the
//! input directory. The scanner polls that directory once per pass:
//!
//! ```text
//! capture process → input dir → Scanner → AudioUnit batch → core
//! ```

pub mod scanner;

pub use scanner::{Scanner, ScannerConfig};
