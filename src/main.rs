//! # cleanup-advisor CLI
//!
//! Command-line interface for the cleanup advisor.
//!
//! ## Usage
//! ```bash
//! cleanup-advisor scan ~/Downloads
//! cleanup-advisor analyze ~/Downloads ~/Desktop --output csv > report.csv
//! ```

mod cli;

use cleanup_advisor::Result;

fn main() -> Result<()> {
    cli::run()
}
