//! Policy Documents
//!
//! A Policy describes one campaign compilation: which subgraphs to emit and
//! the parameters each one runs with. It does not describe the population;
//! individual properties come from the demographics.
//!
//! # Sections
//!
//! Every section is optional. An absent section is not emitted; a present
//! but empty section (`{}`) is emitted with its calibrated defaults.
//!
//! # File Format
//!
//! ```yaml
//! apiVersion: coc/v1
//! kind: Policy
//!
//! metadata:
//!   name: baseline
//!   title: "Baseline cascade"
//!
//! baseYear: 1960.5
//! timeAxis: year
//! strict: false
//!
//! pmtct:
//!   childTestingMap: { Times: [2004, 2009], Values: [0, 0.3] }
//! healthCareTesting: {}
//! artCascade:
//!   staging:
//!     preStagingRetention: 0.85
//! seeding:
//!   startYear: 1982
//!   coverage: 0.075
//! ```

mod types;


pub use types::*;
