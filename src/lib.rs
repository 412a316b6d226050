//! Sample design inference for mass-spectrometry proteomics exports.
//!
//! The crate reads vendor result tables with unknown delimiters and decimal
//! conventions, normalizes their per-sample column names, infers the nested
//! analysis design from those names and assembles one intensity matrix per
//! quantity kind.
//!
//! ```no_run
//! use proteomics_design::config::{ConfigSource, RunConfig};
//! use proteomics_design::reader::{read_data, ReadOptions};
//! use std::path::Path;
//!
//! let dir = Path::new("data");
//! let mut config = RunConfig::load(dir, &ConfigSource::File)?;
//! for (reader, data) in read_data(dir, &mut config, &ReadOptions::default())? {
//!     println!("{}: {:?}", reader, data.sample_names);
//! }
//! config.save()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod design;
pub mod io;
pub mod matrix;
pub mod reader;
pub mod sample_mapping;
