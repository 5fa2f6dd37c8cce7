//! # gridseries - A Time-Stepped Grid Archive Writer
//!
//! `gridseries` appends successive time snapshots of one or more spatial
//! field variables into a single self-describing NetCDF archive, following
//! the CF conventions as far as the data allows (see
//! <http://cfconventions.org/>). It targets the classic model-output loop:
//! advance the simulation one step, persist the new state, repeat.
//!
//! ## Key Properties
//!
//! - **Self-Describing Output**: one unbounded time dimension, one set of
//!   spatial dimensions per distinct grid geometry, one data variable per
//!   field. Readers need nothing but the file.
//!
//! - **Two Grid Topologies**: regular row/column grids and irregular
//!   active-cell collections. Sparse active-cell vectors are materialized
//!   into dense slabs with a missing-value sentinel at inactive cells.
//!
//! - **Strict Temporal Consistency**: every step write requires all field
//!   sources to agree on a single new time value. Ambiguous, conflicting,
//!   and duplicate times are rejected before anything reaches the file.
//!
//! - **Explicit Lifecycle**: the define-schema, commit, write-data
//!   protocol that self-describing array formats require is modeled as a
//!   state machine instead of being left implicit, so misuse surfaces as a
//!   typed error rather than a corrupt file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use gridseries::prelude::*;
//!
//! // A minimal field source; real drivers wrap their model state instead.
//! struct Snapshot {
//!     geometry: GridGeometry,
//!     time: f64,
//!     values: Vec<f64>,
//! }
//!
//! impl FieldSource for Snapshot {
//!     fn name(&self) -> &str {
//!         "waterlevel"
//!     }
//!     fn geometry(&self) -> Option<&GridGeometry> {
//!         Some(&self.geometry)
//!     }
//!     fn current_times(&self) -> Vec<f64> {
//!         vec![self.time]
//!     }
//!     fn current_values(&self) -> FieldValues {
//!         FieldValues::Vector(self.values.clone())
//!     }
//! }
//!
//! let sources: Vec<Rc<dyn FieldSource>> = vec![Rc::new(Snapshot {
//!     geometry: GridGeometry::from(ArrayGrid::new(2, 3)),
//!     time: 58119.0,
//!     values: vec![0.25; 6],
//! })];
//!
//! let mut writer = GridSeriesWriter::create("output.nc", sources)?;
//! writer.write_current_step()?;
//! writer.close()?;
//! # Ok::<(), gridseries::writer::WriterError>(())
//! ```
//!
//! ## File Layout
//!
//! ```text
//! output.nc
//! ├── dimensions: time (unlimited), row, col [, cell, row2, ...]
//! ├── time(time)               # f64, CF units attribute
//! ├── lat(row), lon(col)       # only for georeferenced array grids
//! ├── <field>(time, row, col)  # one f64 variable per array-grid field
//! ├── <field>(time, cell)      # one f64 variable per irregular-grid field
//! └── :Conventions, :title, :institution, :source, :references, :history
//! ```
//!
//! Inactive cells of irregular grids hold the missing-value sentinel
//! (default -9999.0), recorded in each variable's `_FillValue` and
//! `missing_value` attributes.
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`geometry`]: the two supported grid topologies and slab-shape logic
//! - [`source`]: the narrow contract field sources are consumed through
//! - [`schema`]: dimension-layout derivation and the two-phase commit
//! - [`writer`]: the per-step writer and the archive handle lifecycle
//! - [`metadata`]: archive-level provenance attributes
//!
//! The archive-file primitives themselves (dimension/variable creation,
//! attribute encoding, slab writes) are delegated to the `netcdf` crate.

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

mod archive;

pub mod geometry;
pub mod metadata;
pub mod schema;
pub mod source;
pub mod writer;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::geometry::{ArrayGrid, GridGeometry, IrregularGrid};
    pub use crate::metadata::{CreationContext, CONVENTIONS};
    pub use crate::schema::{
        ArchiveSchema, DimensionGroup, FieldVariable, SchemaError, DEFAULT_FILL_VALUE,
        TIME_DIMENSION_NAME, TIME_UNITS_MJD, TIME_VARIABLE_NAME,
    };
    pub use crate::source::{FieldSource, FieldValues};
    pub use crate::writer::{
        GridSeriesWriter, LifecycleState, WriterConfig, WriterError, WriterStats,
    };
}
