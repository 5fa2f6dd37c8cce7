//! # Grid Time Series Writer
//!
//! [`GridSeriesWriter`] appends successive time snapshots of one or more
//! field sources into a single CF-style NetCDF archive. The write pattern is
//! deliberately narrow: exactly one full time-slice per field per call, at a
//! strictly increasing time index.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> SchemaDefined -> Committed -> Writing -> Closed
//! |------------ create() -------------|    ^     |
//!                                          +-----+  write_current_step()
//! ```
//!
//! Construction runs the first three states synchronously: the file is
//! created, the complete schema is derived from the field sources and
//! committed, and the grid-invariant coordinate values are written. From
//! then on the only legal operations are `write_current_step` and `close`.
//! The lifecycle is strictly linear; there is no reopen.
//!
//! ## Step Atomicity
//!
//! Each step commits its time value before any field data is written. All
//! per-step validation (time resolution, duplicate detection) runs first, so
//! a rejected step leaves the archive untouched. If a *field* write fails
//! after the time value went out, the archive is left in a "time written,
//! data incomplete" state: the underlying format has no transactional
//! writes, so no rollback is attempted and the caller should close and
//! discard the file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::archive::{self, ArchiveFile};
use crate::metadata::CreationContext;
use crate::schema::{
    ArchiveSchema, SchemaError, DEFAULT_FILL_VALUE, TIME_UNITS_MJD, TIME_VARIABLE_NAME,
};
use crate::source::{FieldSource, FieldValues};

/// Errors that can occur while creating the archive or writing a step.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// Invalid constructor arguments: no sources, or duplicate field names.
    #[error("invalid argument: {0}")]
    IllegalArgument(String),

    /// Schema derivation failed at construction.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A field source does not define a single current time.
    #[error("cannot resolve time for step {index}: field '{field}' {detail}")]
    AmbiguousTime {
        /// Name of the offending field.
        field: String,
        /// What the source reported instead of one time value.
        detail: String,
        /// Index of the rejected step.
        index: usize,
    },

    /// Field sources disagree on the current time.
    #[error(
        "field '{field}' reports time {actual} while {expected} was already \
         resolved for step {index}"
    )]
    InconsistentTime {
        /// Name of the disagreeing field.
        field: String,
        /// Time resolved from the preceding sources.
        expected: f64,
        /// Time this source reported.
        actual: f64,
        /// Index of the rejected step.
        index: usize,
    },

    /// The resolved time has already been written to the archive.
    #[error("time {time} has already been written; rejecting step {index}")]
    DuplicateTime {
        /// The already-present time value.
        time: f64,
        /// Index of the rejected step.
        index: usize,
    },

    /// A field source reported a value representation other than a flat
    /// numeric vector.
    #[error("field '{field}' supplies {found} values; only flat vectors can be written")]
    UnsupportedValueType {
        /// Name of the offending field.
        field: String,
        /// The representation the source reported.
        found: &'static str,
    },

    /// The supplied value count does not match the geometry's active-cell
    /// count.
    #[error("field '{field}' supplied {actual} values where {expected} were expected")]
    ValueCountMismatch {
        /// Name of the offending field.
        field: String,
        /// Active-cell count of the field's geometry.
        expected: usize,
        /// Number of values the source supplied.
        actual: usize,
    },

    /// Operation attempted after `close()`.
    #[error("archive has been closed")]
    ArchiveClosed,

    /// Fatal error from the archive-file primitives.
    #[error("archive error: {0}")]
    Archive(#[from] netcdf::Error),
}

/// Lifecycle states of the archive handle. `Created` and `SchemaDefined`
/// exist only inside [`GridSeriesWriter::create_with`]; a constructed writer
/// is always in `Committed`, `Writing`, or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// File created, nothing defined yet.
    Created,
    /// Dimensions and variables defined, schema not committed.
    SchemaDefined,
    /// Schema committed, no step written yet.
    Committed,
    /// At least one step has been written.
    Writing,
    /// Handle released; every further operation fails.
    Closed,
}

/// Configuration for the writer, consulted once at construction.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// CF units string stamped on the time variable. The time values
    /// themselves are passed through bit-exact, whatever the unit.
    pub time_units: String,

    /// Missing-value sentinel written at inactive grid cells and recorded
    /// as the variables' fill value.
    pub fill_value: f64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            time_units: TIME_UNITS_MJD.to_string(),
            fill_value: DEFAULT_FILL_VALUE,
        }
    }
}

/// The ordered log of written time values plus an O(1) duplicate check on
/// exact bit patterns. Strictly append-only; after N successful steps its
/// length is exactly N.
#[derive(Debug, Default)]
struct TimeAxis {
    written: Vec<f64>,
    seen: HashSet<u64>,
}

impl TimeAxis {
    fn len(&self) -> usize {
        self.written.len()
    }

    fn contains(&self, time: f64) -> bool {
        self.seen.contains(&time.to_bits())
    }

    fn push(&mut self, time: f64) {
        self.seen.insert(time.to_bits());
        self.written.push(time);
    }

    fn values(&self) -> &[f64] {
        &self.written
    }
}

/// One write call's resolved state: the step index and the single time value
/// all sources agreed on. Created and discarded within `write_current_step`.
#[derive(Debug)]
struct WriteSession {
    index: usize,
    time: f64,
}

impl WriteSession {
    fn resolve(sources: &[Rc<dyn FieldSource>], index: usize) -> Result<Self, WriterError> {
        let mut resolved: Option<f64> = None;
        for source in sources {
            let times = source.current_times();
            if times.len() != 1 {
                return Err(WriterError::AmbiguousTime {
                    field: source.name().to_string(),
                    detail: format!(
                        "reports {} current time values where exactly one is required",
                        times.len()
                    ),
                    index,
                });
            }
            let time = times[0];
            if time.is_nan() {
                return Err(WriterError::AmbiguousTime {
                    field: source.name().to_string(),
                    detail: "reports NaN as its current time".to_string(),
                    index,
                });
            }
            match resolved {
                None => resolved = Some(time),
                Some(expected) if time != expected => {
                    return Err(WriterError::InconsistentTime {
                        field: source.name().to_string(),
                        expected,
                        actual: time,
                        index,
                    });
                }
                Some(_) => {}
            }
        }
        let time = resolved.ok_or_else(|| {
            WriterError::IllegalArgument("cannot resolve a time without field sources".to_string())
        })?;
        Ok(Self { index, time })
    }
}

/// Counters describing what has been written so far.
#[derive(Debug, Clone)]
pub struct WriterStats {
    /// Number of completed step writes.
    pub steps_written: usize,
    /// Number of field slabs written, across all steps.
    pub slabs_written: usize,
    /// Number of data variables in the archive.
    pub fields: usize,
}

impl std::fmt::Display for WriterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wrote {} steps ({} slabs) across {} fields",
            self.steps_written, self.slabs_written, self.fields
        )
    }
}

/// Writer that appends per-step snapshots of its field sources into one
/// NetCDF archive.
///
/// The writer exclusively owns the open archive handle from creation to
/// [`close`](Self::close). It is single-threaded; sources are shared with
/// the caller through `Rc` and must not be advanced while a write call is
/// in progress.
pub struct GridSeriesWriter {
    archive: Option<ArchiveFile>,
    path: PathBuf,
    sources: Vec<Rc<dyn FieldSource>>,
    schema: ArchiveSchema,
    time_axis: TimeAxis,
    config: WriterConfig,
    state: LifecycleState,
    slabs_written: usize,
}

impl GridSeriesWriter {
    /// Create the archive at `path` with default metadata and configuration.
    pub fn create<P: AsRef<Path>>(
        path: P,
        sources: Vec<Rc<dyn FieldSource>>,
    ) -> Result<Self, WriterError> {
        Self::create_with(
            path,
            sources,
            &CreationContext::default(),
            WriterConfig::default(),
        )
    }

    /// Create the archive at `path`: define the complete schema from the
    /// sources, commit it, and write the grid-invariant coordinate values.
    ///
    /// On failure the partially created file is removed, so the path is left
    /// either absent or holding a complete, committed archive.
    pub fn create_with<P: AsRef<Path>>(
        path: P,
        sources: Vec<Rc<dyn FieldSource>>,
        context: &CreationContext,
        config: WriterConfig,
    ) -> Result<Self, WriterError> {
        if sources.is_empty() {
            return Err(WriterError::IllegalArgument(
                "at least one field source is required".to_string(),
            ));
        }
        for (i, source) in sources.iter().enumerate() {
            if sources[..i].iter().any(|s| s.name() == source.name()) {
                return Err(WriterError::IllegalArgument(format!(
                    "duplicate field name '{}'",
                    source.name()
                )));
            }
        }

        let path = path.as_ref().to_path_buf();
        let mut file = archive::create(&path)?;
        match Self::define_schema(&mut file, &sources, context, &config) {
            Ok(schema) => {
                log::debug!(
                    "created archive {} with {} fields over {} dimension groups",
                    path.display(),
                    schema.fields().len(),
                    schema.groups().len()
                );
                Ok(Self {
                    archive: Some(file),
                    path,
                    sources,
                    schema,
                    time_axis: TimeAxis::default(),
                    config,
                    state: LifecycleState::Committed,
                    slabs_written: 0,
                })
            }
            Err(err) => {
                // Release the handle before removing the partial file, so
                // the path is never left half-open.
                drop(file);
                let _ = fs::remove_file(&path);
                Err(err)
            }
        }
    }

    /// Runs Created through SchemaDefined to Committed, plus the one-time
    /// static coordinate write.
    fn define_schema(
        file: &mut ArchiveFile,
        sources: &[Rc<dyn FieldSource>],
        context: &CreationContext,
        config: &WriterConfig,
    ) -> Result<ArchiveSchema, WriterError> {
        let mut schema = ArchiveSchema::new();
        context.apply(file).map_err(SchemaError::from)?;
        schema.define_time(file, &config.time_units)?;
        for source in sources {
            let geometry = source
                .geometry()
                .ok_or_else(|| SchemaError::MissingGeometry {
                    field: source.name().to_string(),
                })?;
            schema.add_field(file, source.name(), geometry, config.fill_value)?;
        }
        schema.commit()?;
        schema.write_static_coordinates(file)?;
        Ok(schema)
    }

    /// Write one time step: the single time value all sources agree on,
    /// then one full spatial slab per field.
    ///
    /// Validation runs before anything is written, so a rejected step leaves
    /// the time axis unchanged. Once the time value is out, a failing field
    /// write leaves the documented "time written, data incomplete" state.
    pub fn write_current_step(&mut self) -> Result<(), WriterError> {
        if self.state == LifecycleState::Closed {
            return Err(WriterError::ArchiveClosed);
        }
        let index = self.time_axis.len();
        let session = WriteSession::resolve(&self.sources, index)?;
        if self.time_axis.contains(session.time) {
            return Err(WriterError::DuplicateTime {
                time: session.time,
                index,
            });
        }

        let file = self.archive.as_mut().ok_or(WriterError::ArchiveClosed)?;

        // Time goes first and is recorded only after a successful write.
        archive::write_slab(file, TIME_VARIABLE_NAME, &[index], &[1], &[session.time])?;
        self.time_axis.push(session.time);
        self.state = LifecycleState::Writing;

        for (source, field) in self.sources.iter().zip(self.schema.fields()) {
            let values = match source.current_values() {
                FieldValues::Vector(values) => values,
                other => {
                    return Err(WriterError::UnsupportedValueType {
                        field: field.name().to_string(),
                        found: other.kind(),
                    });
                }
            };

            let geometry = self.schema.geometry_of(field);
            let expected = geometry.expected_value_count();
            if values.len() != expected {
                return Err(WriterError::ValueCountMismatch {
                    field: field.name().to_string(),
                    expected,
                    actual: values.len(),
                });
            }

            let dense = geometry.materialize_dense(&values, self.config.fill_value);
            archive::write_slab(
                file,
                field.name(),
                &geometry.slab_origin(index),
                &geometry.slab_shape(),
                &dense,
            )?;
            self.slabs_written += 1;
        }

        log::debug!("wrote step {} at time {}", index, session.time);
        Ok(())
    }

    /// Flush and release the archive handle. The lifecycle is forward-only:
    /// every operation after this, including a second `close`, fails with
    /// [`WriterError::ArchiveClosed`].
    pub fn close(&mut self) -> Result<(), WriterError> {
        if self.state == LifecycleState::Closed {
            return Err(WriterError::ArchiveClosed);
        }
        // Dropping the handle flushes and closes the file.
        self.archive.take();
        self.state = LifecycleState::Closed;
        log::debug!(
            "closed archive {} after {} steps",
            self.path.display(),
            self.time_axis.len()
        );
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The derived schema.
    pub fn schema(&self) -> &ArchiveSchema {
        &self.schema
    }

    /// The time values written so far, in write order.
    pub fn times_written(&self) -> &[f64] {
        self.time_axis.values()
    }

    /// Counters for what has been written so far.
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            steps_written: self.time_axis.len(),
            slabs_written: self.slabs_written,
            fields: self.schema.fields().len(),
        }
    }
}
