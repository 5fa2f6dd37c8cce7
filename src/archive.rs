//! Plumbing over the `netcdf` collaborator crate.
//!
//! Every call into the archive-file primitives goes through this module so
//! that the rest of the crate deals only in layout decisions, never in
//! collaborator API details. All functions are synchronous; any failure is
//! fatal to the archive and propagates unchanged.

use std::ops::Range;
use std::path::Path;

/// The writable archive handle, exclusively owned by one writer.
pub(crate) type ArchiveFile = netcdf::FileMut;

/// Errors surfaced by the archive-file primitives.
pub(crate) type ArchiveError = netcdf::Error;

/// Create a new archive file at `path`, truncating any existing file.
pub(crate) fn create(path: &Path) -> Result<ArchiveFile, ArchiveError> {
    netcdf::create(path)
}

/// Define the unbounded record dimension.
pub(crate) fn add_unlimited_dimension(
    file: &mut ArchiveFile,
    name: &str,
) -> Result<(), ArchiveError> {
    file.add_unlimited_dimension(name)?;
    Ok(())
}

/// Define a fixed-length spatial dimension.
pub(crate) fn add_dimension(
    file: &mut ArchiveFile,
    name: &str,
    len: usize,
) -> Result<(), ArchiveError> {
    file.add_dimension(name, len)?;
    Ok(())
}

/// Define the time coordinate variable over the record dimension, with its
/// CF attributes.
pub(crate) fn add_time_variable(
    file: &mut ArchiveFile,
    name: &str,
    dimension: &str,
    units: &str,
) -> Result<(), ArchiveError> {
    let mut var = file.add_variable::<f64>(name, &[dimension])?;
    var.put_attribute("units", units)?;
    var.put_attribute("standard_name", "time")?;
    var.put_attribute("long_name", "time")?;
    var.put_attribute("calendar", "standard")?;
    Ok(())
}

/// Define a spatial coordinate variable over one dimension.
pub(crate) fn add_coordinate_variable(
    file: &mut ArchiveFile,
    name: &str,
    dimension: &str,
    units: &str,
    standard_name: &str,
) -> Result<(), ArchiveError> {
    let mut var = file.add_variable::<f64>(name, &[dimension])?;
    var.put_attribute("units", units)?;
    var.put_attribute("standard_name", standard_name)?;
    Ok(())
}

/// Define one data variable over the given dimensions, with the
/// missing-value sentinel as its fill value.
pub(crate) fn add_data_variable(
    file: &mut ArchiveFile,
    name: &str,
    dimensions: &[&str],
    fill_value: f64,
    coordinates: Option<&str>,
) -> Result<(), ArchiveError> {
    let mut var = file.add_variable::<f64>(name, dimensions)?;
    var.set_fill_value(fill_value)?;
    var.put_attribute("missing_value", fill_value)?;
    var.put_attribute("long_name", name)?;
    if let Some(coordinates) = coordinates {
        var.put_attribute("coordinates", coordinates)?;
    }
    Ok(())
}

/// Stamp one global attribute.
pub(crate) fn add_global_attribute(
    file: &mut ArchiveFile,
    name: &str,
    value: &str,
) -> Result<(), ArchiveError> {
    file.add_attribute(name, value)?;
    Ok(())
}

/// Write one contiguous slab of `values` into `variable` at `origin`, where
/// `shape` gives the extent along every axis. Writing past the end of the
/// record dimension grows it.
pub(crate) fn write_slab(
    file: &mut ArchiveFile,
    variable: &str,
    origin: &[usize],
    shape: &[usize],
    values: &[f64],
) -> Result<(), ArchiveError> {
    let extents: Vec<Range<usize>> = origin
        .iter()
        .zip(shape.iter())
        .map(|(&start, &len)| start..start + len)
        .collect();
    let mut var = file
        .variable_mut(variable)
        .ok_or_else(|| ArchiveError::from(format!("no such variable: {variable}")))?;
    var.put_values(values, extents.as_slice())
}
