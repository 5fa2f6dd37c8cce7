//! # Archive Schema Builder
//!
//! Derives the archive's dimension layout from the set of field sources and
//! drives the two-phase protocol self-describing array formats require:
//! every dimension and variable must be defined before the first byte of
//! data is written, and nothing may be defined afterwards.
//!
//! ## Layout
//!
//! | Element | Name | Notes |
//! |---------|------|-------|
//! | record dimension | `time` | unbounded, grows with every step |
//! | time variable | `time` | `f64`, CF units attribute |
//! | array-grid dimensions | `row`, `col` | `row2`, `col2`, … for further distinct array grids |
//! | irregular-grid dimension | `cell` | `cell2`, … for further distinct irregular grids |
//! | coordinate variables | `lat`, `lon` | only for georeferenced array grids, suffixed like their dimensions |
//! | data variables | field name | `f64`, shaped `(time, <spatial dims>)` |
//!
//! Two fields with equal geometries share one dimension group, so a model
//! state written as several variables does not multiply the spatial
//! dimensions.
//!
//! ## Two-Phase Protocol
//!
//! [`ArchiveSchema`] is a small state machine: definition calls are legal
//! only before [`commit`](ArchiveSchema::commit), static coordinate values
//! can be written only after it. Violating either direction is a programmer
//! error and fails with [`SchemaError::SchemaFrozen`] instead of corrupting
//! the file.

use crate::archive::{self, ArchiveFile};
use crate::geometry::GridGeometry;

/// Name of the unbounded record dimension.
pub const TIME_DIMENSION_NAME: &str = "time";

/// Name of the time coordinate variable.
pub const TIME_VARIABLE_NAME: &str = "time";

/// Default CF units string for the time variable: days since the modified
/// Julian date epoch, the time scale the surrounding model stack uses.
pub const TIME_UNITS_MJD: &str = "days since 1858-11-17 00:00:00 +0000";

/// Default missing-value sentinel written at inactive grid cells.
pub const DEFAULT_FILL_VALUE: f64 = -9999.0;

/// Spatial dimension base names, one family per topology.
pub mod dims {
    /// Row (latitude) dimension of an array grid.
    pub const ROW: &str = "row";
    /// Column (longitude) dimension of an array grid.
    pub const COL: &str = "col";
    /// Cell dimension of an irregular grid.
    pub const CELL: &str = "cell";
}

/// Coordinate variable base names for georeferenced array grids.
pub mod coords {
    /// Latitude coordinate variable.
    pub const LATITUDE: &str = "lat";
    /// Longitude coordinate variable.
    pub const LONGITUDE: &str = "lon";
}

/// Errors raised while deriving or committing the archive schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A field source reported no geometry; only grid sources can be written.
    #[error("field '{field}' has no geometry; only grid field sources can be written")]
    MissingGeometry {
        /// Name of the offending field.
        field: String,
    },

    /// A field source reported a geometry whose invariants do not hold.
    #[error("field '{field}' has an unsupported geometry: {reason}")]
    UnsupportedGeometry {
        /// Name of the offending field.
        field: String,
        /// Why the geometry was rejected.
        reason: String,
    },

    /// A definition was attempted after commit, or a data write before it.
    #[error("schema is frozen: {0}")]
    SchemaFrozen(&'static str),

    /// Error from the archive-file primitives.
    #[error("archive error: {0}")]
    Archive(#[from] netcdf::Error),
}

/// One set of on-disk spatial axes, shared by every field with an equal
/// geometry. Keeps an owned copy of the geometry for later slab-shape
/// lookups.
#[derive(Debug)]
pub struct DimensionGroup {
    geometry: GridGeometry,
    dim_names: Vec<String>,
    coordinate_names: Option<(String, String)>,
}

impl DimensionGroup {
    /// The geometry this group was derived from.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Names of the spatial dimensions, in on-disk order.
    pub fn dim_names(&self) -> &[String] {
        &self.dim_names
    }

    /// Names of the `(lat, lon)` coordinate variables, if the geometry is a
    /// georeferenced array grid.
    pub fn coordinate_names(&self) -> Option<(&str, &str)> {
        self.coordinate_names
            .as_ref()
            .map(|(lat, lon)| (lat.as_str(), lon.as_str()))
    }
}

/// One data variable in the archive, bound to a dimension group.
#[derive(Debug)]
pub struct FieldVariable {
    name: String,
    group: usize,
}

impl FieldVariable {
    /// The archive variable name, equal to the field source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the dimension group this variable is bound to.
    pub fn group(&self) -> usize {
        self.group
    }
}

/// The derived dimension layout of one archive, plus the two-phase
/// definition state.
#[derive(Debug, Default)]
pub struct ArchiveSchema {
    groups: Vec<DimensionGroup>,
    fields: Vec<FieldVariable>,
    committed: bool,
    statics_written: bool,
}

impl ArchiveSchema {
    /// Empty schema in the definition phase.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Define the record dimension and the time variable.
    pub(crate) fn define_time(
        &mut self,
        file: &mut ArchiveFile,
        units: &str,
    ) -> Result<(), SchemaError> {
        if self.committed {
            return Err(SchemaError::SchemaFrozen(
                "cannot define the time axis after the schema has been committed",
            ));
        }
        archive::add_unlimited_dimension(file, TIME_DIMENSION_NAME)?;
        archive::add_time_variable(file, TIME_VARIABLE_NAME, TIME_DIMENSION_NAME, units)?;
        Ok(())
    }

    /// Define one data variable for `name`, creating or reusing the
    /// dimension group for its geometry.
    pub(crate) fn add_field(
        &mut self,
        file: &mut ArchiveFile,
        name: &str,
        geometry: &GridGeometry,
        fill_value: f64,
    ) -> Result<(), SchemaError> {
        if self.committed {
            return Err(SchemaError::SchemaFrozen(
                "cannot define a variable after the schema has been committed",
            ));
        }
        geometry
            .validate()
            .map_err(|reason| SchemaError::UnsupportedGeometry {
                field: name.to_string(),
                reason,
            })?;

        let group = match self.groups.iter().position(|g| g.geometry == *geometry) {
            Some(existing) => existing,
            None => self.define_group(file, geometry)?,
        };

        let dim_refs: Vec<&str> = std::iter::once(TIME_DIMENSION_NAME)
            .chain(self.groups[group].dim_names.iter().map(String::as_str))
            .collect();
        let coordinates = self.groups[group]
            .coordinate_names
            .as_ref()
            .map(|(lat, lon)| format!("{lat} {lon}"));
        archive::add_data_variable(file, name, &dim_refs, fill_value, coordinates.as_deref())?;

        log::debug!(
            "defined variable '{}' over ({}, {})",
            name,
            TIME_DIMENSION_NAME,
            self.groups[group].dim_names.join(", ")
        );
        self.fields.push(FieldVariable {
            name: name.to_string(),
            group,
        });
        Ok(())
    }

    /// Create the dimensions (and coordinate variables, if any) for a
    /// geometry not seen before. Returns the new group index.
    fn define_group(
        &mut self,
        file: &mut ArchiveFile,
        geometry: &GridGeometry,
    ) -> Result<usize, SchemaError> {
        let ordinal = self
            .groups
            .iter()
            .filter(|g| {
                matches!(
                    (&g.geometry, geometry),
                    (GridGeometry::Array(_), GridGeometry::Array(_))
                        | (GridGeometry::Irregular(_), GridGeometry::Irregular(_))
                )
            })
            .count();
        let dim_names = spatial_dim_names(geometry, ordinal);

        for (dim_name, len) in dim_names.iter().zip(geometry.spatial_extents()) {
            archive::add_dimension(file, dim_name, len)?;
        }

        let coordinate_names = match geometry {
            GridGeometry::Array(grid) if grid.latitudes().is_some() => {
                let lat = format!("{}{}", coords::LATITUDE, suffix(ordinal));
                let lon = format!("{}{}", coords::LONGITUDE, suffix(ordinal));
                archive::add_coordinate_variable(
                    file,
                    &lat,
                    &dim_names[0],
                    "degrees_north",
                    "latitude",
                )?;
                archive::add_coordinate_variable(
                    file,
                    &lon,
                    &dim_names[1],
                    "degrees_east",
                    "longitude",
                )?;
                Some((lat, lon))
            }
            _ => None,
        };

        self.groups.push(DimensionGroup {
            geometry: geometry.clone(),
            dim_names,
            coordinate_names,
        });
        Ok(self.groups.len() - 1)
    }

    /// Close the definition phase. After this, no dimension or variable may
    /// be defined, and data writes become legal.
    pub(crate) fn commit(&mut self) -> Result<(), SchemaError> {
        if self.committed {
            return Err(SchemaError::SchemaFrozen("schema already committed"));
        }
        self.committed = true;
        Ok(())
    }

    /// Write the grid-invariant coordinate values. Legal exactly once, and
    /// only after [`commit`](Self::commit).
    pub(crate) fn write_static_coordinates(
        &mut self,
        file: &mut ArchiveFile,
    ) -> Result<(), SchemaError> {
        if !self.committed {
            return Err(SchemaError::SchemaFrozen(
                "static coordinate values cannot be written before the schema is committed",
            ));
        }
        if self.statics_written {
            return Err(SchemaError::SchemaFrozen(
                "static coordinate values are written exactly once",
            ));
        }
        for group in &self.groups {
            if let (Some((lat_name, lon_name)), GridGeometry::Array(grid)) =
                (group.coordinate_names(), &group.geometry)
            {
                if let (Some(latitudes), Some(longitudes)) = (grid.latitudes(), grid.longitudes()) {
                    archive::write_slab(file, lat_name, &[0], &[latitudes.len()], latitudes)?;
                    archive::write_slab(file, lon_name, &[0], &[longitudes.len()], longitudes)?;
                }
            }
        }
        self.statics_written = true;
        Ok(())
    }

    /// Whether the definition phase has been closed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The data variables, in the order the field sources were given.
    pub fn fields(&self) -> &[FieldVariable] {
        &self.fields
    }

    /// The dimension groups, in definition order.
    pub fn groups(&self) -> &[DimensionGroup] {
        &self.groups
    }

    /// The geometry a field variable is bound to.
    pub fn geometry_of(&self, field: &FieldVariable) -> &GridGeometry {
        &self.groups[field.group].geometry
    }
}

/// Spatial dimension names for the `ordinal`-th distinct geometry of its
/// family: `row`/`col` or `cell`, with a numeric suffix from the second
/// group onwards.
fn spatial_dim_names(geometry: &GridGeometry, ordinal: usize) -> Vec<String> {
    match geometry {
        GridGeometry::Array(_) => vec![
            format!("{}{}", dims::ROW, suffix(ordinal)),
            format!("{}{}", dims::COL, suffix(ordinal)),
        ],
        GridGeometry::Irregular(_) => vec![format!("{}{}", dims::CELL, suffix(ordinal))],
    }
}

fn suffix(ordinal: usize) -> String {
    if ordinal == 0 {
        String::new()
    } else {
        format!("{}", ordinal + 1)
    }
}
