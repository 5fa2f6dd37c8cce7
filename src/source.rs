//! # Field Source Contract
//!
//! A field source is the external collaborator that produces one named
//! spatial field: the model state variable, a forcing grid, an analysis
//! increment. The writer consumes sources through the narrow [`FieldSource`]
//! contract and never mutates them.
//!
//! Sources are shared with the caller as `Rc<dyn FieldSource>`: the driver
//! advances the model between steps and then asks the writer to persist the
//! new snapshot. The writer is single-threaded by design, so the non-`Send`
//! `Rc` makes the "no mutation during a write" contract structural.

use crate::geometry::GridGeometry;

/// The value representation a field source reports for the current step.
///
/// The writer accepts only the flat [`Vector`](FieldValues::Vector)
/// representation; anything else is rejected per step with
/// `UnsupportedValueType`. The enum exists because collaborating model
/// components expose heterogeneous value payloads and the writer must be
/// able to name what it cannot handle.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    /// A flat numeric vector: one entry per cell for array grids, one entry
    /// per *active* cell for irregular grids, in index order.
    Vector(Vec<f64>),
    /// A single scalar value, as produced by gauge-style sources.
    Scalar(f64),
}

impl FieldValues {
    /// Short name of the representation, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValues::Vector(_) => "vector",
            FieldValues::Scalar(_) => "scalar",
        }
    }
}

/// A named producer of one spatial field's current-time snapshot.
///
/// Implementations are read-only from the writer's perspective. The geometry
/// must not change across calls for the lifetime of the writer: the schema
/// captures it once at construction and derives every later slab shape from
/// that copy.
pub trait FieldSource {
    /// Name of the field. Must be unique among the sources handed to one
    /// writer; it becomes the archive variable name.
    fn name(&self) -> &str;

    /// The spatial topology of this field, or `None` for sources that carry
    /// no grid (those are rejected at writer construction with
    /// `MissingGeometry`).
    fn geometry(&self) -> Option<&GridGeometry>;

    /// The time values for which this source currently holds data.
    ///
    /// The writer requires exactly one element at every
    /// `write_current_step` call; zero, several, or NaN fail the step with
    /// `AmbiguousTime`.
    fn current_times(&self) -> Vec<f64>;

    /// The values for the current time, in the representation the source
    /// natively uses.
    fn current_values(&self) -> FieldValues;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_names() {
        assert_eq!(FieldValues::Vector(vec![1.0]).kind(), "vector");
        assert_eq!(FieldValues::Scalar(1.0).kind(), "scalar");
    }
}
