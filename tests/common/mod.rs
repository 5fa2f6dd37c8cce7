//! Shared test double for the field source collaborator.

use std::cell::RefCell;
use std::rc::Rc;

use gridseries::prelude::*;

/// An in-memory field source the tests advance between steps, the way a
/// model driver would.
pub struct TestSource {
    name: String,
    geometry: Option<GridGeometry>,
    times: RefCell<Vec<f64>>,
    values: RefCell<FieldValues>,
}

impl TestSource {
    pub fn new<G: Into<GridGeometry>>(
        name: &str,
        geometry: G,
        time: f64,
        values: Vec<f64>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            geometry: Some(geometry.into()),
            times: RefCell::new(vec![time]),
            values: RefCell::new(FieldValues::Vector(values)),
        })
    }

    pub fn without_geometry(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            geometry: None,
            times: RefCell::new(vec![0.0]),
            values: RefCell::new(FieldValues::Vector(vec![])),
        })
    }

    /// Move the source to the next step.
    pub fn advance(&self, time: f64, values: Vec<f64>) {
        *self.times.borrow_mut() = vec![time];
        *self.values.borrow_mut() = FieldValues::Vector(values);
    }

    pub fn set_times(&self, times: Vec<f64>) {
        *self.times.borrow_mut() = times;
    }

    pub fn set_values(&self, values: FieldValues) {
        *self.values.borrow_mut() = values;
    }
}

impl FieldSource for TestSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn geometry(&self) -> Option<&GridGeometry> {
        self.geometry.as_ref()
    }

    fn current_times(&self) -> Vec<f64> {
        self.times.borrow().clone()
    }

    fn current_values(&self) -> FieldValues {
        self.values.borrow().clone()
    }
}

/// Upcast helper: the writer takes `Rc<dyn FieldSource>`.
pub fn sources(list: Vec<Rc<TestSource>>) -> Vec<Rc<dyn FieldSource>> {
    list.into_iter()
        .map(|source| source as Rc<dyn FieldSource>)
        .collect()
}
