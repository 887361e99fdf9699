//! Flattens 3D CAD edges onto a presentation plane.
//!
//! The pipeline is: [`plane::PlaneFrame`] + input edges → [`project::project_edges`]
//! → [`bundle::bundle`] → [`model::Bundle`], which feeds the scene graph in
//! [`scene`] and slide exporters through [`document::SlideExporter`].

pub mod bundle;
pub mod discretize;
pub mod document;
pub mod error;
pub mod geom;
pub mod model;
pub mod plane;
pub mod project;
pub mod report;
pub mod scene;

pub use error::{FlattenError, Result};
