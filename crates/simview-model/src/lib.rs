//! Simulation model layer for simview.
//!
//! Loads scenes written in a subset of the MJCF XML format, owns the mutable
//! simulation state paired with a model, advances it with a small rigid-body
//! integrator, and turns model + state into a renderer-agnostic [`vis::Scene`].
//!
//! ```rust,ignore
//! let model = Model::from_xml(xml)?;
//! let mut data = Data::new(&model);
//! step(&model, &mut data)?;
//!
//! let mut cam = Camera::default();
//! let mut opt = Options::default();
//! vis::default_camera(&mut cam);
//! vis::default_options(&mut opt);
//! let mut scene = Scene::with_capacity(1000);
//! vis::update_scene(&model, &data, &opt, &cam, Catmask::ALL, &mut scene);
//! ```

mod data;
mod error;
mod model;
mod parser;
mod step;

pub mod vis;

pub use data::Data;
pub use error::{ModelError, Result, StepError};
pub use model::{Body, Geom, GeomType, Light, Model, ModelCamera, WORLD_BODY};
pub use step::step;
