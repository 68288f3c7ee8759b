//! Capability lattice.
//!
//! Interfaces and specifications form a multiple-inheritance graph whose
//! ancestry is resolved with C3 linearization. The resolved ancestry is the
//! specificity order dispatch registries rank matches by.
//!
//! # Modules
//!
//! - [`graph`] - node arena, transactional bases reassignment, ancestry
//! - [`linearize`] - the C3 merge step
//! - [`lattice`] - shared copy-on-write handle over a graph
//! - [`declarations`] - interfaces provided by objects and implemented by
//!   factories
//! - [`signature`] - declared callable shapes and compatibility checks

pub mod declarations;
mod error;
pub mod graph;
mod id;
pub mod lattice;
pub mod linearize;
pub mod signature;

pub use declarations::{DeclarationProvider, Declarations};
pub use error::LatticeError;
pub use graph::SpecGraph;
pub use id::{SpecId, SpecKind};
pub use lattice::Lattice;
pub use signature::{Compatibility, MemberShapes, Members, ParamKind, Parameters, SignatureInfo};
