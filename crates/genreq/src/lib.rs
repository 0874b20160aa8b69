//! Generic requirement lowering.
//!
//! Turns the requirements a declaration writes, and the ones implied by the
//! types it mentions, into a flat list of primitive requirements that a
//! generic signature builder can consume:
//!
//! - `T: P` with `P` a protocol
//! - `T: C` with `C` a class
//! - `T: AnyObject` style layout constraints
//! - `T == U` between a type parameter and another type
//!
//! # Architecture
//!
//! - [`ty`]: Type representation and canonicalization
//! - [`requirement`]: Requirements and their provenance
//! - [`module`]: Declarations the passes query (protocols, nominals, conformances)
//! - [`builtins`]: The standard protocols and types
//! - [`matcher`]: Structural type matching
//! - [`desugar`]: Lowering one requirement into primitive ones
//! - [`infer`]: Requirements implied by the types a declaration mentions
//! - [`realize`]: Inference plus desugaring for written requirements
//! - [`protocol`]: Structural requirements of protocols
//! - [`typealias`]: Same-type requirements between colliding type declarations
//! - [`error`]: Requirement errors
//! - [`diagnostics`]: Diagnostics and their rendering
//! - [`config`]: Resolution settings

pub mod builtins;
pub mod config;
pub mod desugar;
pub mod diagnostics;
pub mod error;
pub mod infer;
pub mod matcher;
pub mod module;
pub mod protocol;
pub mod realize;
pub mod requirement;
pub mod subst;
pub mod ty;
pub mod typealias;

pub use config::{RequirementMachineMode, ResolutionConfig};
pub use desugar::{desugar_requirement, Desugarer};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::RequirementError;
pub use infer::infer_requirements;
pub use module::Module;
pub use protocol::{
    collect_protocol_component, protocol_dependencies, structural_requirements, ProtocolComponent,
};
pub use realize::Realizer;
pub use requirement::{Requirement, StructuralRequirement};
pub use ty::Ty;
pub use typealias::typealias_requirements;
