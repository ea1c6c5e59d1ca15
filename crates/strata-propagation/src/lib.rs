//! Propagation of bounded scalar fields (block light, sunlight, liquid depth)
//! over the voxel grid.
//!
//! A field is the result of flooding outward from sources through permeable
//! cells, losing a rule-defined amount at every face crossed. Two engines keep
//! a field consistent after block edits:
//!
//! - [`BatchPropagator`] recomputes the field for a set of simultaneous
//!   [`BlockChange`]s using value-bucketed increase/reduce queues.
//! - [`ContinuousPropagator`] re-evaluates one cell at a time and dirties its
//!   neighbors whenever the cell changes.
//!
//! Both are driven by a stateless [`PropagationRules`] implementation and read
//! and write through a [`PropagatorWorldView`].

pub mod batch;
pub mod block_change;
pub mod continuous;
pub mod grid;
pub mod rules;
pub mod view;

pub use batch::BatchPropagator;
pub use block_change::BlockChange;
pub use continuous::{ContinuousPropagator, Relaxation, RuleRelaxation};
pub use grid::BoundedGrid;
pub use rules::{
    LightRules, LiquidRules, PropagationComparison, PropagationRules, SunlightRules,
};
pub use view::PropagatorWorldView;
