//! Foreign predicates: labels resolved outside the compiled program.

mod facts;

pub use facts::FactsPlugin;

use crate::{error::Result, goal::Outlink, machine::Machine, state::State};

/// Handler for call labels the program does not define. Plugins are asked
/// in priority order and the first to claim a label produces all of its
/// outlinks.
pub trait Plugin {
    fn claim(&self, label: &str) -> bool;

    /// Successors of `state`, which is paused on a call to a claimed label.
    /// `machine` already holds `state` when this is called; use its
    /// argument accessors, `returnp` and `run` to produce each successor.
    fn outlinks(
        &self,
        state: &State,
        machine: &mut Machine,
        compute_features: bool,
    ) -> Result<Vec<Outlink>>;

    /// Short description, for diagnostics.
    fn about(&self) -> String;
}
