//! Feature-construction opcodes.

use tracing::debug;

use crate::{
    error::{Error, Result},
    goal::{Argument, Feature, Goal},
    state::State,
    Addr, Reg,
};

use super::Machine;

impl Machine {
    pub fn fclear(&mut self) -> Result<()> {
        self.feature_stack.clear();
        self.state.increment_pc();
        Ok(())
    }

    pub fn fpushstart(&mut self, functor: &str, arity: usize) -> Result<()> {
        self.feature_stack.push(Feature::new(functor, arity));
        self.state.increment_pc();
        Ok(())
    }

    pub fn fpushconst(&mut self, constant: &str) -> Result<()> {
        self.feature_peek("fpushconst")?
            .append(Argument::constant(constant));
        self.state.increment_pc();
        Ok(())
    }

    /// Appends the value of `reg`, which must already be a constant.
    pub fn fpushboundvar(&mut self, reg: Reg) -> Result<()> {
        let ra = self.state.dereference(self.state.register(reg)?)?;
        let id = self.state.constant_at(ra)?.ok_or(Error::NotConstant {
            addr: ra,
            operation: "fpushboundvar",
        })?;
        let symbol = self.symbols.symbol_of(id).ok_or(Error::UnknownSymbol(id))?;
        self.feature_peek("fpushboundvar")?
            .append(Argument::Constant(symbol));
        self.state.increment_pc();
        Ok(())
    }

    /// Reports every feature on the stack with weight 1.0, or the
    /// no-features marker when the stack is empty.
    pub fn freport(&mut self) -> Result<()> {
        for feature in &self.feature_stack {
            self.reported.insert(feature.to_goal(), 1.0);
        }
        if self.feature_stack.is_empty() {
            self.reported.insert(Goal::no_features(), 1.0);
        }
        self.state.increment_pc();
        Ok(())
    }

    /// Collects every feature reachable from the sub-program at `address`
    /// without committing to any branch of it, then pushes them onto the
    /// feature stack.
    pub fn ffindall(&mut self, address: Addr) -> Result<()> {
        debug!(address, "ffindall");
        let saved = self.save_state();
        let saved_stack = std::mem::take(&mut self.feature_stack);

        // returning out of the sub-program completes it instead of
        // resuming our caller
        self.state.clear_calls();
        let mut found: Vec<Goal> = Vec::new();
        let features = self.run(Some(address), true)?;
        collect(&mut found, features.into_keys());
        let start = self.save_state();

        let result = self.findall_dfs(start, &mut found);
        self.restore_state(&saved);
        self.feature_stack = saved_stack;
        result?;

        debug!(count = found.len(), "ffindall collected features");
        self.feature_stack.extend(found.into_iter().map(Feature::from));
        self.state.increment_pc();
        Ok(())
    }

    fn findall_dfs(&mut self, start: State, found: &mut Vec<Goal>) -> Result<()> {
        let max_depth = self.config.max_findall_depth;
        let mut worklist = vec![(start, 0usize)];

        while let Some((state, depth)) = worklist.pop() {
            if state.is_completed() || state.is_failed() {
                continue;
            }
            if depth >= max_depth {
                return Err(Error::FindallDepthExceeded(max_depth));
            }

            let mut children = Vec::new();
            if state.pc().is_some() {
                // paused on a report: keep going down the same branch
                self.restore_state(&state);
                let features = self.run(None, true)?;
                collect(found, features.into_keys());
                children.push(self.save_state());
            } else {
                for outlink in self.outlinks(&state, true)? {
                    if let Some(features) = outlink.features {
                        collect(found, features.into_keys());
                    }
                    children.push(outlink.state);
                }
            }

            // reversed so the first child is expanded first
            worklist.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        Ok(())
    }

    fn feature_peek(&mut self, operation: &'static str) -> Result<&mut Feature> {
        self.feature_stack
            .last_mut()
            .ok_or(Error::EmptyFeatureStack(operation))
    }
}

fn collect(found: &mut Vec<Goal>, goals: impl IntoIterator<Item = Goal>) {
    let mut goals: Vec<Goal> = goals.into_iter().collect();
    // report maps are unordered
    goals.sort();
    for goal in goals {
        if !found.contains(&goal) {
            found.push(goal);
        }
    }
}
