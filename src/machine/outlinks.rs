//! Branching over clauses and plugins, plus the accessors plugins and
//! tracers use to read and bind the arguments of a paused call.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::{Error, Result},
    goal::{Argument, Goal, Outlink},
    program::parse_label,
    state::{HeapCell, State},
    Addr,
};

use super::Machine;

impl Machine {
    /// Every successor of `state`, one per clause or plugin answer for the
    /// label it is paused on.
    ///
    /// With `compute_features`, clauses that fail (or never report) are
    /// dropped. Without it, every clause yields an outlink, failed or not.
    pub fn outlinks(&mut self, state: &State, compute_features: bool) -> Result<Vec<Outlink>> {
        if state.is_completed() {
            return Ok(Vec::new());
        }
        let label = state.jump_to().ok_or(Error::NoJumpTarget)?;

        let plugin = self.plugins.iter().find(|p| p.claim(label)).cloned();
        if let Some(plugin) = plugin {
            debug!(label, plugin = %plugin.about(), "executing from plugin");
            self.restore_state(state);
            return plugin.outlinks(state, self, compute_features);
        }

        let program = Arc::clone(&self.program);
        let addresses = program
            .addresses(label)
            .ok_or_else(|| Error::UnknownPredicate(label.to_string()))?;

        let mut result = Vec::new();
        for &address in addresses {
            debug!(label, address, "executing clause");
            self.restore_state(state);
            if compute_features {
                let features = self.run(Some(address), true)?;
                if !features.is_empty() && !self.state.is_failed() {
                    self.run(None, true)?;
                    if !self.state.is_failed() {
                        result.push(Outlink::new(Some(features), self.save_state()));
                    }
                }
            } else {
                self.run(Some(address), false)?;
                result.push(Outlink::new(None, self.save_state()));
            }
        }
        Ok(result)
    }

    /// The goals still to be proved from `from`: every call it would make,
    /// pretending each one succeeds immediately. The machine's own state is
    /// left untouched.
    pub fn pending_goals(&mut self, from: &State) -> Result<Vec<Goal>> {
        let saved = self.save_state();
        self.restore_state(from);
        let pending = self.collect_pending();
        self.restore_state(&saved);
        pending
    }

    fn collect_pending(&mut self) -> Result<Vec<Goal>> {
        let mut pending = Vec::new();
        loop {
            if self.state.pc().is_none() {
                pending.push(self.next_pending_goal()?);
                self.returnp()?;
            }
            self.run(None, false)?;
            if self.state.is_completed() || self.state.is_failed() {
                return Ok(pending);
            }
        }
    }

    /// Given that we just did a callp, the goal it is calling.
    fn next_pending_goal(&self) -> Result<Goal> {
        let label = self.state.jump_to().ok_or(Error::NoJumpTarget)?;
        let (functor, arity) = parse_label(label)?;
        let args = (1..=arity)
            .map(|i| self.get_arg(arity, i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Goal::new(functor, args))
    }

    /// Heap address of the `i`-th argument (counting from 1) of the
    /// arity-`k` call on top of the heap.
    fn heapwise_index(&self, k: usize, i: usize) -> Result<Addr> {
        let heap_size = self.state.heap_size();
        if i == 0 || i > k || k > heap_size {
            return Err(Error::InvalidArgument { arity: k, index: i });
        }
        Ok(heap_size - k + i - 1)
    }

    fn dereference_argument(&self, k: usize, i: usize) -> Result<Addr> {
        let j = self.heapwise_index(k, i)?;
        self.state.dereference(j)
    }

    fn heap_index_to_constant(&self, addr: Addr) -> Result<String> {
        let id = self.state.constant_at(addr)?.ok_or(Error::NotConstant {
            addr,
            operation: "get_arg",
        })?;
        self.symbols.symbol_of(id).ok_or(Error::UnknownSymbol(id))
    }

    /// The `i`-th argument of an arity-`k` call, as a constant or as the
    /// canonical address of an unbound variable.
    pub fn get_arg(&self, k: usize, i: usize) -> Result<Argument> {
        let rj = self.dereference_argument(k, i)?;
        if self.state.has_free_at(rj)? {
            Ok(Argument::Variable(rj))
        } else {
            self.heap_index_to_constant(rj).map(Argument::Constant)
        }
    }

    /// The `i`-th argument of an arity-`k` call, or `None` if unbound.
    pub fn get_constant_arg(&self, k: usize, i: usize) -> Result<Option<String>> {
        let rj = self.dereference_argument(k, i)?;
        if self.state.has_free_at(rj)? {
            return Ok(None);
        }
        self.heap_index_to_constant(rj).map(Some)
    }

    /// Binds the unbound `i`-th argument of an arity-`k` call to `value`.
    pub fn set_arg(&mut self, k: usize, i: usize, value: &str) -> Result<()> {
        let j = self.heapwise_index(k, i)?;
        let rj = self.state.dereference(j)?;
        if !self.state.has_free_at(rj)? {
            return Err(Error::NotFree {
                addr: rj,
                operation: "set_arg",
            });
        }
        debug!(k, i, value, "set_arg");
        let id = self.symbols.id_of(value);
        self.state.set_heap(rj, HeapCell::Const(id))?;
        self.state.collapse_pointers(j, rj)
    }
}
