use hashbrown::HashMap;

use crate::{
    error::Result,
    goal::{Argument, Features, Goal, Outlink},
    machine::Machine,
    program::{label, parse_label},
    state::State,
};

use super::Plugin;

/// Ground facts, looked up by call label.
#[derive(Debug, Clone, Default)]
pub struct FactsPlugin {
    facts: HashMap<String, Vec<Vec<String>>>,
}

impl FactsPlugin {
    /// Feature reported for every answer.
    pub const FEATURE: &'static str = "id";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fact<S: AsRef<str>>(&mut self, functor: &str, args: &[S]) {
        let row: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.facts
            .entry(label(functor, args.len()))
            .or_default()
            .push(row);
    }

    pub fn len(&self) -> usize {
        self.facts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    // Binds the call's arguments to `row`, or returns false when a bound
    // argument disagrees with it.
    fn bind_row(machine: &mut Machine, row: &[String]) -> Result<bool> {
        let arity = row.len();
        for (i, value) in row.iter().enumerate() {
            match machine.get_constant_arg(arity, i + 1)? {
                Some(bound) if bound != *value => return Ok(false),
                Some(_) => {}
                None => machine.set_arg(arity, i + 1, value)?,
            }
        }
        Ok(true)
    }
}

impl Plugin for FactsPlugin {
    fn claim(&self, label: &str) -> bool {
        self.facts.contains_key(label)
    }

    fn outlinks(
        &self,
        state: &State,
        machine: &mut Machine,
        compute_features: bool,
    ) -> Result<Vec<Outlink>> {
        let Some(label) = state.jump_to() else {
            return Ok(Vec::new());
        };
        let Some(rows) = self.facts.get(label) else {
            return Ok(Vec::new());
        };
        let (_, arity) = parse_label(label)?;

        let mut result = Vec::new();
        for row in rows.iter().filter(|row| row.len() == arity) {
            machine.restore_state(state);
            if !Self::bind_row(machine, row)? {
                continue;
            }
            machine.returnp()?;
            machine.run(None, compute_features)?;

            if compute_features {
                if machine.state().is_failed() {
                    continue;
                }
                let mut features = Features::new();
                features.insert(
                    Goal::new(Self::FEATURE, vec![Argument::constant(label)]),
                    1.0,
                );
                result.push(Outlink::new(Some(features), machine.save_state()));
            } else {
                result.push(Outlink::new(None, machine.save_state()));
            }
        }
        Ok(result)
    }

    fn about(&self) -> String {
        format!("facts({} rows)", self.len())
    }
}
