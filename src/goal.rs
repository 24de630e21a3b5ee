use std::fmt;

use hashbrown::HashMap;

use crate::{state::State, Addr};

/// Feature goals gained by a proof step, each with its weight contribution.
pub type Features = HashMap<Goal, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Argument {
    Constant(String),
    // An unbound variable, named by its canonical heap address.
    Variable(Addr),
}

impl Argument {
    pub fn constant(name: impl Into<String>) -> Self {
        Argument::Constant(name.into())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Constant(name) => write!(f, "{name}"),
            Argument::Variable(addr) => write!(f, "X{addr}"),
        }
    }
}

/// A finished functor with its arguments: either a feature key or a goal
/// still waiting to be proved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Goal {
    pub functor: String,
    pub args: Vec<Argument>,
}

impl Goal {
    /// Reported by `freport` when no feature was built.
    pub const NO_FEATURES: &'static str = "_no_features_";

    pub fn new(functor: impl Into<String>, args: Vec<Argument>) -> Self {
        Goal {
            functor: functor.into(),
            args,
        }
    }

    pub fn atom(functor: impl Into<String>) -> Self {
        Self::new(functor, Vec::new())
    }

    pub fn no_features() -> Self {
        Self::atom(Self::NO_FEATURES)
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.functor)?;
        if self.args.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// A feature under construction on the feature stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub functor: String,
    pub arity: usize,
    pub args: Vec<Argument>,
}

impl Feature {
    pub fn new(functor: impl Into<String>, arity: usize) -> Self {
        Feature {
            functor: functor.into(),
            arity,
            args: Vec::with_capacity(arity),
        }
    }

    pub fn append(&mut self, arg: Argument) {
        self.args.push(arg);
    }

    pub fn to_goal(&self) -> Goal {
        Goal::new(self.functor.clone(), self.args.clone())
    }
}

impl From<Goal> for Feature {
    fn from(goal: Goal) -> Self {
        Feature {
            arity: goal.args.len(),
            functor: goal.functor,
            args: goal.args,
        }
    }
}

/// One successor of a paused state.
#[derive(Debug, Clone)]
pub struct Outlink {
    pub features: Option<Features>,
    pub state: State,
}

impl Outlink {
    pub fn new(features: Option<Features>, state: State) -> Self {
        Outlink { features, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goals_display_prolog_style() {
        let goal = Goal::new(
            "parent",
            vec![Argument::constant("tom"), Argument::Variable(4)],
        );
        assert_eq!(goal.to_string(), "parent(tom,X4)");
        assert_eq!(goal.arity(), 2);
        assert_eq!(Goal::no_features().to_string(), "_no_features_");
    }

    #[test]
    fn features_finish_into_goals() {
        let mut feature = Feature::new("by", 1);
        feature.append(Argument::constant("rule1"));
        assert_eq!(
            feature.to_goal(),
            Goal::new("by", vec![Argument::constant("rule1")])
        );
        assert_eq!(Feature::from(feature.to_goal()), feature);
    }
}
