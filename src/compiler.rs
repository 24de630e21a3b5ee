use hashbrown::HashMap;

use crate::{
    ast::{Literal, Rule, Term},
    error::{Error, Result},
    instruction::Instruction,
    program::{label, Program},
    Addr, Offset, Reg,
};

struct AllocatedVar {
    reg: Reg,
    seen: bool,
}

/// Compiles rules into a [`Program`], registering each one as another
/// clause of its head's label.
///
/// A rule `h(t1..tk) :- b1, ..., bm {f1, ..., fn}` becomes
///
/// ```text
/// allocate n                        one register per distinct variable
/// unifyconst / initfreevar /        per head argument, addressed relative
///   unifyboundvar                   to the k call arguments on the heap
/// fclear, fpushstart.., freport     the feature block, always reported
/// pushconst / pushfreevar /         per body literal, then callp name/arity
///   pushboundvar, callp
/// returnp
/// ```
pub struct Compiler {
    allocs: HashMap<String, AllocatedVar>, // variable allocations

    program: Program,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            allocs: HashMap::new(),

            program: Program::new(),
        }
    }

    fn reset(&mut self) {
        self.allocs.clear();
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    fn instr(&mut self, instr: Instruction) -> Addr {
        self.program.push(instr)
    }

    // variables are numbered in order of first appearance; the i-th lives
    // in register -i
    fn alloc<'a>(&mut self, literals: impl IntoIterator<Item = &'a Literal>) -> usize {
        for literal in literals {
            for term in &literal.args {
                if let Term::Variable(name) = term {
                    if !self.allocs.contains_key(name) {
                        let reg = -(self.allocs.len() as Reg) - 1;
                        self.allocs
                            .insert(name.clone(), AllocatedVar { reg, seen: false });
                    }
                }
            }
        }
        self.allocs.len()
    }

    fn reg(&self, name: &str) -> Reg {
        self.allocs[name].reg
    }

    // Marks `name` seen, returning whether it already was.
    fn mark_seen(&mut self, name: &str) -> bool {
        if let Some(var) = self.allocs.get_mut(name) {
            if var.seen {
                return true;
            }

            var.seen = true;
        }

        false
    }

    fn compile_head(&mut self, head: &Literal) {
        let arity = head.args.len() as Offset;
        for (i, term) in head.args.iter().enumerate() {
            let offset = i as Offset - arity;
            let instr = match term {
                Term::Constant(constant) => Instruction::UnifyConst {
                    constant: constant.clone(),
                    offset,
                },
                Term::Variable(name) => {
                    let reg = self.reg(name);
                    if self.mark_seen(name) {
                        Instruction::UnifyBoundVar { reg, offset }
                    } else {
                        Instruction::InitFreeVar { reg, offset }
                    }
                }
            };
            self.instr(instr);
        }
    }

    fn check_features(rule: &Rule) -> Result<()> {
        let bound = |name: &String| {
            rule.head
                .args
                .iter()
                .any(|t| matches!(t, Term::Variable(v) if v == name))
        };
        for term in rule.features.iter().flat_map(|f| &f.args) {
            if let Term::Variable(name) = term {
                if !bound(name) {
                    return Err(Error::UnboundFeatureVariable(name.clone()));
                }
            }
        }
        Ok(())
    }

    fn compile_features(&mut self, features: &[Literal]) {
        self.instr(Instruction::FClear);
        for feature in features {
            self.instr(Instruction::FPushStart {
                functor: feature.functor.clone(),
                arity: feature.args.len(),
            });
            for term in &feature.args {
                let instr = match term {
                    Term::Constant(constant) => Instruction::FPushConst {
                        constant: constant.clone(),
                    },
                    Term::Variable(name) => Instruction::FPushBoundVar {
                        reg: self.reg(name),
                    },
                };
                self.instr(instr);
            }
        }
        self.instr(Instruction::FReport);
    }

    fn compile_call(&mut self, goal: &Literal) {
        for term in &goal.args {
            let instr = match term {
                Term::Constant(constant) => Instruction::PushConst {
                    constant: constant.clone(),
                },
                Term::Variable(name) => {
                    let reg = self.reg(name);
                    if self.mark_seen(name) {
                        Instruction::PushBoundVar { reg }
                    } else {
                        Instruction::PushFreeVar { reg }
                    }
                }
            };
            self.instr(instr);
        }
        self.instr(Instruction::CallP {
            label: label(&goal.functor, goal.args.len()),
        });
    }

    /// Compiles `rule`, returning the address of its first instruction.
    /// Feature arguments must be variables bound by the head.
    pub fn compile_rule(&mut self, rule: &Rule) -> Result<Addr> {
        Self::check_features(rule)?;
        self.reset();
        let n = self.alloc(
            std::iter::once(&rule.head)
                .chain(&rule.features)
                .chain(&rule.body),
        );

        let start = self.instr(Instruction::Allocate { n });
        self.compile_head(&rule.head);
        self.compile_features(&rule.features);
        for goal in &rule.body {
            self.compile_call(goal);
        }
        self.instr(Instruction::ReturnP);

        let head_label = label(&rule.head.functor, rule.head.args.len());
        self.program.add_clause_label(&head_label, start);
        Ok(start)
    }

    pub fn compile_rules<'a>(&mut self, rules: impl IntoIterator<Item = &'a Rule>) -> Result<()> {
        for rule in rules {
            self.compile_rule(rule)?;
        }
        Ok(())
    }

    /// Compiles a query: a headless conjunction with no feature block.
    /// Returns its start address; running from there pauses at the first
    /// call.
    pub fn compile_query(&mut self, goals: &[Literal]) -> Addr {
        self.reset();
        let n = self.alloc(goals);

        let start = self.instr(Instruction::Allocate { n });
        for goal in goals {
            self.compile_call(goal);
        }
        self.instr(Instruction::ReturnP);
        start
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(name: &str) -> Term {
        Term::constant(name)
    }

    fn v(name: &str) -> Term {
        Term::var(name)
    }

    #[test]
    fn compiles_rule_with_features() {
        // grandparent(X,Z) :- parent(X,Y), parent(Y,Z) {gp(X)}.
        let rule = Rule::new(
            Literal::new("grandparent", vec![v("X"), v("Z")]),
            vec![
                Literal::new("parent", vec![v("X"), v("Y")]),
                Literal::new("parent", vec![v("Y"), v("Z")]),
            ],
        )
        .with_features(vec![Literal::new("gp", vec![v("X")])]);

        let mut compiler = Compiler::new();
        let start = compiler.compile_rule(&rule).unwrap();
        let listing: Vec<String> = compiler.program().instructions()[start..]
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            listing,
            [
                "allocate 3",
                "initfreevar -1, -2",
                "initfreevar -2, -1",
                "fclear",
                "fpushstart gp, 1",
                "fpushboundvar -1",
                "freport",
                "pushboundvar -1",
                "pushfreevar -3",
                "callp parent/2",
                "pushboundvar -3",
                "pushboundvar -2",
                "callp parent/2",
                "returnp",
            ]
        );
        assert_eq!(
            compiler.program().addresses("grandparent/2"),
            Some(&[start][..])
        );
    }

    #[test]
    fn repeated_head_variables_unify() {
        // same(X, X, a).
        let rule = Rule::fact(Literal::new("same", vec![v("X"), v("X"), c("a")]));
        let mut compiler = Compiler::new();
        compiler.compile_rule(&rule).unwrap();
        let listing: Vec<String> = compiler
            .program()
            .instructions()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            listing,
            [
                "allocate 1",
                "initfreevar -1, -3",
                "unifyboundvar -1, -2",
                "unifyconst a, -1",
                "fclear",
                "freport",
                "returnp",
            ]
        );
    }

    #[test]
    fn clauses_accumulate_under_one_label() {
        let mut compiler = Compiler::new();
        let rules = [
            Rule::fact(Literal::new("p", vec![c("a")])),
            Rule::fact(Literal::new("p", vec![c("b")])),
        ];
        compiler.compile_rules(&rules).unwrap();
        assert_eq!(compiler.program().addresses("p/1"), Some(&[0, 5][..]));
    }

    #[test]
    fn feature_variables_must_be_bound_by_the_head() {
        let rule = Rule::new(
            Literal::new("p", vec![v("X")]),
            vec![Literal::new("q", vec![v("Y")])],
        )
        .with_features(vec![Literal::new("f", vec![v("Y")])]);
        let mut compiler = Compiler::new();
        assert!(matches!(
            compiler.compile_rule(&rule),
            Err(Error::UnboundFeatureVariable(name)) if name == "Y"
        ));
        assert!(compiler.program().is_empty());
    }

    #[test]
    fn compiles_query() {
        let mut compiler = Compiler::new();
        let start = compiler.compile_query(&[Literal::new("p", vec![v("X"), c("a")])]);
        let listing: Vec<String> = compiler.program().instructions()[start..]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            listing,
            ["allocate 1", "pushfreevar -1", "pushconst a", "callp p/2", "returnp"]
        );
    }
}
