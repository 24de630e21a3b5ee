use hashbrown::HashMap;

use crate::{
    error::{Error, Result},
    instruction::Instruction,
    Addr,
};

/// Separates functor and arity in a call label, as in `parent/2`.
pub const JUMPTO_DELIMITER: char = '/';

pub fn label(functor: &str, arity: usize) -> String {
    format!("{functor}{JUMPTO_DELIMITER}{arity}")
}

/// Splits a call label back into functor and arity.
pub fn parse_label(label: &str) -> Result<(&str, usize)> {
    let (functor, arity) = label
        .rsplit_once(JUMPTO_DELIMITER)
        .ok_or_else(|| Error::MalformedLabel(label.to_string()))?;
    let arity = arity
        .parse()
        .map_err(|_| Error::MalformedLabel(label.to_string()))?;
    Ok((functor, arity))
}

/// Compiled instructions plus the clause entry points of every label.
#[derive(Debug, Clone, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<String, Vec<Addr>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `instr`, returning its address.
    pub fn push(&mut self, instr: Instruction) -> Addr {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    /// Registers another clause for `label`, starting at `addr`. Clauses
    /// are tried in the order they are added.
    pub fn add_clause_label(&mut self, label: &str, addr: Addr) {
        self.labels.entry(label.to_string()).or_default().push(addr);
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    pub fn addresses(&self, label: &str) -> Option<&[Addr]> {
        self.labels.get(label).map(Vec::as_slice)
    }

    pub fn instruction(&self, addr: Addr) -> Result<&Instruction> {
        self.instructions.get(addr).ok_or(Error::InvalidAddress(addr))
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        assert_eq!(label("parent", 2), "parent/2");
        assert_eq!(parse_label("parent/2").unwrap(), ("parent", 2));
        assert_eq!(parse_label("a/b/1").unwrap(), ("a/b", 1));
        assert!(matches!(parse_label("parent"), Err(Error::MalformedLabel(_))));
        assert!(matches!(parse_label("parent/x"), Err(Error::MalformedLabel(_))));
    }

    #[test]
    fn clauses_keep_program_order() {
        let mut program = Program::new();
        let first = program.push(Instruction::ReturnP);
        let second = program.push(Instruction::ReturnP);
        program.add_clause_label("p/0", second);
        program.add_clause_label("p/0", first);

        assert!(program.has_label("p/0"));
        assert!(!program.has_label("q/0"));
        assert_eq!(program.addresses("p/0"), Some(&[1, 0][..]));
        assert_eq!(program.instruction(1).unwrap(), &Instruction::ReturnP);
        assert!(matches!(program.instruction(2), Err(Error::InvalidAddress(2))));
    }
}
