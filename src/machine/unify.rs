//! Term construction and unification opcodes.
//!
//! Free cells are only ever bound to a constant, or to another free cell
//! at a smaller address, so every equivalence class has a stable
//! representative: its lowest address.

use crate::{
    error::{Error, Result},
    state::HeapCell,
    Addr, Offset, Reg,
};

use super::Machine;

impl Machine {
    pub fn pushconst(&mut self, constant: &str) -> Result<()> {
        let id = self.symbols.id_of(constant);
        self.state.push_heap(HeapCell::Const(id));
        self.state.increment_pc();
        Ok(())
    }

    pub fn pushfreevar(&mut self, reg: Reg) -> Result<()> {
        let addr = self.state.push_free();
        self.state.set_register(reg, addr)?;
        self.state.increment_pc();
        Ok(())
    }

    pub fn pushboundvar(&mut self, reg: Reg) -> Result<()> {
        let value = self.state.dereference(self.state.register(reg)?)?;
        self.state.push_heap(HeapCell::Ref(value));
        self.state.increment_pc();
        Ok(())
    }

    pub fn unifyconst(&mut self, constant: &str, offset: Offset) -> Result<()> {
        let i = self.state.relative_heap(offset)?;
        let ri = self.state.dereference(i)?;

        if let Some(id) = self.state.constant_at(ri)? {
            // a constant never interned cannot be on the heap
            let matches = self.symbols.lookup(constant) == Some(id);
            self.state.set_failed(!matches);
        } else {
            if !self.state.has_free_at(ri)? {
                return Err(Error::NeitherFreeNorConstant {
                    addr: ri,
                    operation: "unifyconst",
                });
            }
            let id = self.symbols.id_of(constant);
            self.state.set_heap(ri, HeapCell::Const(id))?;
            self.state.collapse_pointers(i, ri)?;
        }

        self.state.increment_pc();
        Ok(())
    }

    pub fn initfreevar(&mut self, reg: Reg, offset: Offset) -> Result<()> {
        let addr = self.state.relative_heap(offset)?;
        self.state.set_register(reg, addr)?;
        self.state.increment_pc();
        Ok(())
    }

    pub fn unifyboundvar(&mut self, reg: Reg, offset: Offset) -> Result<()> {
        let i = self.state.relative_heap(offset)?;
        let j = self.state.register(reg)?;
        let mut ri = self.state.dereference(i)?;
        let mut rj = self.state.dereference(j)?;

        let ci = self.state.constant_at(ri)?;
        let cj = self.state.constant_at(rj)?;

        if ri == rj {
            // already unified
        } else if let (Some(a), Some(b)) = (ci, cj) {
            self.state.set_failed(a != b);
        } else if let Some(a) = ci {
            self.expect_free(rj)?;
            self.state.set_heap(rj, HeapCell::Const(a))?;
        } else if let Some(b) = cj {
            self.expect_free(ri)?;
            self.state.set_heap(ri, HeapCell::Const(b))?;
        } else if rj > ri {
            self.expect_free(rj)?;
            self.state.set_heap(rj, HeapCell::Ref(ri))?;
            rj = ri;
        } else {
            self.expect_free(ri)?;
            self.state.set_heap(ri, HeapCell::Ref(rj))?;
            ri = rj;
        }

        if !self.state.is_failed() {
            self.state.collapse_pointers(i, ri)?;
            self.state.collapse_pointers(j, rj)?;
        }

        self.state.increment_pc();
        Ok(())
    }

    fn expect_free(&self, addr: Addr) -> Result<()> {
        if self.state.has_free_at(addr)? {
            Ok(())
        } else {
            Err(Error::NotFree {
                addr,
                operation: "unifyboundvar",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{program::Program, Addr, Error, HeapCell, Machine};

    fn machine() -> Machine {
        let mut m = Machine::new(Arc::new(Program::new()), Vec::new());
        m.allocate(2).unwrap();
        m
    }

    fn constant(m: &Machine, addr: Addr) -> Option<String> {
        let root = m.state().dereference(addr).unwrap();
        m.state()
            .constant_at(root)
            .unwrap()
            .and_then(|id| m.symbols().symbol_of(id))
    }

    #[test]
    fn unifyconst_binds_free_cell() {
        let mut m = machine();
        m.pushfreevar(-1).unwrap();
        m.unifyconst("a", -1).unwrap();
        assert!(!m.state().is_failed());
        assert_eq!(constant(&m, 0).as_deref(), Some("a"));
    }

    #[test]
    fn unifyconst_matches_or_fails_on_constants() {
        let mut m = machine();
        m.pushconst("a").unwrap();
        m.unifyconst("a", -1).unwrap();
        assert!(!m.state().is_failed());

        m.unifyconst("b", -1).unwrap();
        assert!(m.state().is_failed());
        assert!(!m.symbols().has_id("b"));
    }

    #[test]
    fn unifyconst_compresses_the_path() {
        let mut m = machine();
        m.pushfreevar(-1).unwrap();
        m.pushboundvar(-1).unwrap();
        m.pushboundvar(-1).unwrap();
        // cell 2 refers to 0; make the chain longer by hand
        m.state_mut().set_heap(2, HeapCell::Ref(1)).unwrap();
        m.unifyconst("c", -1).unwrap();
        assert_eq!(m.state().cell(2).unwrap(), HeapCell::Ref(0));
        assert_eq!(constant(&m, 1).as_deref(), Some("c"));
    }

    #[test]
    fn pushboundvar_aliases_the_canonical_cell() {
        let mut m = machine();
        m.pushfreevar(-2).unwrap();
        m.pushboundvar(-2).unwrap();
        assert_eq!(m.state().cell(1).unwrap(), HeapCell::Ref(0));
        assert_eq!(m.state().dereference(1).unwrap(), 0);
    }

    #[test]
    fn initfreevar_aliases_without_pushing() {
        let mut m = machine();
        m.pushconst("a").unwrap();
        m.initfreevar(-1, -1).unwrap();
        assert_eq!(m.state().heap_size(), 1);
        assert_eq!(m.state().register(-1).unwrap(), 0);
    }

    #[test]
    fn free_cells_bind_larger_to_smaller() {
        for (first, second) in [(-1, -2), (-2, -1)] {
            let mut m = machine();
            m.pushfreevar(first).unwrap();
            m.pushfreevar(second).unwrap();
            // unify register `first` (cell 0) with the top of heap (cell 1)
            m.unifyboundvar(first, -1).unwrap();
            assert!(!m.state().is_failed());
            assert_eq!(m.state().dereference(0).unwrap(), 0);
            assert_eq!(m.state().dereference(1).unwrap(), 0);
            assert!(m.state().has_free_at(0).unwrap());
        }
    }

    #[test]
    fn free_cells_bind_larger_to_smaller_from_either_side() {
        let mut m = machine();
        m.pushfreevar(-1).unwrap();
        m.pushfreevar(-2).unwrap();
        // register holds the larger address this time
        m.unifyboundvar(-2, -2).unwrap();
        assert_eq!(m.state().dereference(0).unwrap(), 0);
        assert_eq!(m.state().dereference(1).unwrap(), 0);
        assert_eq!(m.state().cell(1).unwrap(), HeapCell::Ref(0));
    }

    #[test]
    fn unification_is_symmetric_and_idempotent() {
        let mut m = machine();
        m.pushfreevar(-1).unwrap();
        m.pushfreevar(-2).unwrap();
        m.unifyboundvar(-1, -1).unwrap();
        let before = m.save_state();

        m.unifyboundvar(-2, -2).unwrap();
        m.unifyboundvar(-1, -1).unwrap();
        assert!(!m.state().is_failed());
        assert_eq!(m.save_state().heap(), before.heap());
    }

    #[test]
    fn constant_flows_into_free_side() {
        let mut m = machine();
        m.pushfreevar(-1).unwrap();
        m.pushconst("a").unwrap();
        m.unifyboundvar(-1, -1).unwrap();
        assert_eq!(constant(&m, 0).as_deref(), Some("a"));

        let mut m = machine();
        m.pushconst("a").unwrap();
        m.initfreevar(-1, -1).unwrap();
        m.pushfreevar(-2).unwrap();
        m.unifyboundvar(-1, -1).unwrap();
        assert_eq!(constant(&m, 1).as_deref(), Some("a"));
    }

    #[test]
    fn mismatched_constants_fail() {
        let mut m = machine();
        m.pushconst("a").unwrap();
        m.initfreevar(-1, -1).unwrap();
        m.pushconst("b").unwrap();
        m.unifyboundvar(-1, -1).unwrap();
        assert!(m.state().is_failed());
    }

    #[test]
    fn bad_operands_are_fatal() {
        let mut m = machine();
        assert!(matches!(m.unifyconst("a", -1), Err(Error::InvalidHeapOffset { .. })));
        assert!(matches!(m.pushfreevar(1), Err(Error::InvalidRegister(1))));
        assert!(matches!(m.pushboundvar(-1), Err(Error::UnsetRegister(-1))));
    }
}
