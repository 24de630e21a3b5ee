use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    Addr, Atom, Offset, Reg,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapCell {
    // Constant Cell, holding an interned symbol id.
    Const(Atom),
    //
    // Variable Cell, denoted as <REF, k> where k is an index into the heap.
    // An unbound variable is represented by a reference to itself; any other
    // target is a binding pointing toward the canonical cell of its class.
    Ref(Addr),
}

/// Saved at `callp` and consumed by the matching `returnp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub heap_size: usize,
    pub register_count: usize,
    pub pc: Addr,
    pub jump_to: Option<String>,
}

/// Follows reference cells from `addr` until a constant or a free cell.
/// Terminates because bindings always point at a smaller address.
fn dereference(heap: &[HeapCell], mut addr: Addr) -> Result<Addr> {
    loop {
        match heap.get(addr) {
            Some(HeapCell::Ref(target)) if *target != addr => addr = *target,
            Some(_) => return Ok(addr),
            None => {
                return Err(Error::HeapOutOfRange {
                    addr,
                    heap_size: heap.len(),
                })
            }
        }
    }
}

/// The machine state being stepped. Owned, append/truncate only.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableState {
    heap: Vec<HeapCell>,
    registers: Vec<Option<Addr>>,
    calls: Vec<CallFrame>,
    // `None` while a call waits to be resolved by the outlink generator.
    pc: Option<Addr>,
    jump_to: Option<String>,
    failed: bool,
    completed: bool,
}

impl Default for MutableState {
    fn default() -> Self {
        MutableState {
            heap: Vec::new(),
            registers: Vec::new(),
            calls: Vec::new(),
            pc: Some(0),
            jump_to: None,
            failed: false,
            completed: false,
        }
    }
}

impl MutableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn immutable_version(&self) -> State {
        State {
            heap: Arc::from(self.heap.as_slice()),
            registers: Arc::from(self.registers.as_slice()),
            calls: Arc::from(self.calls.as_slice()),
            pc: self.pc,
            jump_to: self.jump_to.clone(),
            failed: self.failed,
            completed: self.completed,
        }
    }

    pub fn pc(&self) -> Option<Addr> {
        self.pc
    }

    pub fn set_pc(&mut self, pc: Option<Addr>) {
        self.pc = pc;
    }

    pub fn increment_pc(&mut self) {
        if let Some(pc) = self.pc.as_mut() {
            *pc += 1;
        }
    }

    pub fn jump_to(&self) -> Option<&str> {
        self.jump_to.as_deref()
    }

    pub fn set_jump_to(&mut self, label: Option<String>) {
        self.jump_to = label;
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub fn calls(&self) -> &[CallFrame] {
        &self.calls
    }

    pub fn push_call(&mut self, frame: CallFrame) {
        self.calls.push(frame);
    }

    pub fn pop_call(&mut self) -> Option<CallFrame> {
        self.calls.pop()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    // heap

    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    pub fn heap(&self) -> &[HeapCell] {
        &self.heap
    }

    pub fn cell(&self, addr: Addr) -> Result<HeapCell> {
        self.heap.get(addr).copied().ok_or(Error::HeapOutOfRange {
            addr,
            heap_size: self.heap.len(),
        })
    }

    /// Appends `cell`, returning its address.
    pub fn push_heap(&mut self, cell: HeapCell) -> Addr {
        self.heap.push(cell);
        self.heap.len() - 1
    }

    /// Appends a free variable cell, returning its address.
    pub fn push_free(&mut self) -> Addr {
        let addr = self.heap.len();
        self.push_heap(HeapCell::Ref(addr))
    }

    pub fn set_heap(&mut self, addr: Addr, cell: HeapCell) -> Result<()> {
        let heap_size = self.heap.len();
        let slot = self
            .heap
            .get_mut(addr)
            .ok_or(Error::HeapOutOfRange { addr, heap_size })?;
        *slot = cell;
        Ok(())
    }

    pub fn truncate_heap(&mut self, size: usize) {
        self.heap.truncate(size);
    }

    /// Absolute address of a position relative to the heap top.
    pub fn relative_heap(&self, offset: Offset) -> Result<Addr> {
        let heap_size = self.heap.len();
        let addr = heap_size as i64 + i64::from(offset);
        if offset >= 0 || addr < 0 {
            return Err(Error::InvalidHeapOffset { offset, heap_size });
        }
        Ok(addr as Addr)
    }

    pub fn dereference(&self, addr: Addr) -> Result<Addr> {
        dereference(&self.heap, addr)
    }

    pub fn has_constant_at(&self, addr: Addr) -> Result<bool> {
        Ok(matches!(self.cell(addr)?, HeapCell::Const(_)))
    }

    pub fn has_free_at(&self, addr: Addr) -> Result<bool> {
        Ok(self.cell(addr)? == HeapCell::Ref(addr))
    }

    pub fn constant_at(&self, addr: Addr) -> Result<Option<Atom>> {
        match self.cell(addr)? {
            HeapCell::Const(id) => Ok(Some(id)),
            HeapCell::Ref(_) => Ok(None),
        }
    }

    /// Points `start` directly at `canonical` so the next dereference of
    /// `start` is a single step.
    pub fn collapse_pointers(&mut self, start: Addr, canonical: Addr) -> Result<()> {
        if start != canonical {
            self.set_heap(start, HeapCell::Ref(canonical))?;
        }
        Ok(())
    }

    // registers

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn add_registers(&mut self, n: usize) {
        self.registers.resize(self.registers.len() + n, None);
    }

    pub fn truncate_registers(&mut self, size: usize) {
        self.registers.truncate(size);
    }

    fn register_index(&self, reg: Reg) -> Result<usize> {
        let index = self.registers.len() as i64 + i64::from(reg);
        if reg >= 0 || index < 0 {
            return Err(Error::InvalidRegister(reg));
        }
        Ok(index as usize)
    }

    pub fn register(&self, reg: Reg) -> Result<Addr> {
        let index = self.register_index(reg)?;
        self.registers[index].ok_or(Error::UnsetRegister(reg))
    }

    pub fn set_register(&mut self, reg: Reg, addr: Addr) -> Result<()> {
        let index = self.register_index(reg)?;
        self.registers[index] = Some(addr);
        Ok(())
    }
}

/// Immutable snapshot of a [`MutableState`]. Cloning is cheap and two
/// snapshots never share anything a running machine can write to.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    heap: Arc<[HeapCell]>,
    registers: Arc<[Option<Addr>]>,
    calls: Arc<[CallFrame]>,
    pc: Option<Addr>,
    jump_to: Option<String>,
    failed: bool,
    completed: bool,
}

impl State {
    pub fn mutable_version(&self) -> MutableState {
        MutableState {
            heap: self.heap.to_vec(),
            registers: self.registers.to_vec(),
            calls: self.calls.to_vec(),
            pc: self.pc,
            jump_to: self.jump_to.clone(),
            failed: self.failed,
            completed: self.completed,
        }
    }

    pub fn pc(&self) -> Option<Addr> {
        self.pc
    }

    pub fn jump_to(&self) -> Option<&str> {
        self.jump_to.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn heap(&self) -> &[HeapCell] {
        &self.heap
    }

    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn calls(&self) -> &[CallFrame] {
        &self.calls
    }

    pub fn dereference(&self, addr: Addr) -> Result<Addr> {
        dereference(&self.heap, addr)
    }
}

impl From<&MutableState> for State {
    fn from(state: &MutableState) -> Self {
        state.immutable_version()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.completed {
            "completed"
        } else if self.failed {
            "failed"
        } else {
            "paused"
        };
        write!(f, "{status} heap=[")?;
        for (i, cell) in self.heap.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match cell {
                HeapCell::Const(id) => write!(f, "c{id}")?,
                HeapCell::Ref(target) if *target == i => write!(f, "_")?,
                HeapCell::Ref(target) => write!(f, "@{target}")?,
            }
        }
        write!(f, "] calls={}", self.calls.len())?;
        match (&self.pc, &self.jump_to) {
            (None, Some(label)) => write!(f, " calling {label}"),
            (Some(pc), _) => write!(f, " pc={pc}"),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_cells_are_self_references() {
        let mut state = MutableState::new();
        let x = state.push_free();
        let a = state.push_heap(HeapCell::Const(0));
        assert!(state.has_free_at(x).unwrap());
        assert!(!state.has_free_at(a).unwrap());
        assert!(state.has_constant_at(a).unwrap());
        assert!(state.cell(5).is_err());
    }

    #[test]
    fn dereference_follows_chain_and_compression_keeps_value() {
        let mut state = MutableState::new();
        let root = state.push_free();
        let mid = state.push_heap(HeapCell::Ref(root));
        let leaf = state.push_heap(HeapCell::Ref(mid));
        assert_eq!(state.dereference(leaf).unwrap(), root);

        state.collapse_pointers(leaf, root).unwrap();
        assert_eq!(state.cell(leaf).unwrap(), HeapCell::Ref(root));
        assert_eq!(state.dereference(leaf).unwrap(), root);

        state.set_heap(root, HeapCell::Const(4)).unwrap();
        assert_eq!(state.dereference(mid).unwrap(), root);
        assert_eq!(state.constant_at(state.dereference(leaf).unwrap()).unwrap(), Some(4));
    }

    #[test]
    fn collapse_onto_itself_keeps_the_cell() {
        let mut state = MutableState::new();
        let a = state.push_heap(HeapCell::Const(1));
        state.collapse_pointers(a, a).unwrap();
        assert_eq!(state.cell(a).unwrap(), HeapCell::Const(1));
    }

    #[test]
    fn registers_are_relative_to_the_top() {
        let mut state = MutableState::new();
        state.add_registers(2);
        state.set_register(-1, 7).unwrap();
        state.set_register(-2, 3).unwrap();
        assert_eq!(state.register(-1).unwrap(), 7);
        assert_eq!(state.register(-2).unwrap(), 3);
        assert!(matches!(state.register(-3), Err(Error::InvalidRegister(-3))));
        assert!(matches!(state.register(0), Err(Error::InvalidRegister(0))));

        state.add_registers(1);
        assert!(matches!(state.register(-1), Err(Error::UnsetRegister(-1))));
        assert_eq!(state.register(-2).unwrap(), 7);
    }

    #[test]
    fn relative_heap_offsets() {
        let mut state = MutableState::new();
        state.push_free();
        state.push_free();
        assert_eq!(state.relative_heap(-1).unwrap(), 1);
        assert_eq!(state.relative_heap(-2).unwrap(), 0);
        assert!(state.relative_heap(-3).is_err());
        assert!(state.relative_heap(0).is_err());
    }

    #[test]
    fn snapshots_do_not_alias() {
        let mut state = MutableState::new();
        let x = state.push_free();
        let snapshot = state.immutable_version();

        state.set_heap(x, HeapCell::Const(2)).unwrap();
        state.push_free();
        assert_eq!(snapshot.heap(), &[HeapCell::Ref(x)]);

        let mut restored = snapshot.mutable_version();
        restored.truncate_heap(0);
        assert_eq!(snapshot.heap_size(), 1);
        assert_eq!(State::from(&restored).heap_size(), 0);
    }
}
