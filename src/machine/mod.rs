//! The machine steps a [`MutableState`] through the compiled program.
//!
//! Registers and heap positions named by instructions are relative to the
//! top of the register stack and heap respectively, so both are small
//! negative numbers: -1, -2, ...
//!
//! Execution never backtracks. Whenever the proof could branch (a call, or
//! a feature report that needs attributing), [`Machine::run`] pauses, and
//! [`Machine::outlinks`] forks one snapshot per alternative.

use std::sync::Arc;

use tracing::trace;

use crate::{
    config::Config,
    error::Result,
    goal::{Feature, Features},
    instruction::Instruction,
    plugin::Plugin,
    pool::SymbolTable,
    program::Program,
    state::{CallFrame, MutableState, State},
    Addr,
};

mod features;
mod outlinks;
mod unify;

pub struct Machine {
    state: MutableState,
    symbols: SymbolTable,
    program: Arc<Program>,
    plugins: Vec<Arc<dyn Plugin>>,
    feature_stack: Vec<Feature>,
    reported: Features,
    config: Config,
}

impl Machine {
    pub fn new(program: Arc<Program>, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self::with_symbols(SymbolTable::new(), program, plugins)
    }

    /// A machine sharing `symbols` with every other machine built from it.
    pub fn with_symbols(
        symbols: SymbolTable,
        program: Arc<Program>,
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> Self {
        Machine {
            state: MutableState::new(),
            symbols,
            program,
            plugins,
            feature_stack: Vec::new(),
            reported: Features::new(),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &MutableState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MutableState {
        &mut self.state
    }

    pub fn feature_stack(&self) -> &[Feature] {
        &self.feature_stack
    }

    pub fn save_state(&self) -> State {
        self.state.immutable_version()
    }

    pub fn restore_state(&mut self, state: &State) {
        self.state = state.mutable_version();
    }

    /// Executes instructions until a unification fails, the top-level
    /// program returns, a `callp` pauses for its label to be resolved, or
    /// an `freport` produces features. Returns the reported features, which
    /// are empty unless the last instruction was a report.
    ///
    /// When `compute_features` is false every feature opcode is skipped.
    pub fn run(&mut self, start: Option<Addr>, compute_features: bool) -> Result<Features> {
        if let Some(start) = start {
            self.state.set_pc(Some(start));
        }
        self.state.set_failed(false);
        self.state.set_completed(false);
        self.reported.clear();

        while !self.state.is_failed() && !self.state.is_completed() && self.reported.is_empty() {
            let Some(pc) = self.state.pc() else {
                break;
            };
            let program = Arc::clone(&self.program);
            let instr = program.instruction(pc)?;
            self.execute(instr, compute_features)?;
        }

        Ok(std::mem::take(&mut self.reported))
    }

    pub fn execute(&mut self, instr: &Instruction, compute_features: bool) -> Result<()> {
        trace!(pc = ?self.state.pc(), %instr, "execute");

        if !compute_features && instr.is_feature() {
            self.state.increment_pc();
            return Ok(());
        }

        match instr {
            Instruction::Allocate { n } => self.allocate(*n),
            Instruction::CallP { label } => self.callp(label),
            Instruction::ReturnP => self.returnp(),
            Instruction::PushConst { constant } => self.pushconst(constant),
            Instruction::PushFreeVar { reg } => self.pushfreevar(*reg),
            Instruction::PushBoundVar { reg } => self.pushboundvar(*reg),
            Instruction::UnifyConst { constant, offset } => self.unifyconst(constant, *offset),
            Instruction::InitFreeVar { reg, offset } => self.initfreevar(*reg, *offset),
            Instruction::UnifyBoundVar { reg, offset } => self.unifyboundvar(*reg, *offset),
            Instruction::FClear => self.fclear(),
            Instruction::FPushStart { functor, arity } => self.fpushstart(functor, *arity),
            Instruction::FPushConst { constant } => self.fpushconst(constant),
            Instruction::FPushBoundVar { reg } => self.fpushboundvar(*reg),
            Instruction::FReport => self.freport(),
            Instruction::FFindAll { address } => self.ffindall(*address),
        }
    }

    pub fn allocate(&mut self, n: usize) -> Result<()> {
        self.state.add_registers(n);
        self.state.increment_pc();
        Ok(())
    }

    /// Pauses on a call: the frame remembers where to resume and the label
    /// being resolved is left in `jump_to`.
    pub fn callp(&mut self, label: &str) -> Result<()> {
        self.state.increment_pc();
        let frame = CallFrame {
            heap_size: self.state.heap_size(),
            register_count: self.state.register_count(),
            pc: self.state.pc().unwrap_or_default(),
            jump_to: self.state.jump_to().map(str::to_string),
        };
        self.state.push_call(frame);
        self.state.set_jump_to(Some(label.to_string()));
        self.state.set_pc(None);
        Ok(())
    }

    /// Marks the state completed at the top level, otherwise pops a frame
    /// and drops everything the callee allocated.
    pub fn returnp(&mut self) -> Result<()> {
        let Some(frame) = self.state.pop_call() else {
            self.state.set_completed(true);
            return Ok(());
        };
        self.state.truncate_heap(frame.heap_size);
        self.state.truncate_registers(frame.register_count);
        self.state.set_pc(Some(frame.pc));
        self.state.set_jump_to(frame.jump_to);
        Ok(())
    }
}
