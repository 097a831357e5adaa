use std::io::{self, Read, Write};

use tracing::{debug, trace};

use crate::brainfuck::Inst;
use crate::error::RuntimeError;

pub const TAPE_LEN: usize = 65536;

/// Fixed-size tape of wrapping 8-bit cells. Every access is bounds-checked.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Box<[u8]>,
}

impl Tape {
    pub fn new() -> Self {
        Tape {
            cells: vec![0u8; TAPE_LEN].into_boxed_slice(),
        }
    }

    pub fn get(&self, addr: usize) -> Option<u8> {
        self.cells.get(addr).copied()
    }

    pub fn get_mut(&mut self, addr: usize) -> Option<&mut u8> {
        self.cells.get_mut(addr)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.cells
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

/// What `,` does once the input source is drained.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Eof {
    /// Leave the cell as it is.
    #[default]
    Unchanged,
    /// Store 0.
    Zero,
    /// Abort with [`RuntimeError::InputExhausted`].
    Fail,
}

/// Instruction pointer, data pointer and tape for one run.
///
/// The data pointer moves with wrapping arithmetic and is only checked when
/// the tape is touched, so `>` past the last cell is fine until something
/// reads or writes there.
#[derive(Debug, Clone, Default)]
pub struct Machine {
    tape: Tape,
    ip: usize,
    dp: usize,
    eof: Eof,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eof(eof: Eof) -> Self {
        Machine {
            eof,
            ..Self::default()
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn dp(&self) -> usize {
        self.dp
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    pub fn is_halted(&self, prog: &[Inst]) -> bool {
        self.ip >= prog.len()
    }

    fn out_of_bounds(&self, ip: usize, addr: usize) -> RuntimeError {
        RuntimeError::TapeOutOfBounds {
            ip,
            dp: self.dp,
            addr,
        }
    }

    fn cell(&self, ip: usize) -> Result<u8, RuntimeError> {
        self.tape
            .get(self.dp)
            .ok_or_else(|| self.out_of_bounds(ip, self.dp))
    }

    fn cell_mut(&mut self, ip: usize) -> Result<&mut u8, RuntimeError> {
        let dp = self.dp;
        match self.tape.get_mut(dp) {
            Some(cell) => Ok(cell),
            None => Err(RuntimeError::TapeOutOfBounds { ip, dp, addr: dp }),
        }
    }

    /// Execute the instruction at the instruction pointer. Does nothing once
    /// the machine has halted.
    pub fn step<R: Read, W: Write>(
        &mut self,
        prog: &[Inst],
        input: &mut R,
        output: &mut W,
    ) -> Result<(), RuntimeError> {
        let ip = self.ip;
        let Some(&inst) = prog.get(ip) else {
            return Ok(());
        };
        self.ip += 1;
        match inst {
            Inst::Shift(delta) => {
                self.dp = self.dp.wrapping_add_signed(delta as isize);
            }
            Inst::Inc(delta) => {
                let cell = self.cell_mut(ip)?;
                *cell = cell.wrapping_add(delta as u8);
            }
            Inst::Output => {
                let value = self.cell(ip)?;
                output.write_all(&[value]).map_err(|source| RuntimeError::Io {
                    ip,
                    dp: self.dp,
                    source,
                })?;
            }
            Inst::Input => self.read_cell(ip, input)?,
            Inst::Set(value) => {
                *self.cell_mut(ip)? = value;
            }
            Inst::Mul(offset, factor) => {
                let value = self.cell(ip)?;
                if value != 0 {
                    let addr = self.dp.wrapping_add_signed(offset as isize);
                    let err = self.out_of_bounds(ip, addr);
                    let target = self.tape.get_mut(addr).ok_or(err)?;
                    *target = target.wrapping_add(value.wrapping_mul(factor as u8));
                }
            }
            Inst::Open(target) => {
                if self.cell(ip)? == 0 {
                    self.ip = target;
                }
            }
            Inst::Close(target) => {
                if self.cell(ip)? != 0 {
                    self.ip = target;
                }
            }
        }
        Ok(())
    }

    fn read_cell<R: Read>(&mut self, ip: usize, input: &mut R) -> Result<(), RuntimeError> {
        let dp = self.dp;
        let mut buf = [0u8];
        let read = loop {
            match input.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(RuntimeError::Io { ip, dp, source }),
            }
        };
        if read == 1 {
            *self.cell_mut(ip)? = buf[0];
            return Ok(());
        }
        trace!(ip, dp, policy = ?self.eof, "input exhausted");
        match self.eof {
            Eof::Unchanged => {
                self.cell(ip)?;
            }
            Eof::Zero => *self.cell_mut(ip)? = 0,
            Eof::Fail => return Err(RuntimeError::InputExhausted { ip, dp }),
        }
        Ok(())
    }

    /// Run until the instruction pointer leaves the program. With `FLUSH`
    /// the output is flushed after every `OUT`.
    pub fn run<const FLUSH: bool, R: Read, W: Write>(
        &mut self,
        prog: &[Inst],
        input: &mut R,
        output: &mut W,
    ) -> Result<(), RuntimeError> {
        let mut steps: u64 = 0;
        while !self.is_halted(prog) {
            let ip = self.ip;
            self.step(prog, input, output)?;
            steps += 1;
            if FLUSH && prog[ip] == Inst::Output {
                output.flush().map_err(|source| RuntimeError::Io {
                    ip,
                    dp: self.dp,
                    source,
                })?;
            }
        }
        output.flush().map_err(|source| RuntimeError::Io {
            ip: self.ip,
            dp: self.dp,
            source,
        })?;
        debug!(steps, dp = self.dp, "halted");
        Ok(())
    }
}

/// Everything observable after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub output: Vec<u8>,
    pub tape: Vec<u8>,
    pub dp: usize,
}

/// Run on a fresh machine with in-memory input, collecting output and tape.
pub fn run_with_state(prog: &[Inst], input: &[u8]) -> Result<State, RuntimeError> {
    let mut machine = Machine::new();
    let mut input = input;
    let mut output = Vec::new();
    machine.run::<false, _, _>(prog, &mut input, &mut output)?;
    Ok(State {
        output,
        tape: machine.tape.as_slice().to_vec(),
        dp: machine.dp,
    })
}
