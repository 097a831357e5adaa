use std::fmt;
use std::io::{self, Write};

use tracing::debug;

use crate::error::CompileError;

/// Largest source accepted by [`compile`], in bytes.
pub const MAX_SOURCE_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Inst {
    /// Move the data pointer.
    Shift(i32),
    /// Add to the current cell, wrapping.
    Inc(i32),
    Output,
    Input,
    /// Jump to the target if the current cell is zero.
    Open(usize),
    /// Jump to the target if the current cell is non-zero.
    Close(usize),
    Set(u8),
    /// `tape[dp + offset] += factor * tape[dp]`.
    Mul(i32, i32),
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Shift(delta) => write!(f, "ADD_DP\t{delta}"),
            Inst::Inc(delta) => write!(f, "ADD_CL\t{delta}"),
            Inst::Mul(offset, factor) => write!(f, "ADD\t{offset}\t{factor}"),
            Inst::Output => write!(f, "OUT\t"),
            Inst::Input => write!(f, "IN\t"),
            Inst::Set(value) => write!(f, "STORE\t{value}"),
            Inst::Open(target) => write!(f, "BZ\t{target}"),
            Inst::Close(target) => write!(f, "BNZ\t{target}"),
        }
    }
}

/// Fold runs of identical `><+-` into single instructions. Bytes outside the
/// eight commands are comments. Branches come out with target 0.
pub fn parse(code: &[u8]) -> Vec<Inst> {
    let mut prog = Vec::new();
    let mut iter = code.iter().copied().peekable();
    while let Some(ch) = iter.next() {
        let inst = match ch {
            b'>' | b'<' | b'+' | b'-' => {
                let mut run: i32 = 1;
                while iter.next_if_eq(&ch).is_some() {
                    run += 1;
                }
                match ch {
                    b'>' => Inst::Shift(run),
                    b'<' => Inst::Shift(-run),
                    b'+' => Inst::Inc(run),
                    _ => Inst::Inc(-run),
                }
            }
            b'.' => Inst::Output,
            b',' => Inst::Input,
            b'[' => Inst::Open(0),
            b']' => Inst::Close(0),
            _ => continue,
        };
        prog.push(inst);
    }
    prog
}

// Any odd step walks every residue mod 256 and hits zero. Even steps only get
// there from a start value divisible by their power-of-two factor, otherwise
// the loop never ends; they are collapsed anyway.
fn clears_cell(step: i32) -> bool {
    step != 0
}

/// Single left-to-right peephole pass. Replacements are pushed to a fresh
/// sequence and never rescanned.
///
/// * `[` `Inc(d)` `]` becomes `Set(0)`.
/// * `[` `Inc(-1)` `Shift(o)` `Inc(f)` `Shift(-o)` `]` becomes
///   `Mul(o, f)` `Set(0)`.
pub fn optimize(prog: Vec<Inst>) -> Vec<Inst> {
    let mut optimized = Vec::with_capacity(prog.len());
    let mut clears = 0usize;
    let mut muls = 0usize;
    let mut idx = 0;
    while idx < prog.len() {
        match &prog[idx..] {
            [Inst::Open(_), Inst::Inc(step), Inst::Close(_), ..] if clears_cell(*step) => {
                optimized.push(Inst::Set(0));
                clears += 1;
                idx += 3;
            }
            [
                Inst::Open(_),
                Inst::Inc(-1),
                Inst::Shift(out),
                Inst::Inc(factor),
                Inst::Shift(back),
                Inst::Close(_),
                ..,
            ] if *out != 0 && *out == -*back => {
                optimized.push(Inst::Mul(*out, *factor));
                optimized.push(Inst::Set(0));
                muls += 1;
                idx += 6;
            }
            [inst, ..] => {
                optimized.push(*inst);
                idx += 1;
            }
            [] => break,
        }
    }
    debug!(
        before = prog.len(),
        after = optimized.len(),
        clears,
        muls,
        "optimized"
    );
    optimized
}

/// Point every branch at the instruction following its partner.
pub fn resolve(mut prog: Vec<Inst>) -> Result<Vec<Inst>, CompileError> {
    let mut stack = Vec::new();
    for idx in 0..prog.len() {
        match prog[idx] {
            Inst::Open(_) => stack.push(idx),
            Inst::Close(_) => {
                let open = stack
                    .pop()
                    .ok_or(CompileError::UnbalancedLoop { at: idx, bracket: ']' })?;
                prog[open] = Inst::Open(idx + 1);
                prog[idx] = Inst::Close(open + 1);
            }
            _ => {}
        }
    }
    if let Some(&open) = stack.first() {
        return Err(CompileError::UnbalancedLoop { at: open, bracket: '[' });
    }
    Ok(prog)
}

pub fn check_source(code: &[u8]) -> Result<(), CompileError> {
    if code.is_empty() {
        return Err(CompileError::EmptySource);
    }
    if code.len() > MAX_SOURCE_LEN {
        return Err(CompileError::SourceTooLarge {
            len: code.len(),
            limit: MAX_SOURCE_LEN,
        });
    }
    Ok(())
}

pub fn compile(code: &[u8]) -> Result<Vec<Inst>, CompileError> {
    check_source(code)?;
    let prog = parse(code);
    debug!(bytes = code.len(), instructions = prog.len(), "parsed");
    let prog = resolve(optimize(prog))?;
    debug!(instructions = prog.len(), "resolved");
    Ok(prog)
}

/// Same as [`compile`] without the peephole pass.
pub fn compile_unoptimized(code: &[u8]) -> Result<Vec<Inst>, CompileError> {
    check_source(code)?;
    let prog = parse(code);
    debug!(bytes = code.len(), instructions = prog.len(), "parsed");
    resolve(prog)
}

/// Write one line per instruction.
pub fn dump<W: Write>(prog: &[Inst], out: &mut W) -> io::Result<()> {
    for inst in prog {
        writeln!(out, "{inst}")?;
    }
    Ok(())
}
