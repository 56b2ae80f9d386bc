use std::path::PathBuf;

use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::value::Value;

/// One module's execution context: its code, its memory, its pending
/// forwarded args, and its conditional-run target.
#[derive(Debug)]
pub struct Frame {
    pub source_path: PathBuf,
    pub code: Vec<Instruction>,
    pub memory: Memory,
    pub forwarded_args: Vec<Value>,
    /// `-1` when no conditional skip region is pending, else the
    /// instruction index `IF_RUN_NEXT` set as its skip horizon.
    pub cond_target: i64,
}

impl Frame {
    pub fn new(source_path: PathBuf, code: Vec<Instruction>) -> Self {
        Self {
            source_path,
            code,
            memory: Memory::new(),
            forwarded_args: Vec::new(),
            cond_target: -1,
        }
    }

    /// An unpopulated placeholder used to pad `Vm::frames` when
    /// `IMPORT_MODULE` names a frame index beyond the current length.
    pub fn empty() -> Self {
        Self::new(PathBuf::new(), Vec::new())
    }

    /// Advances `*inst` by one and returns the instruction now pointed at,
    /// or `None` once the frame's code is exhausted.
    pub fn fetch(&self, inst: &mut i64) -> Option<&Instruction> {
        *inst += 1;
        if *inst >= 0 {
            self.code.get(*inst as usize)
        } else {
            None
        }
    }

    pub fn code_len(&self) -> i64 {
        self.code.len() as i64
    }
}
