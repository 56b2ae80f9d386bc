use std::path::PathBuf;

use tracing::{debug, error};

pub mod error;
pub mod frame;
pub mod instruction;
pub mod memory;
pub mod stack;
pub mod value;

pub use error::{DecodeError, Error, RuntimeError};
pub use instruction::{decode::encode_textual, decode::translate_to_bytes, Instruction, Opcode};
pub use value::{FileMode, Marker, Pointer, Value};

use frame::Frame;
use instruction::{decode::decode, execution};
use stack::Stack;

/// CLI-facing configuration, analogous to the original interpreter's
/// `argparse.Namespace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub step: bool,
}

/// The whole of the VM's mutable state: every module's frame, the shared
/// operand stack, the instruction pointer, and the one-deep "last goto"
/// return slot.
#[derive(Debug)]
pub struct Vm {
    pub frames: Vec<Frame>,
    pub stack: Stack,
    pub ip: Pointer,
    pub last_goto: Pointer,
    pub flags: Flags,
}

impl Vm {
    /// Builds a VM with frame 0 holding `code`, ready to `run()`.
    /// `source_path` anchors `IMPORT_MODULE`'s relative path resolution.
    pub fn new(source_path: PathBuf, code: Vec<Instruction>, flags: Flags) -> Self {
        Self {
            frames: vec![Frame::new(source_path, code)],
            stack: Stack::new(),
            ip: Pointer::new(0, -1),
            last_goto: Pointer::new(0, 0),
            flags,
        }
    }

    /// Decodes `source` (byte or textual form) and builds a VM for it.
    pub fn from_source(source_path: PathBuf, source: &[u8], flags: Flags) -> Result<Self, Error> {
        let code = decode(source)?;
        Ok(Self::new(source_path, code, flags))
    }

    /// Runs until the current frame's code is exhausted or a fatal error
    /// occurs. Every error is fatal to the VM: there is no user-visible
    /// exception mechanism.
    pub fn run(&mut self) -> Result<(), Error> {
        self.preinitialize_markers(0)?;

        loop {
            let frame_idx = self.ip.frame;
            let instruction = match self.frames[frame_idx].fetch(&mut self.ip.inst) {
                Some(instruction) => instruction.clone(),
                None => break,
            };

            if self.ip.inst > self.frames[frame_idx].cond_target {
                self.frames[frame_idx].cond_target = -1;
            }

            let operands = self.take_operands(frame_idx, &instruction);

            if self.flags.step {
                self.trace_step(frame_idx, &instruction, &operands);
            }

            if let Err(err) = self.dispatch(&instruction, operands) {
                error!(%err, "fatal error while executing {:?}", instruction.opcode);
                return Err(err);
            }

            if self.flags.step {
                self.await_step_ack();
            }
        }

        Ok(())
    }

    /// Scans a frame's already-decoded code once, installing a `Marker` at
    /// the memory address named by the *first* static occurrence of each
    /// `MAKE_MARKER`. An occurrence whose operand was itself forwarded (and
    /// is therefore empty at decode time) is skipped: its target address
    /// isn't known until run time.
    fn preinitialize_markers(&mut self, frame_index: usize) -> Result<(), Error> {
        let Frame { code, memory, .. } = &mut self.frames[frame_index];

        for (inst, instruction) in code.iter().enumerate() {
            if instruction.opcode != Opcode::MakeMarker {
                continue;
            }
            let Some(&k) = instruction.operands.first() else {
                continue;
            };
            let address = k as usize;
            let already_marker = matches!(memory.get(address)?, Value::Marker(_));
            if !already_marker {
                memory.set(address, Value::Marker(Marker::new(frame_index, inst as i64)))?;
            }
        }

        Ok(())
    }

    /// Takes the current frame's pending forwarded args if any (clearing the
    /// slot), else wraps the instruction's own inline operand bytes as
    /// `Value::Int`s.
    fn take_operands(&mut self, frame_idx: usize, instruction: &Instruction) -> Vec<Value> {
        let frame = &mut self.frames[frame_idx];
        if !frame.forwarded_args.is_empty() {
            std::mem::take(&mut frame.forwarded_args)
        } else {
            instruction
                .operands
                .iter()
                .map(|&byte| Value::Int(byte as i64))
                .collect()
        }
    }

    fn dispatch(&mut self, instruction: &Instruction, operands: Vec<Value>) -> Result<(), Error> {
        use Opcode::*;

        match instruction.opcode {
            PopStack => execution::stack_ops::pop_stack(self)?,
            DupTop => execution::stack_ops::dup_top(self)?,
            RotTwo => execution::stack_ops::rot_two(self)?,
            RotThree => execution::stack_ops::rot_three(self)?,
            ForwardArgs => execution::control_flow::forward_args(self)?,

            BinaryAdd => execution::arithmetic::binary_add(self)?,
            Subtract => execution::arithmetic::subtract(self)?,
            Multiply => execution::arithmetic::multiply(self)?,
            Power => execution::arithmetic::power(self)?,
            TrueDivide => execution::arithmetic::true_divide(self)?,
            FloorDivide => execution::arithmetic::floor_divide(self)?,
            Modulo => execution::arithmetic::modulo(self)?,
            BitAnd => execution::arithmetic::bit_and(self)?,
            BitOr => execution::arithmetic::bit_or(self)?,
            BitXor => execution::arithmetic::bit_xor(self)?,
            BitNot => execution::arithmetic::bit_not(self)?,
            LeftShift => execution::arithmetic::left_shift(self)?,
            RightShift => execution::arithmetic::right_shift(self)?,

            EqualsTo => execution::comparison::equals_to(self)?,
            NotEqualTo => execution::comparison::not_equal_to(self)?,
            LessThan => execution::comparison::less_than(self)?,
            LessEqualThan => execution::comparison::less_equal_than(self)?,
            GreaterThan => execution::comparison::greater_than(self)?,
            GreaterEqualThan => execution::comparison::greater_equal_than(self)?,

            PushStack => execution::stack_ops::push_stack(self, &operands)?,
            PushStringStack => execution::stack_ops::push_string_stack(self, &operands)?,
            PushLongStack => execution::stack_ops::push_long_stack(self, &operands)?,

            LoadMemory => execution::memory_ops::load_memory(self, &operands)?,
            StoreMemory => execution::memory_ops::store_memory(self, &operands)?,

            ReadFrom => execution::io::read_from(self, &operands)?,
            ReadCharFrom => execution::io::read_char_from(self, &operands)?,
            WriteTo => execution::io::write_to(self, &operands)?,
            OpenFile => execution::io::open_file(self, &operands)?,

            MakeMarker => execution::control_flow::make_marker(self, &operands)?,
            GotoMarker => execution::control_flow::goto_marker(self, &operands)?,
            IfRunNext => execution::control_flow::if_run_next(self, &operands)?,
            SkipNext => execution::control_flow::skip_next(self, &operands)?,
            GoBack => execution::control_flow::go_back(self, &operands)?,

            ImportModule => execution::modules::import_module(self, &operands)?,
            PushStackModule => execution::modules::push_stack_module(self, &operands)?,
            GotoModule => execution::modules::goto_module(self, &operands)?,
        }

        Ok(())
    }

    fn trace_step(&self, frame_idx: usize, instruction: &Instruction, operands: &[Value]) {
        let frame = &self.frames[frame_idx];
        let memory = frame.memory.iter().collect::<Vec<_>>();
        let stack = self.stack.iter().collect::<Vec<_>>();
        debug!(
            opcode = ?instruction.opcode,
            operands = ?operands,
            cond_target = frame.cond_target,
            ?memory,
            ?stack,
            "step",
        );
    }

    fn await_step_ack(&self) {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        let mut line = String::new();
        let _ = stdin.lock().read_line(&mut line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instruction::Instruction;

    fn run_bytes(bytes: &[u8]) -> Vm {
        let code = decode(bytes).unwrap();
        let mut vm = Vm::new(PathBuf::new(), code, Flags::default());
        vm.run().unwrap();
        vm
    }

    #[test]
    fn push_then_pop_leaves_stack_unchanged() {
        let vm = run_bytes(&[Opcode::PushStack as u8, 5, Opcode::PopStack as u8]);
        assert!(vm.stack.is_empty());
    }

    #[test]
    fn dup_then_multiply() {
        let mut vm = run_bytes(&[
            Opcode::PushStack as u8,
            10,
            Opcode::DupTop as u8,
            Opcode::Multiply as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(100));
    }

    #[test]
    fn store_and_load_twice_then_add() {
        let mut vm = run_bytes(&[
            Opcode::PushStack as u8,
            5,
            Opcode::StoreMemory as u8,
            1,
            Opcode::LoadMemory as u8,
            1,
            Opcode::LoadMemory as u8,
            1,
            Opcode::BinaryAdd as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(10));
    }

    #[test]
    fn rot_two_swaps_top_pair() {
        let mut vm = run_bytes(&[
            Opcode::PushStack as u8,
            1,
            Opcode::PushStack as u8,
            2,
            Opcode::RotTwo as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(1));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(2));
    }

    #[test]
    fn rot_two_twice_is_a_no_op() {
        let mut vm = run_bytes(&[
            Opcode::PushStack as u8,
            1,
            Opcode::PushStack as u8,
            2,
            Opcode::RotTwo as u8,
            Opcode::RotTwo as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(2));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(1));
    }

    #[test]
    fn rot_three_three_times_is_a_no_op() {
        let mut vm = run_bytes(&[
            Opcode::PushStack as u8,
            1,
            Opcode::PushStack as u8,
            2,
            Opcode::PushStack as u8,
            3,
            Opcode::RotThree as u8,
            Opcode::RotThree as u8,
            Opcode::RotThree as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(3));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(2));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(1));
    }

    #[test]
    fn push_string_stack_decodes_as_one_value() {
        let mut vm = run_bytes(&[Opcode::PushStringStack as u8, b'h', b'i', 0]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Str(vec![b'h', b'i']));
    }

    #[test]
    fn marker_preinitialization_targets_first_occurrence() {
        // MAKE_MARKER 1 ; SKIP_NEXT 1 ; MAKE_MARKER 1
        let code = decode(&[
            Opcode::MakeMarker as u8,
            1,
            Opcode::SkipNext as u8,
            1,
            Opcode::MakeMarker as u8,
            1,
        ])
        .unwrap();
        let mut vm = Vm::new(PathBuf::new(), code, Flags::default());
        vm.run().unwrap();
        let marker = vm.frames[0].memory.get(1).unwrap();
        assert_eq!(marker, Value::Marker(Marker::new(0, 0)));
    }

    #[test]
    fn unknown_opcode_fails_before_execution() {
        let err = decode(&[254]);
        assert!(matches!(err, Err(DecodeError::UnknownOpcode(254))));
    }
}
