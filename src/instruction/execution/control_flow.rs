use super::operand;
use crate::error::RuntimeError;
use crate::instruction::Arity;
use crate::value::{Marker, Value};
use crate::Vm;

pub(crate) fn make_marker(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    let marker = Marker::new(vm.ip.frame, vm.ip.inst);
    let frame = &mut vm.frames[vm.ip.frame];
    frame.memory.set(address, Value::Marker(marker))
}

/// `GOTO_MARKER 0` is the one-deep "return": it jumps to `last_goto`
/// without recording a new one. Any other address must hold a `Marker`.
pub(crate) fn goto_marker(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;

    if address == 0 {
        vm.ip = vm.last_goto;
        return Ok(());
    }

    let frame = &mut vm.frames[vm.ip.frame];
    let cell = frame.memory.get(address)?;
    let target = match cell {
        Value::Marker(marker) => marker,
        _ => return Err(RuntimeError::BadMarker(address)),
    };

    vm.last_goto = vm.ip;
    vm.ip = target;
    Ok(())
}

/// Sets the frame's pending conditional-skip horizon, then pops the
/// condition; a falsy value skips the next `k` instructions.
pub(crate) fn if_run_next(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let k = operand(operands, 0)?.as_int()?;
    let frame_idx = vm.ip.frame;
    vm.frames[frame_idx].cond_target = vm.ip.inst + k;

    let condition = vm.stack.pop()?;
    if !condition.is_truthy() {
        vm.ip.inst += k;
    }
    Ok(())
}

pub(crate) fn skip_next(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let k = operand(operands, 0)?.as_int()?;
    vm.ip.inst += k;
    Ok(())
}

/// `ip.inst -= k + 1` so that the dispatch loop's subsequent auto-increment
/// lands exactly `k` instructions before the current one.
pub(crate) fn go_back(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let k = operand(operands, 0)?.as_int()?;
    vm.ip.inst -= k + 1;
    Ok(())
}

/// Pops as many values from the stack as the *next* instruction's arity
/// requires (one for `ONE_ARG`, two for `TWO_ARG`) and stashes them as the
/// frame's pending forwarded args; the decoder has already suppressed that
/// instruction's inline operand(s). An opcode outside those two classes
/// following `FORWARD_ARGS` has nothing to forward and is left alone.
pub(crate) fn forward_args(vm: &mut Vm) -> Result<(), RuntimeError> {
    let frame_idx = vm.ip.frame;
    let next = vm.ip.inst + 1;
    let Some(next_instruction) = vm.frames[frame_idx].code.get(next as usize) else {
        return Ok(());
    };

    let count = match next_instruction.opcode.arity() {
        Arity::OneArg => 1,
        Arity::TwoArg => 2,
        Arity::NoArg | Arity::MultiArg => return Ok(()),
    };

    let mut popped = Vec::with_capacity(count);
    for _ in 0..count {
        popped.push(vm.stack.pop()?);
    }
    popped.reverse();

    vm.frames[frame_idx].forwarded_args = popped;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::decode::decode, instruction::Opcode, Flags};
    use std::path::PathBuf;

    fn run(bytes: &[u8]) -> Vm {
        let code = decode(bytes).unwrap();
        let mut vm = Vm::new(PathBuf::new(), code, Flags::default());
        vm.run().unwrap();
        vm
    }

    #[test]
    fn if_run_next_skips_on_falsy_condition() {
        // PUSH_STACK 0; IF_RUN_NEXT 1; PUSH_STACK 10 (skipped); PUSH_STACK 20
        let mut vm = run(&[
            Opcode::PushStack as u8,
            0,
            Opcode::IfRunNext as u8,
            1,
            Opcode::PushStack as u8,
            10,
            Opcode::PushStack as u8,
            20,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(20));
        assert!(vm.stack.is_empty());
    }

    #[test]
    fn if_run_next_runs_next_on_truthy_condition() {
        let mut vm = run(&[
            Opcode::PushStack as u8,
            1,
            Opcode::IfRunNext as u8,
            1,
            Opcode::PushStack as u8,
            10,
            Opcode::PushStack as u8,
            20,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(20));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(10));
    }

    #[test]
    fn forward_args_supplies_one_arg_opcode_operand() {
        // PUSH_STACK 7; FORWARD_ARGS; PUSH_STACK (operand forwarded from stack)
        let mut vm = run(&[
            Opcode::PushStack as u8,
            7,
            Opcode::ForwardArgs as u8,
            Opcode::PushStack as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(7));
    }

    #[test]
    fn goto_marker_zero_returns_to_last_goto() {
        // A minimal subroutine: the caller skips over the marker's
        // declaration and body, then calls into it with GOTO_MARKER, and
        // the body returns with GOTO_MARKER 0 before falling through to the
        // caller's own next instruction.
        let mut vm = run(&[
            Opcode::SkipNext as u8,
            3,
            Opcode::MakeMarker as u8,
            1,
            Opcode::PushStack as u8,
            99,
            Opcode::GotoMarker as u8,
            0,
            Opcode::GotoMarker as u8,
            1,
            Opcode::PushStack as u8,
            42,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(42));
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(99));
    }
}
