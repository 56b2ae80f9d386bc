use super::operand;
use crate::error::RuntimeError;
use crate::value::Value;
use crate::Vm;

pub(crate) fn pop_stack(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.stack.pop()?;
    Ok(())
}

pub(crate) fn dup_top(vm: &mut Vm) -> Result<(), RuntimeError> {
    let value = vm.stack.pop()?;
    vm.stack.push(value.clone());
    vm.stack.push(value);
    Ok(())
}

/// `…, x, y -> …, y, x`.
pub(crate) fn rot_two(vm: &mut Vm) -> Result<(), RuntimeError> {
    let y = vm.stack.pop()?;
    let x = vm.stack.pop()?;
    vm.stack.push(y);
    vm.stack.push(x);
    Ok(())
}

/// `…, x, y, z -> …, z, x, y`.
pub(crate) fn rot_three(vm: &mut Vm) -> Result<(), RuntimeError> {
    let z = vm.stack.pop()?;
    let y = vm.stack.pop()?;
    let x = vm.stack.pop()?;
    vm.stack.push(z);
    vm.stack.push(x);
    vm.stack.push(y);
    Ok(())
}

pub(crate) fn push_stack(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    vm.stack.push(operand(operands, 0)?.clone());
    Ok(())
}

/// Pushes every operand byte as a single `Str`, the string pushed by
/// `PUSH_STRING_STACK b1...bk 0`.
pub(crate) fn push_string_stack(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let bytes = operands
        .iter()
        .map(Value::as_int)
        .map(|n| n.map(|n| n as u8))
        .collect::<Result<Vec<u8>, _>>()?;
    vm.stack.push(Value::Str(bytes));
    Ok(())
}

/// Pushes the sum of every operand byte as a single `Int`, per
/// `PUSH_LONG_STACK n1...nk 0` (a wide integer encoded by decomposition, not
/// a little-endian composition).
pub(crate) fn push_long_stack(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let mut sum = 0i64;
    for value in operands {
        sum += value.as_int()?;
    }
    vm.stack.push(Value::Int(sum));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::decode::decode, Flags};
    use std::path::PathBuf;

    fn run(bytes: &[u8]) -> Vm {
        let code = decode(bytes).unwrap();
        let mut vm = Vm::new(PathBuf::new(), code, Flags::default());
        vm.run().unwrap();
        vm
    }

    #[test]
    fn push_long_stack_sums_operand_bytes() {
        use crate::instruction::Opcode;
        let mut vm = run(&[Opcode::PushLongStack as u8, 255, 255, 10, 0]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(520));
    }
}
