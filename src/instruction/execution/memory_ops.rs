use super::operand;
use crate::error::RuntimeError;
use crate::value::Value;
use crate::Vm;

pub(crate) fn load_memory(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    let frame = &mut vm.frames[vm.ip.frame];
    let value = frame.memory.get(address)?;
    vm.stack.push(value);
    Ok(())
}

pub(crate) fn store_memory(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    let value = vm.stack.pop()?;
    let frame = &mut vm.frames[vm.ip.frame];
    frame.memory.set(address, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::decode::decode, Flags};
    use std::path::PathBuf;

    #[test]
    fn store_then_load_restores_top_and_leaves_cell_unchanged() {
        use crate::instruction::Opcode;
        let code = decode(&[
            Opcode::PushStack as u8,
            9,
            Opcode::StoreMemory as u8,
            2,
            Opcode::LoadMemory as u8,
            2,
        ])
        .unwrap();
        let mut vm = Vm::new(PathBuf::new(), code, Flags::default());
        vm.run().unwrap();
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(9));
        assert_eq!(vm.frames[0].memory.get(2).unwrap(), Value::Int(9));
    }
}
