use std::path::Path;

use super::operand;
use crate::error::RuntimeError;
use crate::frame::Frame;
use crate::instruction::decode::decode;
use crate::value::{Pointer, Value};
use crate::{Flags, Vm};

/// Pops a `Str` path, resolves it relative to the current frame's source
/// directory, decodes it, and runs it to completion in a fresh, isolated
/// `Vm` (its own empty stack, unable to see the importer's frames). The
/// resulting frame's code and memory are then grafted into `vm.frames` at
/// the index named by `operands[0]`, padding with empty placeholder frames
/// if that index is beyond the current length.
pub(crate) fn import_module(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let target = operand(operands, 0)?.as_address()?;

    let path_value = vm.stack.pop()?;
    let relative = match path_value {
        Value::Str(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "IMPORT_MODULE expects a string path, found {other:?}"
            )))
        }
    };

    let base_dir = vm.frames[vm.ip.frame]
        .source_path
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let full_path = base_dir.join(relative);

    if !full_path.is_file() {
        return Err(RuntimeError::ImportNotFound(full_path));
    }

    let source = std::fs::read(&full_path)?;
    let code = decode(&source).map_err(|err| {
        RuntimeError::ImportFailed(Box::new(crate::error::Error::Decode(err)))
    })?;

    let mut nested = Vm::new(full_path, code, vm.flags);
    nested
        .run()
        .map_err(|err| RuntimeError::ImportFailed(Box::new(err)))?;

    let imported_frame = nested.frames.swap_remove(0);
    if target >= vm.frames.len() {
        vm.frames.resize_with(target + 1, Frame::empty);
    }
    vm.frames[target] = imported_frame;
    Ok(())
}

/// `PUSH_STACK_MODULE frame addr` reads `frame`'s memory without disturbing
/// the current frame, pushing the value onto the shared stack.
pub(crate) fn push_stack_module(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let frame_idx = operand(operands, 0)?.as_address()?;
    let address = operand(operands, 1)?.as_address()?;

    let frame = vm.frames.get_mut(frame_idx).ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("frame {frame_idx} does not exist"))
    })?;
    let value = frame.memory.get(address)?;
    vm.stack.push(value);
    Ok(())
}

/// `GOTO_MODULE frame addr` jumps into another frame's marker table: `addr`
/// must name a memory cell in `frame` holding a `Marker`. Like `GOTO_MARKER`,
/// the jump records `last_goto` so a `GOTO_MARKER 0` inside the target frame
/// can return to the call site.
pub(crate) fn goto_module(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let frame_idx = operand(operands, 0)?.as_address()?;
    let address = operand(operands, 1)?.as_address()?;

    let frame = vm.frames.get_mut(frame_idx).ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("frame {frame_idx} does not exist"))
    })?;
    let cell = frame.memory.get(address)?;
    let target = match cell {
        Value::Marker(marker) => marker,
        _ => return Err(RuntimeError::BadMarker(address)),
    };

    vm.last_goto = vm.ip;
    // The marker's own `frame` field is stale for any imported module: it
    // was stamped `0` by the nested VM that built it (see `import_module`),
    // never rewritten when grafted into `frames[frame_idx]`. Jump into
    // `frame_idx` itself, matching the original's explicit
    // `self.IP.frame = args[0]`.
    vm.ip = Pointer::new(frame_idx, target.inst);
    Ok(())
}
