use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::rc::Rc;

use super::operand;
use crate::error::RuntimeError;
use crate::value::{FileMode, Value};
use crate::Vm;

/// Reads bytes from `reader` up to (but excluding) the terminator byte `t`,
/// or up to EOF if `t` never appears — the fix for the reference
/// implementation's read loop, which (per its apparently inverted condition)
/// would stop on the first non-empty byte instead of running to EOF.
fn read_until_terminator_or_eof(reader: &mut impl Read, terminator: u8) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte)? {
            0 => break,
            _ if byte[0] == terminator => break,
            _ => bytes.push(byte[0]),
        }
    }
    Ok(bytes)
}

fn read_one_byte(reader: &mut impl Read) -> std::io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

/// Address 0 names the real stdin/stdout stream; any other address must name
/// a memory cell holding an open `File`.
fn file_at(vm: &mut Vm, address: usize) -> Result<Rc<RefCell<File>>, RuntimeError> {
    let frame = &mut vm.frames[vm.ip.frame];
    let cell = frame.memory.get(address)?;
    match cell {
        Value::File(handle, _) => Ok(handle),
        _ => Err(RuntimeError::BadFileHandle(address)),
    }
}

/// Pops the terminator byte `t`, then reads (terminator-or-EOF, per
/// `read_until_terminator_or_eof`) from stdin or the file named by
/// `operands[0]`, pushing the result as a `Str`. An empty `Str` signals EOF
/// with no data read.
pub(crate) fn read_from(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    let terminator = vm.stack.pop()?.as_int()? as u8;
    let bytes = if address == 0 {
        read_until_terminator_or_eof(&mut std::io::stdin().lock(), terminator)?
    } else {
        let handle = file_at(vm, address)?;
        read_until_terminator_or_eof(&mut *handle.borrow_mut(), terminator)?
    };
    vm.stack.push(Value::Str(bytes));
    Ok(())
}

/// Reads a single byte from stdin or the file named by `operands[0]`. Per
/// the instruction table's asymmetry: stdin (`a == 0`) pushes the raw byte
/// as an `Int`; a file pushes a one-byte `Str`. EOF on stdin pushes `Int(-1)`;
/// EOF on a file pushes an empty `Str`.
pub(crate) fn read_char_from(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    if address == 0 {
        let byte = read_one_byte(&mut std::io::stdin().lock())?;
        vm.stack.push(Value::Int(byte.map_or(-1, i64::from)));
    } else {
        let handle = file_at(vm, address)?;
        let byte = read_one_byte(&mut *handle.borrow_mut())?;
        let value = match byte {
            Some(byte) => Value::Str(vec![byte]),
            None => Value::Str(Vec::new()),
        };
        vm.stack.push(value);
    }
    Ok(())
}

/// Pops the top of the stack and writes its byte form to stdout or the file
/// named by `operands[0]`.
pub(crate) fn write_to(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let address = operand(operands, 0)?.as_address()?;
    let bytes = vm.stack.pop()?.write_bytes()?;

    if address == 0 {
        std::io::stdout().write_all(&bytes)?;
        std::io::stdout().flush()?;
    } else {
        let handle = file_at(vm, address)?;
        handle.borrow_mut().write_all(&bytes)?;
    }
    Ok(())
}

/// Pops a `Str` path from the stack, opens it in the mode named by
/// `operands[0]`, and pushes the resulting `File` handle. The caller is
/// expected to immediately `STORE_MEMORY` it, which is what gives the handle
/// a lifetime beyond this one dispatch.
pub(crate) fn open_file(vm: &mut Vm, operands: &[Value]) -> Result<(), RuntimeError> {
    let mode = FileMode::try_new(operand(operands, 0)?.as_int()? as u8)?;
    let path = vm.stack.pop()?;
    let path = match path {
        Value::Str(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "OPEN_FILE expects a string path, found {other:?}"
            )))
        }
    };
    let file = mode.open_options().open(path)?;
    vm.stack
        .push(Value::File(Rc::new(RefCell::new(file)), mode));
    Ok(())
}
