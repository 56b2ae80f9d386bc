use super::pop_pair;
use crate::error::RuntimeError;
use crate::value::Value;
use crate::Vm;

fn both_ints(a: &Value, b: &Value) -> Result<(i64, i64), RuntimeError> {
    Ok((a.as_int()?, b.as_int()?))
}

/// `a + b`, with one exception to the "arithmetic is integers only" rule:
/// two strings concatenate. Every other arithmetic/logic opcode is integers
/// only; see DESIGN.md for why `BINARY_ADD` alone is the exception.
pub(crate) fn binary_add(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    let result = match (&a, &b) {
        (Value::Str(lhs), Value::Str(rhs)) => {
            let mut bytes = lhs.clone();
            bytes.extend_from_slice(rhs);
            Value::Str(bytes)
        }
        _ => Value::Int(a.as_int()? + b.as_int()?),
    };
    vm.stack.push(result);
    Ok(())
}

macro_rules! int_binop {
    ($name:ident, $op:expr) => {
        pub(crate) fn $name(vm: &mut Vm) -> Result<(), RuntimeError> {
            let (a, b) = pop_pair(vm)?;
            let (a, b) = both_ints(&a, &b)?;
            vm.stack.push(Value::Int($op(a, b)?));
            Ok(())
        }
    };
}

int_binop!(subtract, |a: i64, b: i64| Ok::<_, RuntimeError>(a - b));
int_binop!(multiply, |a: i64, b: i64| Ok::<_, RuntimeError>(a * b));
int_binop!(bit_and, |a: i64, b: i64| Ok::<_, RuntimeError>(a & b));
int_binop!(bit_or, |a: i64, b: i64| Ok::<_, RuntimeError>(a | b));
int_binop!(bit_xor, |a: i64, b: i64| Ok::<_, RuntimeError>(a ^ b));
int_binop!(left_shift, |a: i64, b: i64| Ok::<_, RuntimeError>(
    a << b
));
int_binop!(right_shift, |a: i64, b: i64| Ok::<_, RuntimeError>(
    a >> b
));

pub(crate) fn power(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    let (a, b) = both_ints(&a, &b)?;
    let exponent = u32::try_from(b)
        .map_err(|_| RuntimeError::TypeMismatch(format!("negative exponent {b}")))?;
    let result = a
        .checked_pow(exponent)
        .ok_or_else(|| RuntimeError::TypeMismatch("power overflowed an i64".to_string()))?;
    vm.stack.push(Value::Int(result));
    Ok(())
}

/// Integer division truncating toward zero. There is no `Float` value in
/// this language, so unlike the reference implementation's `a / b` this
/// cannot return a fraction.
pub(crate) fn true_divide(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    let (a, b) = both_ints(&a, &b)?;
    if b == 0 {
        return Err(RuntimeError::TypeMismatch("division by zero".to_string()));
    }
    vm.stack.push(Value::Int(a / b));
    Ok(())
}

/// Floors toward negative infinity regardless of the divisor's sign, unlike
/// `i64::div_euclid` (which only agrees with floor division when `b > 0`).
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// The remainder consistent with [`floor_div`]: takes the sign of `b`, as
/// `i64::rem_euclid` does not when `b < 0`.
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

/// Integer division truncating toward negative infinity, distinct from
/// `TRUE_DIVIDE`'s truncation toward zero.
pub(crate) fn floor_divide(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    let (a, b) = both_ints(&a, &b)?;
    if b == 0 {
        return Err(RuntimeError::TypeMismatch("division by zero".to_string()));
    }
    vm.stack.push(Value::Int(floor_div(a, b)));
    Ok(())
}

pub(crate) fn modulo(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    let (a, b) = both_ints(&a, &b)?;
    if b == 0 {
        return Err(RuntimeError::TypeMismatch("division by zero".to_string()));
    }
    vm.stack.push(Value::Int(floor_mod(a, b)));
    Ok(())
}

/// Unary bitwise complement.
pub(crate) fn bit_not(vm: &mut Vm) -> Result<(), RuntimeError> {
    let a = vm.stack.pop()?.as_int()?;
    vm.stack.push(Value::Int(!a));
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
    fn add_concatenates_strings() {
        let mut vm = run(&[
            Opcode::PushStringStack as u8,
            b'h',
            b'i',
            0,
            Opcode::PushStringStack as u8,
            b'!',
            0,
            Opcode::BinaryAdd as u8,
        ]);
        assert_eq!(vm.stack.pop().unwrap(), Value::Str(b"hi!".to_vec()));
    }

    #[test]
    fn add_rejects_bool_coercion() {
        // PUSH_STACK 1; PUSH_STACK 1; EQUALS_TO -> Bool(true); + 1 is ill-typed.
        let mut vm = Vm::new(PathBuf::new(), Vec::new(), Flags::default());
        vm.stack.push(Value::Bool(true));
        vm.stack.push(Value::Int(1));
        assert!(matches!(binary_add(&mut vm), Err(RuntimeError::TypeMismatch(_))));
    }

    #[test]
    fn floor_divide_negative_rounds_down() {
        let mut vm = Vm::new(PathBuf::new(), Vec::new(), Flags::default());
        vm.stack.push(Value::Int(-7));
        vm.stack.push(Value::Int(2));
        floor_divide(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(-4));
    }

    #[test]
    fn floor_divide_negative_divisor_still_floors() {
        let mut vm = Vm::new(PathBuf::new(), Vec::new(), Flags::default());
        vm.stack.push(Value::Int(7));
        vm.stack.push(Value::Int(-2));
        floor_divide(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(-4));
    }

    #[test]
    fn modulo_takes_the_divisors_sign() {
        let mut vm = Vm::new(PathBuf::new(), Vec::new(), Flags::default());
        vm.stack.push(Value::Int(7));
        vm.stack.push(Value::Int(-2));
        modulo(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(-1));
    }

    #[test]
    fn true_divide_truncates_toward_zero() {
        let mut vm = Vm::new(PathBuf::new(), Vec::new(), Flags::default());
        vm.stack.push(Value::Int(-7));
        vm.stack.push(Value::Int(2));
        true_divide(&mut vm).unwrap();
        assert_eq!(vm.stack.pop().unwrap(), Value::Int(-3));
    }
}
