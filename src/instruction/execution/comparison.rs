use super::pop_pair;
use crate::error::RuntimeError;
use crate::value::Value;
use crate::Vm;

/// Total across every `Value` variant: values of different kinds simply
/// compare unequal rather than erroring.
pub(crate) fn equals_to(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    vm.stack.push(Value::Bool(a == b));
    Ok(())
}

pub(crate) fn not_equal_to(vm: &mut Vm) -> Result<(), RuntimeError> {
    let (a, b) = pop_pair(vm)?;
    vm.stack.push(Value::Bool(a != b));
    Ok(())
}

/// Orders `Int`s numerically and `Str`s lexicographically by byte value;
/// any other pairing (including same-kind markers or file handles) is a
/// `TypeMismatch`, unlike `EQUALS_TO`/`NOT_EQUAL_TO` which are total.
fn ordering(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(RuntimeError::TypeMismatch(
            "ordering comparisons require two integers or two strings".to_string(),
        )),
    }
}

macro_rules! ordering_op {
    ($name:ident, $matches:expr) => {
        pub(crate) fn $name(vm: &mut Vm) -> Result<(), RuntimeError> {
            let (a, b) = pop_pair(vm)?;
            let order = ordering(&a, &b)?;
            vm.stack.push(Value::Bool($matches(order)));
            Ok(())
        }
    };
}

ordering_op!(less_than, |o: std::cmp::Ordering| o.is_lt());
ordering_op!(less_equal_than, |o: std::cmp::Ordering| o.is_le());
ordering_op!(greater_than, |o: std::cmp::Ordering| o.is_gt());
ordering_op!(greater_equal_than, |o: std::cmp::Ordering| o.is_ge());
