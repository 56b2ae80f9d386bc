//! Opcode table and the decoded [`Instruction`] it produces.

pub(crate) mod decode;
pub(crate) mod execution;

use crate::error::DecodeError;

/// The arity class an opcode belongs to. The decoder dispatches purely on
/// this partition; it is a property of the opcode alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    NoArg,
    OneArg,
    TwoArg,
    MultiArg,
}

macro_rules! opcodes {
    ($( $variant:ident = $value:literal => $arity:ident ),+ $(,)?) => {
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $( $variant = $value ),+
        }

        impl Opcode {
            pub fn arity(self) -> Arity {
                match self {
                    $( Opcode::$variant => Arity::$arity ),+
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = DecodeError;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $( $value => Ok(Opcode::$variant), )+
                    other => Err(DecodeError::UnknownOpcode(other)),
                }
            }
        }
    };
}

// Byte values are this crate's own numbering; the language never published a
// stable opcode table, only names and arities (see DESIGN.md).
opcodes! {
    PopStack           = 0  => NoArg,
    DupTop             = 1  => NoArg,
    RotTwo             = 2  => NoArg,
    RotThree           = 3  => NoArg,
    ForwardArgs        = 4  => NoArg,
    BinaryAdd          = 5  => NoArg,
    Subtract           = 6  => NoArg,
    Multiply           = 7  => NoArg,
    Power              = 8  => NoArg,
    TrueDivide         = 9  => NoArg,
    FloorDivide        = 10 => NoArg,
    Modulo             = 11 => NoArg,
    BitAnd             = 12 => NoArg,
    BitOr              = 13 => NoArg,
    BitXor             = 14 => NoArg,
    BitNot             = 15 => NoArg,
    LeftShift          = 16 => NoArg,
    RightShift         = 17 => NoArg,
    EqualsTo           = 18 => NoArg,
    NotEqualTo         = 19 => NoArg,
    LessThan           = 20 => NoArg,
    LessEqualThan      = 21 => NoArg,
    GreaterThan        = 22 => NoArg,
    GreaterEqualThan   = 23 => NoArg,

    PushStack          = 24 => OneArg,
    LoadMemory         = 25 => OneArg,
    StoreMemory        = 26 => OneArg,
    ReadFrom           = 27 => OneArg,
    ReadCharFrom       = 28 => OneArg,
    WriteTo            = 29 => OneArg,
    OpenFile           = 30 => OneArg,
    MakeMarker         = 31 => OneArg,
    GotoMarker         = 32 => OneArg,
    IfRunNext          = 33 => OneArg,
    SkipNext           = 34 => OneArg,
    GoBack             = 35 => OneArg,
    ImportModule       = 36 => OneArg,

    PushStackModule    = 37 => TwoArg,
    GotoModule         = 38 => TwoArg,

    PushStringStack    = 39 => MultiArg,
    PushLongStack      = 40 => MultiArg,
}

/// A decoded instruction: its opcode and its inline operand bytes. An
/// instruction whose arguments were forwarded from the stack (because the
/// previous instruction was `FORWARD_ARGS`) is recorded with an empty
/// operand list; the missing operand is supplied at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<u8>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<u8>) -> Self {
        Self { opcode, operands }
    }
}
