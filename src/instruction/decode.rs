//! Byte stream -> [`Instruction`] list, and the reverse textual encoder used
//! by the CLI's `--translate` path.

use crate::error::DecodeError;
use crate::instruction::{Arity, Instruction, Opcode};

/// Decodes a program, accepting either the compiled byte form or its textual
/// binary-literal form. Selection rule: if the first whitespace-separated
/// token is exactly `00000000`, the input is textual.
pub fn decode(source: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    match first_token(source) {
        Some(token) if token == b"00000000" => decode_textual(source),
        _ => decode_bytes(source),
    }
}

fn first_token(source: &[u8]) -> Option<&[u8]> {
    source
        .split(|b| b.is_ascii_whitespace())
        .find(|token| !token.is_empty())
}

fn is_binary_literal(token: &[u8]) -> bool {
    token.len() == 8 && token.iter().all(|&b| b == b'0' || b == b'1')
}

/// Splits on whitespace, drops the leading `00000000` mode marker and any
/// token that is not exactly eight `0`/`1` characters, folding each
/// remaining token into the byte it denotes.
fn textual_literal_bytes(source: &[u8]) -> Vec<u8> {
    let mut tokens = source
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());
    tokens.next(); // the "00000000" mode marker itself

    tokens
        .filter(|token| is_binary_literal(token))
        .map(|token| token.iter().fold(0u8, |acc, &b| (acc << 1) | (b - b'0')))
        .collect()
}

fn decode_textual(source: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    decode_bytes(&textual_literal_bytes(source))
}

/// The CLI's `--translate` path: extracts the compiled byte form from a
/// textual source and validates it decodes cleanly, without needing the
/// decoded `Instruction` list itself (re-encoding from instructions would
/// lose `FORWARD_ARGS`-suppressed operand bytes).
pub fn translate_to_bytes(source: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let bytes = textual_literal_bytes(source);
    decode_bytes(&bytes)?;
    Ok(bytes)
}

fn decode_bytes(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut p = 0usize;

    while p < bytes.len() {
        let opcode = Opcode::try_from(bytes[p])?;
        let forwarded = p > 0 && bytes[p - 1] == Opcode::ForwardArgs as u8;

        match opcode.arity() {
            Arity::NoArg => instructions.push(Instruction::new(opcode, Vec::new())),
            Arity::OneArg => {
                if forwarded {
                    instructions.push(Instruction::new(opcode, Vec::new()));
                } else {
                    let operand = *bytes.get(p + 1).ok_or(DecodeError::TruncatedInstruction)?;
                    instructions.push(Instruction::new(opcode, vec![operand]));
                    p += 1;
                }
            }
            Arity::TwoArg => {
                if forwarded {
                    instructions.push(Instruction::new(opcode, Vec::new()));
                } else {
                    let a = *bytes.get(p + 1).ok_or(DecodeError::TruncatedInstruction)?;
                    let b = *bytes.get(p + 2).ok_or(DecodeError::TruncatedInstruction)?;
                    instructions.push(Instruction::new(opcode, vec![a, b]));
                    p += 2;
                }
            }
            Arity::MultiArg => {
                let mut operands = Vec::new();
                let mut q = p + 1;
                loop {
                    let byte = *bytes.get(q).ok_or(DecodeError::MissingTerminator)?;
                    if byte == 0 {
                        break;
                    }
                    operands.push(byte);
                    q += 1;
                }
                instructions.push(Instruction::new(opcode, operands));
                p = q;
            }
        }

        p += 1;
    }

    Ok(instructions)
}

/// The inverse of the textual decoder: a leading `00000000` mode marker
/// followed by one whitespace-separated 8-bit binary literal per input byte.
pub fn encode_textual(bytes: &[u8]) -> String {
    let mut out = String::from("00000000");
    for byte in bytes {
        out.push(' ');
        out.push_str(&format!("{byte:08b}"));
    }
    out
}
