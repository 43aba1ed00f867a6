//! Output-script decoding and null-data classification.
//!
//! A null-data script is `OP_RETURN <payload> ...`. The payload is the second
//! element of the decompiled script: a small-integer opcode becomes its
//! decimal text, a data push becomes its bytes read as UTF-8.

use bitcoin::opcodes::all::{OP_PUSHNUM_1, OP_PUSHNUM_16, OP_PUSHNUM_NEG1, OP_RETURN};
use bitcoin::script::{Instruction, Script};

use crate::types::{ScriptType, TxOutput};

/// One element of a decompiled script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    /// `OP_0`, `OP_1NEGATE`, `OP_1`..`OP_16`, or a push a minimal encoder
    /// would have written as one of those.
    SmallInteger(i64),
    /// Any other data push.
    PushBytes(Vec<u8>),
    /// Any non-push opcode.
    Opcode(u8),
}

impl ScriptElement {
    fn from_push(bytes: &[u8]) -> Self {
        match bytes {
            [] => Self::SmallInteger(0),
            [n @ 1..=16] => Self::SmallInteger(i64::from(*n)),
            [0x81] => Self::SmallInteger(-1),
            _ => Self::PushBytes(bytes.to_vec()),
        }
    }

    fn from_opcode(op: u8) -> Self {
        let first = OP_PUSHNUM_1.to_u8();
        let last = OP_PUSHNUM_16.to_u8();
        if op == OP_PUSHNUM_NEG1.to_u8() {
            Self::SmallInteger(-1)
        } else if (first..=last).contains(&op) {
            Self::SmallInteger(i64::from(op - first + 1))
        } else {
            Self::Opcode(op)
        }
    }
}

/// Decompile a raw script into its elements.
///
/// Returns `None` if any push runs past the end of the script.
pub fn decompile(script: &[u8]) -> Option<Vec<ScriptElement>> {
    Script::from_bytes(script)
        .instructions()
        .map(|ins| {
            ins.map(|ins| match ins {
                Instruction::PushBytes(push) => ScriptElement::from_push(push.as_bytes()),
                Instruction::Op(op) => ScriptElement::from_opcode(op.to_u8()),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .ok()
}

/// Extract the payload text of a null-data script, if `script` is one.
pub fn null_data_payload(script: &[u8]) -> Option<String> {
    let elements = decompile(script)?;
    let marker = ScriptElement::Opcode(OP_RETURN.to_u8());
    match elements.as_slice() {
        [first, payload, ..] if *first == marker => match payload {
            ScriptElement::SmallInteger(0) => None,
            ScriptElement::SmallInteger(n) => Some(n.to_string()),
            ScriptElement::PushBytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            ScriptElement::Opcode(_) => None,
        },
        _ => None,
    }
}

/// Extract the payload of a transaction output.
///
/// Outputs the node marks `nonstandard` are skipped without decompiling.
pub fn output_payload(output: &TxOutput) -> Option<String> {
    if output.script_pub_key.kind == ScriptType::Nonstandard {
        return None;
    }
    null_data_payload(&output.script_pub_key.hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScriptPubKey;

    fn output(kind: ScriptType, hex: &[u8]) -> TxOutput {
        TxOutput {
            n: 0,
            script_pub_key: ScriptPubKey {
                kind,
                hex: hex.to_vec(),
            },
        }
    }

    #[test]
    fn text_push_is_extracted() {
        // OP_RETURN PUSH5 "hello"
        assert_eq!(null_data_payload(b"\x6a\x05hello").as_deref(), Some("hello"));
    }

    #[test]
    fn small_integer_opcode_is_stringified() {
        // OP_RETURN OP_5
        assert_eq!(null_data_payload(&[0x6a, 0x55]).as_deref(), Some("5"));
        // OP_RETURN OP_1NEGATE
        assert_eq!(null_data_payload(&[0x6a, 0x4f]).as_deref(), Some("-1"));
    }

    #[test]
    fn minimal_single_byte_push_reads_as_small_integer() {
        // OP_RETURN PUSH1 0x07
        assert_eq!(null_data_payload(&[0x6a, 0x01, 0x07]).as_deref(), Some("7"));
        // OP_RETURN PUSH1 0x81
        assert_eq!(null_data_payload(&[0x6a, 0x01, 0x81]).as_deref(), Some("-1"));
    }

    #[test]
    fn marker_alone_yields_nothing() {
        assert_eq!(null_data_payload(&[0x6a]), None);
    }

    #[test]
    fn zero_payload_yields_nothing() {
        // OP_RETURN OP_0
        assert_eq!(null_data_payload(&[0x6a, 0x00]), None);
    }

    #[test]
    fn non_marker_script_yields_nothing() {
        // OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
        let mut p2pkh = vec![0x76, 0xa9, 0x14];
        p2pkh.extend_from_slice(&[0xab; 20]);
        p2pkh.extend_from_slice(&[0x88, 0xac]);
        assert_eq!(null_data_payload(&p2pkh), None);
        assert_eq!(null_data_payload(&[]), None);
    }

    #[test]
    fn opcode_payload_yields_nothing() {
        // OP_RETURN OP_CHECKSIG
        assert_eq!(null_data_payload(&[0x6a, 0xac]), None);
    }

    #[test]
    fn truncated_push_fails_decompilation() {
        // OP_RETURN PUSH5 "hi" (3 bytes short)
        assert_eq!(decompile(b"\x6a\x05hi"), None);
        assert_eq!(null_data_payload(b"\x6a\x05hi"), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let payload = null_data_payload(&[0x6a, 0x02, 0xff, b'a']).unwrap();
        assert_eq!(payload, "\u{fffd}a");
    }

    #[test]
    fn pushdata1_payload_is_extracted() {
        let text = "x".repeat(80);
        let mut script = vec![0x6a, 0x4c, 80];
        script.extend_from_slice(text.as_bytes());
        assert_eq!(null_data_payload(&script), Some(text));
    }

    #[test]
    fn decompile_tags_elements() {
        let elements = decompile(b"\x6a\x03abc\x52\xac").unwrap();
        assert_eq!(
            elements,
            vec![
                ScriptElement::Opcode(0x6a),
                ScriptElement::PushBytes(b"abc".to_vec()),
                ScriptElement::SmallInteger(2),
                ScriptElement::Opcode(0xac),
            ]
        );
    }

    #[test]
    fn nonstandard_output_is_skipped() {
        let out = output(ScriptType::Nonstandard, b"\x6a\x05hello");
        assert_eq!(output_payload(&out), None);
        let out = output(ScriptType::NullData, b"\x6a\x05hello");
        assert_eq!(output_payload(&out).as_deref(), Some("hello"));
    }
}
