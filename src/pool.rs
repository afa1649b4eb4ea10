//! Constant-pool decoding for compiled Java class files.
//!
//! Only the constant pool is walked. Every entry kind except `Utf8` is
//! skipped by its fixed width; `Class` entries additionally record the index
//! of the `Utf8` entry holding their name. Names are resolved after the whole
//! pool has been scanned, because a `Class` entry may point forward.

use thiserror::Error;

/// Offset of the `constant_pool_count` field (after magic, minor, major).
const POOL_COUNT_OFFSET: usize = 8;
/// Offset of the first constant-pool entry.
const POOL_START: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("class file truncated")]
    Truncated,
    #[error("unknown constant pool tag {0}")]
    UnknownTag(u8),
    #[error("class entry points to missing utf8 entry #{0}")]
    DanglingReference(u16),
    #[error("class name in utf8 entry #{0} is not valid UTF-8")]
    InvalidUtf8(u16),
}

/// Constant-pool entry kinds recognised by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
}

impl ConstantKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            1 => Self::Utf8,
            3 => Self::Integer,
            4 => Self::Float,
            5 => Self::Long,
            6 => Self::Double,
            7 => Self::Class,
            8 => Self::String,
            9 => Self::FieldRef,
            10 => Self::MethodRef,
            11 => Self::InterfaceMethodRef,
            12 => Self::NameAndType,
            15 => Self::MethodHandle,
            16 => Self::MethodType,
            17 => Self::Dynamic,
            18 => Self::InvokeDynamic,
            19 => Self::Module,
            20 => Self::Package,
            _ => return None,
        };
        Some(kind)
    }

    /// Payload width in bytes, excluding the tag. `None` for `Utf8`, whose
    /// payload is length-prefixed.
    pub fn payload_width(self) -> Option<usize> {
        match self {
            Self::Utf8 => None,
            Self::Integer | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            Self::Class | Self::String | Self::MethodType | Self::Module | Self::Package => Some(2),
            Self::FieldRef
            | Self::MethodRef
            | Self::InterfaceMethodRef
            | Self::NameAndType
            | Self::Dynamic
            | Self::InvokeDynamic => Some(4),
            Self::MethodHandle => Some(3),
        }
    }

    /// Number of pool index slots the entry occupies.
    pub fn slots(self) -> u16 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }
}

/// Returns the internal names of all `Class` constant-pool entries, in pool
/// order, duplicates included.
pub fn decode_class_refs(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
    if bytes.len() < POOL_START {
        return Err(DecodeError::Truncated);
    }

    let count = read_u16(bytes, POOL_COUNT_OFFSET)?;
    let mut utf8: Vec<Option<&[u8]>> = vec![None; usize::from(count)];
    let mut pending: Vec<u16> = Vec::new();

    let mut index: u16 = 1;
    let mut pos = POOL_START;
    while index < count {
        let tag = *bytes.get(pos).ok_or(DecodeError::Truncated)?;
        let kind = ConstantKind::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;

        match kind.payload_width() {
            None => {
                let len = usize::from(read_u16(bytes, pos + 1)?);
                let start = pos + 3;
                let payload = bytes
                    .get(start..start + len)
                    .ok_or(DecodeError::Truncated)?;
                utf8[usize::from(index)] = Some(payload);
                pos = start + len;
            }
            Some(width) => {
                if pos + 1 + width > bytes.len() {
                    return Err(DecodeError::Truncated);
                }
                if kind == ConstantKind::Class {
                    pending.push(read_u16(bytes, pos + 1)?);
                }
                pos += 1 + width;
            }
        }

        index = index.saturating_add(kind.slots());
    }

    pending
        .into_iter()
        .map(|name_index| {
            let raw = utf8
                .get(usize::from(name_index))
                .copied()
                .flatten()
                .ok_or(DecodeError::DanglingReference(name_index))?;
            std::str::from_utf8(raw)
                .map(str::to_string)
                .map_err(|_| DecodeError::InvalidUtf8(name_index))
        })
        .collect()
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, DecodeError> {
    match bytes.get(at..at + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(DecodeError::Truncated),
    }
}
