//! Typed argument rendering.

use crate::arch::WORD_SIZE;
use crate::memory::{Memory, slot_addr};
use crate::symbols::{ArgSpec, ArgType, FuncSpec};

/// Longest string rendered before truncation.
pub const MAX_STRING_LEN: usize = 25;

/// Most string-array elements rendered.
pub const MAX_ARRAY_LEN: usize = 3;

/// Render `f`'s arguments as they sit in the frame based at `frame_base`.
///
/// Declaration order, comma-joined, the literal `void` for an empty list.
/// Never fails: a refused read degrades to a fallback rendering for that
/// argument, and nothing outside the returned string is touched.
pub fn format_args(f: &FuncSpec, frame_base: usize, mem: &dyn Memory) -> String {
    if f.args.is_empty() {
        return "void".to_string();
    }
    let rendered: Vec<String> = f
        .args
        .iter()
        .map(|arg| render_arg(arg, frame_base, mem))
        .collect();
    rendered.join(", ")
}

fn render_arg(arg: &ArgSpec, frame_base: usize, mem: &dyn Memory) -> String {
    let slot = slot_addr(frame_base, arg.offset);
    match arg.ty {
        ArgType::Char => match mem.read_byte(slot) {
            Some(b) if is_print(b) => format!("char {}='{}'", arg.name, b as char),
            Some(b) => format!("char {}='\\{:o}'", arg.name, b),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::Int => match mem.read_i32(slot) {
            Some(v) => format!("int {}={}", arg.name, v),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::Float => match mem.read_f32(slot) {
            Some(v) => format!("float {}={}", arg.name, v),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::Double => match mem.read_f64(slot) {
            Some(v) => format!("double {}={}", arg.name, v),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::String => match mem.read_word(slot) {
            Some(ptr) => format!("char *{}={}", arg.name, string_repr(ptr, mem)),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::StringArray => match mem.read_word(slot) {
            Some(base) => format!("char **{}={}", arg.name, array_repr(base, mem)),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::OpaquePointer => match mem.read_word(slot) {
            Some(v) => format!("void *{}=0v{:x}", arg.name, v),
            None => unknown_repr(&arg.name, slot),
        },
        ArgType::Unknown => unknown_repr(&arg.name, slot),
    }
}

// An argument that cannot be interpreted is shown as its own slot address,
// never as its pointed-to content.
fn unknown_repr(name: &str, slot: usize) -> String {
    format!("UNKNOWN {name}={slot:#x}")
}

/// Quoted string at `ptr`, truncated to [`MAX_STRING_LEN`] with a `...`
/// marker; the raw pointer value when `ptr` is null or any byte before the
/// terminator is unreadable or unprintable.
fn string_repr(ptr: usize, mem: &dyn Memory) -> String {
    match read_printable_string(ptr, mem) {
        Some(bytes) => {
            let shown: String = bytes
                .iter()
                .take(MAX_STRING_LEN)
                .map(|&b| b as char)
                .collect();
            if bytes.len() > MAX_STRING_LEN {
                format!("\"{shown}...\"")
            } else {
                format!("\"{shown}\"")
            }
        }
        None => format!("{ptr:#x}"),
    }
}

// Collects the NUL-terminated bytes at `ptr`. The scan itself is what
// validates the string: every byte goes through the memory view before it is
// trusted.
fn read_printable_string(ptr: usize, mem: &dyn Memory) -> Option<Vec<u8>> {
    if ptr == 0 {
        return None;
    }
    let mut bytes = Vec::new();
    loop {
        let b = mem.read_byte(ptr.wrapping_add(bytes.len()))?;
        if b == 0 {
            return Some(bytes);
        }
        if !is_print(b) {
            return None;
        }
        bytes.push(b);
    }
}

/// Brace-wrapped list of the strings in the array at `base`, capped at
/// [`MAX_ARRAY_LEN`] elements with a `, ...` marker when more follow.
fn array_repr(base: usize, mem: &dyn Memory) -> String {
    if base == 0 {
        return "0x0".to_string();
    }
    let mut out = String::from("{");
    let mut i = 0;
    loop {
        // an unreadable slot ends the list like the null terminator would
        let elem = mem.read_word(base.wrapping_add(i * WORD_SIZE)).unwrap_or(0);
        if elem == 0 {
            break;
        }
        if i >= MAX_ARRAY_LEN {
            out.push_str(", ...");
            break;
        }
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&string_repr(elem, mem));
        i += 1;
    }
    out.push('}');
    out
}

fn is_print(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}
