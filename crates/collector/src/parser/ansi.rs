//! ANSI escape stripping.
//!
//! Applications with colored terminal output leave CSI sequences in the
//! container's log stream. The display-affecting ones (`ESC [` params,
//! final byte in `m G K H F`) are removed before timestamp matching and
//! level classification; anything else passes through untouched.

use std::borrow::Cow;

const ESC: u8 = 0x1b;

/// Strip recognized CSI sequences from a line.
///
/// Returns `Cow::Borrowed` when nothing had to be removed (zero
/// allocation for clean logs), `Cow::Owned` otherwise.
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    // Quick scan: no ESC byte, no work.
    if !input.bytes().any(|b| b == ESC) {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == ESC && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            // Parameter bytes are 0x30-0x3F (digits, ';', ':', ...).
            let mut j = i + 2;
            while j < bytes.len() && (0x30..=0x3f).contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && matches!(bytes[j], b'm' | b'G' | b'K' | b'H' | b'F') {
                // ESC and the final byte are ASCII, so these offsets are
                // valid char boundaries.
                out.push_str(&input[copied..i]);
                i = j + 1;
                copied = i;
                continue;
            }
        }
        i += 1;
    }

    if copied == 0 {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[copied..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        let input = "no escapes here";
        match strip_ansi(input) {
            Cow::Borrowed(s) => assert_eq!(s, input),
            Cow::Owned(_) => panic!("should not have allocated"),
        }
    }

    #[test]
    fn test_strip_color_codes() {
        let input = "\x1b[32mINFO\x1b[0m message";
        assert_eq!(strip_ansi(input).as_ref(), "INFO message");
    }

    #[test]
    fn test_strip_cursor_and_erase_finals() {
        let input = "\x1b[2Kcleared \x1b[1;1Hhome \x1b[4Gcol";
        assert_eq!(strip_ansi(input).as_ref(), "cleared home col");
    }

    #[test]
    fn test_unrecognized_final_passes_through() {
        // 'J' is not in the stripped set; the sequence stays.
        let input = "\x1b[2Jkept";
        assert_eq!(strip_ansi(input).as_ref(), input);
    }

    #[test]
    fn test_lone_escape_passes_through() {
        let input = "tail\x1b";
        assert_eq!(strip_ansi(input).as_ref(), input);
    }

    #[test]
    fn test_only_escapes_yield_empty() {
        let input = "\x1b[0m\x1b[32m\x1b[1m";
        assert_eq!(strip_ansi(input).as_ref(), "");
    }

    #[test]
    fn test_tracing_style_line() {
        let input = "\x1b[2m2026-01-30T03:18:50.827498Z\x1b[0m \x1b[32m INFO\x1b[0m starting";
        assert_eq!(
            strip_ansi(input).as_ref(),
            "2026-01-30T03:18:50.827498Z  INFO starting"
        );
    }

    #[test]
    fn test_multibyte_text_around_escapes() {
        let input = "→ \x1b[31m赤\x1b[0m ←";
        assert_eq!(strip_ansi(input).as_ref(), "→ 赤 ←");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(strip_ansi("").as_ref(), "");
    }
}
