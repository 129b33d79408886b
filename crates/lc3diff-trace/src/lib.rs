#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Banner both simulators print immediately before the final register dump.
/// Everything before (and including) its last occurrence is free-form step
/// log and must never be mistaken for the dump itself.
pub const HALT_BANNER: &str = "--- halting the LC-3 ---";

/// The eight LC-3 general-purpose registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 8 { Some(Self::ALL[index]) } else { None }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceParseError {
    /// The halt banner never appeared, so there is no final-state region.
    BannerMissing,
    /// Banner present, but no register dump followed it.
    DumpMissing,
    /// A dump-shaped line was found but violated the grammar.
    DumpMalformed(&'static str),
}

impl TraceParseError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::BannerMissing => "trace_banner_missing",
            Self::DumpMissing => "trace_dump_missing",
            Self::DumpMalformed(_) => "trace_dump_malformed",
        }
    }
}

impl fmt::Display for TraceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BannerMissing => write!(f, "halt banner '{HALT_BANNER}' not found in trace"),
            Self::DumpMissing => write!(f, "no register dump found after the halt banner"),
            Self::DumpMalformed(detail) => write!(f, "register dump malformed: {detail}"),
        }
    }
}

impl std::error::Error for TraceParseError {}

/// Final values of R0..R7 after a program halts. Always complete: parsing
/// either yields all eight 4-hex-digit words or fails, never a partial
/// snapshot. Words are normalized to lowercase hex so simulators that print
/// `%04X` and `%04x` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    words: [String; 8],
}

impl RegisterSnapshot {
    /// Builds a snapshot from eight raw words, validating and normalizing
    /// each. Used by the parser and by harness tests that fabricate states.
    pub fn from_words(raw: [&str; 8]) -> Result<Self, TraceParseError> {
        let mut words: [String; 8] = Default::default();
        for (slot, word) in words.iter_mut().zip(raw) {
            *slot = normalize_hex_word(word)
                .ok_or(TraceParseError::DumpMalformed("register value is not 4 hex digits"))?;
        }
        Ok(Self { words })
    }

    #[must_use]
    pub fn get(&self, register: Register) -> &str {
        &self.words[register.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, &str)> {
        Register::ALL
            .iter()
            .map(|register| (*register, self.words[register.index()].as_str()))
    }
}

impl fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (register, word)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{register}=x{word}")?;
        }
        Ok(())
    }
}

/// Validates a 4-hex-digit register word, returning its lowercase form.
#[must_use]
pub fn normalize_hex_word(raw: &str) -> Option<String> {
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(raw.to_ascii_lowercase())
    } else {
        None
    }
}

/// Extracts the final register state from a raw simulator trace.
///
/// The region after the LAST halt banner occurrence is scanned line by line
/// for the strict grammar `R0=x<4hex> R1=x<4hex> ... R7=x<4hex>`; leading and
/// trailing noise on the matching line is tolerated, everything between the
/// fields is not. Total: every malformed input maps to a `TraceParseError`.
pub fn parse_trace(raw: &str) -> Result<RegisterSnapshot, TraceParseError> {
    let banner_at = raw.rfind(HALT_BANNER).ok_or(TraceParseError::BannerMissing)?;
    let tail = &raw[banner_at + HALT_BANNER.len()..];

    let mut last_malformed = None;
    for line in tail.lines() {
        let mut search_from = 0;
        while let Some(offset) = line[search_from..].find("R0=x") {
            let start = search_from + offset;
            match match_dump(&line[start..]) {
                Ok(words) => return Ok(RegisterSnapshot { words }),
                Err(detail) => last_malformed = Some(detail),
            }
            search_from = start + 1;
        }
    }

    match last_malformed {
        Some(detail) => Err(TraceParseError::DumpMalformed(detail)),
        None => Err(TraceParseError::DumpMissing),
    }
}

/// Matches the dump grammar at the start of `candidate`, returning the eight
/// normalized words on success.
fn match_dump(candidate: &str) -> Result<[String; 8], &'static str> {
    let bytes = candidate.as_bytes();
    let mut at = 0usize;
    let mut words: [String; 8] = Default::default();

    for (i, slot) in words.iter_mut().enumerate() {
        if i > 0 {
            if bytes.get(at) != Some(&b' ') {
                return Err("expected a single space between register fields");
            }
            at += 1;
        }
        let tag = [b'R', b'0' + i as u8, b'=', b'x'];
        if bytes.len() < at + 4 || bytes[at..at + 4] != tag {
            return Err("register fields missing or out of order");
        }
        at += 4;
        if bytes.len() < at + 4 {
            return Err("register value truncated");
        }
        // Bytewise: `at + 4` is not guaranteed to be a char boundary when
        // multi-byte log text follows the tag.
        let word = &bytes[at..at + 4];
        if !word.iter().all(|b| b.is_ascii_hexdigit()) {
            return Err("register value is not 4 hex digits");
        }
        *slot = word.iter().map(|b| b.to_ascii_lowercase() as char).collect();
        at += 4;
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::{HALT_BANNER, Register, RegisterSnapshot, TraceParseError, parse_trace};
    use proptest::prelude::*;

    fn dump_line(words: [&str; 8]) -> String {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| format!("R{i}=x{w}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn parses_dump_after_banner() {
        let trace = format!(
            "x3000: 0x5B60 AND R5, R5, #0\nx3001: 0xF025 TRAP HALT\n{HALT_BANNER}\nPC=x048f\n{} \n",
            dump_line(["0000", "0001", "0002", "0003", "0004", "0005", "fd00", "048f"])
        );
        let snapshot = parse_trace(&trace).expect("trace should parse");
        assert_eq!(snapshot.get(Register::R0), "0000");
        assert_eq!(snapshot.get(Register::R5), "0005");
        assert_eq!(snapshot.get(Register::R7), "048f");
    }

    #[test]
    fn uses_region_after_last_banner() {
        let stale = dump_line(["dead", "dead", "dead", "dead", "dead", "dead", "dead", "dead"]);
        let fresh = dump_line(["0000", "0000", "0000", "0000", "0000", "0002", "0000", "0000"]);
        let trace = format!("{HALT_BANNER}\n{stale}\nrestarting\n{HALT_BANNER}\n{fresh}\n");
        let snapshot = parse_trace(&trace).expect("trace should parse");
        assert_eq!(snapshot.get(Register::R0), "0000");
        assert_eq!(snapshot.get(Register::R5), "0002");
    }

    #[test]
    fn normalizes_uppercase_hex() {
        let trace = format!(
            "{HALT_BANNER}\n{}\n",
            dump_line(["00FF", "0000", "0000", "0000", "0000", "0000", "FD00", "04AF"])
        );
        let snapshot = parse_trace(&trace).expect("trace should parse");
        assert_eq!(snapshot.get(Register::R0), "00ff");
        assert_eq!(snapshot.get(Register::R6), "fd00");
    }

    #[test]
    fn missing_banner_is_reported() {
        let trace = format!("running\n{}\n", dump_line(["0000"; 8]));
        assert_eq!(parse_trace(&trace), Err(TraceParseError::BannerMissing));
    }

    #[test]
    fn banner_without_dump_is_reported() {
        let trace = format!("{HALT_BANNER}\nsegmentation fault\n");
        assert_eq!(parse_trace(&trace), Err(TraceParseError::DumpMissing));
    }

    #[test]
    fn empty_remainder_is_reported() {
        assert_eq!(
            parse_trace(&format!("noise\n{HALT_BANNER}")),
            Err(TraceParseError::DumpMissing)
        );
    }

    #[test]
    fn out_of_order_fields_are_rejected() {
        let trace = format!("{HALT_BANNER}\nR0=x0000 R2=x0000 R1=x0000\n");
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn short_register_value_is_rejected() {
        let trace = format!(
            "{HALT_BANNER}\nR0=x000 R1=x0000 R2=x0000 R3=x0000 R4=x0000 R5=x0000 R6=x0000 R7=x0000\n"
        );
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn non_hex_value_is_rejected() {
        let trace = format!(
            "{HALT_BANNER}\nR0=xzzzz R1=x0000 R2=x0000 R3=x0000 R4=x0000 R5=x0000 R6=x0000 R7=x0000\n"
        );
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn multibyte_text_inside_a_register_value_is_rejected() {
        // 'é' straddles the 4-byte value window after `R0=x`.
        let trace = format!("{HALT_BANNER}\nR0=xabc\u{e9}x\n");
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn multibyte_text_between_fields_is_rejected() {
        let trace = format!(
            "{HALT_BANNER}\nR0=x0000\u{3bb}R1=x0000 R2=x0000 R3=x0000 R4=x0000 R5=x0000 R6=x0000 R7=x0000\n"
        );
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn truncated_dump_is_rejected() {
        let trace = format!("{HALT_BANNER}\nR0=x0000 R1=x0000 R2=x0000\n");
        assert!(matches!(
            parse_trace(&trace),
            Err(TraceParseError::DumpMalformed(_))
        ));
    }

    #[test]
    fn dump_with_leading_noise_on_line_still_matches() {
        let trace = format!(
            "{HALT_BANNER}\nPC=x048f IR=xf025 {}\n",
            dump_line(["0041", "0000", "0000", "0000", "0000", "0000", "0000", "0000"])
        );
        let snapshot = parse_trace(&trace).expect("trace should parse");
        assert_eq!(snapshot.get(Register::R0), "0041");
    }

    #[test]
    fn from_words_rejects_bad_width() {
        assert!(RegisterSnapshot::from_words([
            "0000", "0000", "0000", "0000", "0000", "0000", "0000", "00000"
        ])
        .is_err());
    }

    #[test]
    fn snapshot_display_round_trips_through_parser() {
        let snapshot = RegisterSnapshot::from_words([
            "0000", "0001", "0002", "0003", "0004", "0005", "fd00", "048f",
        ])
        .expect("valid words");
        let trace = format!("{HALT_BANNER}\n{snapshot}\n");
        assert_eq!(parse_trace(&trace).expect("round trip"), snapshot);
    }

    #[test]
    fn register_lookup_by_index() {
        assert_eq!(Register::from_index(5), Some(Register::R5));
        assert_eq!(Register::from_index(8), None);
        assert_eq!(Register::R3.name(), "R3");
    }

    proptest! {
        #[test]
        fn parses_every_register_word(values in proptest::array::uniform8(proptest::num::u16::ANY)) {
            let dump = values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("R{i}=x{v:04x}"))
                .collect::<Vec<_>>()
                .join(" ");
            let trace = format!("step 1\nstep 2\n{HALT_BANNER}\n{dump} \n");
            let snapshot = parse_trace(&trace).expect("generated dump should parse");
            for (i, value) in values.iter().enumerate() {
                let register = Register::from_index(i).expect("index in range");
                let want = format!("{value:04x}");
                prop_assert_eq!(snapshot.get(register), want.as_str());
            }
        }

        #[test]
        fn arbitrary_text_without_banner_never_parses(raw in "[ -~\n\u{e9}\u{3bb}\u{1f600}]{0,200}") {
            prop_assume!(!raw.contains(HALT_BANNER));
            prop_assert_eq!(parse_trace(&raw), Err(TraceParseError::BannerMissing));
        }

        #[test]
        fn arbitrary_tail_after_banner_is_reported_not_a_panic(
            tail in "[ -~\n\u{e9}\u{3bb}\u{1f600}]{0,120}",
        ) {
            let trace = format!("{HALT_BANNER}\n{tail}");
            let _ = parse_trace(&trace);
        }
    }
}
