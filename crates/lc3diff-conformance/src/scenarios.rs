#![forbid(unsafe_code)]

use lc3diff_trace::Register;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// An immutable LC-3 source program, ordered lines between the origin and
/// end directives. Written to disk as the lines joined by newlines plus a
/// trailing newline, which the external assembler requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceProgram {
    lines: Vec<String>,
}

impl SourceProgram {
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn to_source_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// A single check a scenario levies on the final register state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    /// The register must hold this exact 4-hex-digit word on both backends.
    RegisterEquals { register: Register, expected: String },
    /// Reference and candidate must agree on the register, whatever its value.
    BackendsAgree { register: Register },
}

/// A named program plus the assertions its final state must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScenario {
    pub name: String,
    pub program: SourceProgram,
    pub assertions: Vec<Assertion>,
}

/// Loads an external scenario catalogue (a JSON array of scenarios).
pub fn load_scenarios(path: &Path) -> Result<Vec<TestScenario>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid scenario json {}: {err}", path.display()))
}

/// The canonical built-in catalogue. One copy of each scenario; the programs
/// come from the original register-state test set.
#[must_use]
pub fn builtin_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario {
            name: "and_register_with_zero_zeroes_it".to_string(),
            program: SourceProgram::from_lines([
                ".ORIG x3000",
                "AND R5, R5, 0",
                "HALT",
                ".END",
            ]),
            assertions: vec![
                Assertion::RegisterEquals {
                    register: Register::R5,
                    expected: "0000".to_string(),
                },
                Assertion::BackendsAgree {
                    register: Register::R5,
                },
            ],
        },
        TestScenario {
            name: "add_one_to_zeroed_register".to_string(),
            program: SourceProgram::from_lines([
                ".ORIG x3000",
                "AND R5, R5, 0",
                "ADD R5, R5, 1",
                "HALT",
                ".END",
            ]),
            assertions: vec![
                Assertion::RegisterEquals {
                    register: Register::R5,
                    expected: "0001".to_string(),
                },
                Assertion::BackendsAgree {
                    register: Register::R5,
                },
            ],
        },
        TestScenario {
            name: "add_one_twice_gives_two".to_string(),
            program: SourceProgram::from_lines([
                ".ORIG x3000",
                "AND R5, R5, 0",
                "ADD R5, R5, 1",
                "ADD R5, R5, 1",
                "HALT",
                ".END",
            ]),
            assertions: vec![
                Assertion::RegisterEquals {
                    register: Register::R5,
                    expected: "0002".to_string(),
                },
                Assertion::BackendsAgree {
                    register: Register::R5,
                },
            ],
        },
        TestScenario {
            name: "ld_loads_literal_through_label".to_string(),
            program: SourceProgram::from_lines([
                ".ORIG x3000",
                "LD R5, LETTER_A",
                "HALT",
                "LETTER_A: .FILL 65",
                ".END",
            ]),
            assertions: vec![
                Assertion::RegisterEquals {
                    register: Register::R5,
                    expected: "0041".to_string(),
                },
                Assertion::BackendsAgree {
                    register: Register::R5,
                },
            ],
        },
        TestScenario {
            name: "not_and_composition_implements_xor".to_string(),
            program: SourceProgram::from_lines([
                ".ORIG x3000",
                "AND R1, R1, 0",
                "AND R2, R2, 0",
                "ADD R0, R0, 1",
                "ADD R1, R0, 2",
                "NOT R1,R1",
                "AND R3,R1,R2",
                "NOT R1,R1",
                "NOT R2,R2",
                "AND R4,R1,R2",
                "NOT R2,R2",
                "NOT R3,R3",
                "NOT R4,R4",
                "AND R3,R3,R4",
                "NOT R3,R3",
                "HALT",
            ]),
            assertions: vec![Assertion::RegisterEquals {
                register: Register::R3,
                expected: "0003".to_string(),
            }],
        },
    ]
}
