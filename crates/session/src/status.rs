//! Printer status decoding.
//!
//! Turns the vendor status bytes into a [`PrinterStatus`]. Only the first
//! byte is inspected:
//!
//! | Bit  | Mask   | Meaning     |
//! |------|--------|-------------|
//! | 2    | `0x04` | paper out   |
//! | 3    | `0x08` | not ready   |
//! | 5    | `0x20` | cover open  |

use std::fmt;

/// Bit 2 of the first status byte.
const PAPER_OUT: u8 = 0x04;
/// Bit 3 of the first status byte.
const NOT_READY: u8 = 0x08;
/// Bit 5 of the first status byte.
const COVER_OPEN: u8 = 0x20;

/// Paper/media state derived from the status bits.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaperState {
    /// Media present, cover closed.
    Ok,
    /// Paper out (takes precedence over cover open).
    Out,
    /// Cover open.
    CoverOpen,
    /// Connected, but the printer returned no status bytes.
    Unknown,
    /// Session not connected; no status was read.
    Disconnected,
}

impl fmt::Display for PaperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperState::Ok => write!(f, "ok"),
            PaperState::Out => write!(f, "out"),
            PaperState::CoverOpen => write!(f, "cover_open"),
            PaperState::Unknown => write!(f, "unknown"),
            PaperState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Decoded health report. Recomputed on every query, never mutated.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrinterStatus {
    /// Session connection flag at the time of the query.
    pub connected: bool,
    /// Bit 3 clear. Independent of paper and cover state.
    pub ready: bool,
    /// Bit 2 set.
    pub paper_out: bool,
    /// Bit 5 set.
    pub cover_open: bool,
    /// Summary state: out > cover open > ok.
    pub paper_state: PaperState,
}

impl PrinterStatus {
    /// Decode a status response.
    ///
    /// `connected == false` short-circuits to `Disconnected` without looking
    /// at `bytes`; an empty response yields `Unknown`.
    pub fn decode(connected: bool, bytes: &[u8]) -> PrinterStatus {
        if !connected {
            return PrinterStatus::disconnected();
        }

        let Some(&general) = bytes.first() else {
            return PrinterStatus {
                connected: true,
                ready: false,
                paper_out: false,
                cover_open: false,
                paper_state: PaperState::Unknown,
            };
        };

        let ready = general & NOT_READY == 0;
        let paper_out = general & PAPER_OUT != 0;
        let cover_open = general & COVER_OPEN != 0;

        let paper_state = if paper_out {
            PaperState::Out
        } else if cover_open {
            PaperState::CoverOpen
        } else {
            PaperState::Ok
        };

        PrinterStatus {
            connected: true,
            ready,
            paper_out,
            cover_open,
            paper_state,
        }
    }

    /// Status reported while no connection is open.
    pub fn disconnected() -> PrinterStatus {
        PrinterStatus {
            connected: false,
            ready: false,
            paper_out: false,
            cover_open: false,
            paper_state: PaperState::Disconnected,
        }
    }
}
