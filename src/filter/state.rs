//! The five-state close-on-last-character-read decode state machine shared
//! by every decode filter. REFERENCE: [4.3 Decode state machine], grounded
//! on `FilterFillBuff` (`fileio/src/filtops.c`), cases A-H.

/// REFERENCE: [4.3 Decode state machine, States]. `Init` has not yet
/// attempted a read; `Empty` has an empty buffer but no known EOF yet;
/// `LastChar` holds exactly the stashed final byte; `Eof` has reported EOF
/// to the caller; `Err` has a deferred error latched (REFERENCE:
/// [7. ERROR HANDLING DESIGN]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Init,
    Empty,
    LastChar,
    Eof,
    Err,
}

/// What a filter kind's `decode` call reports to the generic fill loop for
/// a single underlying-read attempt. REFERENCE: [9. DESIGN NOTES]
/// ("tagged-result decode callbacks instead of an int error field").
#[derive(Debug)]
pub enum DecodeOutcome {
    /// `produced` bytes were written at the front of the supplied output
    /// buffer; `produced` may be zero without it being EOF (e.g. a filter
    /// that consumed only delimiter bytes this round).
    Filled { produced: usize },
    /// The underlying source is exhausted; no more bytes will ever come,
    /// though `produced` trailing bytes (if any) still precede it.
    Eof { produced: usize },
}
