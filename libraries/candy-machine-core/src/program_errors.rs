//! Candy machine program error codes relevant to minting.

/// Custom program errors that map to a distinct user-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandyMachineErrorCode {
    /// `0x135`
    NotEnoughSol = 309,
    /// `0x137`
    CandyMachineEmpty = 311,
    /// `0x138`
    CandyMachineNotLive = 312,
}

impl CandyMachineErrorCode {
    const ALL: [CandyMachineErrorCode; 3] = [
        CandyMachineErrorCode::NotEnoughSol,
        CandyMachineErrorCode::CandyMachineEmpty,
        CandyMachineErrorCode::CandyMachineNotLive,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Best-effort match on provider error text such as
    /// `"custom program error: 0x137"`. Only used when no structured code
    /// is available.
    pub fn from_error_text(text: &str) -> Option<Self> {
        let lowered = text.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| contains_hex_token(&lowered, &format!("0x{:x}", c.code())))
    }
}

/// `token` occurs in `text` with no hex digit right after it (so `0x135`
/// does not match `0x1350`) and no alphanumeric right before it.
fn contains_hex_token(text: &str, token: &str) -> bool {
    text.match_indices(token).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + token.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_hexdigit())
    })
}
