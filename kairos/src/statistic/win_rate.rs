use rust_decimal::Decimal;

/// `win_rate = |wins| / |closed_positions|` (`spec.md` §6).
///
/// Grounded directly on `barter::statistic::metric::win_rate::WinRate::calculate` - the
/// teacher's formula already matches `spec.md` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WinRate {
    pub value: Decimal,
}

impl WinRate {
    pub fn calculate(wins: Decimal, total_closed: Decimal) -> Option<Self> {
        if total_closed.is_zero() {
            return None;
        }

        Some(Self {
            value: wins.abs().checked_div(total_closed.abs())?,
        })
    }
}
