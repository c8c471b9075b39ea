use rust_decimal::Decimal;

/// `max_drawdown = max_over_curve((peak - current) / peak)`, a running-peak single pass over
/// the balance curve (`spec.md` §6).
///
/// Grounded on the running-max-update idea in
/// `barter::statistic::metric::drawdown::max::MaxDrawdownGenerator::update` ("if the next
/// drawdown is larger than the current max, it supersedes it"), but simplified to operate
/// directly over `(ts, balance)` pairs instead of the teacher's generic `Drawdown` value with
/// its own start/end timestamps - this kernel only needs the single scalar `spec.md` asks for.
///
/// Returns `Decimal::ZERO` for an empty or single-point curve.
pub fn max_drawdown(balance_curve: &[(i64, Decimal)]) -> Decimal {
    let mut peak = match balance_curve.first() {
        Some((_, balance)) => *balance,
        None => return Decimal::ZERO,
    };
    let mut max_drawdown = Decimal::ZERO;

    for &(_, balance) in balance_curve {
        if balance > peak {
            peak = balance;
        }
        if peak.is_zero() {
            continue;
        }

        let drawdown = (peak - balance) / peak;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}
