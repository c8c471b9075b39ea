use rust_decimal::Decimal;

/// `profit_factor = Σ wins / |Σ losses|` (`spec.md` §6).
///
/// Grounded on `barter::statistic::metric::profit_factor::ProfitFactor::calculate`'s
/// `Option`-returning, `Decimal`-based shape, but its zero-losses/zero-profits sentinels are
/// replaced with `spec.md` §6's own explicit rule: `Decimal::MAX` stands in for "infinity" when
/// there are wins and no losses, and the no-wins case yields zero rather than the teacher's
/// `Decimal::MIN` "worst performance" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfitFactor {
    pub value: Decimal,
}

impl ProfitFactor {
    pub fn calculate(gross_wins_abs: Decimal, gross_losses_abs: Decimal) -> Option<Self> {
        if gross_wins_abs.is_zero() && gross_losses_abs.is_zero() {
            return None;
        }

        let value = if gross_losses_abs.is_zero() {
            Decimal::MAX
        } else if gross_wins_abs.is_zero() {
            Decimal::ZERO
        } else {
            gross_wins_abs.abs().checked_div(gross_losses_abs.abs())?
        };

        Some(Self { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn no_trades_is_undefined() {
        assert_eq!(ProfitFactor::calculate(dec!(0), dec!(0)), None);
    }

    #[test]
    fn no_losses_is_infinite_as_decimal_max() {
        assert_eq!(ProfitFactor::calculate(dec!(100), dec!(0)).unwrap().value, Decimal::MAX);
    }

    #[test]
    fn no_wins_is_zero() {
        assert_eq!(ProfitFactor::calculate(dec!(0), dec!(100)).unwrap().value, Decimal::ZERO);
    }

    #[test]
    fn mixed_wins_and_losses_divide_normally() {
        assert_eq!(ProfitFactor::calculate(dec!(300), dec!(100)).unwrap().value, dec!(3));
    }
}
