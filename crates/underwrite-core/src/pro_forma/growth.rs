use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::deal::DealInputs;
use crate::types::{Money, Rate};

/// Years over which in-place rent converges to market.
const MAX_RAMP_YEARS: u32 = 3;

/// Stabilized occupancy ceiling after a capex program.
const STABILIZED_OCCUPANCY_CAP: Rate = dec!(0.95);
const OCCUPANCY_LIFT: Rate = dec!(0.03);
const OCCUPANCY_RAMP_YEARS: u32 = 2;

/// Revenue growth rate for `year` (1-based): the predicted sequence entry
/// (given in percent) when one exists for that year, otherwise the flat rate.
/// The rate for year `y` is what carries year `y - 1` into year `y`.
pub fn growth_rate_for_year(deal: &DealInputs, year: u32) -> Rate {
    year.checked_sub(1)
        .and_then(|idx| deal.yearly_revenue_growth.get(idx as usize))
        .map(|pct| *pct / Decimal::ONE_HUNDRED)
        .unwrap_or(deal.financing.revenue_growth_rate)
}

/// Revenue growth rates and compounding factors for years `1..=years`,
/// computed once per projection.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthPath {
    rates: Vec<Rate>,
    // factors[y - 1] = product of (1 + g_k) for k in 2..=y
    factors: Vec<Decimal>,
}

impl GrowthPath {
    pub fn new(deal: &DealInputs, years: u32) -> Self {
        let rates: Vec<Rate> = (1..=years).map(|y| growth_rate_for_year(deal, y)).collect();
        let mut factors = Vec::with_capacity(rates.len());
        let mut running = Decimal::ONE;
        for (idx, rate) in rates.iter().enumerate() {
            if idx > 0 {
                running *= Decimal::ONE + rate;
            }
            factors.push(running);
        }
        Self { rates, factors }
    }

    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    /// Rate for `year`, falling back to the last resolved rate past the path.
    pub fn rate(&self, year: u32) -> Rate {
        let idx = (year.max(1) - 1) as usize;
        self.rates
            .get(idx)
            .or_else(|| self.rates.last())
            .copied()
            .unwrap_or_default()
    }

    /// Cumulative growth from year 1 to `year`.
    pub fn factor(&self, year: u32) -> Decimal {
        let idx = (year.max(1) - 1) as usize;
        self.factors.get(idx).copied().unwrap_or(Decimal::ONE)
    }

    /// Growth accumulated strictly after year `from` up to and including `to`.
    pub fn factor_between(&self, from: u32, to: u32) -> Decimal {
        ((from + 1)..=to).fold(Decimal::ONE, |acc, year| acc * (Decimal::ONE + self.rate(year)))
    }
}

/// Monthly rent per unit for `year` under the value-add ramp: linear from
/// in-place to market over the ramp window, then compounding from market.
/// With no rent gap, in-place rent simply compounds from year 1.
pub fn rent_per_unit(deal: &DealInputs, path: &GrowthPath, year: u32) -> Money {
    let in_place = deal.in_place_rent;
    let market = if deal.market_rent > Decimal::ZERO {
        deal.market_rent
    } else {
        in_place
    };
    let gap = market - in_place;
    let ramp_years = MAX_RAMP_YEARS.min(deal.hold_period_years);

    if gap > Decimal::ZERO && ramp_years > 0 {
        if year <= ramp_years {
            in_place + gap * Decimal::from(year) / Decimal::from(ramp_years)
        } else {
            market * path.factor_between(ramp_years, year)
        }
    } else {
        in_place * path.factor(year)
    }
}

/// Occupancy for `year`. A capex program lifts occupancy up to 3 points
/// (never above 95%) over the first two years.
pub fn occupancy_for_year(deal: &DealInputs, year: u32) -> Rate {
    let occ = deal.occupancy;
    if deal.total_capex() <= Decimal::ZERO || occ >= STABILIZED_OCCUPANCY_CAP {
        return occ;
    }
    let stabilized = STABILIZED_OCCUPANCY_CAP.min(occ + OCCUPANCY_LIFT);
    if year <= OCCUPANCY_RAMP_YEARS {
        occ + (stabilized - occ) * Decimal::from(year) / Decimal::from(OCCUPANCY_RAMP_YEARS)
    } else {
        stabilized
    }
}
