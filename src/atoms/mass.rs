use rust_decimal::Decimal;
use std::ops::Mul;

use crate::{Charge, Mass};

impl Mass {
    pub(crate) fn checked_div(self, charge: Charge) -> Option<Self> {
        (charge.0 != 0).then(|| Self(self.0 / Decimal::from(charge.0.abs())))
    }

    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl Mul<i32> for Mass {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Charge {
    #[must_use]
    pub const fn new(charge: i32) -> Self {
        Self(charge)
    }

    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }
}
