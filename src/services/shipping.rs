use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{CartLine, ShippingOption};

/// Flat fee charged for carrier codes we do not recognise.
pub const FALLBACK_FEE: Decimal = dec!(29.90);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Yurtici,
    Aras,
    Mng,
}

impl Carrier {
    pub const ALL: [Carrier; 3] = [Carrier::Yurtici, Carrier::Aras, Carrier::Mng];

    /// Case-insensitive lookup of a carrier code.
    pub fn parse(code: &str) -> Option<Carrier> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|carrier| carrier.code().eq_ignore_ascii_case(code))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Carrier::Yurtici => "Yurtici",
            Carrier::Aras => "Aras",
            Carrier::Mng => "Mng",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Carrier::Yurtici => "Yurtiçi Kargo",
            Carrier::Aras => "Aras Kargo",
            Carrier::Mng => "MNG Kargo",
        }
    }

    fn rates(&self) -> (Decimal, Decimal) {
        match self {
            Carrier::Yurtici => (dec!(29.90), dec!(2)),
            Carrier::Aras => (dec!(24.90), dec!(2.5)),
            Carrier::Mng => (dec!(19.90), dec!(3)),
        }
    }

    pub fn cost(&self, lines: &[CartLine]) -> Decimal {
        let (base, per_unit) = self.rates();
        base + per_unit * weight_units(lines)
    }
}

/// Total quantity across the lines, floored at one so an empty cart still
/// ships as a single unit.
pub fn weight_units(lines: &[CartLine]) -> Decimal {
    let units: i64 = lines.iter().map(|line| i64::from(line.quantity)).sum();
    Decimal::from(units.max(1))
}

/// Shipping cost for `carrier_code`. Unknown codes are billed the flat
/// fallback fee with no per-unit increment.
pub fn shipping_cost(carrier_code: &str, lines: &[CartLine]) -> Decimal {
    match Carrier::parse(carrier_code) {
        Some(carrier) => carrier.cost(lines),
        None => FALLBACK_FEE,
    }
}

pub fn shipping_options(lines: &[CartLine]) -> Vec<ShippingOption> {
    Carrier::ALL
        .into_iter()
        .map(|carrier| ShippingOption {
            provider: carrier.code().to_string(),
            display_name: carrier.display_name().to_string(),
            cost: carrier.cost(lines),
        })
        .collect()
}
