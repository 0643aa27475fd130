//! Valuation and quality signals from provider fundamentals.

use analysis_core::numeric::{clip, clip01, finite};
use analysis_core::FundamentalsSnapshot;
use serde::{Deserialize, Serialize};

/// Fair P/E for high-ROE businesses
const PREMIUM_MULTIPLE: f64 = 22.0;
const BASE_MULTIPLE: f64 = 18.0;
/// Fair P/E for low-ROE businesses
const DISCOUNT_MULTIPLE: f64 = 14.0;

const HIGH_ROE: f64 = 0.15;
const LOW_ROE: f64 = 0.08;

/// Normalized fundamentals fed to the composite scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSignals {
    /// Fair multiple over actual P/E minus one, in [-1, 2]
    pub value_gap: f64,
    /// 0.0 to 1.0
    pub quality: f64,
    /// True only when a positive P/E was available
    pub has_fundamentals: bool,
    pub pe: Option<f64>,
    pub roe: Option<f64>,
    pub fair_pe: f64,
}

impl Default for FundamentalSignals {
    fn default() -> Self {
        Self {
            value_gap: 0.0,
            quality: 0.5,
            has_fundamentals: false,
            pe: None,
            roe: None,
            fair_pe: BASE_MULTIPLE,
        }
    }
}

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Forward P/E, falling back to trailing
    fn select_pe(&self, snapshot: &FundamentalsSnapshot) -> Option<f64> {
        finite(snapshot.forward_pe)
            .filter(|pe| *pe != 0.0)
            .or_else(|| finite(snapshot.trailing_pe))
    }

    fn fair_multiple(&self, roe: Option<f64>) -> f64 {
        match roe {
            Some(r) if r > HIGH_ROE => PREMIUM_MULTIPLE,
            Some(r) if r < LOW_ROE => DISCOUNT_MULTIPLE,
            _ => BASE_MULTIPLE,
        }
    }

    pub fn analyze(&self, snapshot: &FundamentalsSnapshot) -> FundamentalSignals {
        let pe = self.select_pe(snapshot);
        let roe = finite(snapshot.return_on_equity);

        let quality = roe.map_or(0.5, |r| clip01(0.5 + r));
        let fair_pe = self.fair_multiple(roe);

        let (value_gap, has_fundamentals) = match pe {
            Some(pe) if pe > 0.0 => (clip(fair_pe / pe - 1.0, -1.0, 2.0, 0.0), true),
            _ => (0.0, false),
        };

        FundamentalSignals {
            value_gap,
            quality,
            has_fundamentals,
            pe,
            roe,
            fair_pe,
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn derive_fundamentals(snapshot: &FundamentalsSnapshot) -> FundamentalSignals {
    FundamentalAnalysisEngine::new().analyze(snapshot)
}
