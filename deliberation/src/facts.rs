//! Financial fact-sheet model.
//!
//! A fact sheet is the immutable structured snapshot a debate panel reasons
//! over: one symbol, an optional current price, and eight fixed category
//! blocks whose fields may individually be absent. Sheets are produced by a
//! [`FactSheetProvider`] outside the engine and never mutated mid-session.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The eight fixed fact-sheet categories agents can claim expertise in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    /// Multiples and intrinsic-value estimates
    Valuation,
    /// Revenue and earnings trajectory
    Growth,
    /// Balance-sheet strength and solvency
    Safety,
    /// Margins and capital productivity
    Efficiency,
    /// Price action and trend indicators
    Momentum,
    /// Trading volume and short interest
    Volume,
    /// Payout history and sustainability
    Dividend,
    /// Sector, size, and market backdrop
    Context,
}

impl FactCategory {
    /// All categories, in fact-sheet block order.
    pub const ALL: [FactCategory; 8] = [
        FactCategory::Valuation,
        FactCategory::Growth,
        FactCategory::Safety,
        FactCategory::Efficiency,
        FactCategory::Momentum,
        FactCategory::Volume,
        FactCategory::Dividend,
        FactCategory::Context,
    ];
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FactCategory::Valuation => "valuation",
            FactCategory::Growth => "growth",
            FactCategory::Safety => "safety",
            FactCategory::Efficiency => "efficiency",
            FactCategory::Momentum => "momentum",
            FactCategory::Volume => "volume",
            FactCategory::Dividend => "dividend",
            FactCategory::Context => "context",
        };
        write!(f, "{s}")
    }
}

fn push_num(out: &mut Vec<(&'static str, String)>, label: &'static str, value: Option<f64>) {
    if let Some(v) = value {
        out.push((label, format!("{v}")));
    }
}

fn push_text(out: &mut Vec<(&'static str, String)>, label: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            out.push((label, v.clone()));
        }
    }
}

/// Valuation multiples and intrinsic-value estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationFacts {
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    /// Modeled fair value per share, when an estimate exists.
    pub intrinsic_value: Option<f64>,
}

impl ValuationFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "pe_ratio", self.pe_ratio);
        push_num(&mut out, "forward_pe", self.forward_pe);
        push_num(&mut out, "peg_ratio", self.peg_ratio);
        push_num(&mut out, "price_to_book", self.price_to_book);
        push_num(&mut out, "price_to_sales", self.price_to_sales);
        push_num(&mut out, "ev_to_ebitda", self.ev_to_ebitda);
        push_num(&mut out, "intrinsic_value", self.intrinsic_value);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Top-line and bottom-line trajectory, percentages year over year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthFacts {
    pub revenue_growth_yoy: Option<f64>,
    pub earnings_growth_yoy: Option<f64>,
    pub revenue_cagr_3y: Option<f64>,
    pub eps_growth_next_year: Option<f64>,
}

impl GrowthFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "revenue_growth_yoy", self.revenue_growth_yoy);
        push_num(&mut out, "earnings_growth_yoy", self.earnings_growth_yoy);
        push_num(&mut out, "revenue_cagr_3y", self.revenue_cagr_3y);
        push_num(&mut out, "eps_growth_next_year", self.eps_growth_next_year);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Solvency and balance-sheet strength.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyFacts {
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub altman_z_score: Option<f64>,
}

impl SafetyFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "debt_to_equity", self.debt_to_equity);
        push_num(&mut out, "current_ratio", self.current_ratio);
        push_num(&mut out, "quick_ratio", self.quick_ratio);
        push_num(&mut out, "interest_coverage", self.interest_coverage);
        push_num(&mut out, "altman_z_score", self.altman_z_score);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Margins and capital productivity, percentages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EfficiencyFacts {
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
}

impl EfficiencyFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "return_on_equity", self.return_on_equity);
        push_num(&mut out, "return_on_assets", self.return_on_assets);
        push_num(&mut out, "gross_margin", self.gross_margin);
        push_num(&mut out, "operating_margin", self.operating_margin);
        push_num(&mut out, "net_margin", self.net_margin);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Trend and price-action indicators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MomentumFacts {
    pub rsi_14: Option<f64>,
    pub price_change_1m: Option<f64>,
    pub price_change_3m: Option<f64>,
    pub price_change_6m: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
}

impl MomentumFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "rsi_14", self.rsi_14);
        push_num(&mut out, "price_change_1m", self.price_change_1m);
        push_num(&mut out, "price_change_3m", self.price_change_3m);
        push_num(&mut out, "price_change_6m", self.price_change_6m);
        push_num(&mut out, "sma_50", self.sma_50);
        push_num(&mut out, "sma_200", self.sma_200);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Liquidity and positioning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeFacts {
    pub average_volume_30d: Option<f64>,
    pub relative_volume: Option<f64>,
    pub short_interest_pct: Option<f64>,
}

impl VolumeFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "average_volume_30d", self.average_volume_30d);
        push_num(&mut out, "relative_volume", self.relative_volume);
        push_num(&mut out, "short_interest_pct", self.short_interest_pct);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Payout level and history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DividendFacts {
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub dividend_growth_5y: Option<f64>,
    pub years_of_growth: Option<f64>,
}

impl DividendFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_num(&mut out, "dividend_yield", self.dividend_yield);
        push_num(&mut out, "payout_ratio", self.payout_ratio);
        push_num(&mut out, "dividend_growth_5y", self.dividend_growth_5y);
        push_num(&mut out, "years_of_growth", self.years_of_growth);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Sector, size, and market backdrop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextFacts {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub analyst_rating: Option<String>,
}

impl ContextFacts {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push_text(&mut out, "sector", &self.sector);
        push_text(&mut out, "industry", &self.industry);
        push_num(&mut out, "market_cap", self.market_cap);
        push_num(&mut out, "beta", self.beta);
        push_text(&mut out, "analyst_rating", &self.analyst_rating);
        out
    }

    pub fn has_data(&self) -> bool {
        !self.fields().is_empty()
    }
}

/// Immutable financial snapshot for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactSheet {
    pub symbol: String,

    /// Last traded price. Absent when the upstream feed had no quote.
    pub current_price: Option<f64>,

    #[serde(default)]
    pub valuation: ValuationFacts,
    #[serde(default)]
    pub growth: GrowthFacts,
    #[serde(default)]
    pub safety: SafetyFacts,
    #[serde(default)]
    pub efficiency: EfficiencyFacts,
    #[serde(default)]
    pub momentum: MomentumFacts,
    #[serde(default)]
    pub volume: VolumeFacts,
    #[serde(default)]
    pub dividend: DividendFacts,
    #[serde(default)]
    pub context: ContextFacts,
}

impl FactSheet {
    /// Create an empty sheet for a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            current_price: None,
            valuation: ValuationFacts::default(),
            growth: GrowthFacts::default(),
            safety: SafetyFacts::default(),
            efficiency: EfficiencyFacts::default(),
            momentum: MomentumFacts::default(),
            volume: VolumeFacts::default(),
            dividend: DividendFacts::default(),
            context: ContextFacts::default(),
        }
    }

    /// Set the current price (builder style).
    pub fn with_current_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Whether the block for `category` carries at least one populated field.
    pub fn has_category_data(&self, category: FactCategory) -> bool {
        match category {
            FactCategory::Valuation => self.valuation.has_data(),
            FactCategory::Growth => self.growth.has_data(),
            FactCategory::Safety => self.safety.has_data(),
            FactCategory::Efficiency => self.efficiency.has_data(),
            FactCategory::Momentum => self.momentum.has_data(),
            FactCategory::Volume => self.volume.has_data(),
            FactCategory::Dividend => self.dividend.has_data(),
            FactCategory::Context => self.context.has_data(),
        }
    }

    /// Populated field (label, value) pairs for one category block.
    pub fn category_fields(&self, category: FactCategory) -> Vec<(&'static str, String)> {
        match category {
            FactCategory::Valuation => self.valuation.fields(),
            FactCategory::Growth => self.growth.fields(),
            FactCategory::Safety => self.safety.fields(),
            FactCategory::Efficiency => self.efficiency.fields(),
            FactCategory::Momentum => self.momentum.fields(),
            FactCategory::Volume => self.volume.fields(),
            FactCategory::Dividend => self.dividend.fields(),
            FactCategory::Context => self.context.fields(),
        }
    }

    /// Categories with at least one populated field, in block order.
    pub fn populated_categories(&self) -> Vec<FactCategory> {
        FactCategory::ALL
            .into_iter()
            .filter(|c| self.has_category_data(*c))
            .collect()
    }
}

/// Errors from fact-sheet sources.
#[derive(Debug, Error)]
pub enum FactsError {
    #[error("no fact sheet available for symbol: {0}")]
    UnknownSymbol(String),

    #[error("fact source error: {0}")]
    Source(String),
}

/// Supplies the immutable snapshot a session debates over.
///
/// Implementations live outside the engine (market-data adapters, static
/// fixtures). Failures here abort session creation before any async work.
#[async_trait]
pub trait FactSheetProvider: Send + Sync {
    async fn get_fact_sheet(&self, symbol: &str) -> Result<FactSheet, FactsError>;
}

/// Shared fact-sheet provider handle.
pub type SharedFactSheetProvider = Arc<dyn FactSheetProvider>;
