//! In-memory fact-sheet source.
//!
//! Ships three demo symbols so the binary works with zero setup, and
//! loads a JSON array of sheets when the user points it at a file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use deliberation::{FactSheet, FactSheetProvider, FactsError, SharedFactSheetProvider};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read fact-sheet file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse fact-sheet file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fixed map of symbol to fact sheet. Lookups are case-insensitive.
#[derive(Debug)]
pub struct StaticFactSheets {
    sheets: HashMap<String, FactSheet>,
}

impl StaticFactSheets {
    pub fn new() -> Self {
        Self {
            sheets: HashMap::new(),
        }
    }

    /// The built-in demo roster: a cheap industrial, a hot grower, and
    /// a dividend stalwart.
    pub fn with_demo_symbols() -> Self {
        let mut source = Self::new();
        source.insert(demo_industrial());
        source.insert(demo_grower());
        source.insert(demo_payer());
        source
    }

    /// Load a JSON array of fact sheets.
    pub fn from_json_file(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path)?;
        let sheets: Vec<FactSheet> = serde_json::from_str(&raw)?;
        let mut source = Self::new();
        let count = sheets.len();
        for sheet in sheets {
            source.insert(sheet);
        }
        info!(count, path = %path.display(), "loaded fact sheets");
        Ok(source)
    }

    pub fn insert(&mut self, sheet: FactSheet) {
        self.sheets.insert(sheet.symbol.to_uppercase(), sheet);
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.sheets.keys().map(|s| s.as_str()).collect()
    }

    pub fn shared(self) -> SharedFactSheetProvider {
        std::sync::Arc::new(self)
    }
}

impl Default for StaticFactSheets {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactSheetProvider for StaticFactSheets {
    async fn get_fact_sheet(&self, symbol: &str) -> Result<FactSheet, FactsError> {
        self.sheets
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| FactsError::UnknownSymbol(symbol.to_string()))
    }
}

fn demo_industrial() -> FactSheet {
    let mut sheet = FactSheet::new("ACME").with_current_price(42.50);
    sheet.valuation.pe_ratio = Some(9.8);
    sheet.valuation.forward_pe = Some(8.9);
    sheet.valuation.price_to_book = Some(1.1);
    sheet.valuation.ev_to_ebitda = Some(5.6);
    sheet.valuation.intrinsic_value = Some(61.0);
    sheet.safety.debt_to_equity = Some(0.45);
    sheet.safety.current_ratio = Some(1.9);
    sheet.safety.interest_coverage = Some(8.2);
    sheet.safety.altman_z_score = Some(3.4);
    sheet.efficiency.return_on_equity = Some(0.14);
    sheet.efficiency.operating_margin = Some(0.11);
    sheet.dividend.dividend_yield = Some(0.031);
    sheet.dividend.payout_ratio = Some(0.35);
    sheet.dividend.years_of_growth = Some(12.0);
    sheet.momentum.rsi_14 = Some(44.0);
    sheet.momentum.sma_50 = Some(43.8);
    sheet.momentum.sma_200 = Some(45.2);
    sheet.context.sector = Some("Industrials".to_string());
    sheet.context.industry = Some("Machinery".to_string());
    sheet.context.market_cap = Some(8.4e9);
    sheet.context.beta = Some(0.9);
    sheet
}

fn demo_grower() -> FactSheet {
    let mut sheet = FactSheet::new("NOVA").with_current_price(187.20);
    sheet.valuation.pe_ratio = Some(68.0);
    sheet.valuation.forward_pe = Some(41.0);
    sheet.valuation.peg_ratio = Some(1.4);
    sheet.valuation.price_to_sales = Some(12.3);
    sheet.growth.revenue_growth_yoy = Some(0.47);
    sheet.growth.earnings_growth_yoy = Some(0.88);
    sheet.growth.revenue_cagr_3y = Some(0.52);
    sheet.growth.eps_growth_next_year = Some(0.42);
    sheet.efficiency.gross_margin = Some(0.74);
    sheet.efficiency.operating_margin = Some(0.19);
    sheet.momentum.rsi_14 = Some(71.0);
    sheet.momentum.price_change_1m = Some(0.12);
    sheet.momentum.price_change_6m = Some(0.58);
    sheet.momentum.sma_50 = Some(164.0);
    sheet.momentum.sma_200 = Some(128.0);
    sheet.volume.relative_volume = Some(1.8);
    sheet.volume.short_interest_pct = Some(0.062);
    sheet.context.sector = Some("Technology".to_string());
    sheet.context.industry = Some("Semiconductors".to_string());
    sheet.context.market_cap = Some(92.0e9);
    sheet.context.beta = Some(1.7);
    sheet.context.analyst_rating = Some("Buy".to_string());
    sheet
}

fn demo_payer() -> FactSheet {
    let mut sheet = FactSheet::new("DRIP").with_current_price(68.75);
    sheet.valuation.pe_ratio = Some(17.5);
    sheet.valuation.price_to_book = Some(2.8);
    sheet.growth.revenue_growth_yoy = Some(0.03);
    sheet.safety.debt_to_equity = Some(0.62);
    sheet.safety.current_ratio = Some(1.3);
    sheet.safety.interest_coverage = Some(11.5);
    sheet.efficiency.return_on_equity = Some(0.21);
    sheet.efficiency.net_margin = Some(0.16);
    sheet.dividend.dividend_yield = Some(0.042);
    sheet.dividend.payout_ratio = Some(0.58);
    sheet.dividend.dividend_growth_5y = Some(0.06);
    sheet.dividend.years_of_growth = Some(28.0);
    sheet.momentum.rsi_14 = Some(52.0);
    sheet.context.sector = Some("Consumer Staples".to_string());
    sheet.context.industry = Some("Beverages".to_string());
    sheet.context.market_cap = Some(31.0e9);
    sheet.context.beta = Some(0.6);
    sheet.context.analyst_rating = Some("Hold".to_string());
    sheet
}
