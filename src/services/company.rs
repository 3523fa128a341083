/*
 * Responsibility
 * - Company lookup behind GET /companies/search
 * - Keyed in-memory directory; ticker match first, then name substring
 */
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompanyError {
    #[error("query cannot be empty")]
    EmptyQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub symbol: String,
    pub cik: String,
    pub security_name: String,
    pub security_type: String,
    pub region: String,
    pub exchange: String,
    pub sector: String,
}

impl Company {
    fn listed(symbol: &str, cik: &str, name: &str, exchange: &str, sector: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            cik: cik.to_string(),
            security_name: name.to_string(),
            security_type: "Common Stock".to_string(),
            region: "US".to_string(),
            exchange: exchange.to_string(),
            sector: sector.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompanyDirectory {
    companies: Vec<Company>,
}

impl Default for CompanyDirectory {
    fn default() -> Self {
        Self::new(vec![
            Company::listed("AAPL", "0000320193", "Apple Inc.", "NASDAQ", "Technology"),
            Company::listed("MSFT", "0000789019", "Microsoft Corporation", "NASDAQ", "Technology"),
            Company::listed("JPM", "0000019617", "JPMorgan Chase & Co.", "NYSE", "Financials"),
            Company::listed("XOM", "0000034088", "Exxon Mobil Corporation", "NYSE", "Energy"),
            Company::listed("JNJ", "0000200406", "Johnson & Johnson", "NYSE", "Health Care"),
        ])
    }
}

impl CompanyDirectory {
    pub fn new(companies: Vec<Company>) -> Self {
        Self { companies }
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// `limit` of 0 means the default; anything above `MAX_LIMIT` is clamped.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Company>, CompanyError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CompanyError::EmptyQuery);
        }

        let limit = match limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };
        let needle = query.to_lowercase();

        let by_symbol = self
            .companies
            .iter()
            .filter(|c| c.symbol.eq_ignore_ascii_case(query));
        let by_name = self.companies.iter().filter(|c| {
            !c.symbol.eq_ignore_ascii_case(query) && c.security_name.to_lowercase().contains(&needle)
        });

        Ok(by_symbol.chain(by_name).take(limit).cloned().collect())
    }
}
