//! Ticker universe parsing and resolution.
//!
//! The universe is either listed explicitly in configuration or defaults to
//! every non-benchmark column the data source offers.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("benchmark {0} cannot be part of the universe")]
    BenchmarkInUniverse(String),

    #[error("code {0} is not offered by the data source")]
    Unavailable(String),

    #[error("universe is empty")]
    Empty,
}

/// Parse a comma-separated code list. Codes keep their case; instrument
/// columns such as `A005930` are matched verbatim.
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let code = token.trim();
        if code.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(code.to_string()) {
            return Err(UniverseError::DuplicateCode(code.to_string()));
        }
        codes.push(code.to_string());
    }

    Ok(codes)
}

/// Resolve the trading universe against what the source can supply.
pub fn resolve_universe(
    configured: Option<&str>,
    available: &[String],
    benchmark: &str,
) -> Result<Vec<String>, UniverseError> {
    let codes = match configured {
        Some(list) => {
            let codes = parse_codes(list)?;
            for code in &codes {
                if code == benchmark {
                    return Err(UniverseError::BenchmarkInUniverse(code.clone()));
                }
                if !available.contains(code) {
                    return Err(UniverseError::Unavailable(code.clone()));
                }
            }
            codes
        }
        None => available
            .iter()
            .filter(|c| c.as_str() != benchmark)
            .cloned()
            .collect(),
    };

    if codes.is_empty() {
        return Err(UniverseError::Empty);
    }
    Ok(codes)
}
