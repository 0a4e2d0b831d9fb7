//! Configuration validation.
//!
//! Validates all config fields before a run starts.

use crate::domain::error::MomtraderError;
use crate::domain::execution::UnitPolicy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_momentum_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    match config.get_string("data", "prices_path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(MomtraderError::ConfigMissing {
                section: "data".to_string(),
                key: "prices_path".to_string(),
            });
        }
    }

    if let Some(benchmark) = config.get_string("data", "benchmark") {
        if benchmark.trim().is_empty() {
            return Err(MomtraderError::ConfigInvalid {
                section: "data".to_string(),
                key: "benchmark".to_string(),
                reason: "benchmark must not be blank".to_string(),
            });
        }
    }

    optional_date(config, "data", "start_date")?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    validate_initial_amount(config)?;
    validate_costs(config)?;
    validate_unit_policy(config)?;
    Ok(())
}

pub fn validate_momentum_config(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let base_date = required_date(config, "momentum", "base_date")?;
    if let Some(start) = optional_date(config, "data", "start_date")? {
        if base_date < start {
            return Err(MomtraderError::ConfigInvalid {
                section: "momentum".to_string(),
                key: "base_date".to_string(),
                reason: "base_date must not precede [data] start_date".to_string(),
            });
        }
    }

    for key in ["lookback_months", "top_n"] {
        if config.get_int("momentum", key, 1) < 1 {
            return Err(MomtraderError::ConfigInvalid {
                section: "momentum".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be at least 1"),
            });
        }
    }
    Ok(())
}

fn validate_initial_amount(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let value = config.get_double("backtest", "initial_amount", 10_000_000.0);
    if value <= 0.0 {
        return Err(MomtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_amount".to_string(),
            reason: "initial_amount must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    let ftc = config.get_double("backtest", "ftc", 0.0);
    if ftc < 0.0 {
        return Err(MomtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "ftc".to_string(),
            reason: "ftc must be non-negative".to_string(),
        });
    }
    let ptc = config.get_double("backtest", "ptc", 0.0);
    if !(0.0..1.0).contains(&ptc) {
        return Err(MomtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "ptc".to_string(),
            reason: "ptc must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_unit_policy(config: &dyn ConfigPort) -> Result<(), MomtraderError> {
    match config.get_string("backtest", "unit_policy") {
        Some(s) if UnitPolicy::parse(&s).is_none() => Err(MomtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "unit_policy".to_string(),
            reason: "expected when_unspecified or entry_bar_only".to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, MomtraderError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| MomtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("invalid {key} format, expected YYYY-MM-DD"),
    })
}

pub fn required_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, MomtraderError> {
    match config.get_string(section, key) {
        Some(s) => parse_date(&s, section, key),
        None => Err(MomtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

pub fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, MomtraderError> {
    config
        .get_string(section, key)
        .map(|s| parse_date(&s, section, key))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[data]
prices_path = prices.csv
benchmark = close
start_date = 2019-01-01

[backtest]
initial_amount = 10000000
ftc = 1.0
ptc = 0.001
unit_policy = entry_bar_only

[momentum]
base_date = 2020-01-01
lookback_months = 3
top_n = 2
"#;

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn missing_prices_path_fails() {
        let config = make_config("[momentum]\nbase_date = 2020-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigMissing { key, .. } if key == "prices_path"));
    }

    #[test]
    fn initial_amount_must_be_positive() {
        let config = make_config("[backtest]\ninitial_amount = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "initial_amount")
        );
    }

    #[test]
    fn negative_ftc_fails() {
        let config = make_config("[backtest]\nftc = -1\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "ftc"));
    }

    #[test]
    fn ptc_of_one_fails() {
        let config = make_config("[backtest]\nptc = 1.0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "ptc"));
    }

    #[test]
    fn unknown_unit_policy_fails() {
        let config = make_config("[backtest]\nunit_policy = sometimes\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "unit_policy"));
    }

    #[test]
    fn backtest_defaults_pass() {
        assert!(validate_backtest_config(&make_config("[backtest]\n")).is_ok());
    }

    #[test]
    fn missing_base_date_fails() {
        let config = make_config("[momentum]\ntop_n = 2\n");
        let err = validate_momentum_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigMissing { key, .. } if key == "base_date"));
    }

    #[test]
    fn invalid_base_date_format_fails() {
        let config = make_config("[momentum]\nbase_date = 2020/01/01\n");
        let err = validate_momentum_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "base_date"));
    }

    #[test]
    fn base_date_before_start_date_fails() {
        let config = make_config(
            "[data]\nstart_date = 2021-01-01\n[momentum]\nbase_date = 2020-01-01\n",
        );
        let err = validate_momentum_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "base_date"));
    }

    #[test]
    fn zero_top_n_fails() {
        let config = make_config("[momentum]\nbase_date = 2020-01-01\ntop_n = 0\n");
        let err = validate_momentum_config(&config).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "top_n"));
    }
}
