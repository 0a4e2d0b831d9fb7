//! End-to-end momentum pipeline over an in-memory price source.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use momtrader::cli::{self, DataSettings};
use momtrader::domain::backtest::BacktestConfig;
use momtrader::domain::error::MomtraderError;
use momtrader::domain::momentum::RankingConfig;
use momtrader::domain::trade_book::Phase;
use momtrader::ports::progress_port::ProgressAction;
use std::path::PathBuf;

fn settings() -> DataSettings {
    DataSettings {
        prices_path: PathBuf::from("unused.csv"),
        benchmark: "close".to_string(),
        codes: None,
        start_date: None,
    }
}

fn run(base: &str) -> cli::PipelineOutcome {
    let mock = MockDataPort::new(six_month_prices());
    cli::run_pipeline(
        &mock,
        &settings(),
        &BacktestConfig::default(),
        &RankingConfig::default(),
        date(base),
        None,
    )
    .unwrap()
}

mod ranking {
    use super::*;

    #[test]
    fn one_ranking_per_month_after_lookback() {
        let outcome = run("2024-01-01");
        let months: Vec<String> = outcome
            .rankings
            .iter()
            .map(|r| r.std_ym.to_string())
            .collect();
        assert_eq!(months, vec!["2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]);
    }

    #[test]
    fn absolute_filter_drops_flat_and_falling() {
        let outcome = run("2024-01-01");
        let selected: Vec<Vec<String>> = outcome
            .rankings
            .iter()
            .map(|r| r.selected.clone())
            .collect();
        assert_eq!(
            selected,
            vec![
                vec!["A".to_string()],
                vec!["A".to_string()],
                vec!["A".to_string()],
                vec!["B".to_string()],
                vec!["A".to_string()],
            ]
        );
    }
}

mod tracking {
    use super::*;

    #[test]
    fn phases_follow_monthly_signals() {
        let outcome = run("2024-01-01");
        use Phase::*;
        assert_eq!(
            outcome.book.phases_of(0),
            vec![Empty, Empty, Empty, Ready, Buy, Ready, Buy, Ready, Buy, Buy, Empty, Ready]
        );
        assert_eq!(
            outcome.book.phases_of(1),
            vec![Empty, Empty, Empty, Empty, Empty, Empty, Empty, Empty, Empty, Ready, Buy, Buy]
        );
    }

    #[test]
    fn single_exit_compounds_into_acc_rtn() {
        let outcome = run("2024-01-01");
        assert_eq!(outcome.tracker.trades.len(), 1);

        let trade = &outcome.tracker.trades[0];
        assert_eq!(trade.code, "A");
        assert_eq!(trade.entry_date, Some(date("2024-03-01")));
        assert_eq!(trade.exit_date, date("2024-06-03"));
        assert_abs_diff_eq!(trade.return_pct, 0.25, epsilon = 1e-12);

        assert_abs_diff_eq!(outcome.tracker.acc_rtn, 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(outcome.book.acc_rtn()[9], 1.0);
        assert_abs_diff_eq!(outcome.book.acc_rtn()[10], 1.25, epsilon = 1e-12);
    }

    #[test]
    fn later_base_date_shortens_the_window() {
        let outcome = run("2024-03-01");
        assert_eq!(outcome.book.len(), 8);
        assert_eq!(outcome.book.dates()[0], date("2024-03-01"));
        assert_eq!(outcome.tracker.trades.len(), 1);
        assert_abs_diff_eq!(outcome.tracker.acc_rtn, 15.0 / 13.0, epsilon = 1e-12);
    }
}

mod replay {
    use super::*;

    #[test]
    fn every_instrument_is_replayed() {
        let outcome = run("2024-01-01");
        assert!(outcome.skipped.is_empty());
        let codes: Vec<&str> = outcome.replays.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn replay_balances() {
        let outcome = run("2024-01-01");
        let (_, a) = &outcome.replays[0];
        assert_abs_diff_eq!(a.final_balance, 12_499_999.0, epsilon = 1e-6);
        assert_eq!(a.trades, 3);
        assert_abs_diff_eq!(a.performance_pct, 24.99999, epsilon = 1e-9);

        let (_, b) = &outcome.replays[1];
        assert_abs_diff_eq!(b.final_balance, 10_000_000.0, epsilon = 1e-6);
        assert_eq!(b.trades, 2);
    }

    #[test]
    fn verbose_run_reports_each_order() {
        let mock = MockDataPort::new(six_month_prices());
        let recorder = RecordingProgress::default();
        let config = BacktestConfig {
            verbose: true,
            ..BacktestConfig::default()
        };
        cli::run_pipeline(
            &mock,
            &settings(),
            &config,
            &RankingConfig::default(),
            date("2024-01-01"),
            Some(&recorder),
        )
        .unwrap();

        let actions: Vec<(String, ProgressAction)> = recorder
            .events
            .borrow()
            .iter()
            .map(|e| (e.column.clone(), e.action))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("A".to_string(), ProgressAction::Buy),
                ("A".to_string(), ProgressAction::Sell),
                ("A".to_string(), ProgressAction::CloseOut),
                ("B".to_string(), ProgressAction::Buy),
                ("B".to_string(), ProgressAction::CloseOut),
            ]
        );
    }

    #[test]
    fn quiet_run_reports_nothing() {
        let mock = MockDataPort::new(six_month_prices());
        let recorder = RecordingProgress::default();
        cli::run_pipeline(
            &mock,
            &settings(),
            &BacktestConfig::default(),
            &RankingConfig::default(),
            date("2024-01-01"),
            Some(&recorder),
        )
        .unwrap();
        assert!(recorder.events.borrow().is_empty());
    }
}

mod loading {
    use super::*;

    #[test]
    fn configured_codes_restrict_the_universe() {
        let mock = MockDataPort::new(six_month_prices());
        let settings = DataSettings {
            codes: Some("B".to_string()),
            ..settings()
        };
        let (table, universe) = cli::load_table(&mock, &settings).unwrap();
        assert_eq!(universe, vec!["B"]);
        assert_eq!(table.instruments().len(), 2);
        assert_eq!(table.benchmark().name, "close");
    }

    #[test]
    fn start_date_trims_the_table() {
        let mock = MockDataPort::new(six_month_prices());
        let settings = DataSettings {
            start_date: Some(date("2024-05-01")),
            ..settings()
        };
        let (table, _) = cli::load_table(&mock, &settings).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.dates()[0], date("2024-05-02"));
    }

    #[test]
    fn missing_benchmark_is_unknown_column() {
        let mock = MockDataPort::new(six_month_prices());
        let settings = DataSettings {
            benchmark: "kospi".to_string(),
            ..settings()
        };
        let err = cli::load_table(&mock, &settings).unwrap_err();
        assert!(matches!(err, MomtraderError::UnknownColumn { column } if column == "kospi"));
    }

    #[test]
    fn benchmark_in_codes_is_config_error() {
        let mock = MockDataPort::new(six_month_prices());
        let settings = DataSettings {
            codes: Some("A,close".to_string()),
            ..settings()
        };
        let err = cli::load_table(&mock, &settings).unwrap_err();
        assert!(matches!(err, MomtraderError::ConfigInvalid { key, .. } if key == "codes"));
    }

    #[test]
    fn source_errors_propagate() {
        let mock = MockDataPort::new(six_month_prices()).with_error("connection reset");
        let err = cli::load_table(&mock, &settings()).unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn base_date_after_last_bar_fails() {
        let mock = MockDataPort::new(six_month_prices());
        let result = cli::run_pipeline(
            &mock,
            &settings(),
            &BacktestConfig::default(),
            &RankingConfig::default(),
            date("2025-01-01"),
            None,
        );
        assert!(matches!(result, Err(MomtraderError::Data { .. })));
    }
}
