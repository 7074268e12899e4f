//! End-to-end tests for the `ddstat` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

/// A `ddstat` command isolated from the caller's config and log settings.
fn ddstat() -> Command {
    let mut cmd = cargo_bin_cmd!("ddstat");
    cmd.env_remove("DDSTAT_CONFIG")
        .env_remove("DDSTAT_CONFIG_DIR")
        .env_remove("DDSTAT_LOG")
        .env_remove("DDSTAT_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", "/nonexistent/ddstat-test-xdg");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is not JSON")
}

fn approx(value: &Value, expected: f64, tol: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < tol)
        .unwrap_or(false)
}

fn experiments_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[experiment]]
name = "two-events"
observed = 2
background = 0.6
signal = 4.0
intervals = [1.0, 2.0, 1.0]

[[experiment]]
name = "empty"
observed = 0
signal = 1.5
"#
    )
    .unwrap();
    file
}

// ============================================================================
// Help
// ============================================================================

mod help {
    use super::*;

    #[test]
    fn help_lists_commands() {
        ddstat()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("likelihood"))
            .stdout(predicate::str::contains("pvalue"))
            .stdout(predicate::str::contains("scale"))
            .stdout(predicate::str::contains("interval"))
            .stdout(predicate::str::contains("summary"));
    }

    #[test]
    fn version_flag_works() {
        ddstat()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ddstat"));
    }

    #[test]
    fn missing_subcommand_is_args_error() {
        ddstat().assert().code(10);
    }
}

// ============================================================================
// Single-experiment commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn likelihood_json() {
        let json = json_stdout(ddstat().args(["likelihood", "-n", "2", "-b", "1", "-s", "2"]));
        assert_eq!(json["observed"], 2);
        assert!(approx(&json["log_likelihood"], 4.5f64.ln() - 3.0, 1e-12));
    }

    #[test]
    fn likelihood_human() {
        ddstat()
            .args(["-f", "human", "likelihood", "-n", "2", "-b", "1", "-s", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Log-likelihood"))
            .stdout(predicate::str::contains("-1.4959"));
    }

    #[test]
    fn pvalue_poisson_zero_events() {
        let json = json_stdout(ddstat().args(["pvalue", "-n", "0", "-s", "3"]));
        assert_eq!(json["method"], "poisson");
        assert_eq!(json["log_p_value"], -3.0);
    }

    #[test]
    fn pvalue_maximum_gap_with_intervals() {
        let json = json_stdout(ddstat().args([
            "pvalue",
            "-n",
            "1",
            "-s",
            "3",
            "--intervals",
            "1,2",
        ]));
        assert_eq!(json["method"], "maximum_gap");
        assert!(approx(&json["max_interval_fraction"], 2.0 / 3.0, 1e-12));
    }

    #[test]
    fn pvalue_drops_mismatched_intervals() {
        let json = json_stdout(ddstat().args(["pvalue", "-n", "1", "-s", "3", "--intervals", "1"]));
        assert_eq!(json["method"], "poisson");
        assert!(json["max_interval_fraction"].is_null());
    }

    #[test]
    fn scale_matches_classical_limit() {
        let json = json_stdout(ddstat().args(["scale", "-n", "10", "-s", "1", "--cl", "0.9"]));
        assert!(approx(&json["scale"], 15.4066, 1e-3), "{json}");
        assert!(approx(&json["confidence_level"], 0.9, 1e-12));
    }

    #[test]
    fn scale_without_signal_is_null() {
        let json = json_stdout(ddstat().args(["scale", "-n", "3", "-s", "0"]));
        assert!(json["scale"].is_null());
    }

    #[test]
    fn interval_with_explicit_lnp() {
        let json = json_stdout(ddstat().args([
            "interval",
            "-n",
            "3",
            "-b",
            "1",
            "--lnp=-2.302585092994046",
        ]));
        assert!(approx(&json["lower"], 0.102, 0.01), "{json}");
        assert!(approx(&json["upper"], 6.425, 0.01), "{json}");
    }

    #[test]
    fn interval_degenerate() {
        let json = json_stdout(ddstat().args(["interval", "-n", "0", "-b", "4", "--cl", "0.6"]));
        assert_eq!(json["lower"], 0.0);
        assert_eq!(json["upper"], 0.0);
    }

    #[test]
    fn interval_human() {
        ddstat()
            .args(["--format", "human", "interval", "-n", "0", "--cl", "0.9"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("90% CL interval: [0.0000, 2.43"));
    }
}

// ============================================================================
// Errors and exit codes
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn invalid_confidence_level() {
        ddstat()
            .args(["interval", "-n", "1", "--cl", "1.5"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("ERR_ARGS"))
            .stderr(predicate::str::contains("confidence level"));
    }

    #[test]
    fn conflicting_targets() {
        ddstat()
            .args(["interval", "-n", "1", "--lnp=-1", "--cl", "0.9"])
            .assert()
            .code(10);
    }

    #[test]
    fn missing_config_file() {
        ddstat()
            .args(["--config", "/nonexistent/ddstat.toml", "interval", "-n", "1"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("ERR_CONFIG"));
    }

    #[test]
    fn invalid_config_value() {
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "[root]\nx_tolerance = -1.0").unwrap();
        ddstat()
            .arg("--config")
            .arg(config.path())
            .args(["interval", "-n", "1"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("root.x_tolerance"));
    }

    #[test]
    fn missing_input_file() {
        ddstat()
            .args(["summary", "--input", "/nonexistent/experiments.toml"])
            .assert()
            .code(21)
            .stderr(predicate::str::contains("ERR_IO"));
    }

    #[test]
    fn human_errors_are_plain_text() {
        ddstat()
            .args(["-f", "human", "interval", "-n", "1", "--cl", "2"])
            .assert()
            .code(10)
            .stderr(predicate::str::starts_with("Error:"));
    }
}

// ============================================================================
// Configuration, batch input, and logging
// ============================================================================

mod integration {
    use super::*;

    #[test]
    fn config_sets_default_target() {
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "[analysis]\ndefault_lnp = -2.995732273553991").unwrap();
        let json = json_stdout(
            ddstat()
                .arg("--config")
                .arg(config.path())
                .args(["interval", "-n", "3", "-b", "1"]),
        );
        assert!(approx(&json["confidence_level"], 0.95, 1e-9), "{json}");
    }

    #[test]
    fn config_from_environment() {
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "[analysis]\ndefault_lnp = -1.6094379124341003").unwrap();
        let json = json_stdout(
            ddstat()
                .env("DDSTAT_CONFIG", config.path())
                .args(["scale", "-n", "0", "-s", "1"]),
        );
        // N = 0 scales in closed form: x = -lnp / s
        assert!(approx(&json["scale"], 1.6094379124341003, 1e-12), "{json}");
    }

    #[test]
    fn summary_json() {
        let input = experiments_file();
        let json = json_stdout(ddstat().arg("summary").arg("--input").arg(input.path()));
        let experiments = json["experiments"].as_array().unwrap();
        assert_eq!(experiments.len(), 2);
        assert_eq!(experiments[0]["name"], "two-events");
        assert_eq!(experiments[0]["has_intervals"], true);
        assert_eq!(experiments[1]["log_p_value"], -1.5);
    }

    #[test]
    fn summary_human_table() {
        let input = experiments_file();
        ddstat()
            .args(["-f", "human", "summary", "--cl", "0.9", "--input"])
            .arg(input.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("two-events"))
            .stdout(predicate::str::contains("Observed events"))
            .stdout(predicate::str::contains("Rescaling for 90% CL*"));
    }

    #[test]
    fn jsonl_logs_go_to_stderr() {
        ddstat()
            .args(["-vv", "--log-format", "jsonl", "pvalue", "-n", "0", "-s", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("log_p_value"))
            .stdout(predicate::str::contains("run.started").not())
            .stderr(predicate::str::contains("\"event\":\"run.started\""));
    }

    #[test]
    fn negative_background_is_clamped() {
        let json = json_stdout(ddstat().args(["likelihood", "-n", "0", "-b", "-2", "-s", "1"]));
        assert_eq!(json["background"], 0.0);
        assert_eq!(json["log_likelihood"], -1.0);
    }
}
