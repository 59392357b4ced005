use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use miniob_test_harness::cases;
use miniob_test_harness::cli::{verbosity_filter, HarnessCli, HarnessCommand};
use miniob_test_harness::config::HarnessConfig;
use miniob_test_harness::report;
use miniob_test_harness::suite::{load_script_cases, load_text_cases, SuiteRunner};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = HarnessCli::parse();
    init_tracing(cli.verbose);

    let config = match HarnessConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    let cases = match discover_cases(&config) {
        Ok(cases) => cases,
        Err(err) => {
            eprintln!("failed to load test cases: {err}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        HarnessCommand::List => {
            for case in &cases {
                println!("{}", case.name);
            }
            ExitCode::SUCCESS
        }
        HarnessCommand::Dryrun => {
            let runner = SuiteRunner::new(config);
            let result = runner.dryrun_all("dryrun", &cases).await;
            print!("{}", report::render_text(&result, &cases));
            write_json_report(cli.report_json.as_deref(), &result, &cases);
            exit_code(result.exit_code())
        }
        HarnessCommand::Run { cases: selected } => {
            let runner = SuiteRunner::new(config);
            let result = if selected.is_empty() {
                runner.run("default", &cases).await
            } else {
                runner.run_selected("default", &cases, &selected).await
            };
            print!("{}", report::render_text(&result, &cases));
            write_json_report(cli.report_json.as_deref(), &result, &cases);
            exit_code(result.exit_code())
        }
    }
}

/// Union of the compiled-in example cases and any `<name>.test`/`<name>.result`
/// pairs discovered under `config.test_case_dir`, deduplicated and sorted by
/// [`load_script_cases`]/[`load_text_cases`]'s shared validation pass.
fn discover_cases(config: &HarnessConfig) -> miniob_test_harness::error::Result<Vec<miniob_test_harness::model::TestCase>> {
    let mut all = load_script_cases(cases::CASE_FACTORIES)?;
    if config.test_case_dir.is_dir() {
        let text_cases = load_text_cases(&config.test_case_dir)?;
        all.extend(text_cases);
    }
    Ok(all)
}

fn write_json_report(path: Option<&std::path::Path>, result: &miniob_test_harness::suite::TestResult, cases: &[miniob_test_harness::model::TestCase]) {
    let Some(path) = path else {
        return;
    };
    let value = report::render_json(result, cases);
    if let Err(err) = std::fs::write(path, value.to_string()) {
        eprintln!("failed to write JSON report to {}: {err}", path.display());
    }
}

fn init_tracing(verbosity: u8) {
    let filter: EnvFilter = verbosity_filter(verbosity);
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
