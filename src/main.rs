//! BidGuard command line.
//!
//! Loads the reference costs for a region, applies the contract scope and
//! operating-risk profile, and prints the monthly projection with its verdict.
//!
//! Example:
//!   bidguard --region MG --risk high --revenue-cap 45000 --hours 200 \
//!       --account me@example.com --override diesel=6.10 --report

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::{info, warn};

use bidguard::{
    app::SessionHandle,
    config::{
        SourceConfig, DEFAULT_MACHINE_TYPE, DEFAULT_MACHINE_VALUE, ENV_API_KEY, ENV_BASE_URL,
        ENV_MACHINE_TYPE,
    },
    domain::{
        CalculationResult, CostField, Entitlement, FetchOutcome, FetchState, RegionCode,
        RiskLevel, ScopeConfig, Session,
    },
    infra::SupabaseClient,
    util::{
        format::format_brl,
        logging::{init_logging, LogFormat},
        version::{version_label, APP_NAME},
    },
};

#[derive(Parser)]
#[command(name = "bidguard")]
#[command(version, about = "Estimate whether a heavy-equipment rental tender pays off")]
struct Cli {
    /// State code selecting the reference cost data
    #[arg(short, long, default_value = "SP")]
    region: RegionCode,

    /// Operating risk profile: low, medium, high
    #[arg(long, default_value = "medium")]
    risk: RiskLevel,

    /// Contract duration in months
    #[arg(long, default_value_t = 12)]
    months: u32,

    /// Monthly hour allowance
    #[arg(long, default_value_t = 200.0)]
    hours: f64,

    /// Monthly revenue cap from the tender notice
    #[arg(long, default_value_t = 45_000.0)]
    revenue_cap: f64,

    /// Operator labor is not part of the contract
    #[arg(long)]
    no_operator: bool,

    /// Fuel is not part of the contract
    #[arg(long)]
    no_fuel: bool,

    /// Cost override as FIELD=VALUE (diesel, salary, machine); premium only
    #[arg(long = "override", value_parser = parse_override_arg)]
    overrides: Vec<(CostField, String)>,

    /// Account e-mail used for the premium lookup
    #[arg(long)]
    account: Option<String>,

    /// Write the audit report; defaults to a dated file name in the current directory
    #[arg(long, num_args = 0..=1)]
    report: Option<Option<PathBuf>>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Reference-data base URL
    #[arg(long, env = ENV_BASE_URL)]
    supabase_url: String,

    /// Reference-data API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    supabase_key: String,

    /// Machine type for the consumption and maintenance lookup
    #[arg(long, env = ENV_MACHINE_TYPE, default_value = DEFAULT_MACHINE_TYPE)]
    machine_type: String,

    /// Machine reference value
    #[arg(long, default_value_t = DEFAULT_MACHINE_VALUE)]
    machine_value: f64,

    /// Log output format: pretty, compact, json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_override_arg(raw: &str) -> Result<(CostField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got {raw}"))?;
    Ok((field.parse()?, value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = SourceConfig::new(&cli.supabase_url, cli.supabase_key.clone())?
        .with_machine_type(cli.machine_type.clone())
        .with_machine_value(cli.machine_value)?;
    let client = SupabaseClient::new(config)?;
    let handle = SessionHandle::new(Session::new(Entitlement::Free));

    handle
        .set_scope(ScopeConfig {
            contract_months: cli.months,
            monthly_hours: cli.hours,
            revenue_cap: cli.revenue_cap,
            has_operator: !cli.no_operator,
            has_fuel: !cli.no_fuel,
        })
        .await?;
    handle.set_risk_level(cli.risk).await;

    if let Some(account) = cli.account.as_deref() {
        let entitlement = handle.refresh_entitlement(&client, account).await;
        info!(premium = entitlement.is_premium(), "entitlement resolved");
    }

    if handle.select_region(&client, cli.region.clone()).await != FetchOutcome::Applied {
        let reason = handle
            .with_session(|s| match s.fetch_state() {
                FetchState::Unavailable { reason } => reason.clone(),
                _ => "unknown".to_string(),
            })
            .await;
        eprintln!("Cost parameters for {} are unavailable: {reason}", cli.region);
        return Ok(ExitCode::FAILURE);
    }

    for (field, value) in &cli.overrides {
        if !handle.set_override(*field, value).await {
            warn!(field = field.key(), "override refused; premium access required");
        }
    }

    let Some(result) = handle.result().await else {
        eprintln!("No result available.");
        return Ok(ExitCode::FAILURE);
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&cli, &result);
    }

    if let Some(target) = cli.report {
        match handle.report_snapshot().await {
            Ok(snapshot) => {
                let path = target.unwrap_or_else(|| PathBuf::from(snapshot.file_name()));
                std::fs::write(&path, snapshot.render_text())?;
                println!("Report written to {}", path.display());
            }
            Err(err) => {
                eprintln!("Report not generated: {err}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(cli: &Cli, result: &CalculationResult) {
    println!("{APP_NAME} {} | {} | risco {}", version_label(), cli.region, cli.risk.label());
    println!("{:<28}{:>20}", "Receita Teto", format_brl(cli.revenue_cap));
    println!(
        "{:<28}{:>20}",
        "Custo Estimado",
        format!("- {}", format_brl(result.total_monthly_cost))
    );
    println!(
        "{:<28}{:>20}",
        "Resultado Operacional",
        format_brl(result.projected_profit)
    );
    println!("{:<28}{:>19.1}%", "Margem", result.margin_percent);
    println!(
        "{:<28}{:>20}",
        "Break-Even / Hora",
        format_brl(result.hourly_break_even)
    );
    println!(
        "{:<28}{:>20}",
        "Resultado no Contrato",
        format_brl(result.total_contract_profit)
    );
    println!("{} - {}", result.status.label(), result.status.description());
}
