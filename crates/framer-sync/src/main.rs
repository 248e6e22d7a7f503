use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use framer_core::{
    FeedbackInput, FrameType, FrameUpdate, HeuristicEvaluator, Language, Outcome, UserPerspective,
};
use framer_sync::{FrameStore, SyncConfig, SyncMode};
use framer_wire::{decode_frame_at, encode_frame, FrameResponse};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    Command::new("framer")
        .version(framer_sync::VERSION)
        .about("Frame state synchronization engine")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .global(true)
                .help("local or remote"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Backend base URL"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .help("Acting user id"),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .global(true)
                .help("Display language (en or zh)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Remote call timeout in seconds"),
        )
        .subcommand(
            Command::new("demo")
                .about("Walk a bug frame through its whole lifecycle locally")
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Seed for heuristic jitter"),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Decode a frame payload and print heuristic issues")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("FrameResponse JSON"),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Check that decode/encode/decode is stable for a payload")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("FrameResponse JSON"),
                ),
        )
        .subcommand(Command::new("config").about("Print the resolved configuration"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn resolve_config(matches: &ArgMatches) -> Result<SyncConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = SyncConfig::load(path.map(PathBuf::as_path))
        .with_context(|| format!("loading configuration from {path:?}"))?;

    if let Some(mode) = matches.get_one::<String>("mode") {
        config = config.with_mode(mode.parse::<SyncMode>()?);
    }
    if let Some(url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(url);
    }
    if let Some(user) = matches.get_one::<String>("user") {
        config = config.with_current_user(user);
    }
    if let Some(lang) = matches.get_one::<String>("lang") {
        config = config.with_language(lang.parse::<Language>()?);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(Duration::from_secs(*secs));
    }
    config.validate()?;
    Ok(config)
}

fn read_payload(path: &Path) -> Result<FrameResponse> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("parsing {}", path.display()))
}

async fn run_demo(config: SyncConfig, seed: u64) -> Result<()> {
    let evaluator = HeuristicEvaluator::seeded(seed, config.heuristic_jitter);
    let store = FrameStore::new(config, None, evaluator);

    let frame = store.create_frame(FrameType::Bug).await?;
    let id = frame.id.clone();
    let id = id.as_str();
    println!("Created {} ({}, {})", frame.id, frame.frame_type, frame.status);

    store
        .update_frame(
            id,
            FrameUpdate::new()
                .with_problem_statement("Login fails on Safari after the session refresh")
                .with_root_cause("Refresh cookie is set with SameSite=None but without Secure")
                .with_user_perspective(UserPerspective {
                    persona: "Returning customer".to_string(),
                    context: "Signs in on an iPad".to_string(),
                    journey_steps: vec![
                        "Open the app".to_string(),
                        "Tap sign in".to_string(),
                    ],
                    pain_points: vec!["Bounced back to the login page".to_string()],
                }),
        )
        .await?;

    let reviewed = store.submit_for_review(id, Some("reviewer".to_string())).await?;
    println!("Submitted for review ({})", reviewed.status);
    if let Some(ai) = &reviewed.ai {
        println!("  Score: {}", ai.score);
        for issue in &ai.issues {
            let section = issue.section.map_or_else(|| "general".to_string(), |s| s.to_string());
            println!("  [{}] {section}: {}", issue.severity, issue.message);
        }
    }

    store.mark_as_ready(id).await?;
    store.start_feedback(id).await?;
    let archived = store
        .submit_feedback(
            id,
            FeedbackInput::new(Outcome::Success, "Cookie flags fixed; login works on Safari")
                .with_lesson("Test auth flows on WebKit before release")
                .with_assumption("Only Safari is affected", true),
        )
        .await?;
    println!("Archived ({})", archived.status);
    if let Some(feedback) = &archived.feedback {
        println!("{}", feedback.to_text());
    }
    println!(
        "Working: {}  Archived: {}",
        store.working_frames().len(),
        store.archived_frames().len()
    );
    Ok(())
}

fn run_evaluate(config: &SyncConfig, path: &Path) -> Result<()> {
    let now = Utc::now();
    let frame = decode_frame_at(&read_payload(path)?, now)?;
    let evaluation =
        HeuristicEvaluator::new(config.heuristic_jitter).evaluate(&frame, config.language, now);

    println!("Frame: {} ({}, {})", frame.id, frame.frame_type, frame.status);
    println!("Score: {}", evaluation.score);
    if let Some(breakdown) = &evaluation.breakdown {
        for (criterion, value) in breakdown.iter() {
            println!("  {criterion}: {value}");
        }
    }
    if evaluation.issues.is_empty() {
        println!("No issues");
    }
    for issue in &evaluation.issues {
        let section = issue.section.map_or_else(|| "general".to_string(), |s| s.to_string());
        println!("[{}] {section}: {}", issue.severity, issue.message);
    }
    Ok(())
}

fn run_roundtrip(path: &Path) -> Result<bool> {
    let now = Utc::now();
    let first = decode_frame_at(&read_payload(path)?, now)?;
    let encoded = serde_json::to_string(&encode_frame(&first))?;
    let reparsed: FrameResponse = serde_json::from_str(&encoded)?;
    let second = decode_frame_at(&reparsed, now)?;

    if first == second {
        println!("{}: stable", first.id);
        Ok(true)
    } else {
        println!("{}: mismatch after re-decoding", first.id);
        println!("{}", serde_json::to_string_pretty(&reparsed)?);
        Ok(false)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = resolve_config(&matches)?;

    match matches.subcommand() {
        Some(("demo", args)) => {
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            run_demo(config.with_mode(SyncMode::LocalOnly), seed).await
        }
        Some(("evaluate", args)) => {
            let Some(path) = args.get_one::<PathBuf>("file") else {
                bail!("--file is required");
            };
            run_evaluate(&config, path)
        }
        Some(("roundtrip", args)) => {
            let Some(path) = args.get_one::<PathBuf>("file") else {
                bail!("--file is required");
            };
            if !run_roundtrip(path)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(("config", _)) => {
            print!("{}", config.to_toml_redacted()?);
            Ok(())
        }
        _ => bail!("unknown command"),
    }
}
