use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_agent::evaluation::{evaluate_and_save, NatsEvaluator};
use interview_agent::recording::{NatsEgressBackend, RecordingBackend};
use interview_agent::{
    create_router, prompts, AppState, Config, InterviewController, InterviewJob, NatsBackends,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "interview-agent", version, about = "Voice AI job interview agent")]
struct Cli {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/interview-agent")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,

    /// Run one interview and block until it has been cleaned up
    Run {
        /// Room to join
        #[arg(long)]
        room: String,

        /// Job metadata JSON, e.g. '{"candidate_id":"c-1","job_role":"data_scientist"}'
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Score a saved transcript
    Evaluate {
        /// Plain-text transcript file
        transcript: PathBuf,

        #[arg(long, default_value = prompts::DEFAULT_ROLE)]
        role: String,

        #[arg(long, default_value = "unknown")]
        candidate: String,

        /// Also write the Markdown report
        #[arg(long)]
        report: bool,
    },

    /// List the known job roles
    Roles,

    /// List recording jobs and their download URLs
    Recordings {
        /// Only recordings of this room
        #[arg(long)]
        room: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let level = cfg.service.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let cfg = Arc::new(cfg);
    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Run { room, metadata } => run(cfg, room, metadata).await,
        Command::Evaluate {
            transcript,
            role,
            candidate,
            report,
        } => evaluate(cfg, transcript, role, candidate, report).await,
        Command::Roles => {
            for role in prompts::available_roles() {
                println!("{}", role);
            }
            Ok(())
        }
        Command::Recordings { room } => recordings(cfg, room).await,
    }
}

async fn serve(cfg: Arc<Config>) -> Result<()> {
    let backends = Arc::new(NatsBackends::connect(cfg.clone()).await?);
    let evaluator = Arc::new(NatsEvaluator::new(backends.client().clone()));

    let recordings = Arc::new(NatsEgressBackend::new(backends.client().clone()));

    let state = AppState::new(cfg.clone(), backends)
        .with_evaluator(evaluator)
        .with_recordings(recordings);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run(cfg: Arc<Config>, room: String, metadata: Option<String>) -> Result<()> {
    let backends = NatsBackends::connect(cfg.clone()).await?;
    let job = InterviewJob::new(room, metadata);
    let controller = InterviewController::new(cfg.clone(), job, &backends).await?;

    let session = controller.session();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, ending interview");
            session.terminate(interview_agent::EndReason::Stopped);
        }
    });

    let result = controller.start_interview().await;
    ctrl_c.abort();
    let outcome = result?;

    info!(
        "Interview {} ended ({}), transcript: {}",
        outcome.session_id,
        outcome.cleanup.reason.as_str(),
        outcome.cleanup.transcript_key.as_deref().unwrap_or("not saved")
    );
    if let Some(url) = outcome.cleanup.recording.download_url() {
        info!("Recording: {}", url);
    }

    if cfg.evaluation.auto_evaluate && controller.transcript().len().await > 0 {
        let evaluator = NatsEvaluator::new(backends.client().clone());
        let text = controller.transcript().format().await;
        let files = evaluate_and_save(
            &evaluator,
            &cfg.evaluation,
            &text,
            &outcome.job_role,
            &outcome.candidate_id,
        )
        .await?;
        info!("Evaluation saved to {}", files.json.display());
    }

    Ok(())
}

async fn evaluate(
    cfg: Arc<Config>,
    transcript: PathBuf,
    role: String,
    candidate: String,
    report: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&transcript)
        .await
        .with_context(|| format!("Failed to read {}", transcript.display()))?;

    let client = interview_agent::NatsClient::connect(&cfg.nats.url).await?;
    let evaluator = NatsEvaluator::new(client);

    let mut eval_cfg = cfg.evaluation.clone();
    eval_cfg.write_report |= report;

    let files = evaluate_and_save(&evaluator, &eval_cfg, &text, &role, &candidate).await?;

    println!(
        "{}: {}/10 ({})",
        candidate, files.evaluation.overall_score, files.evaluation.recommendation
    );
    println!("JSON: {}", files.json.display());
    if let Some(path) = files.report {
        println!("Report: {}", path.display());
    }
    Ok(())
}

async fn recordings(cfg: Arc<Config>, room: Option<String>) -> Result<()> {
    let backend = NatsEgressBackend::connect(&cfg.nats.url).await?;
    let listed = backend.list_recordings(room.as_deref()).await;
    backend.close().await?;
    let listed = listed?;

    if listed.is_empty() {
        match room {
            Some(room) => println!("No recordings found for room {}", room),
            None => println!("No recordings found"),
        }
        return Ok(());
    }

    for (i, recording) in listed.iter().enumerate() {
        println!("{}. Recording ID: {}", i + 1, recording.handle);
        println!("   Room: {}", recording.room_name);
        println!("   Status: {:?}", recording.status);
        if let Some(started) = recording.started_at {
            println!("   Started: {}", started.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        for artifact in &recording.artifacts {
            println!("   File: {}", artifact.filename);
        }
        for (_, url) in recording.downloads() {
            println!("   Download URL: {}", url);
        }
    }
    Ok(())
}
