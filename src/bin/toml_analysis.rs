use clap::Parser;
use solar_adoption::core::{AnalysisSettings, DetectionSource};
use solar_adoption::utils::error::ErrorSeverity;
use solar_adoption::utils::{logger, validation::Validate};
use solar_adoption::{AnalysisEngine, AnalysisPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-analysis")]
#[command(about = "Rooftop solar analysis driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "solar-analysis.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override output directory from config
    #[arg(long)]
    output_path: Option<String>,

    /// Show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置 (日誌格式由配置決定，所以先載入)
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based solar analysis");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(output_path) = &args.output_path {
        config.load.output_path = output_path.clone();
        tracing::info!("🔧 Output path overridden to: {}", output_path);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = AnalysisPipeline::new(storage, config);
    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Analysis completed successfully!");
            println!("✅ Analysis completed successfully!");
            println!("📁 Reports saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!("  Analysis: {}", config.analysis.name);
    if !config.analysis.description.is_empty() {
        println!("  Description: {}", config.analysis.description);
    }
    match config.source() {
        DetectionSource::File { path } => println!("  Source: file {}", path),
        DetectionSource::Api { endpoint, .. } => println!("  Source: api {}", endpoint),
    }
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    if let Some(max_frames) = config.max_frames() {
        println!("  Max Frames: {}", max_frames);
    }
    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Detection Source:");
    match config.source() {
        DetectionSource::File { path } => {
            println!("  File: {}", path);
            println!(
                "  Exists: {}",
                if std::path::Path::new(&path).exists() { "yes" } else { "NO" }
            );
        }
        DetectionSource::Api {
            endpoint,
            headers,
            timeout_seconds,
        } => {
            println!("  Endpoint: {}", endpoint);
            println!("  Headers: {} custom headers", headers.len());
            if let Some(timeout) = timeout_seconds {
                println!("  Timeout: {}s", timeout);
            }
        }
    }
    println!(
        "  Format: {}",
        config.source.format.as_deref().unwrap_or("inferred from extension")
    );

    println!();
    println!("⚙️ Detection Filters:");
    println!("  Rooftop confidence >= {}", config.detection.rooftop_confidence);
    println!("  Panel confidence >= {}", config.detection.panel_confidence);

    let tracking = config.tracker_config();
    println!();
    println!("🛰️ Tracking:");
    println!("  Activation threshold: {}", tracking.track_activation_threshold);
    println!("  Match IoU >= {}", tracking.match_iou_threshold);
    println!(
        "  Lost track buffer: {} frames at {} fps ({} frames kept)",
        tracking.lost_track_buffer,
        tracking.frame_rate,
        tracking.max_frames_lost()
    );
    println!(
        "  Minimum consecutive frames: {}",
        tracking.minimum_consecutive_frames
    );

    let matching = config.match_config();
    println!();
    println!("🔗 Panel Matching:");
    println!("  Strategy: {:?}, threshold > {}", matching.strategy, matching.threshold);

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    if let Some(archive) = config.archive_name() {
        println!("  Compression: {} (ZIP)", archive);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
