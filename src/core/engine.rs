use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::ProcessMonitor;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: ProcessMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        let monitor = ProcessMonitor::new(monitor_enabled);
        if monitor.is_enabled() {
            tracing::info!("🔍 Process monitoring enabled");
        } else if monitor_enabled {
            tracing::warn!("Process monitoring requested but not available in this build");
        }
        Self { pipeline, monitor }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitor.is_enabled()
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting rooftop solar analysis...");
        self.monitor.log_stats("Start");

        tracing::info!("Extracting detections...");
        let frames = self.pipeline.extract().await?;
        tracing::info!("Extracted {} frames", frames.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Tracking and counting rooftops...");
        let result = self.pipeline.transform(frames).await?;
        tracing::info!(
            "Analyzed {} frames, {} unique rooftops",
            result.frames.len(),
            result.summary.total_rooftops
        );
        self.monitor.log_stats("Transform");

        tracing::info!("Writing reports...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
