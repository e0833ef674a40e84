use anyhow::Result;
use httpmock::prelude::*;
use solar_adoption::core::Pipeline;
use solar_adoption::{AnalysisEngine, AnalysisPipeline, LocalStorage, TomlConfig};
use tempfile::TempDir;

/// A rooftop that leaves the frame and comes back within the lost-track
/// buffer keeps its ID and is counted once.
fn occluded_pass() -> String {
    let mut frames = Vec::new();
    for index in 0..6u64 {
        let rooftops = if index == 2 || index == 3 {
            // house A hidden under a tree
            serde_json::json!([{"bbox": [300, 0, 380, 80], "confidence": 0.9}])
        } else {
            serde_json::json!([
                {"bbox": [0, 0, 80, 80], "confidence": 0.9},
                {"bbox": [300, 0, 380, 80], "confidence": 0.9}
            ])
        };
        let panels = if index == 4 {
            serde_json::json!([{"polygon": [[10, 10], [40, 10], [40, 30], [10, 30]], "confidence": 0.6}])
        } else {
            serde_json::json!([])
        };
        frames.push(serde_json::json!({
            "frame_index": index,
            "rooftops": rooftops,
            "panels": panels
        }));
    }
    frames
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_config(dir: &TempDir, body: &str) -> Result<TomlConfig> {
    let path = dir.path().join("solar-analysis.toml");
    std::fs::write(&path, body)?;
    Ok(TomlConfig::from_file(&path)?)
}

#[tokio::test]
async fn test_occluded_rooftop_counted_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("pass.jsonl");
    std::fs::write(&input, occluded_pass())?;
    let output = temp_dir.path().join("out");

    let config = write_config(
        &temp_dir,
        &format!(
            r#"
[analysis]
name = "occlusion"

[source]
type = "file"
path = "{}"

[tracking]
lost_track_buffer = 5

[matching]
strategy = "coverage"
threshold = 0.5

[load]
output_path = "{}"
output_formats = ["json"]
"#,
            input.display(),
            output.display()
        ),
    )?;

    let pipeline = AnalysisPipeline::new(LocalStorage::new(&output), config);
    let frames = pipeline.extract().await?;
    assert_eq!(frames.len(), 6);

    let result = pipeline.transform(frames).await?;
    assert_eq!(result.summary.total_rooftops, 2);
    assert_eq!(result.summary.with_solar, 1);

    let house_a = &result.rooftops[0];
    assert_eq!(house_a.tracker_id, 1);
    assert_eq!(house_a.frames_observed, 4);
    assert_eq!(house_a.first_solar_frame, Some(4));
    assert_eq!(result.frames[4].rooftops[0].label, "#1 Rooftop (Solar)");
    assert_eq!(result.frames[5].rooftops[0].label, "#1 Rooftop (No Solar)");

    pipeline.load(result).await?;
    assert!(output.join("summary.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_short_buffer_recounts_rooftop() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("pass.jsonl");
    std::fs::write(&input, occluded_pass())?;

    let config = write_config(
        &temp_dir,
        &format!(
            r#"
[analysis]
name = "short-buffer"

[source]
type = "file"
path = "{}"

[tracking]
lost_track_buffer = 1

[load]
output_path = "{}"
output_formats = ["csv"]
"#,
            input.display(),
            temp_dir.path().display()
        ),
    )?;

    let pipeline = AnalysisPipeline::new(LocalStorage::new(temp_dir.path()), config);
    let frames = pipeline.extract().await?;
    let result = pipeline.transform(frames).await?;

    // house A is forgotten during the occlusion and returns under a new ID
    assert_eq!(result.summary.total_rooftops, 3);
    let returned: Vec<u64> = result.frames[4].rooftops.iter().map(|r| r.tracker_id).collect();
    assert_eq!(returned, vec![3, 2]);
    Ok(())
}

#[tokio::test]
async fn test_api_source_with_headers_and_compression() -> Result<()> {
    std::env::set_var("SOLAR_TEST_TOKEN", "abc123");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/runs/7")
            .header("Authorization", "Bearer abc123");
        then.status(200)
            .header("Content-Type", "application/x-ndjson")
            .body(occluded_pass());
    });

    let temp_dir = TempDir::new()?;
    let config = write_config(
        &temp_dir,
        &format!(
            r#"
[analysis]
name = "remote"

[source]
type = "api"
endpoint = "{}"
format = "jsonl"
timeout_seconds = 5
max_frames = 3
headers = {{ Authorization = "Bearer ${{SOLAR_TEST_TOKEN}}" }}

[load]
output_path = "{}"
output_formats = ["csv", "json"]
compression = {{ enabled = true, filename = "run-7.zip" }}
"#,
            server.url("/runs/7"),
            temp_dir.path().display()
        ),
    )?;

    let pipeline = AnalysisPipeline::new(LocalStorage::new(temp_dir.path()), config);
    let output_path = AnalysisEngine::new(pipeline).run().await?;

    api_mock.assert();
    assert!(output_path.ends_with("run-7.zip"));

    let zip_data = std::fs::read(temp_dir.path().join("run-7.zip"))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    let mut frames_csv = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("frames.csv")?, &mut frames_csv)?;
    // header plus the three frames allowed by max_frames
    assert_eq!(frames_csv.lines().count(), 4);

    std::env::remove_var("SOLAR_TEST_TOKEN");
    Ok(())
}
