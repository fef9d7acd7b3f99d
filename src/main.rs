use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

use tennislens::probe::{is_supported_video, probe_duration};
use tennislens::session::progress::{filled_segments, step_states, StepState, PROGRESS_SEGMENTS, STEP_TITLES};
use tennislens::timecode::{format_duration, format_file_size, format_time};
use tennislens::{
    logging, AnalysisSession, AppState, ClientConfig, CommittedRange, HttpAnalysisClient, SessionError,
    SessionEvent, SessionPhase, TrimSelector, VideoFile,
};

const USAGE: &str = "Usage: tennislens <video> [--start M:SS] [--end M:SS] [--duration SECONDS]";

#[derive(Debug, Clone, PartialEq)]
struct CliArgs {
    video: PathBuf,
    start: Option<String>,
    end: Option<String>,
    duration: Option<f64>,
}

fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut video = None;
    let mut start = None;
    let mut end = None;
    let mut duration = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" => start = Some(args.next().ok_or("--start needs a value")?),
            "--end" => end = Some(args.next().ok_or("--end needs a value")?),
            "--duration" => {
                let raw = args.next().ok_or("--duration needs a value")?;
                let seconds = raw
                    .parse::<f64>()
                    .map_err(|_| format!("--duration must be a number of seconds, got {:?}", raw))?;
                duration = Some(seconds);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with("--") => return Err(format!("Unknown option {}\n{}", other, USAGE)),
            other => {
                if video.replace(PathBuf::from(other)).is_some() {
                    return Err(format!("Only one video can be analyzed at a time\n{}", USAGE));
                }
            }
        }
    }

    Ok(CliArgs {
        video: video.ok_or_else(|| USAGE.to_string())?,
        start,
        end,
        duration,
    })
}

fn prompt(label: &str, current: &str) -> io::Result<String> {
    print!("{} [{}]: ", label, current);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Apply typed bounds; blank values keep the current handle
fn apply_range(selector: &mut TrimSelector, start: Option<&str>, end: Option<&str>) {
    let start = start.filter(|s| !s.is_empty());
    let end = end.filter(|s| !s.is_empty());

    // end first so a start past the current end still fits
    if let Some(end) = end {
        selector.set_end_text(end);
    }
    if let Some(start) = start {
        selector.set_start_text(start);
    }
    if let Some(end) = end {
        selector.set_end_text(end);
    }
}

fn print_selection(selector: &TrimSelector) {
    let range = selector.committed();
    print!(
        "✂️  Selection: {} → {} ({})",
        range.start,
        range.end,
        format_time(selector.selection_duration())
    );
    if selector.is_long_selection() {
        print!("  (Long videos may take more time)");
    }
    println!();
}

/// Pending alerts, or the error itself when the session raised none
fn start_failure_lines(events: &mut UnboundedReceiver<SessionEvent>, error: &SessionError) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Alert(text) = event {
            lines.push(format!("⚠️  {}", text));
        }
    }
    if lines.is_empty() {
        lines.push(format!("❌ {}", error));
    }
    lines
}

fn progress_bar(progress: f64) -> String {
    let filled = filled_segments(progress);
    format!("{}{}", "█".repeat(filled), "░".repeat(PROGRESS_SEGMENTS - filled))
}

fn render_steps(step: usize, progress: f64) -> String {
    step_states(step, progress)
        .iter()
        .zip(STEP_TITLES.iter())
        .map(|(state, title)| match state {
            StepState::Done => format!("✓ {}", title),
            StepState::Active => format!("▶ {}", title),
            StepState::Pending => format!("· {}", title),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::init_logging()?;

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };
    let config = ClientConfig::from_env()?;

    if !is_supported_video(&args.video) {
        eprintln!("❌ Please upload a valid video file.");
        std::process::exit(2);
    }

    let file = VideoFile::open(&args.video).await?;
    let duration = match args.duration {
        Some(seconds) => seconds,
        None => probe_duration(&args.video).await?,
    };

    println!("🎾 TennisLens");
    println!("==========================================");
    println!(
        "{} • {} • {}",
        file.name,
        format_file_size(file.size_bytes),
        format_time(duration)
    );

    let committed = Arc::new(Mutex::new(CommittedRange::default()));
    let sink = committed.clone();
    let mut selector = TrimSelector::new(duration)?.with_observer(move |range| {
        if let Ok(mut slot) = sink.lock() {
            *slot = range.clone();
        }
    });
    println!("Timeline: {}", selector.time_markers().join(" | "));

    let (start, end) = match (args.start, args.end) {
        (None, None) => {
            let current = selector.committed();
            let start = prompt("Start time", &current.start)?;
            let end = prompt("End time", &current.end)?;
            (Some(start), Some(end))
        }
        given => given,
    };
    apply_range(&mut selector, start.as_deref(), end.as_deref());
    print_selection(&selector);

    let range = committed.lock().map(|r| r.clone()).unwrap_or_else(|_| selector.committed());

    let api = Arc::new(HttpAnalysisClient::new(&config)?);
    println!("Connecting to {}", api.base_url());
    let session = AnalysisSession::with_poll_interval(api, config.poll_interval);
    let mut events = session.subscribe().await;

    if let Err(e) = session.submit(file, range, duration).await {
        for line in start_failure_lines(&mut events, &e) {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }

    let mut failed = false;
    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.reset().await;
                println!();
                println!("Analysis cancelled.");
                break;
            }
            event = events.recv() => event,
        };

        let Some(event) = event else { break };
        match event {
            SessionEvent::Progress { progress, phase, step } => {
                println!("{} {:>3.0}%  {}", progress_bar(progress), progress.round(), phase);
                println!("   {}", render_steps(step, progress));
            }
            SessionEvent::Log(entry) => {
                println!("   {} {}", entry.timestamp.format("%H:%M:%S"), entry.message);
            }
            SessionEvent::Alert(text) => {
                eprintln!("⚠️  {}", text);
            }
            SessionEvent::StateChanged(SessionPhase::Complete) => {
                if let AppState::Complete { video, output_file } = session.state().await {
                    println!("==========================================");
                    println!("✅ Analysis complete: {}", video.name);
                    println!("   Duration: {}", format_duration(video.duration_seconds));
                    println!("   Range:    {} → {}", video.start_time, video.end_time);
                    if let Some(job_id) = video.job_id {
                        println!("   Job:      {}", job_id);
                    }
                    if let Some(output) = output_file {
                        println!("   Output:   {}", output);
                    }
                }
                break;
            }
            SessionEvent::StateChanged(SessionPhase::Idle) => {
                failed = true;
                break;
            }
            SessionEvent::StateChanged(SessionPhase::Processing) => {}
        }
    }

    // an alert is published right after the Idle transition
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Alert(text) = event {
            eprintln!("⚠️  {}", text);
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_full() {
        let parsed = parse_args(args(&["rally.mp4", "--start", "0:10", "--end", "1:00", "--duration", "95.5"])).unwrap();
        assert_eq!(
            parsed,
            CliArgs {
                video: PathBuf::from("rally.mp4"),
                start: Some("0:10".into()),
                end: Some("1:00".into()),
                duration: Some(95.5),
            }
        );
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a.mp4", "b.mp4"])).is_err());
        assert!(parse_args(args(&["a.mp4", "--start"])).is_err());
        assert!(parse_args(args(&["a.mp4", "--duration", "long"])).is_err());
        assert!(parse_args(args(&["a.mp4", "--speed", "2"])).is_err());
    }

    #[test]
    fn test_apply_range_start_past_default_end() {
        let mut selector = TrimSelector::new(120.0).unwrap();
        apply_range(&mut selector, Some("1:30"), Some("1:40"));
        assert_eq!(selector.committed(), CommittedRange { start: "1:30".into(), end: "1:40".into() });
    }

    #[test]
    fn test_apply_range_blank_and_partial_input() {
        let mut selector = TrimSelector::new(120.0).unwrap();
        apply_range(&mut selector, Some(""), Some(""));
        assert_eq!(selector.committed(), CommittedRange::default());

        apply_range(&mut selector, Some("0:10"), None);
        assert_eq!(selector.committed(), CommittedRange { start: "0:10".into(), end: "0:30".into() });

        apply_range(&mut selector, None, Some("1:05"));
        assert_eq!(selector.committed(), CommittedRange { start: "0:10".into(), end: "1:05".into() });

        apply_range(&mut selector, Some("9:99"), Some("5:00"));
        assert_eq!(selector.committed(), CommittedRange { start: "0:10".into(), end: "1:05".into() });
    }

    #[test]
    fn test_start_failure_reported_once() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(SessionEvent::StateChanged(SessionPhase::Idle)).unwrap();
        tx.send(SessionEvent::Alert("Error starting analysis: Upload failed: boom".into())).unwrap();
        let error = SessionError::Busy;
        assert_eq!(
            start_failure_lines(&mut rx, &error),
            vec!["⚠️  Error starting analysis: Upload failed: boom".to_string()]
        );

        // nothing published: the error is the only line
        assert_eq!(
            start_failure_lines(&mut rx, &error),
            vec!["❌ An analysis is already in progress".to_string()]
        );
    }

    #[test]
    fn test_progress_rendering() {
        assert_eq!(progress_bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(progress_bar(50.0).chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(progress_bar(100.0).chars().count(), PROGRESS_SEGMENTS);
        assert_eq!(
            render_steps(1, 30.0),
            "✓ Initialize  ▶ Tracking  · Physics  · Actions  · Report"
        );
    }
}
