use std::{fs::OpenOptions, io, path::PathBuf, sync::mpsc, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use framescope::{
    network::{self, CaptureSource},
    ui, DecodedPacket, PacketListModel,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal packet viewer")]
struct Args {
    /// Interface to capture on
    #[arg(short, long, default_value = "any")]
    interface: String,

    /// Read frames from a pcap file instead of capturing live
    #[arg(short, long)]
    read: Option<PathBuf>,

    /// Capture helper used for live captures
    #[arg(long, default_value = "dumpcap")]
    dumpcap: PathBuf,

    /// Append logs to this file; logs are discarded otherwise
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn init_logging(args: &Args) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_ansi(false);
    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {path:?}"))?;
            builder.with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let source = match &args.read {
        Some(path) => CaptureSource::File(path.clone()),
        None => CaptureSource::Live {
            dumpcap: args.dumpcap.clone(),
            interface: args.interface.clone(),
        },
    };

    let (tx, rx) = mpsc::channel::<DecodedPacket>();
    let mut child = network::run_sniffer(source, tx).context("Cannot start capture")?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &rx);

    if let Some(child) = child.as_mut() {
        let _ = child.kill();
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    let shown = result?;
    info!(packets = shown, "viewer closed");
    Ok(())
}

/// Event loop. Returns the number of packets received.
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rx: &mpsc::Receiver<DecodedPacket>,
) -> Result<usize> {
    let mut model = PacketListModel::new(1);

    loop {
        while let Ok(packet) = rx.try_recv() {
            model.push(packet);
        }

        terminal.draw(|f| ui::draw(f, &mut model))?;

        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('j') | KeyCode::Down => model.move_down(),
                    KeyCode::Char('k') | KeyCode::Up => model.move_up(),
                    _ => {}
                }
            }
        }
    }

    Ok(model.len())
}
