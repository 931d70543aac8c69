//! cairn-ctl — command-line interface for the cairn hub daemon.

use anyhow::Result;

use cairn_core::config::CairnConfig;

mod cmd;

fn usage() -> ! {
    eprintln!("usage: cairn-ctl [--port <port>] <status|peers|shutdown>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut port = CairnConfig::default().network.port;
    let mut command: Option<String> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--port" | "-p" => {
                port = iter
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| usage());
            }
            "status" | "peers" | "shutdown" if command.is_none() => {
                command = Some(arg.clone());
            }
            _ => usage(),
        }
    }

    match command.as_deref() {
        Some("status") => cmd::status::cmd_status(port).await,
        Some("peers") => cmd::status::cmd_peers(port).await,
        Some("shutdown") => cmd::status::cmd_shutdown(port).await,
        _ => usage(),
    }
}
