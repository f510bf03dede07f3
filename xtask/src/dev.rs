//! Development launcher: starts the backend, waits for its health endpoint,
//! opens the web UI, and keeps the child on a leash until it exits or the
//! user interrupts.

use crate::cli::DevArgs;
use crate::util::repo::{self, BACKEND_BIN};
use anyhow::{Context, Result};
use std::io::{Read, Write as _};
use std::net::TcpStream;
use std::process::{Child, Command, ExitCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const READY_TIMEOUT: Duration = Duration::from_secs(30);
const KILL_GRACE: Duration = Duration::from_secs(5);

pub fn run(args: &DevArgs) -> Result<ExitCode> {
    let root = repo::repo_root()?;
    let build_type = if args.release { "release" } else { "debug" };
    let exe = root.join("target").join(build_type).join(BACKEND_BIN);

    if !exe.is_file() {
        eprintln!("backend binary not found: {}", exe.display());
        eprintln!(
            "build it first: cargo build{}",
            if args.release { " --release" } else { "" }
        );
        return Ok(ExitCode::FAILURE);
    }

    println!("\n==> Starting backend: {}", exe.display());
    let mut child = Command::new(&exe)
        .current_dir(&root)
        .env("TREEWARD__SERVER__HOST", "127.0.0.1")
        .env("TREEWARD__SERVER__PORT", args.port.to_string())
        .spawn()
        .with_context(|| format!("failed to start {}", exe.display()))?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("failed to install the Ctrl-C handler")?;
    }

    if !wait_until_ready(args.port, READY_TIMEOUT, &interrupted) {
        eprintln!(
            "\nbackend did not become ready on port {} within {}s",
            args.port,
            READY_TIMEOUT.as_secs()
        );
        shutdown(&mut child);
        return Ok(ExitCode::FAILURE);
    }

    let url = format!("http://127.0.0.1:{}/", args.port);
    if args.no_browser {
        println!("\n==> Backend running at {url}");
    } else {
        println!("\n==> Opening browser: {url}");
        open_browser(&url);
    }
    println!("\nTreeward is up. Press Ctrl+C to stop.\n");

    loop {
        if interrupted.load(Ordering::SeqCst) {
            println!("\n==> Stopping backend...");
            shutdown(&mut child);
            println!("backend stopped");
            return Ok(ExitCode::SUCCESS);
        }
        match child.try_wait().context("failed to poll the backend process")? {
            Some(status) => {
                return Ok(if status.success() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                });
            }
            None => thread::sleep(Duration::from_millis(200)),
        }
    }
}

fn wait_until_ready(port: u16, timeout: Duration, interrupted: &AtomicBool) -> bool {
    print!("Waiting for backend on port {port}...");
    let _ = std::io::stdout().flush();

    let start = Instant::now();
    while start.elapsed() < timeout {
        if interrupted.load(Ordering::SeqCst) {
            return false;
        }
        if healthz_ok(port) {
            println!(" ready!");
            return true;
        }
        print!(".");
        let _ = std::io::stdout().flush();
        thread::sleep(Duration::from_millis(500));
    }
    println!(" timeout");
    false
}

/// Raw `GET /healthz` over loopback; anything but a 200 counts as not ready.
fn healthz_ok(port: u16) -> bool {
    let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)) else {
        return false;
    };
    let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));
    let request =
        format!("GET /healthz HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n");
    if stream.write_all(request.as_bytes()).is_err() {
        return false;
    }
    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(n) if n >= 12 => &buf[..12] == b"HTTP/1.1 200",
        _ => false,
    }
}

fn open_browser(url: &str) {
    #[cfg(target_os = "windows")]
    let result = Command::new("cmd").args(["/C", "start", "", url]).spawn();
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(url).spawn();
    #[cfg(all(unix, not(target_os = "macos")))]
    let result = Command::new("xdg-open").arg(url).spawn();

    if let Err(err) = result {
        eprintln!("warning: could not open a browser: {err}");
    }
}

/// Best-effort graceful stop, then a hard kill once the grace period runs out.
fn shutdown(child: &mut Child) {
    terminate(child);
    let deadline = Instant::now() + KILL_GRACE;
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    let _ = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}
