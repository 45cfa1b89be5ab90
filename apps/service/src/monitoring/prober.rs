use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

/// Extra wall-clock allowance on top of the ping deadline before the child is killed
const PING_GRACE: Duration = Duration::from_secs(1);

/// Result of a single reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    /// The probe itself could not run or gave an unexpected answer
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Which probe the service uses for every device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Icmp,
    Tcp,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Icmp => write!(f, "icmp"),
            ProbeMethod::Tcp => write!(f, "tcp"),
        }
    }
}

/// Reachability check for a network address.
///
/// Implementations never return errors: anything that goes wrong is reported
/// as [`ProbeOutcome::Failed`] and counts as unreachable.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, address: &str) -> ProbeOutcome;

    async fn probe(&self, address: &str) -> bool {
        self.check(address).await.is_reachable()
    }
}

/// ICMP echo through the system `ping` binary, which already holds the raw
/// socket privileges the service itself lacks.
pub struct IcmpProber {
    program: String,
    count: u32,
    timeout_duration: Duration,
}

impl IcmpProber {
    pub fn new(count: u32, timeout_seconds: u64) -> Self {
        Self {
            program: "ping".to_string(),
            count: count.max(1),
            timeout_duration: Duration::from_secs(timeout_seconds.max(1)),
        }
    }

    /// Use a different ping executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn arguments(&self, address: &str) -> Vec<String> {
        let deadline_flag = if cfg!(target_os = "macos") { "-t" } else { "-w" };
        vec![
            "-n".to_string(),
            "-c".to_string(),
            self.count.to_string(),
            deadline_flag.to_string(),
            self.timeout_duration.as_secs().to_string(),
            "--".to_string(),
            address.to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn check(&self, address: &str) -> ProbeOutcome {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(address))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout_duration + PING_GRACE, command.output()).await {
            Err(_) => return ProbeOutcome::Unreachable,
            Ok(Err(e)) => return ProbeOutcome::Failed(format!("failed to run {}: {e}", self.program)),
            Ok(Ok(output)) => output,
        };

        // With both a count and a deadline ping exits 1 unless every reply arrived,
        // so any reply in its output counts
        if replies_received(&String::from_utf8_lossy(&output.stdout)) {
            return ProbeOutcome::Reachable;
        }

        match output.status.code() {
            Some(0) => ProbeOutcome::Reachable,
            Some(1) => ProbeOutcome::Unreachable,
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                ProbeOutcome::Failed(format!("{} exited with {code}: {stderr}", self.program))
            }
        }
    }
}

/// Whether ping output reports at least one echo reply
fn replies_received(stdout: &str) -> bool {
    stdout.lines().any(|line| {
        line.contains("bytes from")
            || line
                .split(',')
                .find(|part| part.contains("received"))
                .and_then(|part| part.split_whitespace().next())
                .and_then(|count| count.parse::<u32>().ok())
                .is_some_and(|count| count > 0)
    })
}

/// TCP connect probe for networks that filter ICMP
pub struct TcpProber {
    port: u16,
    timeout_duration: Duration,
}

impl TcpProber {
    pub fn new(port: u16, timeout_seconds: u64) -> Self {
        Self { port, timeout_duration: Duration::from_secs(timeout_seconds.max(1)) }
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    async fn check(&self, address: &str) -> ProbeOutcome {
        let connect = TcpStream::connect((address, self.port));

        match timeout(self.timeout_duration, connect).await {
            Err(_) => ProbeOutcome::Unreachable,
            Ok(Ok(_stream)) => ProbeOutcome::Reachable,
            // A refusal means the host answered
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => ProbeOutcome::Reachable,
            Ok(Err(e)) => ProbeOutcome::Failed(format!("TCP connection failed: {e}")),
        }
    }
}

/// Build the prober selected by the probe settings
pub fn build_prober(settings: &crate::config::Probe) -> Arc<dyn Prober> {
    match settings.method {
        ProbeMethod::Icmp => Arc::new(IcmpProber::new(settings.count, settings.timeout_seconds)),
        ProbeMethod::Tcp => Arc::new(TcpProber::new(settings.tcp_port, settings.timeout_seconds)),
    }
}
