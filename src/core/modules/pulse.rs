use std::process::Stdio;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    time::sleep,
};
use tracing::{debug, warn};

use super::{
    backoff::Backoff,
    error::ModuleError,
    traits::{FromConfig, Module, ModuleHandle},
    types::{ModuleResult, Render},
};
use crate::{config::status::ModuleConfig, register_module};

const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Volume of the default audio sink, as `🔉 50%` (`🔇` when muted).
///
/// Follows `pactl subscribe` and re-queries the default sink on every sink
/// or server event. When the subscription dies the module hides itself and
/// restarts it with exponential backoff.
#[derive(Debug)]
pub struct Volume {
    pactl: String,
    last: Option<Render>,
}

impl FromConfig for Volume {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        let pactl = config.command.clone().unwrap_or_else(|| "pactl".to_string());
        if pactl.trim().is_empty() {
            return Err(ModuleError::InvalidConfig {
                module: config.name.clone(),
                reason: "command must not be empty".to_string(),
            });
        }

        Ok(Volume { pactl, last: None })
    }
}

#[async_trait::async_trait]
impl Module for Volume {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
        let mut backoff = Backoff::default();

        loop {
            match self.follow(&handle, &mut backoff).await {
                Ok(()) => warn!("'{} subscribe' exited", self.pactl),
                Err(e) => warn!("Volume subscription failed: {}", e),
            }

            self.publish(&handle, Render::hidden());

            let delay = backoff.next_sleep();
            debug!("Restarting volume subscription in {:?}", delay);
            sleep(delay).await;
        }
    }
}

register_module!(Volume, "pulse");

impl Volume {
    fn publish(&mut self, handle: &ModuleHandle, render: Render) {
        if self.last.as_ref() != Some(&render) {
            handle.render(&render);
            self.last = Some(render);
        }
    }

    /// Runs one subscription until the subprocess exits.
    async fn follow(&mut self, handle: &ModuleHandle, backoff: &mut Backoff) -> ModuleResult<()> {
        let command = format!("{} subscribe", self.pactl);
        let mut child = Command::new(&self.pactl)
            .arg("subscribe")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ModuleError::CommandExecution {
                command: command.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModuleError::CommandFailed {
                command: command.clone(),
                reason: "stdout not captured".to_string(),
            })?;

        // Initial state, before any event arrives.
        self.refresh(handle).await?;
        backoff.reset();

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|source| ModuleError::CommandExecution {
                command: command.clone(),
                source,
            })?
        {
            if is_sink_event(&line) {
                self.refresh(handle).await?;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| ModuleError::CommandExecution {
                command: command.clone(),
                source,
            })?;
        debug!("'{}' exited with {}", command, status);

        Ok(())
    }

    async fn refresh(&mut self, handle: &ModuleHandle) -> ModuleResult<()> {
        let volume = self.query("get-sink-volume").await?;
        let mute = self.query("get-sink-mute").await?;

        let percent = parse_volume(&volume).ok_or_else(|| ModuleError::InvalidFormat {
            location: "pactl get-sink-volume".to_string(),
            reason: format!("no volume percentage in {:?}", volume.trim()),
        })?;

        self.publish(handle, Render::shown(render_volume(percent, parse_mute(&mute))));
        Ok(())
    }

    async fn query(&self, subcommand: &str) -> ModuleResult<String> {
        let command = format!("{} {} {}", self.pactl, subcommand, DEFAULT_SINK);
        let output = Command::new(&self.pactl)
            .args([subcommand, DEFAULT_SINK])
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ModuleError::CommandExecution {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ModuleError::CommandFailed {
                command,
                reason: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether a `pactl subscribe` line may have changed the default sink volume.
pub fn is_sink_event(line: &str) -> bool {
    line.contains(" on sink ") || line.contains(" on server ")
}

/// Average of all channel percentages in `pactl get-sink-volume` output.
pub fn parse_volume(output: &str) -> Option<u32> {
    let channels: Vec<u32> = output
        .split_whitespace()
        .filter_map(|token| token.strip_suffix('%'))
        .filter_map(|n| n.parse().ok())
        .collect();

    if channels.is_empty() {
        return None;
    }

    let sum: u32 = channels.iter().sum();
    let count = channels.len() as u32;
    Some((sum + count / 2) / count)
}

pub fn parse_mute(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("mute: yes")
}

/// Speaker icon by volume: 0-33% low, 34-66% medium, 67% and above high.
pub fn render_volume(percent: u32, muted: bool) -> String {
    let icon = match percent {
        _ if muted => '🔇',
        0..=33 => '🔈',
        34..=66 => '🔉',
        _ => '🔊',
    };
    format!("{} {}%", icon, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO: &str = "Volume: front-left: 42597 /  65% / -11.23 dB,   \
                          front-right: 45875 /  70% / -9.29 dB\n        balance 0.07\n";

    #[test]
    fn averages_channels() {
        assert_eq!(parse_volume(STEREO), Some(68));
        assert_eq!(
            parse_volume("Volume: mono: 65536 / 100% / 0.00 dB\n"),
            Some(100)
        );
    }

    #[test]
    fn no_percentage_means_no_volume() {
        assert_eq!(parse_volume("Failed to get sink volume"), None);
    }

    #[test]
    fn parses_mute_state() {
        assert!(parse_mute("Mute: yes\n"));
        assert!(!parse_mute("Mute: no\n"));
    }

    #[test]
    fn icons_follow_volume_bands() {
        assert_eq!(render_volume(0, false), "🔈 0%");
        assert_eq!(render_volume(33, false), "🔈 33%");
        assert_eq!(render_volume(34, false), "🔉 34%");
        assert_eq!(render_volume(66, false), "🔉 66%");
        assert_eq!(render_volume(67, false), "🔊 67%");
        assert_eq!(render_volume(150, false), "🔊 150%");
        assert_eq!(render_volume(50, true), "🔇 50%");
    }

    #[test]
    fn filters_subscription_events() {
        assert!(is_sink_event("Event 'change' on sink #0"));
        assert!(is_sink_event("Event 'change' on server #-1"));
        assert!(!is_sink_event("Event 'new' on sink-input #12"));
        assert!(!is_sink_event("Event 'change' on client #5"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = ModuleConfig {
            command: Some("  ".into()),
            ..ModuleConfig::named("pulse")
        };
        assert!(matches!(
            Volume::from_config(&config),
            Err(ModuleError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn missing_binary_fails_subscription() {
        let mut volume = Volume {
            pactl: "/nonexistent/linebar/pactl".into(),
            last: None,
        };
        let slot = std::sync::Arc::new(crate::core::slot::OutputSlot::new("pulse", 32));
        let (signal, _listener) = crate::core::signal::update_channel();
        let handle = ModuleHandle::new(slot, signal);

        let result = volume.follow(&handle, &mut Backoff::default()).await;
        assert!(matches!(result, Err(ModuleError::CommandExecution { .. })));
    }
}
