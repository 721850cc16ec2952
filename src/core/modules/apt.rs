use std::process::Stdio;

use tokio::process::Command;

use super::{
    error::ModuleError,
    traits::{FromConfig, Periodic, Sampler},
    types::{ModuleResult, Render},
};
use crate::{config::status::ModuleConfig, register_module};

const DEFAULT_COMMAND: &str = "apt-get upgrade --dry-run";

/// Number of pending package upgrades, as `⬆ 12`. Hidden when up to date.
#[derive(Debug, Clone)]
pub struct Upgrades {
    program: String,
    args: Vec<String>,
}

impl FromConfig for Upgrades {
    fn from_config(config: &ModuleConfig) -> ModuleResult<Self> {
        let command = config.command.as_deref().unwrap_or(DEFAULT_COMMAND);
        let mut words = command.split_whitespace().map(str::to_string);

        let program = words.next().ok_or_else(|| ModuleError::InvalidConfig {
            module: config.name.clone(),
            reason: "command must not be empty".to_string(),
        })?;

        Ok(Upgrades {
            program,
            args: words.collect(),
        })
    }
}

#[async_trait::async_trait]
impl Sampler for Upgrades {
    const DEFAULT_INTERVAL_SECS: u64 = 3600;

    async fn sample(&mut self) -> ModuleResult<Render> {
        let command = self.command_line();
        let output = Command::new(&self.program)
            .args(&self.args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(true)
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

        let stdout = String::from_utf8_lossy(&output.stdout);
        let count = parse_upgradable(&stdout).ok_or_else(|| ModuleError::CommandFailed {
            command,
            reason: "no upgrade summary in output".to_string(),
        })?;

        Ok(render_upgrades(count))
    }
}

register_module!(Periodic<Upgrades>, "apt");

impl Upgrades {
    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Upgrade count from the summary line of a dry run, e.g.
/// `"12 upgraded, 0 newly installed, 0 to remove and 3 not upgraded."`.
pub fn parse_upgradable(stdout: &str) -> Option<u64> {
    stdout.lines().find_map(|line| {
        let digits: String = line.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() || !line[digits.len()..].starts_with(" upgraded") {
            return None;
        }
        digits.parse().ok()
    })
}

pub fn render_upgrades(count: u64) -> Render {
    if count == 0 {
        Render::hidden()
    } else {
        Render::shown(format!("⬆ {}", count))
    }
}
