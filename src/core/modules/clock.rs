use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use tokio::time::sleep;

use super::{
    traits::{FromConfig, Module, ModuleHandle},
    types::ModuleResult,
};
use crate::{config::status::ModuleConfig, register_module};

/// Wall clock rendered as `🕐 Mon 1 Jan 13:05`, refreshed at every minute
/// boundary.
#[derive(Debug, Default)]
pub struct Clock;

impl FromConfig for Clock {
    fn from_config(_config: &ModuleConfig) -> ModuleResult<Self> {
        Ok(Clock)
    }
}

#[async_trait::async_trait]
impl Module for Clock {
    async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
        loop {
            let now = Local::now();
            handle.publish(&render_clock(&now.naive_local()), true);
            sleep(until_next_minute(&now)).await;
        }
    }
}

register_module!(Clock, "clock");

/// Clock-face emoji showing the given hour (0-23). Midnight and noon are 🕛.
pub fn clock_face(hour: u32) -> char {
    let offset = if hour == 0 { 11 } else { (hour - 1) % 12 };
    char::from_u32(0x1F550 + offset).unwrap_or('🕛')
}

pub fn render_clock(time: &NaiveDateTime) -> String {
    format!("{} {}", clock_face(time.hour()), time.format("%a %-d %b %R"))
}

/// Time left until the next full minute.
pub fn until_next_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let elapsed = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)));
    Duration::from_secs(60).saturating_sub(elapsed)
}
