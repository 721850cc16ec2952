//! Coalescing aggregator loop.
//!
//! The aggregator is the single consumer of module output. It sleeps on the
//! update signal; on the first wakeup it waits out a fixed debounce window,
//! drains every signal that arrived meanwhile, then visits the registry once
//! and writes a single frame. Signals that arrive after the drain stay pending
//! and trigger the next frame, so no update is lost.

use std::sync::Arc;

use serde::Serialize;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time::{sleep, Duration},
};
use tracing::{debug, info, trace};

use super::{
    error::{EngineError, EngineResult},
    registry::ModuleRegistry,
    signal::UpdateListener,
};

/// Protocol version announced in the header line.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Serialize)]
struct Header {
    version: u32,
}

#[derive(Serialize)]
struct Block<'a> {
    name: &'a str,
    full_text: &'a str,
}

/// Renders the two header lines that open the stream: the version object and
/// the opening bracket of the unbounded frame array.
pub fn render_header() -> EngineResult<String> {
    let mut out = serde_json::to_string(&Header {
        version: PROTOCOL_VERSION,
    })?;
    out.push_str("\n[\n");
    Ok(out)
}

/// Renders one frame: a JSON array with an object per visible slot in
/// registration order, followed by `,` and a newline.
///
/// Each slot is locked only while its text is copied.
pub fn render_frame(registry: &ModuleRegistry) -> EngineResult<String> {
    let mut visible = Vec::with_capacity(registry.len());
    registry.for_each(|slot| {
        let snapshot = slot.snapshot();
        if snapshot.visible {
            visible.push((slot.name(), snapshot.text));
        }
    });

    let blocks: Vec<Block<'_>> = visible
        .iter()
        .map(|(name, text)| Block {
            name,
            full_text: text,
        })
        .collect();

    let mut out = serde_json::to_string(&blocks)?;
    out.push_str(",\n");
    Ok(out)
}

/// Single consumer that turns update signals into frames on `out`.
pub struct Aggregator<W> {
    registry: Arc<ModuleRegistry>,
    listener: UpdateListener,
    out: W,
    debounce: Duration,
}

impl<W> Aggregator<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        registry: Arc<ModuleRegistry>,
        listener: UpdateListener,
        out: W,
        debounce: Duration,
    ) -> Self {
        Self {
            registry,
            listener,
            out,
            debounce,
        }
    }

    /// Writes the header, then one frame per drained burst of signals.
    ///
    /// Only returns on failure.
    ///
    /// # Errors
    ///
    /// `EngineError::Output` when the stream cannot be written or flushed,
    /// `EngineError::SignalClosed` when no module can signal anymore.
    pub async fn run(mut self) -> EngineResult<()> {
        self.write(&render_header()?).await?;
        info!(
            "Aggregator started with {} modules (debounce: {}ms)",
            self.registry.len(),
            self.debounce.as_millis()
        );

        let mut frames: u64 = 0;
        loop {
            if !self.listener.wait().await {
                return Err(EngineError::SignalClosed);
            }

            sleep(self.debounce).await;

            let drained = self.listener.drain();
            trace!("Drained {} additional update signals", drained);

            let frame = render_frame(&self.registry)?;
            self.write(&frame).await?;

            frames += 1;
            debug!("Emitted frame #{}", frames);
        }
    }

    async fn write(&mut self, chunk: &str) -> EngineResult<()> {
        self.out.write_all(chunk.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncBufReadExt, BufReader, DuplexStream, Lines},
        time::timeout,
    };

    use super::*;
    use crate::core::{signal::update_channel, slot::OutputSlot};

    const DEBOUNCE: Duration = Duration::from_millis(40);
    const QUIET: Duration = Duration::from_millis(250);

    fn registry(names: &[&str]) -> (Arc<ModuleRegistry>, Vec<Arc<OutputSlot>>) {
        let mut registry = ModuleRegistry::new();
        let slots = names
            .iter()
            .map(|n| registry.register(n, 64).unwrap())
            .collect();
        (Arc::new(registry), slots)
    }

    async fn next_line(lines: &mut Lines<BufReader<DuplexStream>>) -> Option<String> {
        timeout(QUIET, lines.next_line()).await.ok()?.ok()?
    }

    #[test]
    fn header_declares_version_and_opens_array() {
        assert_eq!(render_header().unwrap(), "{\"version\":1}\n[\n");
    }

    #[test]
    fn frame_contains_only_visible_slots_in_order() {
        let (registry, slots) = registry(&["sysinfo", "df", "clock"]);
        slots[2].write("🕛 Mon 1 Jan 00:00", true);
        slots[0].write("🐧 0.10 1d 2h", true);
        slots[1].write("💾 40%", false);

        assert_eq!(
            render_frame(&registry).unwrap(),
            "[{\"name\":\"sysinfo\",\"full_text\":\"🐧 0.10 1d 2h\"},\
             {\"name\":\"clock\",\"full_text\":\"🕛 Mon 1 Jan 00:00\"}],\n"
        );
    }

    #[test]
    fn frame_with_nothing_visible_is_empty_array() {
        let (registry, _slots) = registry(&["meds"]);
        assert_eq!(render_frame(&registry).unwrap(), "[],\n");
    }

    #[test]
    fn frame_escapes_json_specials() {
        let (registry, slots) = registry(&["inoitems"]);
        slots[0].write("say \"hi\" \\ bye", true);

        let frame = render_frame(&registry).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(frame.trim_end().trim_end_matches(',')).unwrap();
        assert_eq!(parsed[0]["full_text"], "say \"hi\" \\ bye");
    }

    #[test]
    fn rendering_unchanged_registry_is_idempotent() {
        let (registry, slots) = registry(&["df", "clock"]);
        slots[0].write("💾 40%", true);
        slots[1].write("🕐 Tue 2 Jan 13:05", true);

        assert_eq!(
            render_frame(&registry).unwrap(),
            render_frame(&registry).unwrap()
        );
    }

    #[tokio::test]
    async fn burst_of_publishes_yields_single_frame() {
        let (registry, slots) = registry(&["df", "pulse"]);
        let (signal, listener) = update_channel();
        let (writer, reader) = tokio::io::duplex(4096);
        let handle = tokio::spawn(Aggregator::new(registry, listener, writer, DEBOUNCE).run());
        let mut lines = BufReader::new(reader).lines();

        assert_eq!(next_line(&mut lines).await.as_deref(), Some("{\"version\":1}"));
        assert_eq!(next_line(&mut lines).await.as_deref(), Some("["));

        slots[0].write("💾 41%", true);
        signal.notify();
        tokio::time::sleep(Duration::from_millis(10)).await;
        slots[1].write("🔉 50%", true);
        signal.notify();

        assert_eq!(
            next_line(&mut lines).await.as_deref(),
            Some(
                "[{\"name\":\"df\",\"full_text\":\"💾 41%\"},\
                 {\"name\":\"pulse\",\"full_text\":\"🔉 50%\"}],"
            )
        );
        assert_eq!(next_line(&mut lines).await, None, "burst must not emit a second frame");

        handle.abort();
    }

    #[tokio::test]
    async fn visibility_toggles_between_frames() {
        let (registry, slots) = registry(&["meds", "clock"]);
        let (signal, listener) = update_channel();
        let (writer, reader) = tokio::io::duplex(4096);
        let handle = tokio::spawn(Aggregator::new(registry, listener, writer, DEBOUNCE).run());
        let mut lines = BufReader::new(reader).lines();
        next_line(&mut lines).await;
        next_line(&mut lines).await;

        slots[0].write("💊 ibuprofen 1:05", true);
        slots[1].write("🕐 Mon 1 Jan 01:00", true);
        signal.notify();
        let frame = next_line(&mut lines).await.unwrap();
        assert!(frame.contains("\"meds\""));

        slots[0].write("", false);
        signal.notify();
        let frame = next_line(&mut lines).await.unwrap();
        assert_eq!(
            frame,
            "[{\"name\":\"clock\",\"full_text\":\"🕐 Mon 1 Jan 01:00\"}],"
        );

        slots[0].write("💊 ibuprofen 0:00", true);
        signal.notify();
        let frame = next_line(&mut lines).await.unwrap();
        assert!(frame.starts_with("[{\"name\":\"meds\""));

        handle.abort();
    }

    #[tokio::test]
    async fn publish_during_render_triggers_next_frame() {
        let (registry, slots) = registry(&["clock"]);
        let (signal, listener) = update_channel();
        let (writer, reader) = tokio::io::duplex(4096);
        let handle = tokio::spawn(Aggregator::new(registry, listener, writer, DEBOUNCE).run());
        let mut lines = BufReader::new(reader).lines();
        next_line(&mut lines).await;
        next_line(&mut lines).await;

        slots[0].write("first", true);
        signal.notify();
        // Lands after the first drain while the first frame is being produced.
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(5)).await;
        slots[0].write("second", true);
        signal.notify();

        let mut frames = Vec::new();
        while let Some(line) = next_line(&mut lines).await {
            frames.push(line);
        }

        assert_eq!(
            frames.last().map(String::as_str),
            Some("[{\"name\":\"clock\",\"full_text\":\"second\"}],")
        );

        handle.abort();
    }

    #[tokio::test]
    async fn closed_output_is_fatal() {
        let (registry, slots) = registry(&["clock"]);
        let (signal, listener) = update_channel();
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);

        slots[0].write("x", true);
        signal.notify();

        let result = Aggregator::new(registry, listener, writer, DEBOUNCE)
            .run()
            .await;
        assert!(matches!(result, Err(EngineError::Output(_))));
    }

    #[tokio::test]
    async fn dropped_signals_end_the_loop() {
        let (registry, _slots) = registry(&["clock"]);
        let (signal, listener) = update_channel();
        drop(signal);

        let result = Aggregator::new(registry, listener, Vec::new(), DEBOUNCE)
            .run()
            .await;
        assert!(matches!(result, Err(EngineError::SignalClosed)));
    }
}
