use std::io::Write;

use tracing::{debug, info, warn};

use crate::core::{
    LogicalRange, OhlcvBar, PriceScale, PriceScaleTuning, ScreenPoint, TimeIndex, TimeScale,
    Timeframe, Viewport,
};
use crate::drawing::DrawingPoint;
use crate::error::{ChartError, ChartResult};
use crate::ingest::{
    ChunkRead, ChunkSource, FileSource, LoadOutcome, LoadTicket, SanitizeStats, StreamController,
    resample, sanitize, to_csv_string, write_csv,
};
use crate::interaction::{DrawingController, Tool};
use crate::render::{FrameScheduler, OverlayFrame, OverlayStyle, Renderer, build_overlay};

use super::config::WorkspaceConfig;
use super::coordinate_mapper::{CoordinateMapper, ViewportSurface};
use super::persistence::ChartStateRecord;
use super::sync::{ChartId, SyncContext, SyncEvent};

/// One open chart: a streamed file, its displayed series and the drawings
/// annotating it.
///
/// The displayed series is rebuilt from the merged raw bars by sanitizing at
/// the base timeframe and resampling to the current one. Drawings live in
/// (time, price) space and survive timeframe switches and backfills.
#[derive(Debug)]
pub struct ChartSession<S: ChunkSource = FileSource> {
    source_id: String,
    config: WorkspaceConfig,
    stream: StreamController<S>,
    stats: SanitizeStats,
    base_timeframe: Timeframe,
    timeframe: Timeframe,
    bars: Vec<OhlcvBar>,
    index: TimeIndex,
    viewport: Viewport,
    time_scale: TimeScale,
    price_scale: PriceScale,
    controller: DrawingController,
    scheduler: FrameScheduler,
    synced_crosshair: Option<DrawingPoint>,
}

impl<S: ChunkSource> ChartSession<S> {
    /// Opens `source`: reads the tail chunk, detects the base timeframe and
    /// fits the view to the newest bars.
    pub fn open(source: S, config: WorkspaceConfig, viewport: Viewport) -> ChartResult<Self> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        let config = config.validate()?;
        let source_id = crate::ingest::source_id_for_name(source.name());
        let stream = StreamController::open(source, config.chunk_size_bytes)?;

        let times: Vec<i64> = stream.bars().iter().map(|bar| bar.time).collect();
        let base_timeframe = Timeframe::detect_from_times(&times)
            .or_else(|| Timeframe::infer_from_file_name(stream.source().name()))
            .unwrap_or(Timeframe::M1);

        let mut session = Self {
            source_id,
            config,
            stream,
            stats: SanitizeStats::default(),
            base_timeframe,
            timeframe: base_timeframe,
            bars: Vec::new(),
            index: TimeIndex::from_times(Vec::new(), base_timeframe.duration_ms()),
            viewport,
            time_scale: TimeScale::new(0.0, 1.0)?,
            price_scale: PriceScale::new(0.0, 1.0)?,
            controller: DrawingController::new(config.controller_options()),
            scheduler: FrameScheduler::new(),
            synced_crosshair: None,
        };
        session.rebuild_series();
        session.time_scale.fit_latest(session.bars.len())?;
        session.autoscale_price();
        info!(
            source_id = session.source_id.as_str(),
            timeframe = base_timeframe.label(),
            bars = session.bars.len(),
            "chart session opened"
        );
        Ok(session)
    }

    fn rebuild_series(&mut self) {
        let options = self
            .config
            .sanitize_options(self.base_timeframe.duration_ms());
        let (cleaned, stats) = sanitize(self.stream.bars(), options);
        self.stats = stats;
        self.bars = if self.timeframe == self.base_timeframe {
            cleaned
        } else {
            resample(
                &cleaned,
                self.base_timeframe.duration_ms(),
                self.timeframe.duration_ms(),
            )
        };
        self.index = TimeIndex::from_bars(&self.bars, self.timeframe.duration_ms());
        self.scheduler.request();
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[must_use]
    pub fn config(&self) -> WorkspaceConfig {
        self.config
    }

    /// Displayed (sanitized, resampled) series.
    #[must_use]
    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    /// Merged series as read from the file, before repair.
    #[must_use]
    pub fn raw_bars(&self) -> &[OhlcvBar] {
        self.stream.bars()
    }

    #[must_use]
    pub fn stats(&self) -> SanitizeStats {
        self.stats
    }

    #[must_use]
    pub fn time_index(&self) -> &TimeIndex {
        &self.index
    }

    #[must_use]
    pub fn base_timeframe(&self) -> Timeframe {
        self.base_timeframe
    }

    #[must_use]
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    #[must_use]
    pub fn price_scale(&self) -> PriceScale {
        self.price_scale
    }

    #[must_use]
    pub fn controller(&self) -> &DrawingController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DrawingController {
        self.scheduler.request();
        &mut self.controller
    }

    #[must_use]
    pub fn scheduler(&self) -> FrameScheduler {
        self.scheduler
    }

    /// Load generation; bumped by [`Self::close`].
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.stream.generation()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.stream.has_more()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.stream.is_loading()
    }

    #[must_use]
    pub fn synced_crosshair(&self) -> Option<DrawingPoint> {
        self.synced_crosshair
    }

    #[must_use]
    pub fn surface(&self) -> ViewportSurface<'_> {
        ViewportSurface::new(self.viewport, self.time_scale, self.price_scale, &self.index)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> ChartResult<()> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        self.viewport = viewport;
        self.scheduler.request();
        Ok(())
    }

    /// Fits the price axis to the displayed bars. An empty series keeps the
    /// current axis.
    pub fn autoscale_price(&mut self) {
        match PriceScale::from_bars(&self.bars, PriceScaleTuning::default()) {
            Ok(scale) => {
                self.price_scale = scale;
                self.scheduler.request();
            }
            Err(err) => debug!(error = %err, "price autoscale skipped"),
        }
    }

    pub fn set_visible_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        self.time_scale.set_visible_range(range)?;
        self.scheduler.request();
        Ok(())
    }

    pub fn pan_by_pixels(&mut self, delta_px: f64) -> ChartResult<()> {
        self.time_scale.pan_by_pixels(delta_px, self.viewport)?;
        self.scheduler.request();
        Ok(())
    }

    pub fn zoom_around_pixel(&mut self, factor: f64, anchor_px: f64) -> ChartResult<()> {
        self.time_scale
            .zoom_around_pixel(factor, anchor_px, self.viewport)?;
        self.scheduler.request();
        Ok(())
    }

    /// Switches the displayed timeframe, keeping the newest visible time at
    /// the right edge. Timeframes finer than the file's base are rejected.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) -> ChartResult<()> {
        if timeframe < self.base_timeframe {
            return Err(ChartError::InvalidData(format!(
                "cannot display {} from {} data",
                timeframe.label(),
                self.base_timeframe.label()
            )));
        }
        if timeframe == self.timeframe {
            return Ok(());
        }

        let visible = self.time_scale.visible_range();
        let right_time = self.index.time_for_logical(visible.to);
        let span_ms = visible.span() * self.timeframe.duration_ms() as f64;

        self.timeframe = timeframe;
        self.controller.cancel();
        self.rebuild_series();

        let span = span_ms / timeframe.duration_ms() as f64;
        match right_time.and_then(|time| self.index.logical_for_time(time)) {
            Some(to) => self
                .time_scale
                .set_visible_range(LogicalRange::new(to - span, to))?,
            None => self.time_scale.fit_latest(self.bars.len())?,
        }
        self.autoscale_price();
        info!(
            timeframe = timeframe.label(),
            bars = self.bars.len(),
            "timeframe changed"
        );
        Ok(())
    }

    /// Whether the visible range is close enough to the oldest loaded bar
    /// to warrant loading the previous chunk.
    #[must_use]
    pub fn needs_backfill(&self) -> bool {
        self.stream.has_more()
            && !self.stream.is_loading()
            && self.time_scale.visible_range().from < self.config.backfill_threshold_bars
    }

    /// Claims the backward-load slot for a host that reads off-thread.
    pub fn begin_backfill(&mut self) -> Option<LoadTicket> {
        self.stream.begin_backward_load()
    }

    pub fn read_backfill(&self, ticket: LoadTicket) -> ChartResult<ChunkRead> {
        self.stream.read_for(ticket)
    }

    /// Merges a backward read and keeps the same bars on screen.
    pub fn complete_backfill(
        &mut self,
        ticket: LoadTicket,
        result: ChartResult<ChunkRead>,
    ) -> ChartResult<LoadOutcome> {
        let before = self.bars.len();
        let outcome = self.stream.complete_backward_load(ticket, result)?;
        if outcome.added > 0 {
            self.rebuild_series();
            let prepended = self.bars.len().saturating_sub(before);
            self.time_scale.shift_for_prepended(prepended);
            debug!(prepended, has_more = outcome.has_more, "backfill applied");
        }
        Ok(outcome)
    }

    /// Loads the previous chunk when [`Self::needs_backfill`] says so.
    /// Returns `Ok(None)` when nothing was requested.
    pub fn maybe_backfill(&mut self) -> ChartResult<Option<LoadOutcome>> {
        if !self.needs_backfill() {
            return Ok(None);
        }
        let Some(ticket) = self.begin_backfill() else {
            return Ok(None);
        };
        let result = self.read_backfill(ticket);
        self.complete_backfill(ticket, result).map(Some)
    }

    /// Drops the loaded series and invalidates in-flight loads.
    pub fn close(&mut self) {
        self.stream.close();
        self.controller.cancel();
        self.scheduler.cancel();
        self.bars.clear();
        self.index = TimeIndex::from_times(Vec::new(), self.timeframe.duration_ms());
        info!(source_id = self.source_id.as_str(), "chart session closed");
    }

    pub fn export_csv(&self) -> ChartResult<String> {
        to_csv_string(&self.bars)
    }

    pub fn export_csv_to<W: Write>(&self, writer: W) -> ChartResult<()> {
        write_csv(writer, &self.bars)
    }

    /// Durable state for persistence. Live drag points and previews are not
    /// part of it.
    #[must_use]
    pub fn state_record(&self) -> ChartStateRecord {
        let snapshot = self.controller.drawings().snapshot();
        ChartStateRecord {
            source_id: self.source_id.clone(),
            drawings: snapshot.drawings,
            folders: snapshot.folders,
            config: self.config,
            visible_range: Some(self.time_scale.visible_range()),
        }
    }

    /// Applies a persisted record. Records of another instrument are
    /// rejected.
    pub fn restore_state(&mut self, record: ChartStateRecord) -> ChartResult<()> {
        if record.source_id != self.source_id {
            return Err(ChartError::InvalidData(format!(
                "chart state for `{}` cannot be applied to `{}`",
                record.source_id, self.source_id
            )));
        }
        let config = record.config.validate()?;
        let snapshot = record.drawing_snapshot();
        let mut controller = DrawingController::new(config.controller_options());
        controller.load(snapshot)?;
        if let Some(range) = record.visible_range {
            self.time_scale.set_visible_range(range)?;
        }
        self.config = config;
        self.controller = controller;
        self.scheduler.request();
        info!(
            source_id = self.source_id.as_str(),
            drawings = self.controller.drawings().len(),
            "chart state restored"
        );
        Ok(())
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.controller.set_tool(tool);
        self.scheduler.request();
    }

    fn dispatch_pointer(
        &mut self,
        apply: impl FnOnce(&mut DrawingController, &CoordinateMapper<'_, ViewportSurface<'_>>) -> bool,
    ) -> bool {
        let surface =
            ViewportSurface::new(self.viewport, self.time_scale, self.price_scale, &self.index);
        let mapper = CoordinateMapper::new(&surface, &self.index, &self.bars)
            .with_magnet(self.config.magnet_options());
        let changed = apply(&mut self.controller, &mapper);
        if changed {
            self.scheduler.request();
        }
        changed
    }

    pub fn pointer_down(&mut self, pos: ScreenPoint) -> bool {
        self.dispatch_pointer(|controller, mapper| controller.pointer_down(pos, mapper))
    }

    pub fn pointer_move(&mut self, pos: ScreenPoint) -> bool {
        self.dispatch_pointer(|controller, mapper| controller.pointer_move(pos, mapper))
    }

    pub fn pointer_up(&mut self, pos: ScreenPoint) -> bool {
        self.dispatch_pointer(|controller, mapper| controller.pointer_up(pos, mapper))
    }

    /// Abstract point under `pos`, without magnet snapping.
    #[must_use]
    pub fn point_at(&self, pos: ScreenPoint) -> Option<DrawingPoint> {
        let surface = self.surface();
        CoordinateMapper::new(&surface, &self.index, &self.bars).screen_to_point(pos, false)
    }

    #[must_use]
    pub fn build_overlay(&self, style: &OverlayStyle) -> OverlayFrame {
        let surface = self.surface();
        let mapper = CoordinateMapper::new(&surface, &self.index, &self.bars);
        let drawings = self.controller.render_drawings();
        build_overlay(
            drawings.iter().map(|drawing| drawing.as_ref()),
            self.controller.selected(),
            &mapper,
            &mapper.scene_context(),
            style,
        )
    }

    /// Animation-frame hook: paints the overlay if anything requested it
    /// since the last frame.
    pub fn render_frame<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        style: &OverlayStyle,
    ) -> ChartResult<bool> {
        if !self.scheduler.is_pending() {
            return Ok(false);
        }
        let frame = self.build_overlay(style);
        self.scheduler.on_frame(renderer, || frame)
    }

    /// Visible span as times, for publishing to other charts.
    #[must_use]
    pub fn visible_time_range(&self) -> Option<(i64, i64)> {
        let range = self.time_scale.visible_range();
        Some((
            self.index.time_for_logical(range.from)?,
            self.index.time_for_logical(range.to)?,
        ))
    }

    pub fn publish_visible_range(&self, sync: &mut SyncContext, me: ChartId) -> usize {
        match self.visible_time_range() {
            Some((from_time, to_time)) => {
                sync.publish(me, SyncEvent::VisibleRangeChanged { from_time, to_time })
            }
            None => 0,
        }
    }

    pub fn publish_crosshair(
        &self,
        sync: &mut SyncContext,
        me: ChartId,
        pos: Option<ScreenPoint>,
    ) -> usize {
        let event = match pos.and_then(|pos| self.point_at(pos)) {
            Some(point) => SyncEvent::CrosshairMoved {
                time: point.time,
                price: point.price,
            },
            None => SyncEvent::CrosshairLeft,
        };
        sync.publish(me, event)
    }

    /// Applies everything other charts published since the last call.
    pub fn apply_sync(&mut self, sync: &mut SyncContext, me: ChartId) -> ChartResult<()> {
        for event in sync.drain(me) {
            match event {
                SyncEvent::VisibleRangeChanged { from_time, to_time } => {
                    let from = self.index.logical_for_time(from_time);
                    let to = self.index.logical_for_time(to_time);
                    match (from, to) {
                        (Some(from), Some(to)) => {
                            self.time_scale
                                .set_visible_range(LogicalRange::new(from, to))?;
                        }
                        _ => warn!(from_time, to_time, "synced range not mappable"),
                    }
                }
                SyncEvent::CrosshairMoved { time, price } => {
                    self.synced_crosshair = Some(DrawingPoint::new(time, price));
                }
                SyncEvent::CrosshairLeft => self.synced_crosshair = None,
            }
            self.scheduler.request();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ChartSession;
    use crate::api::WorkspaceConfig;
    use crate::core::{Timeframe, Viewport};
    use crate::error::ChartError;
    use crate::ingest::FileSource;
    use crate::render::{NullRenderer, OverlayStyle};

    fn csv(count: usize, step_ms: i64) -> Vec<u8> {
        let mut out = String::new();
        for i in 0..count {
            let time = 1_704_067_200_000_i64 + i as i64 * step_ms;
            out.push_str(&format!("{time},100,101,99,100.5,1\n"));
        }
        out.into_bytes()
    }

    fn open(name: &str, bytes: Vec<u8>) -> ChartSession {
        ChartSession::open(
            FileSource::from_bytes(name, bytes),
            WorkspaceConfig::default(),
            Viewport::new(800, 400),
        )
        .expect("open")
    }

    #[test]
    fn open_detects_timeframe_and_fits_latest() {
        let session = open("EURUSD_M1.csv", csv(300, 60_000));
        assert_eq!(session.base_timeframe(), Timeframe::M1);
        assert_eq!(session.bars().len(), 300);
        assert_eq!(session.source_id(), "eurusd");
        assert!(session.time_scale().visible_range().to > 299.0);
    }

    #[test]
    fn timeframe_switch_resamples_and_rejects_finer() {
        let mut session = open("x.csv", csv(300, 60_000));
        session.set_timeframe(Timeframe::M5).expect("m5");
        assert_eq!(session.bars().len(), 60);
        session.set_timeframe(Timeframe::M1).expect("back to base");
        assert_eq!(session.bars().len(), 300);

        let mut coarse = open("y.csv", csv(30, 300_000));
        assert_eq!(coarse.base_timeframe(), Timeframe::M5);
        assert!(coarse.set_timeframe(Timeframe::M1).is_err());
        assert_eq!(coarse.timeframe(), Timeframe::M5);
    }

    #[test]
    fn render_frame_paints_only_when_requested() {
        let mut session = open("x.csv", csv(10, 60_000));
        let mut renderer = NullRenderer::default();
        let style = OverlayStyle::default();
        assert!(session.render_frame(&mut renderer, &style).expect("first"));
        assert!(!session.render_frame(&mut renderer, &style).expect("idle"));
    }

    #[test]
    fn backfill_started_before_close_is_discarded() {
        let config = WorkspaceConfig::default().with_chunk_size_bytes(512);
        let mut session = ChartSession::open(
            FileSource::from_bytes("x.csv", csv(300, 60_000)),
            config,
            Viewport::new(800, 400),
        )
        .expect("open");
        assert_eq!(session.generation(), 0);
        let ticket = session.begin_backfill().expect("ticket");
        let read = session.read_backfill(ticket);

        session.close();
        assert_eq!(session.generation(), 1);
        let err = session.complete_backfill(ticket, read).expect_err("stale");
        assert!(matches!(err, ChartError::StaleSession { expected: 1, actual: 0 }));
        assert!(session.bars().is_empty());
    }
}
