//! Classification machine: IDLE → DETECTING → ROTATING → SNAPPING → IDLE.
//!
//! - DETECTING watches the feeder camera for an object touching the
//!   carousel platform and creates its piece record.
//! - ROTATING advances the carousel one platform once distribution is
//!   ready, handing the exit piece to distribution and confirming drops.
//! - SNAPPING photographs the piece on the classification platform and
//!   dispatches it to the classifier without waiting for the answer.
//!
//! The exit platform is never rotated off while its piece still awaits a
//! classifier answer; after `timeout_ms` the piece is resolved as unknown.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sorter_common::classify::Classifier;
use sorter_common::consts::{CAROUSEL_CLASS_ID, OBJECT_CLASS_ID};
use sorter_common::hal::driver::MotionProfile;
use sorter_common::pipeline::config::ClassificationConfig;
use sorter_common::pipeline::events::{EventSender, SorterEvent};
use sorter_common::pipeline::piece::PieceStatus;
use sorter_common::vision::{CropPair, FeederSnapshot, FramePair, VisionSource};
use sorter_hal::SharedStepper;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::machine::{Machine, StateKind};
use crate::carousel::SharedCarousel;
use crate::piece::{PieceRef, piece_id, update_piece};
use crate::shared::SharedState;
use crate::worker::WorkerSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationTag {
    Idle,
    Detecting,
    Rotating,
    Snapping,
}

impl fmt::Display for ClassificationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Detecting => "DETECTING",
            Self::Rotating => "ROTATING",
            Self::Snapping => "SNAPPING",
        })
    }
}

#[derive(Debug, Default)]
pub struct Rotating {
    commanded_at: Option<Instant>,
    blocked_since: Option<Instant>,
}

pub struct Snapping {
    entered: Instant,
    piece: PieceRef,
    worker: WorkerSlot<SnapCapture>,
}

impl Snapping {
    fn new(piece: PieceRef) -> Self {
        Self {
            entered: Instant::now(),
            piece,
            worker: WorkerSlot::new(),
        }
    }
}

/// Frames and crops taken for one piece.
#[derive(Debug, Clone, Default)]
pub struct SnapCapture {
    pub frames: FramePair,
    pub crops: CropPair,
}

pub enum ClassificationState {
    Idle,
    Detecting,
    Rotating(Rotating),
    Snapping(Snapping),
}

impl StateKind for ClassificationState {
    type Tag = ClassificationTag;

    fn tag(&self) -> ClassificationTag {
        match self {
            Self::Idle => ClassificationTag::Idle,
            Self::Detecting => ClassificationTag::Detecting,
            Self::Rotating(_) => ClassificationTag::Rotating,
            Self::Snapping(_) => ClassificationTag::Snapping,
        }
    }
}

struct ClassificationContext {
    config: ClassificationConfig,
    carousel: SharedCarousel,
    vision: Arc<dyn VisionSource>,
    classifier: Arc<dyn Classifier>,
    stepper: SharedStepper,
    events: EventSender,
}

pub struct ClassificationMachine {
    machine: Machine<ClassificationState>,
    ctx: ClassificationContext,
    lost_pieces: u64,
}

impl ClassificationMachine {
    pub fn new(
        config: ClassificationConfig,
        carousel: SharedCarousel,
        vision: Arc<dyn VisionSource>,
        classifier: Arc<dyn Classifier>,
        stepper: SharedStepper,
        events: EventSender,
    ) -> Self {
        Self {
            machine: Machine::new("classification", ClassificationState::Idle),
            ctx: ClassificationContext {
                config,
                carousel,
                vision,
                classifier,
                stepper,
                events,
            },
            lost_pieces: 0,
        }
    }

    pub fn tag(&self) -> ClassificationTag {
        self.machine.tag()
    }

    /// Pieces that left the exit platform without being distributed.
    pub fn lost_pieces(&self) -> u64 {
        self.lost_pieces
    }

    pub fn step(&mut self, shared: &mut SharedState) {
        let ctx = &self.ctx;
        let next = match self.machine.state_mut() {
            ClassificationState::Idle => {
                shared.classification_ready.then_some(ClassificationState::Detecting)
            }
            ClassificationState::Detecting => step_detecting(ctx, shared),
            ClassificationState::Rotating(r) => step_rotating(ctx, r, shared, &mut self.lost_pieces),
            ClassificationState::Snapping(s) => step_snapping(ctx, s, shared),
        };
        self.machine.apply(next);
    }

    /// Return to IDLE, cancelling any capture in progress.
    pub fn cleanup(&mut self) {
        if self.tag() != ClassificationTag::Idle {
            self.machine.apply(Some(ClassificationState::Idle));
        }
    }
}

// ─── DETECTING ──────────────────────────────────────────────────────

/// True when a confident object mask touches a carousel mask.
pub fn pickup_detected(snapshot: &FeederSnapshot, config: &ClassificationConfig) -> bool {
    let platforms = snapshot.masks_of(CAROUSEL_CLASS_ID);
    snapshot
        .masks_of(OBJECT_CLASS_ID)
        .iter()
        .filter(|o| o.confidence >= config.object_confidence)
        .any(|o| {
            platforms.iter().any(|p| {
                o.mask.edge_proximity(&p.mask, config.proximity_radius_px)
                    > config.proximity_threshold
            })
        })
}

fn step_detecting(ctx: &ClassificationContext, shared: &mut SharedState) -> Option<ClassificationState> {
    if !pickup_detected(&ctx.vision.feeder_snapshot(), &ctx.config) {
        return None;
    }
    shared.classification_ready = false;
    ctx.carousel.lock().add_piece_at_feeder();
    Some(ClassificationState::Rotating(Rotating::default()))
}

// ─── ROTATING ───────────────────────────────────────────────────────

fn hand_off(ctx: &ClassificationContext, piece: &PieceRef, shared: &mut SharedState) {
    update_piece(piece, &ctx.events, |p| p.status = PieceStatus::Distributing);
    shared.distribution_ready = false;
    shared.pending_piece = Some(Arc::clone(piece));
    info!(
        "classification: piece {} handed to distribution",
        piece.lock().short_id()
    );
}

/// Settle the exit platform before rotating. Returns `true` when the
/// carousel may turn now.
fn prepare_exit(ctx: &ClassificationContext, rot: &mut Rotating, shared: &mut SharedState) -> bool {
    let mut carousel = ctx.carousel.lock();
    let Some(exit) = carousel.piece_at_exit() else {
        return true;
    };
    let (id, status) = {
        let p = exit.lock();
        (p.id, p.status)
    };

    if status == PieceStatus::Classifying {
        let since = *rot.blocked_since.get_or_insert_with(|| {
            debug!("classification: waiting for exit piece {} to resolve", id);
            Instant::now()
        });
        if since.elapsed() < Duration::from_millis(ctx.config.timeout_ms) {
            return false;
        }
        carousel.force_resolve(id);
    }

    if exit.lock().status.is_resolved() {
        if shared.pending_piece.is_none() {
            hand_off(ctx, &exit, shared);
        }
        // wait for the chute to be positioned for it
        return false;
    }
    true
}

fn step_rotating(
    ctx: &ClassificationContext,
    rot: &mut Rotating,
    shared: &mut SharedState,
    lost: &mut u64,
) -> Option<ClassificationState> {
    let Some(commanded_at) = rot.commanded_at else {
        if !shared.distribution_ready || !prepare_exit(ctx, rot, shared) {
            return None;
        }
        let profile = MotionProfile {
            delay_us: ctx.config.rotate_delay_us,
            acceleration: 0,
        };
        match ctx.stepper.lock().rotate(ctx.config.rotate_degrees, &profile) {
            Ok(steps) => debug!("classification: carousel rotate ({} steps)", steps),
            Err(e) => warn!("classification: carousel rotate rejected: {}", e),
        }
        rot.commanded_at = Some(Instant::now());
        return None;
    };
    if commanded_at.elapsed() < Duration::from_millis(ctx.config.rotate_settle_ms) {
        return None;
    }

    let mut carousel = ctx.carousel.lock();
    if let Some(exiting) = carousel.rotate() {
        let record = exiting.lock().clone();
        if record.status == PieceStatus::Distributing && record.destination_bin.is_some() {
            debug!("classification: drop of {} confirmed", record.short_id());
            shared.distribution_ready = false;
        } else {
            *lost += 1;
            warn!(
                "classification: piece {} left the carousel unhandled ({})",
                record.short_id(),
                record.status
            );
            ctx.events.emit(SorterEvent::PieceLost(record));
        }
    }

    if let Some(exit) = carousel.piece_at_exit() {
        if shared.pending_piece.is_none() && exit.lock().status.is_resolved() {
            hand_off(ctx, &exit, shared);
        }
    }

    match carousel.piece_at_classification() {
        Some(piece) => Some(ClassificationState::Snapping(Snapping::new(piece))),
        None => {
            shared.classification_ready = true;
            Some(ClassificationState::Idle)
        }
    }
}

// ─── SNAPPING ───────────────────────────────────────────────────────

fn capture(vision: &dyn VisionSource, timeout: Duration) -> SnapCapture {
    SnapCapture {
        frames: vision.capture_fresh_frames(timeout),
        crops: vision.classification_crops(timeout),
    }
}

/// Write `<id>_{top,bottom}_{full,crop}.jpg` for whatever was captured.
fn save_snapshots(dir: &Path, id: Uuid, snap: &SnapCapture) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let files = [
        ("top_full", snap.frames.top.as_ref().map(|f| f.jpeg.as_slice())),
        ("bottom_full", snap.frames.bottom.as_ref().map(|f| f.jpeg.as_slice())),
        ("top_crop", snap.crops.top.as_ref().map(|c| c.jpeg.as_slice())),
        ("bottom_crop", snap.crops.bottom.as_ref().map(|c| c.jpeg.as_slice())),
    ];
    for (suffix, bytes) in files {
        if let Some(bytes) = bytes {
            std::fs::write(dir.join(format!("{id}_{suffix}.jpg")), bytes)?;
        }
    }
    Ok(())
}

fn capture_worker(
    vision: Arc<dyn VisionSource>,
    timeout: Duration,
    snap_dir: Option<PathBuf>,
    id: Uuid,
) -> SnapCapture {
    let snap = capture(vision.as_ref(), timeout);
    if let Some(dir) = snap_dir {
        if let Err(e) = save_snapshots(&dir, id, &snap) {
            warn!("classification: could not save snapshots to {}: {}", dir.display(), e);
        }
    }
    snap
}

/// Attach images to the piece and send it to the classifier.
fn dispatch(ctx: &ClassificationContext, piece: &PieceRef, snap: SnapCapture) {
    let SnapCapture { frames, crops } = snap;
    let encode = |bytes: &[u8]| BASE64.encode(bytes);
    let top_image = frames.top.as_ref().map(|f| encode(f.display_jpeg()));
    let bottom_image = frames.bottom.as_ref().map(|f| encode(f.display_jpeg()));

    if crops.top.is_none() && crops.bottom.is_none() {
        update_piece(piece, &ctx.events, |p| {
            p.top_image = top_image;
            p.bottom_image = bottom_image;
            p.status = PieceStatus::NotFound;
        });
        warn!(
            "classification: no crop for piece {}, marked not_found",
            piece.lock().short_id()
        );
        return;
    }

    let thumbnail = crops
        .top
        .as_ref()
        .or(crops.bottom.as_ref())
        .map(|c| encode(&c.jpeg));
    update_piece(piece, &ctx.events, |p| {
        p.thumbnail = thumbnail;
        p.top_image = top_image;
        p.bottom_image = bottom_image;
        p.status = PieceStatus::Classifying;
    });

    let id = piece_id(piece);
    ctx.carousel.lock().mark_pending_classification(piece);
    let carousel = Arc::clone(&ctx.carousel);
    ctx.classifier.classify(
        crops.top,
        crops.bottom,
        Box::new(move |result| {
            carousel.lock().resolve_classification(id, result);
        }),
    );
    debug!("classification: dispatched {}", id);
}

fn step_snapping(
    ctx: &ClassificationContext,
    snapping: &mut Snapping,
    shared: &mut SharedState,
) -> Option<ClassificationState> {
    if snapping.entered.elapsed() < Duration::from_millis(ctx.config.snap_delay_ms) {
        return None;
    }
    let vision = Arc::clone(&ctx.vision);
    let timeout = Duration::from_millis(ctx.config.capture_timeout_ms);
    let snap_dir = ctx.config.snap_dir.clone();
    let id = piece_id(&snapping.piece);
    snapping
        .worker
        .ensure_started("snapping", move |_| capture_worker(vision, timeout, snap_dir, id));

    let snap = match snapping.worker.poll() {
        Some(snap) => snap,
        None if snapping.worker.is_finished() => SnapCapture::default(),
        None => return None,
    };
    dispatch(ctx, &snapping.piece, snap);
    shared.classification_ready = true;
    Some(ClassificationState::Idle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::Carousel;
    use crate::piece::piece_status;
    use sorter_common::classify::Classification;
    use sorter_common::consts::{CLASSIFICATION_POSITION, EXIT_POSITION};
    use sorter_common::hal::config::StepperConfig;
    use sorter_common::pipeline::events::event_channel;
    use sorter_common::pipeline::piece::BinAddress;
    use sorter_common::vision::{CameraFrame, DetectedMask, ImageCrop, Mask};
    use sorter_hal::drivers::simulation::{SimulatedClassifier, SimulatedStepper, SimulatedVision};
    use sorter_hal::share;
    use std::sync::mpsc::Receiver;
    use tempfile::TempDir;

    struct Rig {
        machine: ClassificationMachine,
        carousel: SharedCarousel,
        vision: Arc<SimulatedVision>,
        classifier: Arc<SimulatedClassifier>,
        stepper: SharedStepper,
        events: Receiver<SorterEvent>,
    }

    fn fast_config() -> ClassificationConfig {
        ClassificationConfig {
            rotate_settle_ms: 0,
            snap_delay_ms: 0,
            timeout_ms: 50,
            ..ClassificationConfig::default()
        }
    }

    fn rig(config: ClassificationConfig) -> Rig {
        let (events, rx) = event_channel();
        let carousel = Carousel::shared(events.clone());
        let vision = Arc::new(SimulatedVision::new());
        let classifier = Arc::new(SimulatedClassifier::deferred());
        let stepper = share(Box::new(SimulatedStepper::new(
            "carousel",
            StepperConfig::default(),
        )));
        let machine = ClassificationMachine::new(
            config,
            Arc::clone(&carousel),
            vision.clone(),
            classifier.clone(),
            Arc::clone(&stepper),
            events,
        );
        Rig {
            machine,
            carousel,
            vision,
            classifier,
            stepper,
            events: rx,
        }
    }

    fn touching_snapshot() -> FeederSnapshot {
        let mut snap = FeederSnapshot::default();
        snap.push(DetectedMask {
            mask: Mask::from_rect(40, 40, 10, 10, 20, 20),
            confidence: 0.9,
            class_id: OBJECT_CLASS_ID,
            instance_id: 1,
        });
        snap.push(DetectedMask {
            mask: Mask::from_rect(40, 40, 20, 0, 40, 40),
            confidence: 0.99,
            class_id: CAROUSEL_CLASS_ID,
            instance_id: 2,
        });
        snap
    }

    fn crop() -> ImageCrop {
        ImageCrop {
            jpeg: vec![0xff, 0xd8, 0x01],
            width: 8,
            height: 8,
        }
    }

    fn step_until(rig: &mut Rig, shared: &mut SharedState, tag: ClassificationTag) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while rig.machine.tag() != tag {
            assert!(Instant::now() < deadline, "stuck in {}", rig.machine.tag());
            rig.machine.step(shared);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn pickup_needs_confident_touching_object() {
        let config = ClassificationConfig::default();
        assert!(pickup_detected(&touching_snapshot(), &config));

        let mut far = FeederSnapshot::default();
        far.push(DetectedMask {
            mask: Mask::from_rect(40, 40, 0, 0, 4, 4),
            confidence: 0.9,
            class_id: OBJECT_CLASS_ID,
            instance_id: 1,
        });
        far.push(DetectedMask {
            mask: Mask::from_rect(40, 40, 30, 30, 40, 40),
            confidence: 0.9,
            class_id: CAROUSEL_CLASS_ID,
            instance_id: 2,
        });
        assert!(!pickup_detected(&far, &config));

        let mut faint = touching_snapshot();
        for m in faint.masks.get_mut(&OBJECT_CLASS_ID).unwrap() {
            m.confidence = 0.1;
        }
        assert!(!pickup_detected(&faint, &config));
    }

    #[test]
    fn full_cycle_dispatches_and_returns_ready() {
        let mut rig = rig(fast_config());
        let mut shared = SharedState::new();
        rig.machine.step(&mut shared);
        assert_eq!(rig.machine.tag(), ClassificationTag::Detecting);

        // nothing on the feeder: keep polling
        rig.machine.step(&mut shared);
        assert_eq!(rig.machine.tag(), ClassificationTag::Detecting);

        rig.vision.set_snapshot(touching_snapshot());
        rig.vision.set_crops(CropPair {
            top: Some(crop()),
            bottom: None,
        });
        rig.vision.set_frames(FramePair {
            top: Some(CameraFrame {
                jpeg: vec![1, 2, 3],
                annotated_jpeg: None,
                timestamp_ms: 0,
            }),
            bottom: None,
        });
        rig.machine.step(&mut shared);
        assert_eq!(rig.machine.tag(), ClassificationTag::Rotating);
        assert!(!shared.classification_ready);

        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);
        assert_eq!(rig.stepper.lock().position_steps(), -400);
        let piece = rig
            .carousel
            .lock()
            .piece_at(CLASSIFICATION_POSITION)
            .unwrap();

        step_until(&mut rig, &mut shared, ClassificationTag::Idle);
        assert!(shared.classification_ready);
        assert_eq!(piece_status(&piece), PieceStatus::Classifying);
        assert!(rig.carousel.lock().is_pending(&piece_id(&piece)));
        assert_eq!(rig.vision.capture_count(), 1);
        {
            let p = piece.lock();
            assert_eq!(p.thumbnail.as_deref(), Some("/9gB"));
            assert_eq!(p.top_image.as_deref(), Some("AQID"));
            assert!(p.bottom_image.is_none());
        }

        assert!(rig.classifier.complete_next(Classification::identified("3001", 0.8)));
        assert_eq!(piece_status(&piece), PieceStatus::Classified);

        let tags: Vec<_> = rig.events.try_iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["piece_created", "piece_updated", "piece_updated"]);
    }

    #[test]
    fn missing_crops_mark_not_found_without_dispatch() {
        let mut rig = rig(fast_config());
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);
        let piece = rig.carousel.lock().piece_at_classification().unwrap();

        step_until(&mut rig, &mut shared, ClassificationTag::Idle);
        assert_eq!(piece_status(&piece), PieceStatus::NotFound);
        assert_eq!(rig.classifier.pending(), 0);
        assert_eq!(rig.carousel.lock().pending_count(), 0);
    }

    #[test]
    fn rotation_waits_for_distribution() {
        let mut rig = rig(fast_config());
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        step_until(&mut rig, &mut shared, ClassificationTag::Rotating);

        shared.distribution_ready = false;
        for _ in 0..5 {
            rig.machine.step(&mut shared);
        }
        assert_eq!(rig.machine.tag(), ClassificationTag::Rotating);
        assert_eq!(rig.stepper.lock().position_steps(), 0);

        shared.distribution_ready = true;
        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);
    }

    /// Put a piece with `status` on the exit platform.
    fn exit_piece(rig: &Rig, status: PieceStatus) -> PieceRef {
        let mut carousel = rig.carousel.lock();
        let piece = carousel.add_piece_at_feeder();
        for _ in 0..EXIT_POSITION {
            carousel.rotate();
        }
        piece.lock().status = status;
        if status == PieceStatus::Classifying {
            carousel.mark_pending_classification(&piece);
        }
        piece
    }

    #[test]
    fn resolved_exit_piece_is_handed_off_before_rotating() {
        let mut rig = rig(fast_config());
        let piece = exit_piece(&rig, PieceStatus::Classified);
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        step_until(&mut rig, &mut shared, ClassificationTag::Rotating);
        rig.machine.step(&mut shared);

        assert!(!shared.distribution_ready);
        assert!(Arc::ptr_eq(shared.pending_piece.as_ref().unwrap(), &piece));
        assert_eq!(piece_status(&piece), PieceStatus::Distributing);
        assert_eq!(rig.stepper.lock().position_steps(), 0);

        // distribution positions the chute and takes the piece
        shared.pending_piece = None;
        piece.lock().destination_bin = Some(BinAddress::new(0, 0, 0));
        shared.distribution_ready = true;
        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);

        // rotation dropped the piece: confirmation clears distribution_ready
        assert!(!shared.distribution_ready);
        assert!(rig.carousel.lock().piece_at_exit().is_none());
        assert_eq!(rig.machine.lost_pieces(), 0);
    }

    #[test]
    fn classifying_exit_piece_blocks_until_timeout() {
        let mut rig = rig(fast_config());
        let piece = exit_piece(&rig, PieceStatus::Classifying);
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        step_until(&mut rig, &mut shared, ClassificationTag::Rotating);

        rig.machine.step(&mut shared);
        assert_eq!(piece_status(&piece), PieceStatus::Classifying);
        assert!(shared.pending_piece.is_none());

        std::thread::sleep(Duration::from_millis(60));
        rig.machine.step(&mut shared);
        assert_eq!(piece_status(&piece), PieceStatus::Distributing);
        assert!(piece.lock().part_id.is_none());
        assert!(!rig.carousel.lock().is_pending(&piece_id(&piece)));
    }

    #[test]
    fn abandoned_exit_piece_is_counted_lost() {
        let mut rig = rig(fast_config());
        let piece = exit_piece(&rig, PieceStatus::Distributing);
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);

        assert_eq!(rig.machine.lost_pieces(), 1);
        assert!(shared.distribution_ready);
        let lost: Vec<_> = rig
            .events
            .try_iter()
            .filter_map(|e| match e {
                SorterEvent::PieceLost(p) => Some(p.id),
                _ => None,
            })
            .collect();
        assert_eq!(lost, vec![piece_id(&piece)]);
    }

    #[test]
    fn snapshots_are_written_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut rig = rig(ClassificationConfig {
            snap_dir: Some(dir.path().to_path_buf()),
            ..fast_config()
        });
        let mut shared = SharedState::new();
        rig.vision.set_snapshot(touching_snapshot());
        rig.vision.set_crops(CropPair {
            top: Some(crop()),
            bottom: Some(crop()),
        });
        step_until(&mut rig, &mut shared, ClassificationTag::Snapping);
        let id = piece_id(&rig.carousel.lock().piece_at_classification().unwrap());
        step_until(&mut rig, &mut shared, ClassificationTag::Idle);

        assert!(dir.path().join(format!("{id}_top_crop.jpg")).exists());
        assert!(dir.path().join(format!("{id}_bottom_crop.jpg")).exists());
        assert!(!dir.path().join(format!("{id}_top_full.jpg")).exists());
    }

    #[test]
    fn cleanup_returns_to_idle() {
        let mut rig = rig(fast_config());
        let mut shared = SharedState::new();
        rig.machine.step(&mut shared);
        rig.machine.cleanup();
        assert_eq!(rig.machine.tag(), ClassificationTag::Idle);
    }
}
