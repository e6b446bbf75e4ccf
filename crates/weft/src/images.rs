//! Asynchronous image loading.
//!
//! [`ImagePipeline::load`] hands back a handle straight away, so a widget can
//! draw an image in the same frame it asked for it. Decoding happens on worker
//! threads (or deferred to the next [`ImagePipeline::poll`]) and results are
//! published over a channel. Each record moves `Pending -> Loaded` or
//! `Pending -> Failed` exactly once, at poll time, on the frame thread.
//!
//! Handles carry a generation so a slot reused after [`ImagePipeline::unload`]
//! never answers for the old handle.

use crate::atlas::{AtlasOwner, PixelFormat};
use crossbeam_channel::{Receiver, Sender};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    index: u32,
    generation: u32,
}

impl ImageHandle {
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub const fn from_raw(raw: [u32; 2]) -> Self {
        Self {
            index: raw[0],
            generation: raw[1],
        }
    }

    #[inline]
    pub const fn to_raw(self) -> [u32; 2] {
        [self.index, self.generation]
    }
}

impl From<ImageHandle> for AtlasOwner {
    fn from(handle: ImageHandle) -> Self {
        AtlasOwner::Image {
            index: handle.index,
            generation: handle.generation,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Clone, Debug)]
pub enum ImageSource {
    Path(PathBuf),
    /// Encoded file contents (PNG, JPEG, GIF).
    Encoded(Vec<u8>),
    /// Already decoded RGBA8 pixels.
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path(path.into())
    }

    fn describe(&self) -> String {
        match self {
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::Encoded(bytes) => format!("<{} encoded bytes>", bytes.len()),
            ImageSource::Rgba { width, height, .. } => format!("<{width}x{height} rgba>"),
        }
    }
}

/// Load-time options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Target size in pixels. `[0, 0]` keeps the natural size; a single zero
    /// component is derived from the aspect ratio.
    pub size: [u32; 2],
}

impl ImageOptions {
    pub const fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: [width, height],
        }
    }

    /// Final size for an image whose natural size is `natural`.
    pub fn target_size(&self, natural: [u32; 2]) -> [u32; 2] {
        let [w, h] = self.size;
        let [nw, nh] = natural;
        match (w, h) {
            (0, 0) => natural,
            (0, h) if nh > 0 => [scale(nw, h, nh), h],
            (w, 0) if nw > 0 => [w, scale(nh, w, nw)],
            (0, h) => [0, h],
            (w, 0) => [w, 0],
            (w, h) => [w, h],
        }
    }
}

fn scale(value: u32, num: u32, den: u32) -> u32 {
    ((value as u64 * num as u64 + den as u64 / 2) / den as u64).max(1) as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Decoded RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("decode failed: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{expected} bytes of RGBA expected, got {actual}")]
    PixelSize { expected: usize, actual: usize },

    #[error("image has zero size")]
    ZeroSize,

    #[error("{0} cannot decode this source")]
    Unsupported(&'static str),

    #[error("failed to spawn decode worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("decode worker is gone")]
    WorkerGone,

    #[error("decoder panicked: {0}")]
    Panicked(String),
}

/// Turns an [`ImageSource`] into RGBA8 pixels. Called from worker threads.
pub trait ImageDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(
        &self,
        source: &ImageSource,
        options: &ImageOptions,
    ) -> Result<DecodedImage, ImageError>;
}

/// Run `decoder` on `job`, turning a panic into [`ImageError::Panicked`].
fn decode_job(decoder: &dyn ImageDecoder, job: &Job) -> Result<DecodedImage, ImageError> {
    let decode = || decoder.decode(&job.source, &job.options);
    match std::panic::catch_unwind(AssertUnwindSafe(decode)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ImageError::Panicked(message))
        }
    }
}

/// Accepts raw RGBA sources only, at their natural size.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawRgbaDecoder;

impl ImageDecoder for RawRgbaDecoder {
    fn name(&self) -> &'static str {
        "raw-rgba"
    }

    fn decode(
        &self,
        source: &ImageSource,
        options: &ImageOptions,
    ) -> Result<DecodedImage, ImageError> {
        match source {
            ImageSource::Rgba {
                width,
                height,
                pixels,
            } => {
                let image = checked_rgba(*width, *height, pixels)?;
                if options.target_size([*width, *height]) != [*width, *height] {
                    return Err(ImageError::Unsupported(self.name()));
                }
                Ok(image)
            }
            _ => Err(ImageError::Unsupported(self.name())),
        }
    }
}

fn checked_rgba(width: u32, height: u32, pixels: &[u8]) -> Result<DecodedImage, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroSize);
    }
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(ImageError::PixelSize {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(DecodedImage {
        width,
        height,
        pixels: pixels.to_vec(),
    })
}

/// Decoder backed by the `image` crate. Resizes with a triangle filter.
#[cfg(feature = "image-decode")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

#[cfg(feature = "image-decode")]
impl ImageDecoder for ImageCrateDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn decode(
        &self,
        source: &ImageSource,
        options: &ImageOptions,
    ) -> Result<DecodedImage, ImageError> {
        let rgba = match source {
            ImageSource::Path(path) => image::open(path).map_err(decode_error)?.to_rgba8(),
            ImageSource::Encoded(bytes) => {
                let decoded = image::load_from_memory(bytes).map_err(decode_error)?;
                decoded.to_rgba8()
            }
            ImageSource::Rgba {
                width,
                height,
                pixels,
            } => {
                let checked = checked_rgba(*width, *height, pixels)?;
                image::RgbaImage::from_raw(checked.width, checked.height, checked.pixels).ok_or(
                    ImageError::PixelSize {
                        expected: *width as usize * *height as usize * 4,
                        actual: pixels.len(),
                    },
                )?
            }
        };

        let (nw, nh) = rgba.dimensions();
        if nw == 0 || nh == 0 {
            return Err(ImageError::ZeroSize);
        }

        let [w, h] = options.target_size([nw, nh]);
        if w == 0 || h == 0 {
            return Err(ImageError::ZeroSize);
        }
        let rgba = if [w, h] == [nw, nh] {
            rgba
        } else {
            image::imageops::resize(&rgba, w, h, image::imageops::FilterType::Triangle)
        };

        Ok(DecodedImage {
            width: w,
            height: h,
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(feature = "image-decode")]
fn decode_error(e: image::ImageError) -> ImageError {
    ImageError::Decode(Box::new(e))
}

/// The decoder used when none is given.
pub fn default_decoder() -> Arc<dyn ImageDecoder> {
    #[cfg(feature = "image-decode")]
    {
        Arc::new(ImageCrateDecoder)
    }
    #[cfg(not(feature = "image-decode"))]
    {
        Arc::new(RawRgbaDecoder)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeMode {
    /// Decode on `n` worker threads (at least one).
    Threads(usize),
    /// Decode synchronously inside the next `poll()`.
    Deferred,
}

impl Default for DecodeMode {
    fn default() -> Self {
        DecodeMode::Threads(2)
    }
}

/// What a `poll()` changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub loaded: usize,
    pub failed: usize,
    /// Results that arrived for unloaded or reused slots.
    pub stale: usize,
}

struct Job {
    handle: ImageHandle,
    source: ImageSource,
    options: ImageOptions,
}

struct JobResult {
    handle: ImageHandle,
    result: Result<DecodedImage, ImageError>,
}

enum RecordState {
    Free,
    Pending,
    Loaded(DecodedImage),
    Failed(ImageError),
}

struct ImageRecord {
    generation: u32,
    state: RecordState,
}

enum Executor {
    Threads {
        jobs: Option<Sender<Job>>,
        workers: Vec<JoinHandle<()>>,
        shutdown: Arc<AtomicBool>,
    },
    Deferred {
        queue: Vec<Job>,
    },
}

pub struct ImagePipeline {
    records: Vec<ImageRecord>,
    free: Vec<u32>,
    executor: Executor,
    results_tx: Sender<JobResult>,
    results_rx: Receiver<JobResult>,
    decoder: Arc<dyn ImageDecoder>,
    in_flight: usize,
}

impl ImagePipeline {
    pub fn new(mode: DecodeMode) -> Result<Self, ImageError> {
        Self::with_decoder(mode, default_decoder())
    }

    pub fn with_decoder(
        mode: DecodeMode,
        decoder: Arc<dyn ImageDecoder>,
    ) -> Result<Self, ImageError> {
        let (results_tx, results_rx) = crossbeam_channel::unbounded();

        let executor = match mode {
            DecodeMode::Deferred => Executor::Deferred { queue: Vec::new() },
            DecodeMode::Threads(n) => {
                let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<Job>();
                let shutdown = Arc::new(AtomicBool::new(false));
                let mut workers = Vec::with_capacity(n.max(1));
                for i in 0..n.max(1) {
                    let jobs = jobs_rx.clone();
                    let results = results_tx.clone();
                    let decoder = decoder.clone();
                    let shutdown = shutdown.clone();
                    let worker = std::thread::Builder::new()
                        .name(format!("weft-decode-{i}"))
                        .spawn(move || decode_worker(jobs, results, decoder, shutdown))
                        .map_err(ImageError::Spawn)?;
                    workers.push(worker);
                }
                log::debug!(
                    "started {} image decode workers ({})",
                    workers.len(),
                    decoder.name()
                );
                Executor::Threads {
                    jobs: Some(jobs_tx),
                    workers,
                    shutdown,
                }
            }
        };

        Ok(Self {
            records: Vec::new(),
            free: Vec::new(),
            executor,
            results_tx,
            results_rx,
            decoder,
            in_flight: 0,
        })
    }

    pub fn load(&mut self, source: ImageSource) -> ImageHandle {
        self.load_with_options(source, ImageOptions::default())
    }

    /// Never blocks. The returned handle is `Pending` until a later `poll()`.
    pub fn load_with_options(&mut self, source: ImageSource, options: ImageOptions) -> ImageHandle {
        let handle = self.allocate_slot();
        log::debug!("loading {} as {:?}", source.describe(), handle);

        let job = Job {
            handle,
            source,
            options,
        };

        match &mut self.executor {
            Executor::Deferred { queue } => {
                queue.push(job);
                self.in_flight += 1;
            }
            Executor::Threads { jobs, .. } => {
                let sent = match jobs {
                    Some(tx) => tx.send(job).is_ok(),
                    None => false,
                };
                if sent {
                    self.in_flight += 1;
                } else {
                    log::warn!("image decode workers are gone, {:?} failed", handle);
                    let record = &mut self.records[handle.index as usize];
                    record.state = RecordState::Failed(ImageError::WorkerGone);
                }
            }
        }

        handle
    }

    /// Apply every finished decode. Deferred jobs run here.
    pub fn poll(&mut self) -> PollSummary {
        if let Executor::Deferred { queue } = &mut self.executor {
            for job in queue.drain(..) {
                let result = decode_job(self.decoder.as_ref(), &job);
                // The receiver lives in `self`, so this cannot fail.
                let _ = self.results_tx.send(JobResult {
                    handle: job.handle,
                    result,
                });
            }
        }

        let mut summary = PollSummary::default();
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply(result, &mut summary);
        }
        summary
    }

    /// Block until nothing is in flight or `timeout` passes. Returns whether
    /// the pipeline went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut summary = self.poll();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results_rx.recv_timeout(remaining) {
                Ok(result) => self.apply(result, &mut summary),
                Err(_) => break,
            }
        }
        self.in_flight == 0
    }

    /// Number of decodes not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Unknown or stale handles report `Failed`.
    pub fn status(&self, handle: ImageHandle) -> ImageStatus {
        match self.record(handle).map(|r| &r.state) {
            Some(RecordState::Pending) => ImageStatus::Pending,
            Some(RecordState::Loaded(_)) => ImageStatus::Loaded,
            _ => ImageStatus::Failed,
        }
    }

    pub fn info(&self, handle: ImageHandle) -> Option<ImageInfo> {
        self.decoded(handle).map(|image| ImageInfo {
            width: image.width,
            height: image.height,
            format: PixelFormat::Rgba8,
        })
    }

    pub fn pixels(&self, handle: ImageHandle) -> Option<&[u8]> {
        self.decoded(handle).map(|image| image.pixels.as_slice())
    }

    /// Why a handle failed, if it did.
    pub fn error(&self, handle: ImageHandle) -> Option<&ImageError> {
        match self.record(handle).map(|r| &r.state) {
            Some(RecordState::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// Free the slot. Later results for this handle are ignored and the
    /// handle reports `Failed` from now on.
    pub fn unload(&mut self, handle: ImageHandle) -> bool {
        if self.record(handle).is_none() {
            return false;
        }
        let record = &mut self.records[handle.index as usize];
        record.state = RecordState::Free;
        record.generation = record.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    /// Live (non-free) records.
    pub fn len(&self) -> usize {
        self.records.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn decoded(&self, handle: ImageHandle) -> Option<&DecodedImage> {
        match self.record(handle).map(|r| &r.state) {
            Some(RecordState::Loaded(image)) => Some(image),
            _ => None,
        }
    }

    fn record(&self, handle: ImageHandle) -> Option<&ImageRecord> {
        let record = self.records.get(handle.index as usize)?;
        let free = matches!(record.state, RecordState::Free);
        (record.generation == handle.generation && !free).then_some(record)
    }

    fn allocate_slot(&mut self) -> ImageHandle {
        if let Some(index) = self.free.pop() {
            let record = &mut self.records[index as usize];
            record.state = RecordState::Pending;
            return ImageHandle {
                index,
                generation: record.generation,
            };
        }

        let index = self.records.len() as u32;
        self.records.push(ImageRecord {
            generation: 0,
            state: RecordState::Pending,
        });
        ImageHandle {
            index,
            generation: 0,
        }
    }

    fn apply(&mut self, result: JobResult, summary: &mut PollSummary) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let JobResult { handle, result } = result;
        let record = self
            .records
            .get_mut(handle.index as usize)
            .filter(|r| r.generation == handle.generation)
            .filter(|r| matches!(r.state, RecordState::Pending));
        let Some(record) = record else {
            log::debug!("ignoring decode result for stale {:?}", handle);
            summary.stale += 1;
            return;
        };

        match result {
            Ok(image) => {
                log::debug!("{:?} loaded ({}x{})", handle, image.width, image.height);
                record.state = RecordState::Loaded(image);
                summary.loaded += 1;
            }
            Err(e) => {
                log::warn!("{:?} failed to decode: {}", handle, e);
                record.state = RecordState::Failed(e);
                summary.failed += 1;
            }
        }
    }
}

impl Drop for ImagePipeline {
    fn drop(&mut self) {
        if let Executor::Threads {
            jobs,
            workers,
            shutdown,
        } = &mut self.executor
        {
            // Queued jobs are abandoned; only decodes already running finish.
            shutdown.store(true, Ordering::Release);
            jobs.take();
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

fn decode_worker(
    jobs: Receiver<Job>,
    results: Sender<JobResult>,
    decoder: Arc<dyn ImageDecoder>,
    shutdown: Arc<AtomicBool>,
) {
    for job in jobs.iter() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        let result = JobResult {
            handle: job.handle,
            result: decode_job(decoder.as_ref(), &job),
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32) -> ImageSource {
        ImageSource::Rgba {
            width,
            height,
            pixels: vec![200; (width * height * 4) as usize],
        }
    }

    fn pipeline(mode: DecodeMode, decoder: impl ImageDecoder + 'static) -> ImagePipeline {
        ImagePipeline::with_decoder(mode, Arc::new(decoder)).unwrap()
    }

    #[test]
    fn test_target_size_keeps_aspect() {
        let fit = |w, h, natural| ImageOptions::with_size(w, h).target_size(natural);
        assert_eq!(ImageOptions::default().target_size([40, 20]), [40, 20]);
        assert_eq!(fit(0, 10, [40, 20]), [20, 10]);
        assert_eq!(fit(10, 0, [40, 20]), [10, 5]);
        assert_eq!(fit(7, 9, [40, 20]), [7, 9]);
        assert_eq!(fit(1, 0, [40, 1]), [1, 1]);
    }

    #[test]
    fn test_deferred_load_transitions_once() {
        let mut images = ImagePipeline::new(DecodeMode::Deferred).unwrap();
        let handle = images.load(rgba(4, 2));

        assert_eq!(images.status(handle), ImageStatus::Pending);
        assert!(images.info(handle).is_none());
        assert!(images.pixels(handle).is_none());

        let summary = images.poll();
        assert_eq!(summary.loaded, 1);
        assert_eq!(images.status(handle), ImageStatus::Loaded);
        assert_eq!(
            images.info(handle),
            Some(ImageInfo {
                width: 4,
                height: 2,
                format: PixelFormat::Rgba8
            })
        );
        assert_eq!(images.pixels(handle).map(<[u8]>::len), Some(32));

        assert_eq!(images.poll(), PollSummary::default());
        assert_eq!(images.status(handle), ImageStatus::Loaded);
    }

    #[test]
    fn test_bad_pixels_fail() {
        let mut images = ImagePipeline::new(DecodeMode::Deferred).unwrap();
        let handle = images.load(ImageSource::Rgba {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        });
        images.poll();
        assert_eq!(images.status(handle), ImageStatus::Failed);
        assert!(matches!(
            images.error(handle),
            Some(ImageError::PixelSize { .. })
        ));
    }

    #[test]
    fn test_unload_makes_handle_stale() {
        let mut images = ImagePipeline::new(DecodeMode::Deferred).unwrap();
        let first = images.load(rgba(1, 1));
        assert!(images.unload(first));
        assert!(!images.unload(first));

        let second = images.load(rgba(2, 2));
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());

        let summary = images.poll();
        assert_eq!(summary.stale, 1);
        assert_eq!(summary.loaded, 1);
        assert_eq!(images.status(first), ImageStatus::Failed);
        assert_eq!(images.status(second), ImageStatus::Loaded);
    }

    #[test]
    fn test_unknown_handle_reports_failed() {
        let images = ImagePipeline::new(DecodeMode::Deferred).unwrap();
        let unknown = ImageHandle::from_raw([3, 0]);
        assert_eq!(images.status(unknown), ImageStatus::Failed);
    }

    #[test]
    fn test_raw_decoder_rejects_encoded() {
        let decoder = RawRgbaDecoder;
        let source = ImageSource::Encoded(vec![1, 2, 3]);
        let err = decoder
            .decode(&source, &ImageOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImageError::Unsupported("raw-rgba")));
    }

    #[test]
    fn test_worker_threads_decode() {
        let mut images = pipeline(DecodeMode::Threads(2), RawRgbaDecoder);
        let handles: Vec<_> = (1..=8).map(|i| images.load(rgba(i, i))).collect();

        assert!(images.wait_idle(Duration::from_secs(10)));
        assert_eq!(images.in_flight(), 0);
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(images.status(*handle), ImageStatus::Loaded);
            let width = images.info(*handle).map(|info| info.width);
            assert_eq!(width, Some(i as u32 + 1));
        }
    }

    struct PanicDecoder;

    impl ImageDecoder for PanicDecoder {
        fn name(&self) -> &'static str {
            "panic"
        }

        fn decode(&self, _: &ImageSource, _: &ImageOptions) -> Result<DecodedImage, ImageError> {
            panic!("corrupt stream")
        }
    }

    #[test]
    fn test_panicking_decoder_fails_handle_on_worker() {
        let mut images = pipeline(DecodeMode::Threads(1), PanicDecoder);
        let first = images.load(rgba(2, 2));
        assert!(images.wait_idle(Duration::from_secs(10)));
        assert_eq!(images.status(first), ImageStatus::Failed);
        assert!(matches!(
            images.error(first),
            Some(ImageError::Panicked(m)) if m == "corrupt stream"
        ));

        // The worker survives and keeps serving loads.
        let second = images.load(rgba(2, 2));
        assert!(images.wait_idle(Duration::from_secs(10)));
        assert_eq!(images.in_flight(), 0);
        assert!(matches!(
            images.error(second),
            Some(ImageError::Panicked(_))
        ));
    }

    #[test]
    fn test_panicking_decoder_fails_handle_when_deferred() {
        let mut images = pipeline(DecodeMode::Deferred, PanicDecoder);
        let handle = images.load(rgba(2, 2));
        let summary = images.poll();
        assert_eq!(summary.failed, 1);
        assert_eq!(images.status(handle), ImageStatus::Failed);
        assert_eq!(images.in_flight(), 0);
    }

    struct CountingDecoder {
        started: Sender<()>,
        gate: Receiver<()>,
        decoded: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ImageDecoder for CountingDecoder {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn decode(
            &self,
            source: &ImageSource,
            options: &ImageOptions,
        ) -> Result<DecodedImage, ImageError> {
            let _ = self.started.send(());
            let _ = self.gate.recv();
            self.decoded.fetch_add(1, Ordering::SeqCst);
            RawRgbaDecoder.decode(source, options)
        }
    }

    #[test]
    fn test_drop_abandons_queued_decodes() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let decoded = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let decoder = CountingDecoder {
            started: started_tx,
            gate: gate_rx,
            decoded: decoded.clone(),
        };

        let mut images = pipeline(DecodeMode::Threads(1), decoder);
        for _ in 0..5 {
            images.load(rgba(1, 1));
        }
        started_rx.recv().unwrap();

        // Open the gate only once the drop below is already waiting.
        let release = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            drop(gate_tx);
        });
        drop(images);
        release.join().unwrap();

        assert_eq!(decoded.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "image-decode")]
    #[test]
    fn test_png_decode_and_resize() {
        use std::io::Cursor;

        let source = image::RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]));
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let mut images = ImagePipeline::new(DecodeMode::Deferred).unwrap();
        let source = ImageSource::Encoded(png.into_inner());
        let handle = images.load_with_options(source, ImageOptions::with_size(4, 0));
        let garbage = images.load(ImageSource::Encoded(vec![0xde, 0xad]));
        images.poll();

        let info = images.info(handle).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        let first = &images.pixels(handle).unwrap()[..4];
        assert!(first[0].abs_diff(10) <= 1 && first[2].abs_diff(30) <= 1);
        assert_eq!(first[3], 255);
        assert_eq!(images.status(garbage), ImageStatus::Failed);
    }
}
