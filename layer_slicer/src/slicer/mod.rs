use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use common::{
    color::{Color, PALETTE},
    config::{SliceConfig, SliceMode},
    progress::Progress,
};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    bounds::{check_layer_height, ZBounds},
    error::{Result, SliceError},
    mesh::{Mesh, WorldGeometry},
    slice::SliceSet,
    task::Task,
};

mod layer;

/// Drives slicing runs and owns what they produce.
///
/// Each call to [`Slicer::slice_model`] starts a new run and invalidates every
/// earlier [`SliceTask`]; polling an invalidated task does nothing.
pub struct Slicer {
    shared: Arc<Shared>,
    palette: Vec<Color>,
}

struct Shared {
    generation: AtomicU64,
    state: Mutex<ProgressState>,
    slices: Mutex<SliceSet>,
    progress: Progress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SliceStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

/// Snapshot of the current run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub status: SliceStatus,
    pub current_layer: u32,
    pub total_layers: u32,
    pub error: Option<SliceError>,
}

/// One layer of work per [`SliceTask::step`].
pub struct SliceTask {
    generation: u64,
    shared: Arc<Shared>,

    geometry: WorldGeometry,
    bounds: ZBounds,
    layer_height: f32,
    mode: SliceMode,
    palette: Vec<Color>,

    next_layer: u32,
    total_layers: u32,
    start_time: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPoll {
    /// More layers are left.
    Pending,
    /// Every layer has been sliced.
    Done,
    /// A newer run replaced this one. Nothing was touched.
    Stale,
}

impl Slicer {
    pub fn new() -> Self {
        Self::with_palette(PALETTE.to_vec())
    }

    pub fn with_palette(palette: Vec<Color>) -> Self {
        Self {
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                state: Mutex::new(ProgressState::default()),
                slices: Mutex::new(SliceSet::default()),
                progress: Progress::new(),
            }),
            palette,
        }
    }

    pub fn from_config(config: &SliceConfig) -> Self {
        Self::with_palette(config.palette.clone())
    }

    /// Starts slicing `mesh` into layers of `layer_height`.
    ///
    /// The previous run's slices are released first, whether or not this
    /// one can start. Setup failures are recorded in the progress state and
    /// returned; no layer is processed in that case.
    pub fn slice_model(&self, mesh: &Mesh, layer_height: f32, mode: SliceMode) -> Result<SliceTask> {
        let generation = {
            let mut state = self.shared.state.lock();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

            self.shared.slices.lock().clear();
            self.shared.progress.reset(0);
            *state = ProgressState {
                status: SliceStatus::Running,
                ..Default::default()
            };
            generation
        };

        // Baking the mesh scans every vertex, keep the state unlocked for it.
        let setup = (|| -> Result<_> {
            check_layer_height(layer_height)?;
            let geometry = mesh.world_geometry()?;
            let bounds = ZBounds::of(&geometry)?;
            let total_layers = bounds.layer_count(layer_height)?;
            Ok((geometry, bounds, total_layers))
        })();

        let mut state = self.shared.state.lock();
        if self.shared.generation.load(Ordering::SeqCst) != generation {
            debug!("Run {generation} was replaced during setup");
            return Err(SliceError::Superseded);
        }

        let (geometry, bounds, total_layers) = match setup {
            Ok(setup) => setup,
            Err(err) => {
                warn!("Can't slice model: {err}");
                state.status = SliceStatus::Error;
                state.error = Some(err.clone());
                return Err(err);
            }
        };

        info!(
            "Slicing {} triangles into {total_layers} {mode:?} layers of {layer_height} (z {} to {})",
            geometry.triangle_count(),
            bounds.min,
            bounds.max
        );

        state.total_layers = total_layers;
        self.shared.progress.reset(total_layers as u64);
        *self.shared.slices.lock() = SliceSet::new(mesh.clone(), layer_height, mode, bounds);
        drop(state);

        Ok(SliceTask {
            generation,
            shared: self.shared.clone(),

            geometry,
            bounds,
            layer_height,
            mode,
            palette: self.palette.clone(),

            next_layer: 0,
            total_layers,
            start_time: Instant::now(),
        })
    }

    /// Slices to completion on the calling thread.
    pub fn slice_blocking(&self, mesh: &Mesh, layer_height: f32, mode: SliceMode) -> Result<SliceSet> {
        self.slice_model(mesh, layer_height, mode)?.run()
    }

    /// Invalidates any running task, drops the current slices and goes back
    /// to idle.
    pub fn release(&self) {
        let mut state = self.shared.state.lock();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.slices.lock().clear();
        self.shared.progress.reset(0);
        *state = ProgressState::default();
    }

    pub fn progress(&self) -> ProgressState {
        self.shared.state.lock().clone()
    }

    /// Counter that can be watched from another thread, see
    /// [`Progress::wait`].
    pub fn progress_counter(&self) -> Progress {
        self.shared.progress.clone()
    }

    pub fn is_slicing(&self) -> bool {
        self.shared.state.lock().status == SliceStatus::Running
    }

    pub fn error(&self) -> Option<SliceError> {
        self.shared.state.lock().error.clone()
    }

    /// Cheap snapshot of the slices produced so far.
    pub fn slices(&self) -> SliceSet {
        self.shared.slices.lock().clone()
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Fraction of layers done in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        match self.status {
            SliceStatus::Done => 1.0,
            _ if self.total_layers == 0 => 0.0,
            _ => self.current_layer as f32 / self.total_layers as f32,
        }
    }

    pub fn is_slicing(&self) -> bool {
        self.status == SliceStatus::Running
    }
}

impl SliceTask {
    pub fn is_current(&self) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == self.generation
    }

    pub fn total_layers(&self) -> u32 {
        self.total_layers
    }

    pub fn mode(&self) -> SliceMode {
        self.mode
    }

    /// Slices the next layer and publishes it.
    pub fn step(&mut self) -> TaskPoll {
        if !self.is_current() {
            return TaskPoll::Stale;
        }

        if self.next_layer >= self.total_layers {
            let mut state = self.shared.state.lock();
            if !self.is_current() {
                return TaskPoll::Stale;
            }

            self.finish(&mut state);
            return TaskPoll::Done;
        }

        let layer = self.next_layer;
        let z0 = self.bounds.layer_z(layer, self.layer_height);
        let slice = layer::slice_layer(
            &self.geometry,
            self.mode,
            layer,
            (z0, z0 + self.layer_height),
            &self.palette,
        );
        trace!(
            "Layer {layer} at z {z0}: {} segments, {} triangles",
            slice.segment_count(),
            slice.triangle_count()
        );

        // Checked again under the lock, a new run may have started while
        // this layer was being computed.
        let mut state = self.shared.state.lock();
        if !self.is_current() {
            debug!("Discarding layer {layer} of a superseded run");
            return TaskPoll::Stale;
        }

        self.shared.slices.lock().push(slice);
        self.next_layer += 1;
        state.current_layer = self.next_layer;
        self.shared.progress.add_complete(1);

        if self.next_layer >= self.total_layers {
            self.finish(&mut state);
            return TaskPoll::Done;
        }

        TaskPoll::Pending
    }

    /// Steps until done, returning a snapshot of the finished slices.
    pub fn run(mut self) -> Result<SliceSet> {
        loop {
            match self.step() {
                TaskPoll::Pending => continue,
                TaskPoll::Stale => return Err(SliceError::Superseded),
                TaskPoll::Done => {
                    let _state = self.shared.state.lock();
                    if !self.is_current() {
                        return Err(SliceError::Superseded);
                    }

                    return Ok(self.shared.slices.lock().clone());
                }
            }
        }
    }

    fn finish(&self, state: &mut ProgressState) {
        if state.status == SliceStatus::Done {
            return;
        }

        state.status = SliceStatus::Done;
        state.current_layer = self.total_layers;
        self.shared.progress.set_finished();
        info!(
            "Sliced {} layers in {:?}",
            self.total_layers,
            self.start_time.elapsed()
        );
    }
}

impl Task for SliceTask {
    fn poll(&mut self) -> bool {
        match self.step() {
            TaskPoll::Pending => false,
            TaskPoll::Done => true,
            TaskPoll::Stale => {
                debug!("Dropping stale slice task (generation {})", self.generation);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::color::slice_color;

    use super::*;
    use crate::{error::ErrorKind, task::TaskManager, Pos};

    fn cube() -> Mesh {
        Mesh::cube(Pos::zeros(), Pos::repeat(1.0))
    }

    #[test]
    fn one_layer_per_step() {
        let slicer = Slicer::new();
        let mut task = slicer.slice_model(&cube(), 0.25, SliceMode::Volumetric).unwrap();
        assert_eq!(task.total_layers(), 4);

        let state = slicer.progress();
        assert_eq!(state.status, SliceStatus::Running);
        assert_eq!((state.current_layer, state.total_layers), (0, 4));
        assert_eq!(state.progress(), 0.0);

        assert_eq!(task.step(), TaskPoll::Pending);
        assert_eq!(slicer.slices().len(), 1);
        assert_eq!(slicer.progress().progress(), 0.25);
        assert_eq!(slicer.progress_counter().completed(), 1);

        assert_eq!(task.step(), TaskPoll::Pending);
        assert_eq!(task.step(), TaskPoll::Pending);
        assert_eq!(task.step(), TaskPoll::Done);

        let state = slicer.progress();
        assert_eq!(state.status, SliceStatus::Done);
        assert_eq!(state.progress(), 1.0);
        assert!(!slicer.is_slicing());

        let slices = slicer.slices();
        assert_eq!(slices.len(), 4);
        for (i, slice) in slices.iter().enumerate() {
            assert_eq!(slice.layer as usize, i);
            assert_eq!(slice.color, slice_color(i));
        }

        // Polling a finished task is harmless.
        assert_eq!(task.step(), TaskPoll::Done);
        assert_eq!(slicer.slices().len(), 4);
    }

    #[test]
    fn bad_layer_height() {
        let slicer = Slicer::new();
        let err = slicer
            .slice_model(&cube(), 0.0, SliceMode::Contour)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let state = slicer.progress();
        assert_eq!(state.status, SliceStatus::Error);
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.error, Some(err));
        assert!(slicer.slices().is_empty());
    }

    #[test]
    fn failed_setup_releases_previous_slices() {
        let slicer = Slicer::new();
        slicer
            .slice_blocking(&cube(), 0.5, SliceMode::Volumetric)
            .unwrap();
        assert_eq!(slicer.slices().len(), 2);

        let broken = Mesh::new(vec![Pos::zeros(); 3], Some(vec![0, 1, 7]));
        let err = slicer
            .slice_model(&broken, 0.5, SliceMode::Volumetric)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Geometry);
        assert!(slicer.slices().is_empty());
        assert_eq!(slicer.error().map(|x| x.kind()), Some(ErrorKind::Geometry));
    }

    #[test]
    fn new_run_supersedes_old_one() {
        let slicer = Slicer::new();
        let mut old = slicer.slice_model(&cube(), 0.1, SliceMode::Contour).unwrap();
        assert_eq!(old.step(), TaskPoll::Pending);

        let mut tall = cube();
        tall.set_scale(Pos::new(1.0, 1.0, 2.0));
        let mut new = slicer.slice_model(&tall, 0.5, SliceMode::Volumetric).unwrap();
        assert!(slicer.slices().is_empty());

        assert_eq!(old.step(), TaskPoll::Stale);
        assert!(!old.is_current());
        assert!(slicer.slices().is_empty());
        assert_eq!(slicer.progress().total_layers, 4);

        assert_eq!(new.step(), TaskPoll::Pending);
        assert_eq!(old.step(), TaskPoll::Stale);
        assert_eq!(slicer.slices().len(), 1);
        assert_eq!(slicer.slices().mode(), SliceMode::Volumetric);
        assert_eq!(old.run().unwrap_err(), SliceError::Superseded);

        let set = new.run().unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.layer_height(), 0.5);
    }

    #[test]
    fn concurrent_starts_leave_one_current_run() {
        let slicer = Slicer::new();
        let mut tall = cube();
        tall.set_scale(Pos::new(20.0, 20.0, 4.0));

        let (slicer, tall) = (&slicer, &tall);
        let results = std::thread::scope(|s| {
            let handles = (0..4)
                .map(|_| s.spawn(move || slicer.slice_model(tall, 0.25, SliceMode::Volumetric)))
                .collect::<Vec<_>>();

            // Progress stays readable while the runs are being set up.
            while !handles.iter().all(|x| x.is_finished()) {
                assert_ne!(slicer.progress().status, SliceStatus::Error);
            }

            handles
                .into_iter()
                .map(|x| x.join().unwrap())
                .collect::<Vec<_>>()
        });

        let mut current = 0;
        for result in results {
            match result {
                Ok(task) => current += task.is_current() as usize,
                Err(err) => assert_eq!(err, SliceError::Superseded),
            }
        }

        assert!(current <= 1);
        assert!(slicer.is_slicing());
    }

    #[test]
    fn release_cancels() {
        let slicer = Slicer::new();
        let mut task = slicer.slice_model(&cube(), 0.25, SliceMode::Contour).unwrap();
        task.step();

        slicer.release();
        assert_eq!(slicer.progress(), ProgressState::default());
        assert_eq!(task.step(), TaskPoll::Stale);
        assert!(slicer.slices().is_empty());
    }

    #[test]
    fn flat_mesh_finishes_immediately() {
        let slicer = Slicer::new();
        let flat = Mesh::new(vec![Pos::zeros(), Pos::x(), Pos::y()], None);
        let mut task = slicer.slice_model(&flat, 0.1, SliceMode::Volumetric).unwrap();

        assert_eq!(task.total_layers(), 0);
        assert_eq!(task.step(), TaskPoll::Done);
        assert_eq!(slicer.progress().progress(), 1.0);
        assert!(slicer.slices().is_empty());
    }

    #[test]
    fn driven_by_task_manager() {
        let slicer = Slicer::new();
        let mut tasks = TaskManager::default();

        tasks.add(slicer.slice_model(&cube(), 0.25, SliceMode::Contour).unwrap());
        tasks.tick();
        tasks.add(slicer.slice_model(&cube(), 0.5, SliceMode::Contour).unwrap());
        assert_eq!(tasks.len(), 2);

        // The stale task drops out on the next tick.
        tasks.tick();
        assert_eq!(tasks.len(), 1);

        let ticks = tasks.run_until_idle();
        assert_eq!(ticks, 1);
        assert_eq!(slicer.slices().len(), 2);
        assert_eq!(slicer.progress().status, SliceStatus::Done);
    }

    #[test]
    fn custom_palette_from_config() {
        let config = SliceConfig {
            palette: vec![Color::from_hex(0xabcdef)],
            ..Default::default()
        };
        let slicer = Slicer::from_config(&config);
        let set = slicer
            .slice_blocking(&cube(), 0.5, SliceMode::Volumetric)
            .unwrap();
        assert!(set.iter().all(|x| x.color == Color::from_hex(0xabcdef)));
    }
}
