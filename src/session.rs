//! The player's state: one chorale, the seed it grew from, and everything
//! derived from them.
//!
//! A `Session` is owned by a single controller (the terminal app, a test)
//! and mutated one call at a time. The audio backend is opened lazily on
//! the first `play`, through the factory handed to [`Session::new`].

use log::{info, warn};

use crate::{
    audio::{AudioError, AudioScheduler, SynthBackend},
    chorale::{
        parse_seed_table, Chorale, ChoraleStats, Chord, SeedError, SeedMatrix, MAX_PITCH,
        SEED_CHORDS, VOICES,
    },
    config::PlayerConfig,
    roll::{PianoRoll, Surface},
    service::{ExportService, GenerationRequest, GenerationService, SeedType},
};

/// Rows shown in the notes listing unless everything is requested
pub const NOTES_PREVIEW_ROWS: usize = 24;

pub const STATUS_GENERATING: &str = "Generating...";
pub const STATUS_GENERATED: &str = "Generation complete.";
pub const CSV_LOADED: &str = "CSV loaded. Ready to generate.";
pub const CSV_REJECTED: &str = "CSV must have at least 8 rows of 4 numbers.";
pub const CSV_MISSING: &str = "Please upload a CSV first.";
pub const MODEL_LOADED: &str = "Model loaded.";
pub const MODEL_NOT_LOADED: &str = "Model not loaded.";
pub const MODEL_UNKNOWN: &str = "Model status unavailable.";

pub type BackendFactory<B> = Box<dyn FnMut() -> Result<B, AudioError>>;

/// One line of the notes listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRow {
    /// 1-based chord number
    pub number: usize,
    pub chord: Chord,
    /// Chord belongs to the seed prefix
    pub seed: bool,
}

pub struct Session<B: SynthBackend> {
    config: PlayerConfig,

    chorale: Option<Chorale>,
    seed_boundary: usize,

    seed_grid: SeedMatrix,
    csv_seed: Option<SeedMatrix>,
    seed_type: SeedType,
    sampling_seed: Option<u64>,
    seed_random: Option<u64>,

    status: String,
    csv_status: String,
    show_all_notes: bool,

    roll: PianoRoll,
    surface: Surface,

    scheduler: Option<AudioScheduler<B>>,
    backend_factory: BackendFactory<B>,
}

impl<B: SynthBackend> Session<B> {
    pub fn new(config: PlayerConfig, backend_factory: BackendFactory<B>) -> Self {
        let roll = PianoRoll::new(config.roll);
        let mut surface = Surface::new(config.roll.min_width, config.roll.surface_height());
        roll.render(&mut surface, None, 0);

        Self {
            config,
            chorale: None,
            seed_boundary: 0,
            seed_grid: SeedMatrix::default(),
            csv_seed: None,
            seed_type: SeedType::Manual,
            sampling_seed: None,
            seed_random: None,
            status: String::new(),
            csv_status: String::new(),
            show_all_notes: false,
            roll,
            surface,
            scheduler: None,
            backend_factory,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn chorale(&self) -> Option<&Chorale> {
        self.chorale.as_ref()
    }

    pub fn seed_boundary(&self) -> usize {
        self.seed_boundary
    }

    pub fn seed_grid(&self) -> &SeedMatrix {
        &self.seed_grid
    }

    /// Edit one cell of the manual seed grid. Pitches above 127 are
    /// clamped, 0 is a rest; out-of-range cells are ignored.
    pub fn set_seed_pitch(&mut self, chord: usize, voice: usize, pitch: u8) {
        if chord < SEED_CHORDS && voice < VOICES {
            self.seed_grid.0[chord].0[voice] = pitch.min(MAX_PITCH);
        }
    }

    pub fn csv_seed(&self) -> Option<&SeedMatrix> {
        self.csv_seed.as_ref()
    }

    pub fn seed_type(&self) -> SeedType {
        self.seed_type
    }

    pub fn set_seed_type(&mut self, seed_type: SeedType) {
        self.seed_type = seed_type;
    }

    /// Sampling seed passed to the model, for reproducible generations
    pub fn set_sampling_seed(&mut self, seed: Option<u64>) {
        self.sampling_seed = seed;
    }

    pub fn seed_random(&self) -> Option<u64> {
        self.seed_random
    }

    /// RNG seed for service-drawn random seeds
    pub fn set_seed_random(&mut self, seed: Option<u64>) {
        self.seed_random = seed;
    }

    pub fn set_length(&mut self, length: usize) {
        self.config.length = length;
    }

    pub fn set_rest_probability(&mut self, probability: f64) {
        self.config.rest_probability = probability.clamp(0.0, 1.0);
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn csv_status(&self) -> &str {
        &self.csv_status
    }

    pub fn stats(&self) -> ChoraleStats {
        ChoraleStats::compute(self.chorale.as_ref())
    }

    pub fn roll(&self) -> &PianoRoll {
        &self.roll
    }

    /// The piano roll as last rendered
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Ask `service` whether its model is ready and put the answer on the
    /// status line
    pub fn check_status(&mut self, service: &mut dyn GenerationService) {
        let status = match service.model_loaded() {
            Ok(true) => MODEL_LOADED,
            Ok(false) => MODEL_NOT_LOADED,
            Err(err) => {
                warn!("model status check failed: {}", err);
                MODEL_UNKNOWN
            }
        };
        self.status = status.to_owned();
    }

    /// Parse an uploaded seed table. On success the table becomes the CSV
    /// seed and is copied into the seed grid; on failure any earlier CSV
    /// seed is dropped.
    pub fn load_seed_csv(&mut self, text: &str) -> Result<(), SeedError> {
        match parse_seed_table(text) {
            Ok(seed) => {
                self.csv_seed = Some(seed);
                self.seed_grid = seed;
                self.csv_status = CSV_LOADED.to_owned();
                Ok(())
            }
            Err(err) => {
                self.csv_seed = None;
                self.csv_status = CSV_REJECTED.to_owned();
                Err(err)
            }
        }
    }

    /// The request the current seed selection would send, or `None` when
    /// the CSV source is selected but nothing was loaded
    pub fn request(&self) -> Option<GenerationRequest> {
        let length = self.config.length;
        let request = match self.seed_type {
            SeedType::Manual => {
                GenerationRequest::with_seed(SeedType::Manual, self.seed_grid, length)
            }
            SeedType::Csv => GenerationRequest::with_seed(SeedType::Csv, self.csv_seed?, length),
            SeedType::Random => {
                GenerationRequest::random(length, self.seed_random, self.config.rest_probability)
            }
        };
        Some(request.random_seed(self.sampling_seed))
    }

    /// Ask `service` for a new chorale.
    ///
    /// On success the chorale and its seed boundary replace the old ones
    /// together and the roll is redrawn. On failure the error lands on the
    /// status line and nothing else changes. Returns whether a new chorale
    /// was installed.
    pub fn generate(&mut self, service: &mut dyn GenerationService) -> bool {
        let Some(request) = self.request() else {
            self.csv_status = CSV_MISSING.to_owned();
            return false;
        };

        self.status = STATUS_GENERATING.to_owned();
        match service.generate(&request) {
            Ok(response) => {
                info!(
                    "generated {} chords, seed boundary {}",
                    response.chorale.len(),
                    response.generated_start
                );
                self.seed_boundary = response.generated_start;
                self.chorale = Some(response.chorale);
                if let Some(seed) = response.seed_chords {
                    self.seed_grid = seed;
                }
                self.redraw();
                self.status = STATUS_GENERATED.to_owned();
                true
            }
            Err(err) => {
                warn!("generation failed: {}", err);
                self.status = format!("Error: {err}");
                false
            }
        }
    }

    /// Export the current chorale. Nothing happens without one.
    pub fn export(&mut self, service: &mut dyn ExportService) -> Option<Vec<u8>> {
        let chorale = self.chorale.as_ref()?;
        match service.export(chorale) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("export failed: {}", err);
                self.status = format!("Error: {err}");
                None
            }
        }
    }

    /// Play the current chorale at `tempo_bpm`, replacing any playback in
    /// progress. Returns the number of voices scheduled.
    pub fn play(&mut self, tempo_bpm: f64) -> usize {
        let Some(chorale) = self.chorale.as_ref().filter(|c| !c.is_empty()) else {
            return 0;
        };

        if self.scheduler.is_none() {
            match (self.backend_factory)() {
                Ok(backend) => {
                    self.scheduler = Some(AudioScheduler::new(backend, self.config.playback));
                }
                Err(err) => {
                    warn!("audio unavailable: {}", err);
                    self.status = format!("Error: {err}");
                    return 0;
                }
            }
        }

        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.play(Some(chorale), tempo_bpm),
            None => 0,
        }
    }

    pub fn stop(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
    }

    /// Periodic upkeep; the controller calls this while it waits
    pub fn tick(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.tick();
        }
    }

    pub fn scheduler(&self) -> Option<&AudioScheduler<B>> {
        self.scheduler.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> Option<&mut AudioScheduler<B>> {
        self.scheduler.as_mut()
    }

    /// Chord under the playhead
    pub fn position(&self) -> Option<usize> {
        self.scheduler.as_ref()?.position()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.is_playing())
    }

    pub fn shows_all_notes(&self) -> bool {
        self.show_all_notes
    }

    pub fn toggle_notes(&mut self) {
        self.show_all_notes = !self.show_all_notes;
    }

    /// The notes listing: the first few chords, or all of them when toggled
    pub fn notes(&self) -> Vec<NoteRow> {
        let Some(chorale) = &self.chorale else {
            return Vec::new();
        };
        let limit = if self.show_all_notes {
            chorale.len()
        } else {
            chorale.len().min(NOTES_PREVIEW_ROWS)
        };

        chorale
            .iter()
            .take(limit)
            .enumerate()
            .map(|(index, chord)| NoteRow {
                number: index + 1,
                chord: *chord,
                seed: index < self.seed_boundary,
            })
            .collect()
    }

    fn redraw(&mut self) {
        self.roll
            .render(&mut self.surface, self.chorale.as_ref(), self.seed_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::OfflineBackend,
        service::{GenerationResponse, JsonExport, ServiceError},
    };

    struct Recording {
        requests: Vec<GenerationRequest>,
        reply: Option<GenerationResponse>,
    }

    impl Recording {
        fn answering(reply: GenerationResponse) -> Self {
            Self {
                requests: Vec::new(),
                reply: Some(reply),
            }
        }

        fn failing() -> Self {
            Self {
                requests: Vec::new(),
                reply: None,
            }
        }
    }

    impl GenerationService for Recording {
        fn generate(
            &mut self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, ServiceError> {
            self.requests.push(request.clone());
            self.reply
                .clone()
                .ok_or_else(|| ServiceError::Rejected("model not loaded".into()))
        }

        fn model_loaded(&mut self) -> Result<bool, ServiceError> {
            Ok(self.reply.is_some())
        }
    }

    struct BrokenExport;

    impl ExportService for BrokenExport {
        fn export(&mut self, _: &Chorale) -> Result<Vec<u8>, ServiceError> {
            Err(ServiceError::Unavailable("MIDI generation failed".into()))
        }
    }

    fn session() -> Session<OfflineBackend> {
        Session::new(
            PlayerConfig::default(),
            Box::new(|| Ok(OfflineBackend::new(8_000.0))),
        )
    }

    fn response(len: usize, generated_start: usize) -> GenerationResponse {
        let seed = SeedMatrix([Chord([50, 0, 0, 0]); 8]);
        let chorale = (0..len)
            .map(|i| Chord([48 + (i % 12) as u8, 64, 0, 72]))
            .collect();
        GenerationResponse {
            chorale,
            generated_start,
            seed_chords: Some(seed),
        }
    }

    const SEED_CSV: &str = "60,64,67,72\n62,65,69,74\n59,62,67,71\n60,64,67,72\n\
                            57,60,64,69\n55,59,62,67\n60,64,67,72\n60,64,67,72\n";

    #[test]
    fn fresh_session_shows_placeholders() {
        let s = session();
        let stats = s.stats();
        assert_eq!(stats.chord_count_label(), "--");
        assert_eq!(stats.rest_count_label(), "--");
        assert_eq!(stats.pitch_range_label(), "--");
        assert!(s.notes().is_empty());
        assert_eq!(s.seed_grid(), &SeedMatrix::default());
    }

    #[test]
    fn generation_shades_seed_and_draws_divider() {
        let mut s = session();
        let mut service = Recording::answering(response(56, 8));
        assert!(s.generate(&mut service));

        let palette = *s.roll().palette();
        let surface = s.surface();
        // Pitch 81 row is empty in this chorale
        assert_eq!(surface.pixel(40, 0), Some(palette.seed_tint.over(palette.background)));
        assert_eq!(surface.pixel(79, 0), Some(palette.seed_tint.over(palette.background)));
        assert_eq!(surface.pixel(80, 0), Some(palette.divider.over(palette.background)));
        assert_eq!(surface.pixel(81, 0), Some(palette.background));

        let y = (81 - 64) * 6 + 1;
        assert_eq!(surface.pixel(75, y), Some(palette.seed_note));
        assert_eq!(surface.pixel(85, y), Some(palette.generated_note));
        assert_eq!(s.status(), STATUS_GENERATED);
    }

    #[test]
    fn service_seed_overwrites_grid() {
        let mut s = session();
        s.generate(&mut Recording::answering(response(16, 8)));
        assert_eq!(s.seed_grid(), &SeedMatrix([Chord([50, 0, 0, 0]); 8]));
    }

    #[test]
    fn grid_survives_reply_without_seed() {
        let mut s = session();
        let mut reply = response(16, 8);
        reply.seed_chords = None;
        s.generate(&mut Recording::answering(reply));
        assert_eq!(s.seed_grid(), &SeedMatrix::default());
    }

    #[test]
    fn failed_generation_keeps_prior_state() {
        let mut s = session();
        s.generate(&mut Recording::answering(response(16, 8)));
        let surface = s.surface().clone();
        let chorale = s.chorale().cloned();

        assert!(!s.generate(&mut Recording::failing()));
        assert_eq!(s.status(), "Error: model not loaded");
        assert_eq!(s.chorale().cloned(), chorale);
        assert_eq!(s.seed_boundary(), 8);
        assert_eq!(s.surface(), &surface);
    }

    #[test]
    fn manual_request_sends_grid() {
        let mut s = session();
        s.set_sampling_seed(Some(11));
        let mut service = Recording::answering(response(4, 0));
        s.generate(&mut service);

        let request = &service.requests[0];
        assert_eq!(request.seed_type, SeedType::Manual);
        assert_eq!(request.seed_chords, Some(SeedMatrix::default()));
        assert_eq!(request.random_seed, Some(11));
        assert_eq!(request.length, 56);
    }

    #[test]
    fn csv_source_without_upload_fails_locally() {
        let mut s = session();
        s.set_seed_type(SeedType::Csv);
        let mut service = Recording::answering(response(4, 0));

        assert!(!s.generate(&mut service));
        assert!(service.requests.is_empty());
        assert_eq!(s.csv_status(), CSV_MISSING);
    }

    #[test]
    fn csv_upload_feeds_grid_and_request() {
        let mut s = session();
        s.load_seed_csv(SEED_CSV).unwrap();
        assert_eq!(s.csv_status(), CSV_LOADED);
        assert_eq!(s.seed_grid().rows()[2], Chord([59, 62, 67, 71]));

        s.set_seed_type(SeedType::Csv);
        let mut service = Recording::answering(response(4, 0));
        s.generate(&mut service);
        assert_eq!(service.requests[0].seed_chords, s.csv_seed().copied());
    }

    #[test]
    fn bad_csv_drops_earlier_upload() {
        let mut s = session();
        s.load_seed_csv(SEED_CSV).unwrap();
        assert!(s.load_seed_csv("60,64,67,72\n").is_err());
        assert_eq!(s.csv_status(), CSV_REJECTED);
        assert!(s.csv_seed().is_none());
    }

    #[test]
    fn random_request_carries_rest_probability() {
        let mut s = session();
        s.set_seed_type(SeedType::Random);
        s.set_seed_random(Some(5));
        s.set_rest_probability(1.5);

        let request = s.request().unwrap();
        assert_eq!(request.seed_chords, None);
        assert_eq!(request.seed_random, Some(5));
        assert_eq!(request.rest_probability, Some(1.0));
    }

    #[test]
    fn edited_grid_cells_reach_the_request() {
        let mut s = session();
        s.set_seed_pitch(0, 0, 200);
        s.set_seed_pitch(7, 3, 0);
        s.set_seed_pitch(8, 0, 60);
        s.set_seed_pitch(0, 4, 60);
        s.set_length(24);

        let request = s.request().unwrap();
        let seed = request.seed_chords.unwrap();
        assert_eq!(seed.rows()[0], Chord([127, 64, 67, 72]));
        assert_eq!(seed.rows()[7].pitches()[3], 0);
        assert_eq!(request.length, 24);
    }

    #[test]
    fn model_status_lands_on_status_line() {
        let mut s = session();
        s.check_status(&mut Recording::answering(response(2, 0)));
        assert_eq!(s.status(), MODEL_LOADED);

        s.check_status(&mut Recording::failing());
        assert_eq!(s.status(), MODEL_NOT_LOADED);

        s.check_status(&mut crate::service::UnavailableService);
        assert_eq!(s.status(), MODEL_UNKNOWN);
    }

    #[test]
    fn tick_forgets_finished_voices() {
        let mut s = session();
        s.tick();
        s.generate(&mut Recording::answering(response(4, 0)));
        s.play(240.0);

        if let Some(scheduler) = s.scheduler_mut() {
            scheduler.backend_mut().advance(2.0);
        }
        s.tick();
        assert!(!s.is_playing());
        assert_eq!(s.scheduler().map(|sch| sch.scheduled_count()), Some(0));
    }

    #[test]
    fn notes_listing_is_capped_until_toggled() {
        let mut s = session();
        s.generate(&mut Recording::answering(response(56, 8)));

        let rows = s.notes();
        assert_eq!(rows.len(), NOTES_PREVIEW_ROWS);
        assert_eq!(rows[0].number, 1);
        assert!(rows[7].seed);
        assert!(!rows[8].seed);

        s.toggle_notes();
        assert_eq!(s.notes().len(), 56);
    }

    #[test]
    fn play_without_chorale_opens_nothing() {
        let mut s = Session::<OfflineBackend>::new(
            PlayerConfig::default(),
            Box::new(|| -> Result<OfflineBackend, AudioError> {
                panic!("backend opened without a chorale")
            }),
        );
        assert_eq!(s.play(90.0), 0);
        s.stop();
        assert!(s.scheduler().is_none());
    }

    #[test]
    fn backend_failure_lands_on_status() {
        let mut s = Session::<OfflineBackend>::new(
            PlayerConfig::default(),
            Box::new(|| Err(AudioError::NoOutputDevice)),
        );
        s.generate(&mut Recording::answering(response(4, 0)));

        assert_eq!(s.play(90.0), 0);
        assert_eq!(s.status(), "Error: no default output device available");
    }

    #[test]
    fn play_and_stop_go_through_scheduler() {
        let mut s = session();
        s.generate(&mut Recording::answering(response(4, 0)));

        // three notes per chord
        assert_eq!(s.play(120.0), 12);
        assert!(s.is_playing());
        s.stop();
        assert!(!s.is_playing());
        assert_eq!(s.scheduler().map(|sch| sch.scheduled_count()), Some(0));
    }

    #[test]
    fn export_needs_a_chorale() {
        let mut s = session();
        assert_eq!(s.export(&mut JsonExport), None);

        s.generate(&mut Recording::answering(response(2, 0)));
        assert!(s.export(&mut JsonExport).is_some());

        assert_eq!(s.export(&mut BrokenExport), None);
        assert_eq!(s.status(), "Error: service unavailable: MIDI generation failed");
    }
}
