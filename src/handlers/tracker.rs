use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::handlers::events::LocationEvent;
use crate::models::error::{PositionError, TrackerError};
use crate::models::position::PositionSample;
use crate::models::updates::{Control, DisplayField, WatchId, WatchOptions};

/// Speeds below this (m/s) are sensor noise.
pub const MIN_SPEED_THRESHOLD: f64 = 0.1;
/// Distance steps below this (m) are sensor noise.
pub const MIN_DISTANCE_THRESHOLD: f64 = 1.0;

const RESET_VALUE: &str = "0";

/// An active subscription: its handle plus the stream of samples and errors.
pub struct Watch {
    pub id: WatchId,
    pub events: mpsc::Receiver<LocationEvent>,
}

#[async_trait]
pub trait LocationSource: Send {
    async fn watch(&mut self, options: WatchOptions) -> Result<Watch, TrackerError>;
    async fn clear_watch(&mut self, id: WatchId);
}

pub trait DisplaySurface: Send {
    fn set_field(&mut self, field: DisplayField, value: String);
    fn set_control(&mut self, control: Control, enabled: bool);
    fn alert(&mut self, message: String);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub last_accepted_position: Option<PositionSample>,
    pub cumulative_distance_meters: f64,
    pub start_time: Option<Instant>,
    pub is_tracking: bool,
}

pub struct Tracker<L, D> {
    source: L,
    display: D,
    options: WatchOptions,
    state: TrackerState,
    watch_id: Option<WatchId>,
}

impl<L: LocationSource, D: DisplaySurface> Tracker<L, D> {
    pub fn new(source: L, display: D) -> Self {
        Self {
            source,
            display,
            options: WatchOptions::default(),
            state: TrackerState::default(),
            watch_id: None,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    pub fn cumulative_distance(&self) -> f64 {
        self.state.cumulative_distance_meters
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.state.start_time.map(|start| start.elapsed())
    }

    /// Puts the display into its idle layout.
    pub fn show_idle(&mut self) {
        self.display.set_control(Control::Start, true);
        self.display.set_control(Control::Stop, false);
        for field in DisplayField::ALL {
            self.display.set_field(field, RESET_VALUE.to_string());
        }
    }

    /// Subscribes to the location source and begins a fresh session.
    /// The returned receiver carries the session's samples and errors.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<LocationEvent>, TrackerError> {
        if self.state.is_tracking {
            return Err(TrackerError::AlreadyTracking);
        }

        let watch = match self.source.watch(self.options).await {
            Ok(watch) => watch,
            Err(e) => {
                warn!("Unable to start tracking: {}", e);
                if let TrackerError::SourceUnavailable = e {
                    self.display.alert(e.to_string());
                }
                return Err(e);
            }
        };

        self.state = TrackerState {
            last_accepted_position: None,
            cumulative_distance_meters: 0.0,
            start_time: Some(Instant::now()),
            is_tracking: true,
        };
        self.watch_id = Some(watch.id);

        self.display.set_control(Control::Start, false);
        self.display.set_control(Control::Stop, true);

        info!("Tracking started (watch {})", watch.id);
        Ok(watch.events)
    }

    pub async fn stop(&mut self) {
        if !self.state.is_tracking {
            debug!("Stop requested while idle");
            return;
        }

        if let Some(id) = self.watch_id.take() {
            self.source.clear_watch(id).await;
        }

        info!(
            "Tracking stopped after {:.2} m",
            self.state.cumulative_distance_meters
        );
        self.state = TrackerState::default();
        self.show_idle();
    }

    pub fn on_sample(&mut self, sample: PositionSample) {
        if !self.state.is_tracking {
            trace!("Sample received while idle, ignoring");
            return;
        }

        if sample.has_coordinates() {
            self.display.set_field(DisplayField::Latitude, format!("{:.6}", sample.latitude));
            self.display.set_field(DisplayField::Longitude, format!("{:.6}", sample.longitude));
        } else {
            trace!("Sample without numeric coordinates");
        }

        match sample.speed.filter(|speed| !speed.is_nan() && *speed >= MIN_SPEED_THRESHOLD) {
            Some(speed) => {
                self.display.set_field(DisplayField::Speed, format!("{:.2}", speed));

                if let Some(last) = &self.state.last_accepted_position {
                    let distance = last.distance_to(&sample);
                    if distance >= MIN_DISTANCE_THRESHOLD {
                        self.state.cumulative_distance_meters += distance;
                        self.display.set_field(
                            DisplayField::Distance,
                            format!("{:.2}", self.state.cumulative_distance_meters),
                        );
                    } else {
                        trace!("Distance step {:.3} m below threshold", distance);
                    }
                }
                // the reference point advances even when the step was suppressed
                self.state.last_accepted_position = Some(sample);
            }
            None => trace!("Speed {:?} below threshold", sample.speed),
        }

        if let Some(elapsed) = self.elapsed() {
            self.display.set_field(DisplayField::Time, format!("{:.2}", elapsed.as_secs_f64()));
        }
    }

    pub fn on_error(&mut self, error: PositionError) {
        warn!("Location source error ({:?}): {}", error.code, error.message);
        self.display.alert(TrackerError::Sample(error).to_string());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::error::PositionErrorCode;

    #[derive(Default)]
    pub(crate) struct RecordingDisplay {
        pub fields: HashMap<DisplayField, String>,
        pub controls: HashMap<Control, bool>,
        pub alerts: Vec<String>,
    }

    impl RecordingDisplay {
        pub fn field(&self, field: DisplayField) -> Option<&str> {
            self.fields.get(&field).map(String::as_str)
        }
    }

    impl DisplaySurface for RecordingDisplay {
        fn set_field(&mut self, field: DisplayField, value: String) {
            self.fields.insert(field, value);
        }

        fn set_control(&mut self, control: Control, enabled: bool) {
            self.controls.insert(control, enabled);
        }

        fn alert(&mut self, message: String) {
            self.alerts.push(message);
        }
    }

    pub(crate) struct FakeSource {
        pub available: bool,
        pub next_id: WatchId,
        pub options: Vec<WatchOptions>,
        pub cleared: Vec<WatchId>,
        pub senders: Vec<mpsc::Sender<LocationEvent>>,
    }

    impl FakeSource {
        pub fn available() -> Self {
            Self { available: true, next_id: 1, options: vec![], cleared: vec![], senders: vec![] }
        }

        pub fn unavailable() -> Self {
            Self { available: false, ..Self::available() }
        }
    }

    #[async_trait]
    impl LocationSource for FakeSource {
        async fn watch(&mut self, options: WatchOptions) -> Result<Watch, TrackerError> {
            if !self.available {
                return Err(TrackerError::SourceUnavailable);
            }
            let (tx, events) = mpsc::channel(8);
            let id = self.next_id;
            self.next_id += 1;
            self.options.push(options);
            self.senders.push(tx);
            Ok(Watch { id, events })
        }

        async fn clear_watch(&mut self, id: WatchId) {
            self.cleared.push(id);
        }
    }

    fn sample(latitude: f64, longitude: f64, speed: Option<f64>) -> PositionSample {
        PositionSample::new(latitude, longitude, speed)
    }

    /// Latitude (deg) north of the equator that lies `meters` from (0, 0).
    fn meters_north(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    const EARTH_RADIUS_M: f64 = crate::models::position::EARTH_RADIUS_KM * 1000.0;

    fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        crate::models::position::haversine_distance(lat1, lon1, lat2, lon2)
    }

    async fn started() -> Tracker<FakeSource, RecordingDisplay> {
        let mut tracker = Tracker::new(FakeSource::available(), RecordingDisplay::default());
        tracker.start().await.unwrap();
        tracker
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_subscribes_with_high_accuracy_options() {
        let tracker = started().await;
        assert!(tracker.is_tracking());
        assert_eq!(tracker.source.options, vec![WatchOptions {
            enable_high_accuracy: true,
            maximum_age: 0,
            timeout: 5000,
        }]);
        assert!(!tracker.display.controls[&Control::Start]);
        assert!(tracker.display.controls[&Control::Stop]);
        assert_eq!(tracker.cumulative_distance(), 0.0);
        assert!(tracker.state().last_accepted_position.is_none());
    }

    #[tokio::test]
    async fn test_start_without_source_alerts_and_stays_idle() {
        let mut tracker = Tracker::new(FakeSource::unavailable(), RecordingDisplay::default());
        let result = tracker.start().await;
        assert!(matches!(result, Err(TrackerError::SourceUnavailable)));
        assert!(!tracker.is_tracking());
        assert!(tracker.state().start_time.is_none());
        assert_eq!(tracker.display.alerts, vec!["Geolocation is not supported by this browser.".to_string()]);
        assert!(tracker.display.controls.is_empty());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut tracker = started().await;
        assert!(matches!(tracker.start().await, Err(TrackerError::AlreadyTracking)));
        assert_eq!(tracker.source.senders.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_two_samples_one_second_apart() {
        let mut tracker = started().await;

        tracker.on_sample(sample(0.0, 0.0, Some(1.0)));
        tokio::time::advance(Duration::from_secs(1)).await;
        tracker.on_sample(sample(0.0001, 0.0, Some(1.0)));

        let expected = haversine(0.0, 0.0, 0.0001, 0.0);
        assert!((tracker.cumulative_distance() - expected).abs() < 1e-9);
        assert!((expected - 11.12).abs() < 0.01);
        assert_eq!(tracker.display.field(DisplayField::Distance), Some("11.12"));
        assert_eq!(tracker.display.field(DisplayField::Time), Some("1.00"));
        assert_eq!(tracker.display.field(DisplayField::Latitude), Some("0.000100"));
        assert_eq!(tracker.display.field(DisplayField::Longitude), Some("0.000000"));
        assert_eq!(tracker.display.field(DisplayField::Speed), Some("1.00"));
    }

    #[tokio::test]
    async fn test_slow_sample_never_adds_distance() {
        let mut tracker = started().await;

        tracker.on_sample(sample(0.0, 0.0, Some(1.0)));
        tracker.on_sample(sample(1.0, 1.0, Some(0.05)));

        assert_eq!(tracker.cumulative_distance(), 0.0);
        let last = tracker.state().last_accepted_position.unwrap();
        assert_eq!((last.latitude, last.longitude), (0.0, 0.0));
        // speed display keeps the previous value
        assert_eq!(tracker.display.field(DisplayField::Speed), Some("1.00"));
        // coordinates still follow the device
        assert_eq!(tracker.display.field(DisplayField::Latitude), Some("1.000000"));
    }

    #[tokio::test]
    async fn test_missing_speed_is_filtered() {
        let mut tracker = started().await;

        tracker.on_sample(sample(0.0, 0.0, None));
        tracker.on_sample(sample(0.01, 0.0, Some(f64::NAN)));

        assert!(tracker.state().last_accepted_position.is_none());
        assert_eq!(tracker.cumulative_distance(), 0.0);
        assert_eq!(tracker.display.field(DisplayField::Speed), None);
        assert!(tracker.display.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_sub_threshold_step_is_discarded_but_reference_advances() {
        let mut tracker = started().await;
        let half_meter = meters_north(0.5);

        tracker.on_sample(sample(0.0, 0.0, Some(0.5)));
        tracker.on_sample(sample(half_meter, 0.0, Some(0.5)));

        assert_eq!(tracker.cumulative_distance(), 0.0);
        assert_eq!(tracker.display.field(DisplayField::Distance), None);
        let last = tracker.state().last_accepted_position.unwrap();
        assert_eq!(last.latitude, half_meter);
    }

    #[tokio::test]
    async fn test_five_meter_step_is_added() {
        let mut tracker = started().await;

        tracker.on_sample(sample(0.0, 0.0, Some(0.1)));
        tracker.on_sample(sample(meters_north(5.0), 0.0, Some(0.1)));

        assert!((tracker.cumulative_distance() - 5.0).abs() < 1e-6);
        assert_eq!(tracker.display.field(DisplayField::Distance), Some("5.00"));
    }

    #[tokio::test]
    async fn test_distance_is_non_decreasing() {
        let mut tracker = started().await;
        let mut previous = 0.0;

        for (i, speed) in [1.0, 0.0, 2.0, 0.05, 3.0, 0.2].into_iter().enumerate() {
            tracker.on_sample(sample(meters_north(3.0 * i as f64), 0.0, Some(speed)));
            assert!(tracker.cumulative_distance() >= previous);
            previous = tracker.cumulative_distance();
        }
        assert!(previous > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_is_monotonic() {
        let mut tracker = started().await;
        let mut shown = vec![];

        for step in [250, 0, 1000, 1750] {
            tokio::time::advance(Duration::from_millis(step)).await;
            tracker.on_sample(sample(0.0, 0.0, None));
            shown.push(tracker.display.field(DisplayField::Time).unwrap().parse::<f64>().unwrap());
        }

        assert_eq!(shown, vec![0.25, 0.25, 1.25, 3.0]);
    }

    #[tokio::test]
    async fn test_stop_then_start_resets_state() {
        let mut tracker = started().await;
        tracker.on_sample(sample(0.0, 0.0, Some(1.0)));
        tracker.on_sample(sample(meters_north(20.0), 0.0, Some(1.0)));
        assert!(tracker.cumulative_distance() > 19.0);

        tracker.stop().await;
        assert_eq!(tracker.state(), &TrackerState::default());
        assert_eq!(tracker.source.cleared, vec![1]);
        for field in DisplayField::ALL {
            assert_eq!(tracker.display.field(field), Some("0"));
        }
        assert!(tracker.display.controls[&Control::Start]);
        assert!(!tracker.display.controls[&Control::Stop]);

        tracker.start().await.unwrap();
        assert_eq!(tracker.cumulative_distance(), 0.0);
        assert!(tracker.state().last_accepted_position.is_none());
        assert!(tracker.state().start_time.is_some());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_a_no_op() {
        let mut tracker = Tracker::new(FakeSource::available(), RecordingDisplay::default());
        tracker.stop().await;
        assert!(tracker.source.cleared.is_empty());
        assert!(tracker.display.fields.is_empty());
    }

    #[tokio::test]
    async fn test_samples_after_stop_are_ignored() {
        let mut tracker = started().await;
        tracker.stop().await;
        tracker.on_sample(sample(5.0, 5.0, Some(3.0)));
        assert_eq!(tracker.display.field(DisplayField::Latitude), Some("0"));
        assert!(tracker.state().last_accepted_position.is_none());
    }

    #[tokio::test]
    async fn test_error_alerts_and_keeps_tracking() {
        let mut tracker = started().await;
        tracker.on_error(PositionError::new(PositionErrorCode::PermissionDenied, "User denied Geolocation"));

        assert!(tracker.is_tracking());
        assert_eq!(
            tracker.display.alerts,
            vec!["Error occurred while getting your location: User denied Geolocation".to_string()]
        );
    }
}
