use chrono::{Duration, NaiveDateTime};

use crate::processing::types::{Field, Intensity, Reading, Sample};

const KMH_PER_MPS: f64 = 3.6;

#[derive(Clone, Copy)]
enum Curve {
    Distance,
    Altitude,
}

/// A contiguous block of 1 Hz telemetry.
///
/// Samples are appended through [`Lap::push`], which derives the timestamp
/// and the per-second distance/altitude deltas. The cumulative curves are only
/// written later by [`Lap::update_distance`] and [`Lap::update_altitude`] once
/// the lap's place in its session is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Lap {
    start: NaiveDateTime,
    intensity: Intensity,
    samples: Vec<Sample>,
}

impl Lap {
    pub fn new(start: NaiveDateTime, intensity: Intensity) -> Self {
        Self {
            start,
            intensity,
            samples: Vec::new(),
        }
    }

    pub fn active(start: NaiveDateTime) -> Self {
        Self::new(start, Intensity::Active)
    }

    pub fn resting(start: NaiveDateTime) -> Self {
        Self::new(start, Intensity::Resting)
    }

    /// Append one second of telemetry.
    ///
    /// The grade is stored as 10x the percentage, so dividing by 1000 yields
    /// the slope ratio.
    pub fn push(&mut self, reading: Reading) {
        let time = match self.samples.last() {
            Some(previous) => previous.time + Duration::seconds(1),
            None => self.start,
        };
        let distance_delta = reading.speed / KMH_PER_MPS;
        let altitude_delta = distance_delta * (f64::from(reading.grade) / 1000.0).atan().sin();

        self.samples.push(Sample {
            time,
            pulse: reading.pulse,
            cadence: reading.cadence,
            power: reading.power,
            grade: reading.grade,
            speed: reading.speed,
            distance_delta,
            altitude_delta,
            distance: 0.0,
            altitude: 0.0,
        });
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start
    }

    /// Timestamp of the last sample, or the start time for an empty lap.
    pub fn end_time(&self) -> NaiveDateTime {
        self.samples
            .last()
            .map_or(self.start, |sample| sample.time)
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn total_time_seconds(&self) -> f64 {
        (self.end_time() - self.start).num_seconds() as f64
    }

    fn values(&self, field: Field) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |sample| sample.value(field))
    }

    pub fn sum(&self, field: Field) -> f64 {
        self.values(field).sum()
    }

    pub fn average(&self, field: Field) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum(field) / self.samples.len() as f64)
        }
    }

    pub fn maximum(&self, field: Field) -> Option<f64> {
        self.values(field).reduce(f64::max)
    }

    pub fn minimum(&self, field: Field) -> Option<f64> {
        self.values(field).reduce(f64::min)
    }

    /// Highest mean of `field` over any `window` consecutive samples.
    ///
    /// Only full windows count. When the window is longer than the lap the
    /// missing samples contribute zero, so the result is `sum / window`.
    pub fn max_average(&self, field: Field, window: usize) -> Option<f64> {
        if window == 0 || self.samples.is_empty() {
            return None;
        }
        if window == 1 {
            return self.maximum(field);
        }

        let values: Vec<f64> = self.values(field).collect();
        if window > values.len() {
            return Some(values.iter().sum::<f64>() / window as f64);
        }

        let mut running: f64 = values[..window].iter().sum();
        let mut best = running;
        for idx in window..values.len() {
            running += values[idx] - values[idx - window];
            best = best.max(running);
        }
        Some(best / window as f64)
    }

    /// Sum of the per-second distance deltas.
    pub fn distance_meters(&self) -> f64 {
        self.sum(Field::DistanceDelta)
    }

    pub fn last_pulse(&self) -> Option<i32> {
        self.samples.last().map(|sample| sample.pulse)
    }

    pub fn max_speed_mps(&self) -> Option<f64> {
        self.maximum(Field::Speed).map(|kmh| kmh / KMH_PER_MPS)
    }

    pub fn average_speed_mps(&self) -> Option<f64> {
        self.average(Field::Speed).map(|kmh| kmh / KMH_PER_MPS)
    }

    /// Rewrite cumulative distance starting from `start` and return the final value.
    pub fn update_distance(&mut self, start: f64) -> f64 {
        self.rewrite_curve(start, Curve::Distance)
    }

    /// Rewrite cumulative altitude starting from `start` and return the final value.
    pub fn update_altitude(&mut self, start: f64) -> f64 {
        self.rewrite_curve(start, Curve::Altitude)
    }

    // The first sample takes `start` as is; its own delta is not added.
    fn rewrite_curve(&mut self, start: f64, curve: Curve) -> f64 {
        let mut running = start;
        for (idx, sample) in self.samples.iter_mut().enumerate() {
            let (delta, slot) = match curve {
                Curve::Distance => (sample.distance_delta, &mut sample.distance),
                Curve::Altitude => (sample.altitude_delta, &mut sample.altitude),
            };
            if idx > 0 {
                running += delta;
            }
            *slot = running;
        }
        running
    }
}

impl Extend<Reading> for Lap {
    fn extend<I: IntoIterator<Item = Reading>>(&mut self, readings: I) {
        for reading in readings {
            self.push(reading);
        }
    }
}
