//! Weather station: a notifier entity with three observable measurements and
//! the displays that watch it.

use std::fmt;

use serde::Deserialize;

use crate::attribute::ObservableAttribute;
use crate::config::SubjectConfig;
use crate::error::{NotifyError, UpdateError};
use crate::notifier::Notifier;
use crate::subject::{Observer, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    #[serde(alias = "temperature")]
    Temp,
    Humidity,
    Pressure,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Measurement::Temp => "temp",
            Measurement::Humidity => "humidity",
            Measurement::Pressure => "pressure",
        };
        f.write_str(name)
    }
}

// ============================================================================
// WeatherData (subject)
// ============================================================================

pub struct WeatherData {
    subject: Subject<WeatherData>,
    temp: ObservableAttribute<f64>,
    humidity: ObservableAttribute<f64>,
    pressure: ObservableAttribute<f64>,
}

impl WeatherData {
    pub fn new() -> Self {
        Self::with_config(SubjectConfig::default())
    }

    pub fn with_config(config: SubjectConfig) -> Self {
        WeatherData {
            subject: Subject::with_config(config),
            temp: ObservableAttribute::with_default("temp"),
            humidity: ObservableAttribute::with_default("humidity"),
            pressure: ObservableAttribute::with_default("pressure"),
        }
    }

    pub fn temp(&self) -> f64 {
        *self.temp.get()
    }

    pub fn humidity(&self) -> f64 {
        *self.humidity.get()
    }

    pub fn pressure(&self) -> f64 {
        *self.pressure.get()
    }

    pub fn get(&self, measurement: Measurement) -> f64 {
        match measurement {
            Measurement::Temp => self.temp(),
            Measurement::Humidity => self.humidity(),
            Measurement::Pressure => self.pressure(),
        }
    }

    pub fn set_temp(&mut self, value: f64) -> Result<(), NotifyError> {
        self.set_attribute(|w| &mut w.temp, value)
    }

    pub fn set_humidity(&mut self, value: f64) -> Result<(), NotifyError> {
        self.set_attribute(|w| &mut w.humidity, value)
    }

    pub fn set_pressure(&mut self, value: f64) -> Result<(), NotifyError> {
        self.set_attribute(|w| &mut w.pressure, value)
    }

    pub fn set(&mut self, measurement: Measurement, value: f64) -> Result<(), NotifyError> {
        match measurement {
            Measurement::Temp => self.set_temp(value),
            Measurement::Humidity => self.set_humidity(value),
            Measurement::Pressure => self.set_pressure(value),
        }
    }

    /// Write all three measurements; observers hear about each one.
    ///
    /// Every value is stored even when a notification fails. The failures of
    /// all three broadcasts come back together.
    pub fn set_measurements(
        &mut self,
        temp: f64,
        humidity: f64,
        pressure: f64,
    ) -> Result<(), NotifyError> {
        let outcomes = [
            self.set_temp(temp),
            self.set_humidity(humidity),
            self.set_pressure(pressure),
        ];

        let failures = outcomes
            .into_iter()
            .filter_map(Result::err)
            .flat_map(NotifyError::into_failures)
            .collect();
        NotifyError::new(failures).into_result()
    }
}

impl Default for WeatherData {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for WeatherData {
    fn subject(&self) -> &Subject<Self> {
        &self.subject
    }

    fn subject_mut(&mut self) -> &mut Subject<Self> {
        &mut self.subject
    }
}

impl fmt::Debug for WeatherData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherData")
            .field("temp", &self.temp())
            .field("humidity", &self.humidity())
            .field("pressure", &self.pressure())
            .field("observers", &self.subject.len())
            .finish()
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Renders the current conditions on every change.
#[derive(Debug, Default)]
pub struct ConditionsDisplay {
    lines: Vec<String>,
}

impl ConditionsDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(data: &WeatherData) -> String {
        format!(
            "Current conditions: {} deg F and {}% humidity",
            data.temp(),
            data.humidity()
        )
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

impl Observer<WeatherData> for ConditionsDisplay {
    fn update(&mut self, subject: &WeatherData) -> Result<(), UpdateError> {
        self.lines.push(Self::render(subject));
        Ok(())
    }

    fn name(&self) -> &str {
        "conditions"
    }
}

/// Min/avg/max temperature over every notification received.
#[derive(Debug, Default)]
pub struct StatisticsDisplay {
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
    count: usize,
}

impl StatisticsDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn summary(&self) -> Option<String> {
        let (avg, max, min) = (self.average()?, self.max?, self.min?);
        Some(format!("Avg/Max/Min temperature = {avg:.1}/{max}/{min}"))
    }
}

impl Observer<WeatherData> for StatisticsDisplay {
    fn update(&mut self, subject: &WeatherData) -> Result<(), UpdateError> {
        let temp = subject.temp();
        self.min = Some(self.min.map_or(temp, |m| m.min(temp)));
        self.max = Some(self.max.map_or(temp, |m| m.max(temp)));
        self.sum += temp;
        self.count += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "statistics"
    }
}

/// Refuses updates once the temperature goes above `limit`.
#[derive(Debug)]
pub struct ThresholdAlarm {
    limit: f64,
    tripped: usize,
}

impl ThresholdAlarm {
    pub fn new(limit: f64) -> Self {
        ThresholdAlarm { limit, tripped: 0 }
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn tripped(&self) -> usize {
        self.tripped
    }
}

impl Observer<WeatherData> for ThresholdAlarm {
    fn update(&mut self, subject: &WeatherData) -> Result<(), UpdateError> {
        let temp = subject.temp();
        if temp > self.limit {
            self.tripped += 1;
            return Err(UpdateError::rejected(format!(
                "temperature {temp} deg F exceeds limit {}",
                self.limit
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "alarm"
    }
}
