//! Replays a scripted sequence of weather readings through the station.
//!
//! A scenario is a TOML document:
//!
//! ```toml
//! [subject]
//! notify_policy = "best-effort"
//!
//! [alarm]
//! limit = 90.0
//!
//! [[step]]
//! action = "attach"
//! observer = "conditions"
//!
//! [[step]]
//! action = "set"
//! attribute = "temp"
//! value = 42.0
//! ```

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{NotifyPolicy, SubjectConfig};
use crate::error::{ConfigError, NotifyError, ObserverError};
use crate::notifier::Notifier;
use crate::subject::ObserverHandle;
use crate::weather::{ConditionsDisplay, Measurement, StatisticsDisplay, ThresholdAlarm, WeatherData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObserverKind {
    Conditions,
    Statistics,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Step {
    Set { attribute: Measurement, value: f64 },
    Attach { observer: ObserverKind },
    Detach { observer: ObserverKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlarmConfig {
    pub limit: f64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        AlarmConfig { limit: 100.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub subject: SubjectConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Outcome of a scenario run.
#[derive(Debug, Default)]
pub struct Report {
    /// Every line the conditions display rendered.
    pub conditions: Vec<String>,
    /// Temperature statistics, if the statistics display saw any reading.
    pub statistics: Option<String>,
    /// Failures recorded under best-effort notification.
    pub failures: Vec<ObserverError>,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
}

impl Scenario {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The classic walkthrough: attach a display, write two readings,
    /// detach it, write a third reading nobody sees.
    pub fn demo() -> Self {
        Scenario {
            subject: SubjectConfig::default(),
            alarm: AlarmConfig::default(),
            steps: vec![
                Step::Attach {
                    observer: ObserverKind::Conditions,
                },
                Step::Set {
                    attribute: Measurement::Temp,
                    value: 42.0,
                },
                Step::Set {
                    attribute: Measurement::Humidity,
                    value: 50.0,
                },
                Step::Detach {
                    observer: ObserverKind::Conditions,
                },
                Step::Set {
                    attribute: Measurement::Temp,
                    value: 31.0,
                },
            ],
        }
    }

    pub fn with_notify_policy(mut self, policy: NotifyPolicy) -> Self {
        self.subject.notify_policy = policy;
        self
    }

    /// Run every step against a fresh station.
    ///
    /// Under fail-fast notification the first failure aborts the run. Under
    /// best-effort it is recorded in the report and the run continues.
    pub fn run(&self) -> Result<Report, NotifyError> {
        let mut station = WeatherData::with_config(self.subject);
        let conditions = Rc::new(RefCell::new(ConditionsDisplay::new()));
        let statistics = Rc::new(RefCell::new(StatisticsDisplay::new()));
        let alarm = Rc::new(RefCell::new(ThresholdAlarm::new(self.alarm.limit)));

        let handle = |kind: ObserverKind| -> ObserverHandle<WeatherData> {
            match kind {
                ObserverKind::Conditions => conditions.clone(),
                ObserverKind::Statistics => statistics.clone(),
                ObserverKind::Alarm => alarm.clone(),
            }
        };

        let mut failures = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = index, ?step, "running step");
            let outcome = match *step {
                Step::Set { attribute, value } => station.set(attribute, value),
                Step::Attach { observer } => station
                    .register_observer(handle(observer))
                    .map_err(NotifyError::single),
                Step::Detach { observer } => {
                    if !station.remove_observer(&handle(observer)) {
                        debug!(?observer, "detach of an observer that is not attached");
                    }
                    Ok(())
                }
            };

            if let Err(err) = outcome {
                if self.subject.notify_policy == NotifyPolicy::FailFast {
                    return Err(err);
                }
                warn!(step = index, error = %err, "step failed, continuing");
                failures.extend(err.into_failures());
            }
        }

        info!(
            steps = self.steps.len(),
            failures = failures.len(),
            "scenario finished"
        );
        let report = Report {
            conditions: conditions.borrow().lines().to_vec(),
            statistics: statistics.borrow().summary(),
            failures,
            temp: station.temp(),
            humidity: station.humidity(),
            pressure: station.pressure(),
        };
        Ok(report)
    }
}
